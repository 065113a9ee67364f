//! Contract state loading.

use tokio::sync::MutexGuard;

use super::{
    contract::InheritanceContract, error::Error, state::ContractSnapshot, status_message, Backend,
};

const NO_CODE: &str = "No contract code found at this address on current network";

impl Backend {
    /// Loads all contract fields at once and commits them as a single
    /// snapshot. Nothing is committed unless every read succeeds, so a
    /// failure leaves the previous snapshot in place.
    ///
    /// Loads run one at a time. A load whose chain changed while it was
    /// reading commits nothing, the load triggered by the change does.
    pub(crate) async fn load_contract_state(&self) -> Result<(), Error> {
        let loading = self.loading.lock().await;
        self.load_exclusive(loading).await
    }

    /// Loads the contract state unless a load is already running.
    pub(crate) async fn refresh(&self) -> Result<(), Error> {
        match self.loading.try_lock() {
            Ok(loading) => self.load_exclusive(loading).await,
            Err(_) => {
                tracing::debug!("contract state load already running, skipping refresh");
                Ok(())
            }
        }
    }

    async fn load_exclusive(&self, _loading: MutexGuard<'_, ()>) -> Result<(), Error> {
        let Some(wallet) = &self.wallet else {
            return Ok(());
        };

        let generation = {
            let chain = self.app_state.chain.lock().await;
            chain
                .on_expected_network(&self.network.chain_id)
                .then_some(chain.generation)
        };
        let Some(generation) = generation else {
            self.app_state.distrust_snapshot().await;
            self.app_state
                .set_status(format!(
                    "Switch to {} to load contract state",
                    self.network.name
                ))
                .await;
            return Ok(());
        };

        let contract = InheritanceContract::new(wallet.as_ref(), self.network.contract_address);
        let fetched = fetch_snapshot(&contract).await;

        // Held until the outcome is committed so no chain change slips in
        let chain = self.app_state.chain.lock().await;
        if chain.generation != generation {
            tracing::debug!(
                generation,
                current = chain.generation,
                "chain changed while loading, discarding contract state"
            );
            return Ok(());
        }

        match fetched {
            Ok(Some(snapshot)) => {
                tracing::debug!(?snapshot, "contract state loaded");
                self.app_state.commit_snapshot(snapshot).await;
                Ok(())
            }
            Ok(None) => {
                self.app_state.distrust_snapshot().await;
                self.app_state.set_status(NO_CODE).await;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "unable to load contract state");
                self.app_state
                    .set_status(status_message(&error, "Failed to load state"))
                    .await;
                Err(error)
            }
        }
    }
}

/// `None` if there is no code deployed at the contract address.
async fn fetch_snapshot(
    contract: &InheritanceContract<'_>,
) -> Result<Option<ContractSnapshot>, Error> {
    if !contract.has_code().await? {
        return Ok(None);
    }

    let (owner, is_deceased, heartbeat_interval, last_check_in, beneficiaries) = futures::try_join!(
        contract.owner(),
        contract.is_deceased(),
        contract.heartbeat_interval(),
        contract.last_check_in(),
        contract.beneficiaries(),
    )?;

    Ok(Some(ContractSnapshot {
        owner,
        is_deceased,
        heartbeat_interval,
        last_check_in,
        beneficiaries,
    }))
}
