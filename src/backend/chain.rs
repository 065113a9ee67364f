//! Chain context tracking: which account and which chain the wallet is on.

use super::{
    abi::Address,
    error::Error,
    status_message,
    wallet::{ChainId, ProviderEvent, WalletProviderExt},
    Backend,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainContext {
    pub active_account: Option<Address>,
    pub active_chain_id: Option<ChainId>,
    /// Set once the provider was queried on startup
    pub initialized: bool,
    /// Bumped on every chain change, tells apart loads started on a
    /// previous chain
    pub generation: u64,
}

impl ChainContext {
    pub fn on_expected_network(&self, expected: &ChainId) -> bool {
        self.active_chain_id
            .as_ref()
            .is_some_and(|chain_id| chain_id.matches(expected))
    }

    /// Returns `true` if the chain has changed.
    pub fn set_chain_id(&mut self, chain_id: ChainId) -> bool {
        let changed = !self
            .active_chain_id
            .as_ref()
            .is_some_and(|current| current.matches(&chain_id));
        self.active_chain_id = Some(chain_id);
        if changed {
            self.generation += 1;
        }
        changed
    }

    /// Applies a provider event, returning `true` if the chain has changed.
    /// An empty account list means the wallet got disconnected.
    pub fn apply(&mut self, event: &ProviderEvent) -> bool {
        match event {
            ProviderEvent::AccountsChanged(accounts) => {
                self.active_account = accounts.first().copied();
                false
            }
            ProviderEvent::ChainChanged(chain_id) => self.set_chain_id(chain_id.clone()),
        }
    }
}

impl Backend {
    /// Picks up whatever the wallet already exposes without prompting, then
    /// loads the contract state.
    pub(crate) async fn initialize(&self) -> Result<(), Error> {
        let (account, chain_id) = match &self.wallet {
            Some(wallet) => {
                let (accounts, chain_id) = futures::join!(wallet.accounts(), wallet.chain_id());
                let account = accounts
                    .map_err(|e| tracing::warn!(error = %e, "unable to query accounts"))
                    .ok()
                    .and_then(|accounts| accounts.first().copied());
                let chain_id = chain_id
                    .map_err(|e| tracing::warn!(error = %e, "unable to query chain id"))
                    .ok();
                (account, chain_id)
            }
            None => (None, None),
        };

        self.app_state
            .update_chain(|chain| {
                chain.active_account = account;
                if let Some(chain_id) = chain_id {
                    chain.set_chain_id(chain_id);
                }
                chain.initialized = true;
            })
            .await;

        self.load_contract_state().await
    }

    pub(crate) async fn connect(&self) -> Result<(), Error> {
        let Some(wallet) = &self.wallet else {
            let error = Error::NoWallet;
            self.app_state.set_status(error.to_string()).await;
            return Err(error);
        };

        let connected = async {
            let accounts = wallet.request_accounts().await?;
            let chain_id = wallet.chain_id().await?;
            Ok::<_, Error>((accounts, chain_id))
        }
        .await;

        match connected {
            Ok((accounts, chain_id)) => {
                tracing::info!(?accounts, %chain_id, "wallet connected");
                let chain_changed = self
                    .app_state
                    .update_chain(|chain| {
                        chain.active_account = accounts.first().copied();
                        chain.set_chain_id(chain_id)
                    })
                    .await;
                if chain_changed {
                    self.app_state.distrust_snapshot().await;
                }
                self.app_state.set_status("").await;

                self.load_contract_state().await
            }
            Err(error) => {
                self.app_state
                    .set_status(status_message(&error, "Failed to connect wallet"))
                    .await;
                Err(error)
            }
        }
    }

    /// Asks the wallet to switch to the expected network, adding it first if
    /// the wallet does not know it. The switch itself is observed through a
    /// `chainChanged` event.
    pub(crate) async fn switch_network(&self) -> Result<(), Error> {
        let Some(wallet) = &self.wallet else {
            return Ok(());
        };

        let switched = wallet.switch_chain(&self.network.chain_id).await;
        let (result, fallback) = match switched {
            Ok(()) => return Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(chain_id = %self.network.chain_id, "chain unknown to the wallet, adding it");
                (
                    wallet.add_chain(&self.network.definition).await,
                    format!("Failed to add {} network", self.network.name),
                )
            }
            Err(e) => (Err(e), "Failed to switch network".to_owned()),
        };

        if let Err(e) = result {
            let error = Error::from(e);
            self.app_state
                .set_status(status_message(&error, &fallback))
                .await;
            return Err(error);
        }
        Ok(())
    }

    /// Applies an account or chain change reported by the wallet and reloads
    /// the contract state for the new context.
    pub(crate) async fn apply_provider_event(&self, event: ProviderEvent) -> Result<(), Error> {
        tracing::info!(?event, "provider event");

        let chain_changed = self
            .app_state
            .update_chain(|chain| chain.apply(&event))
            .await;
        if chain_changed {
            self.app_state.distrust_snapshot().await;
        }

        self.load_contract_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_network_follows_latest_chain_change() {
        let sepolia = ChainId::new("0xaa36a7");
        let mut chain = ChainContext::default();
        assert!(!chain.on_expected_network(&sepolia));

        assert!(chain.apply(&ProviderEvent::ChainChanged(ChainId::new("0xAA36A7"))));
        assert!(chain.on_expected_network(&sepolia));
        assert_eq!(chain.generation, 1);

        // Same chain, different spelling
        assert!(!chain.apply(&ProviderEvent::ChainChanged(ChainId::new("0xaa36a7"))));
        assert_eq!(chain.generation, 1);

        assert!(chain.apply(&ProviderEvent::ChainChanged(ChainId::new("0x1"))));
        assert!(!chain.on_expected_network(&sepolia));
        assert_eq!(chain.generation, 2);
    }

    #[test]
    fn empty_account_list_disconnects() {
        let account = Address::new([9; 20]);
        let mut chain = ChainContext::default();

        chain.apply(&ProviderEvent::AccountsChanged(vec![
            account,
            Address::new([1; 20]),
        ]));
        assert_eq!(chain.active_account, Some(account));

        chain.apply(&ProviderEvent::AccountsChanged(vec![]));
        assert_eq!(chain.active_account, None);
    }
}
