//! Contract actions dispatching.
//!
//! Every action goes through the same sequence: preflight, input parsing,
//! submission, confirmation, drafts cleanup and state reload. Any failure
//! stops the sequence and becomes the status.

use std::str::FromStr;

use cosmwasm_std::Decimal256;
use dashmap::DashSet;

use super::{
    abi::{Address, U256},
    contract::{ContractCall, InheritanceContract},
    error::Error,
    state::ActionDrafts,
    status_message,
    wallet::{TransactionReceipt, TxHash, WalletProvider, WalletProviderExt},
    Backend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ActionKind {
    #[strum(serialize = "checkIn")]
    CheckIn,
    #[strum(serialize = "declareDeceased")]
    DeclareDeceased,
    #[strum(serialize = "deposit")]
    Deposit,
    #[strum(serialize = "setHeartbeatInterval")]
    SetHeartbeatInterval,
    #[strum(serialize = "addBeneficiary")]
    AddBeneficiary,
    #[strum(serialize = "removeBeneficiary")]
    RemoveBeneficiary,
    #[strum(serialize = "updateBeneficiaryShare")]
    UpdateBeneficiaryShare,
    #[strum(serialize = "distributeERC20")]
    DistributeErc20,
}

impl ActionKind {
    /// Guardian and deceased rules of the remaining actions are enforced by
    /// the contract itself.
    pub fn requires_owner(self) -> bool {
        matches!(
            self,
            ActionKind::CheckIn
                | ActionKind::SetHeartbeatInterval
                | ActionKind::AddBeneficiary
                | ActionKind::RemoveBeneficiary
                | ActionKind::UpdateBeneficiaryShare
        )
    }

    fn submitted_status(self) -> String {
        match self {
            ActionKind::Deposit => "Sending deposit...".to_owned(),
            call => format!("{call} submitted..."),
        }
    }

    fn confirmed_status(self) -> &'static str {
        match self {
            ActionKind::CheckIn => "checkIn confirmed",
            ActionKind::DeclareDeceased => "Deceased declared and distribution executed (ETH)",
            ActionKind::Deposit => "Deposit confirmed",
            ActionKind::SetHeartbeatInterval => "Heartbeat interval updated",
            ActionKind::AddBeneficiary => "Beneficiary added",
            ActionKind::RemoveBeneficiary => "Beneficiary removed",
            ActionKind::UpdateBeneficiaryShare => "Beneficiary share updated",
            ActionKind::DistributeErc20 => "ERC20 distribution executed",
        }
    }

    fn failed_status(self) -> String {
        match self {
            ActionKind::Deposit => "Deposit failed".to_owned(),
            call => format!("{call} failed"),
        }
    }

    fn clear_drafts(self, drafts: &mut ActionDrafts) {
        match self {
            ActionKind::CheckIn | ActionKind::DeclareDeceased => {}
            ActionKind::Deposit => drafts.deposit_amount.clear(),
            ActionKind::SetHeartbeatInterval => drafts.heartbeat_interval.clear(),
            ActionKind::AddBeneficiary => drafts.new_beneficiary = Default::default(),
            ActionKind::RemoveBeneficiary => drafts.remove_beneficiary.clear(),
            ActionKind::UpdateBeneficiaryShare => drafts.update_share = Default::default(),
            ActionKind::DistributeErc20 => drafts.erc20_token.clear(),
        }
    }
}

/// Action requested by the user, with inputs as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTask {
    CheckIn,
    DeclareDeceased,
    /// Amount in ETH
    Deposit { amount: String },
    SetHeartbeatInterval { seconds: String },
    AddBeneficiary { wallet: String, share: String },
    RemoveBeneficiary { wallet: String },
    UpdateBeneficiaryShare { wallet: String, share: String },
    DistributeErc20 { token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} is not a valid address: {value}")]
    Address { field: &'static str, value: String },
    #[error("{field} is not a valid unsigned integer: {value}")]
    Integer { field: &'static str, value: String },
    #[error("{0} is not a valid ETH amount")]
    Amount(String),
}

fn required<'s>(field: &'static str, value: &'s str) -> Result<&'s str, InputError> {
    match value.trim() {
        "" => Err(InputError::Missing(field)),
        value => Ok(value),
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, InputError> {
    let value = required(field, value)?;
    value.parse().map_err(|_| InputError::Address {
        field,
        value: value.to_owned(),
    })
}

fn parse_uint(field: &'static str, value: &str) -> Result<U256, InputError> {
    let value = required(field, value)?;
    U256::from_str(value).map_err(|_| InputError::Integer {
        field,
        value: value.to_owned(),
    })
}

/// Parses a decimal ETH amount into wei; at most 18 fractional digits.
pub fn parse_ether(value: &str) -> Result<U256, InputError> {
    let value = required("Amount", value)?;
    Decimal256::from_str(value)
        .map(|amount| U256::from_be_bytes(amount.atomics().to_be_bytes()))
        .map_err(|_| InputError::Amount(value.to_owned()))
}

impl ActionTask {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionTask::CheckIn => ActionKind::CheckIn,
            ActionTask::DeclareDeceased => ActionKind::DeclareDeceased,
            ActionTask::Deposit { .. } => ActionKind::Deposit,
            ActionTask::SetHeartbeatInterval { .. } => ActionKind::SetHeartbeatInterval,
            ActionTask::AddBeneficiary { .. } => ActionKind::AddBeneficiary,
            ActionTask::RemoveBeneficiary { .. } => ActionKind::RemoveBeneficiary,
            ActionTask::UpdateBeneficiaryShare { .. } => ActionKind::UpdateBeneficiaryShare,
            ActionTask::DistributeErc20 { .. } => ActionKind::DistributeErc20,
        }
    }

    fn record_drafts(&self, drafts: &mut ActionDrafts) {
        match self {
            ActionTask::CheckIn | ActionTask::DeclareDeceased => {}
            ActionTask::Deposit { amount } => drafts.deposit_amount = amount.clone(),
            ActionTask::SetHeartbeatInterval { seconds } => {
                drafts.heartbeat_interval = seconds.clone()
            }
            ActionTask::AddBeneficiary { wallet, share } => {
                drafts.new_beneficiary.wallet = wallet.clone();
                drafts.new_beneficiary.share = share.clone();
            }
            ActionTask::RemoveBeneficiary { wallet } => drafts.remove_beneficiary = wallet.clone(),
            ActionTask::UpdateBeneficiaryShare { wallet, share } => {
                drafts.update_share.wallet = wallet.clone();
                drafts.update_share.share = share.clone();
            }
            ActionTask::DistributeErc20 { token } => drafts.erc20_token = token.clone(),
        }
    }

    pub fn parse(&self) -> Result<ContractCall, InputError> {
        Ok(match self {
            ActionTask::CheckIn => ContractCall::CheckIn,
            ActionTask::DeclareDeceased => ContractCall::DeclareDeceased,
            ActionTask::Deposit { amount } => ContractCall::Deposit {
                amount: parse_ether(amount)?,
            },
            ActionTask::SetHeartbeatInterval { seconds } => ContractCall::SetHeartbeatInterval {
                seconds: parse_uint("Heartbeat interval", seconds)?,
            },
            ActionTask::AddBeneficiary { wallet, share } => ContractCall::AddBeneficiary {
                wallet: parse_address("Beneficiary wallet", wallet)?,
                share: parse_uint("Share", share)?,
            },
            ActionTask::RemoveBeneficiary { wallet } => ContractCall::RemoveBeneficiary {
                wallet: parse_address("Beneficiary wallet", wallet)?,
            },
            ActionTask::UpdateBeneficiaryShare { wallet, share } => {
                ContractCall::UpdateBeneficiaryShare {
                    wallet: parse_address("Beneficiary wallet", wallet)?,
                    share: parse_uint("Share", share)?,
                }
            }
            ActionTask::DistributeErc20 { token } => ContractCall::DistributeErc20 {
                token: parse_address("Token address", token)?,
            },
        })
    }
}

/// Marks an action as dispatching until dropped.
struct InFlightGuard<'s> {
    in_flight: &'s DashSet<ActionKind>,
    kind: ActionKind,
}

impl<'s> InFlightGuard<'s> {
    fn acquire(in_flight: &'s DashSet<ActionKind>, kind: ActionKind) -> Option<Self> {
        in_flight
            .insert(kind)
            .then(|| InFlightGuard { in_flight, kind })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.kind);
    }
}

impl Backend {
    pub(crate) async fn dispatch(&self, action: ActionTask) -> Result<(), Error> {
        let kind = action.kind();
        let Some(_guard) = InFlightGuard::acquire(&self.app_state.in_flight, kind) else {
            let error = Error::InFlight(kind);
            self.app_state.set_status(error.to_string()).await;
            return Err(error);
        };

        let result = self.dispatch_exclusive(&action).await;
        if let Err(error) = &result {
            tracing::warn!(action = %kind, %error, "action failed");
            self.app_state
                .set_status(status_message(error, &kind.failed_status()))
                .await;
        }
        result
    }

    async fn dispatch_exclusive(&self, action: &ActionTask) -> Result<(), Error> {
        let kind = action.kind();
        self.app_state
            .update_drafts(|drafts| action.record_drafts(drafts))
            .await;

        let signer = self.preflight(kind.requires_owner()).await?;
        let call = action.parse()?;

        let Some(wallet) = &self.wallet else {
            return Err(Error::NoWallet);
        };
        let contract = InheritanceContract::new(wallet.as_ref(), self.network.contract_address);

        let hash = wallet
            .send_transaction(contract.transaction(&call, signer))
            .await?;
        tracing::info!(action = %kind, %hash, %signer, "transaction submitted");
        self.app_state.set_status(kind.submitted_status()).await;

        let receipt = self.wait_for_receipt(wallet.as_ref(), hash).await?;
        tracing::info!(action = %kind, %hash, block = ?receipt.block_number, "transaction confirmed");
        self.app_state.set_status(kind.confirmed_status()).await;

        self.app_state
            .update_drafts(|drafts| kind.clear_drafts(drafts))
            .await;

        // The loader reports its own failures as status
        if let Err(error) = self.load_contract_state().await {
            tracing::warn!(%error, "reload after confirmation failed");
        }
        Ok(())
    }

    /// Polls for the receipt of a transaction until it is mined or the
    /// configured timeout elapses.
    async fn wait_for_receipt(
        &self,
        wallet: &dyn WalletProvider,
        hash: TxHash,
    ) -> Result<TransactionReceipt, Error> {
        let poll = async {
            loop {
                if let Some(receipt) = wallet.transaction_receipt(hash).await? {
                    return Ok::<_, Error>(receipt);
                }
                tokio::time::sleep(self.settings.receipt_poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.settings.confirmation_timeout, poll)
            .await
            .map_err(|_| Error::ConfirmationTimeout(hash))??;

        if receipt.succeeded() {
            Ok(receipt)
        } else {
            Err(Error::Reverted(hash))
        }
    }
}
