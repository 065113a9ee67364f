//! Forms collecting the inputs of contract actions.
//!
//! Inputs start from the drafts kept by the backend, so an action that failed
//! can be retried without typing everything again.

use crate::{
    backend::{
        actions::{ActionKind, ActionTask},
        state::ActionDrafts,
    },
    ui::form::{ActionForm, FormField},
};

/// What a key bound to an action opens.
pub(crate) enum ActionEntry {
    Form(ActionForm),
    /// Actions without inputs go straight to the backend
    Ready(ActionTask),
}

fn single(values: Vec<String>) -> String {
    values.into_iter().next().unwrap_or_default()
}

fn pair(values: Vec<String>) -> (String, String) {
    let mut values = values.into_iter();
    (
        values.next().unwrap_or_default(),
        values.next().unwrap_or_default(),
    )
}

pub(crate) fn action_entry(kind: ActionKind, drafts: &ActionDrafts) -> ActionEntry {
    let form = match kind {
        ActionKind::CheckIn => return ActionEntry::Ready(ActionTask::CheckIn),
        ActionKind::DeclareDeceased => return ActionEntry::Ready(ActionTask::DeclareDeceased),
        ActionKind::Deposit => ActionForm::new(
            "Deposit",
            vec![FormField::new("Amount", "ETH, e.g. 0.05", &drafts.deposit_amount)],
            |values| ActionTask::Deposit {
                amount: single(values),
            },
        ),
        ActionKind::SetHeartbeatInterval => ActionForm::new(
            "Set heartbeat interval",
            vec![FormField::new("Interval", "Seconds", &drafts.heartbeat_interval)],
            |values| ActionTask::SetHeartbeatInterval {
                seconds: single(values),
            },
        ),
        ActionKind::AddBeneficiary => ActionForm::new(
            "Add beneficiary",
            vec![
                FormField::new("Wallet", "0x...", &drafts.new_beneficiary.wallet),
                FormField::new("Share", "Percent", &drafts.new_beneficiary.share),
            ],
            |values| {
                let (wallet, share) = pair(values);
                ActionTask::AddBeneficiary { wallet, share }
            },
        ),
        ActionKind::RemoveBeneficiary => ActionForm::new(
            "Remove beneficiary",
            vec![FormField::new("Wallet", "0x...", &drafts.remove_beneficiary)],
            |values| ActionTask::RemoveBeneficiary {
                wallet: single(values),
            },
        ),
        ActionKind::UpdateBeneficiaryShare => ActionForm::new(
            "Update beneficiary share",
            vec![
                FormField::new("Wallet", "0x...", &drafts.update_share.wallet),
                FormField::new("New share", "Percent", &drafts.update_share.share),
            ],
            |values| {
                let (wallet, share) = pair(values);
                ActionTask::UpdateBeneficiaryShare { wallet, share }
            },
        ),
        ActionKind::DistributeErc20 => ActionForm::new(
            "Distribute ERC-20",
            vec![FormField::new("Token", "Token contract 0x...", &drafts.erc20_token)],
            |values| ActionTask::DistributeErc20 {
                token: single(values),
            },
        ),
    };
    ActionEntry::Form(form)
}
