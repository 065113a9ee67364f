//! Application state module.
//! This kind of state does not include UI details: it is what the backend
//! knows about the wallet, the chain and the contract.

use dashmap::DashSet;
use tokio::sync::{broadcast, Mutex};

use super::{
    abi::{Address, U256},
    actions::ActionKind,
    chain::ChainContext,
    contract::Beneficiary,
};

const UPDATES_CAPACITY: usize = 64;

/// Contract fields as loaded together by the state loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub owner: Address,
    pub is_deceased: bool,
    /// Seconds
    pub heartbeat_interval: U256,
    /// Epoch seconds, zero if the owner never checked in
    pub last_check_in: U256,
    pub beneficiaries: Vec<Beneficiary>,
}

/// Last loaded snapshot and whether it still describes the current chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotCache {
    pub snapshot: Option<ContractSnapshot>,
    /// Set on a successful load, cleared when the chain changes or the
    /// contract code disappears
    pub trusted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeneficiaryDraft {
    pub wallet: String,
    pub share: String,
}

/// Text typed into action inputs, kept until the action is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionDrafts {
    pub deposit_amount: String,
    pub heartbeat_interval: String,
    pub new_beneficiary: BeneficiaryDraft,
    pub remove_beneficiary: String,
    pub update_share: BeneficiaryDraft,
    pub erc20_token: String,
}

/// Notification of which part of [AppState] has changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStateUpdate {
    ChainContext,
    Snapshot,
    /// Carries the new status text
    Status(String),
    Drafts,
}

/// Owned copy of the state for rendering.
#[derive(Debug, Clone, Default)]
pub struct StateView {
    pub chain: ChainContext,
    pub snapshot: SnapshotCache,
    pub status: String,
    pub drafts: ActionDrafts,
    pub in_flight: Vec<ActionKind>,
}

pub struct AppState {
    pub chain: Mutex<ChainContext>,
    pub snapshot: Mutex<SnapshotCache>,
    pub status: Mutex<String>,
    pub drafts: Mutex<ActionDrafts>,
    pub(crate) in_flight: DashSet<ActionKind>,
    updates: broadcast::Sender<AppStateUpdate>,
}

impl Default for AppState {
    fn default() -> Self {
        let (updates, _) = broadcast::channel(UPDATES_CAPACITY);
        AppState {
            chain: Default::default(),
            snapshot: Default::default(),
            status: Default::default(),
            drafts: Default::default(),
            in_flight: DashSet::new(),
            updates,
        }
    }
}

impl AppState {
    pub fn subscribe(&self) -> broadcast::Receiver<AppStateUpdate> {
        self.updates.subscribe()
    }

    pub(crate) fn notify(&self, update: AppStateUpdate) {
        // No receivers is fine, nobody is rendering
        let _ = self.updates.send(update);
    }

    pub(crate) async fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        tracing::info!(status, "status changed");
        *self.status.lock().await = status.clone();
        self.notify(AppStateUpdate::Status(status));
    }

    pub(crate) async fn update_chain<R>(&self, update: impl FnOnce(&mut ChainContext) -> R) -> R {
        let result = update(&mut *self.chain.lock().await);
        self.notify(AppStateUpdate::ChainContext);
        result
    }

    pub(crate) async fn commit_snapshot(&self, snapshot: ContractSnapshot) {
        *self.snapshot.lock().await = SnapshotCache {
            snapshot: Some(snapshot),
            trusted: true,
        };
        self.notify(AppStateUpdate::Snapshot);
    }

    pub(crate) async fn distrust_snapshot(&self) {
        let mut cache = self.snapshot.lock().await;
        if cache.trusted {
            cache.trusted = false;
            drop(cache);
            self.notify(AppStateUpdate::Snapshot);
        }
    }

    pub(crate) async fn update_drafts(&self, update: impl FnOnce(&mut ActionDrafts)) {
        update(&mut *self.drafts.lock().await);
        self.notify(AppStateUpdate::Drafts);
    }

    pub async fn view(&self) -> StateView {
        StateView {
            chain: self.chain.lock().await.clone(),
            snapshot: self.snapshot.lock().await.clone(),
            status: self.status.lock().await.clone(),
            drafts: self.drafts.lock().await.clone(),
            in_flight: self.in_flight.iter().map(|kind| *kind).collect(),
        }
    }
}
