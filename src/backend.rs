//! Application backend.
//! This includes all logic unrelated to UI.

pub mod abi;
pub mod actions;
pub mod chain;
pub mod contract;
mod error;
mod loader;
pub mod preflight;
pub mod state;
pub mod wallet;

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

pub use self::error::Error;
use self::{
    actions::ActionTask,
    state::{AppState, AppStateUpdate, StateView},
    wallet::{ListenerId, ProviderEvent, WalletProvider},
};
use crate::config::{DispatchSettings, Network};

/// Unit of work the UI asks the backend to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Query the wallet without prompting and load the contract state
    Initialize,
    Connect,
    SwitchNetwork,
    Refresh,
    ProviderEvent(ProviderEvent),
    Action(ActionTask),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Result of a [Task]: the resulting status on success or the error
    /// message otherwise
    TaskCompleted {
        task: Task,
        execution_result: Result<String, String>,
    },
    AppStateUpdated(AppStateUpdate),
}

pub struct Backend {
    wallet: Option<Arc<dyn WalletProvider>>,
    network: Network,
    settings: DispatchSettings,
    app_state: AppState,
    listener: Mutex<Option<ListenerId>>,
    /// Held by the running contract state load
    loading: tokio::sync::Mutex<()>,
}

impl Backend {
    /// Creates a backend over an optional wallet; without one every wallet
    /// interaction fails the way a missing browser extension would.
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        network: Network,
        settings: DispatchSettings,
    ) -> Self {
        Backend {
            wallet,
            network,
            settings,
            app_state: AppState::default(),
            listener: Mutex::new(None),
            loading: tokio::sync::Mutex::new(()),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    pub async fn view(&self) -> StateView {
        self.app_state.view().await
    }

    /// Subscribes to state change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<AppStateUpdate> {
        self.app_state.subscribe()
    }

    /// Registers the backend as a listener of wallet events. Received events
    /// are expected to be fed back as [Task::ProviderEvent].
    pub fn subscribe_provider_events(&self) -> Option<mpsc::UnboundedReceiver<ProviderEvent>> {
        let wallet = self.wallet.as_ref()?;
        let (id, events) = wallet.subscribe();
        if let Some(previous) = self.listener.lock().expect("lock is poisoned").replace(id) {
            if let Err(error) = wallet.remove_listener(previous) {
                tracing::debug!(%error, previous, "unable to remove replaced wallet listener");
            }
        }
        Some(events)
    }

    /// Removes the wallet event listener, ignoring failures.
    pub fn teardown(&self) {
        let listener = self.listener.lock().expect("lock is poisoned").take();
        if let (Some(wallet), Some(id)) = (&self.wallet, listener) {
            if let Err(error) = wallet.remove_listener(id) {
                tracing::debug!(%error, "unable to remove wallet listener");
            }
        }
    }

    pub async fn run_task(&self, task: Task) -> BackendEvent {
        tracing::debug!(?task, "running task");

        let result = match &task {
            Task::Initialize => self.initialize().await,
            Task::Connect => self.connect().await,
            Task::SwitchNetwork => self.switch_network().await,
            Task::Refresh => self.refresh().await,
            Task::ProviderEvent(event) => self.apply_provider_event(event.clone()).await,
            Task::Action(action) => self.dispatch(action.clone()).await,
        };

        let execution_result = match result {
            Ok(()) => Ok(self.app_state.status.lock().await.clone()),
            Err(error) => Err(error.to_string()),
        };
        BackendEvent::TaskCompleted {
            task,
            execution_result,
        }
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Status text for an error, the fallback if the error carries no message.
fn status_message(error: &Error, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::wallet::ProviderError;

    #[test]
    fn empty_messages_fall_back() {
        let silent = Error::Provider(ProviderError::new(4001, ""));
        assert_eq!(status_message(&silent, "checkIn failed"), "checkIn failed");

        let rejected = Error::Provider(ProviderError::new(4001, "User rejected the request."));
        assert_eq!(
            status_message(&rejected, "checkIn failed"),
            "User rejected the request."
        );
    }
}
