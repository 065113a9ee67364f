//! Wallet provider capability.
//!
//! The application never talks to a wallet directly: every account, network
//! and chain interaction goes through [WalletProvider], an EIP-1193 shaped
//! interface injected into the backend at construction.

pub mod key_wallet;
pub mod rpc;

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    sync::Mutex,
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub use super::abi::TxHash;
use super::abi::{parse_u64, AbiError, Address, Bytes, U256};

/// The user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// The requested account or method is not authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// The provider is disconnected from the requested chain.
pub const DISCONNECTED: i64 = 4900;
/// The requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Error reported by a provider, JSON-RPC shaped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        ProviderError {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn unrecognized_chain(chain_id: &ChainId) -> Self {
        Self::new(
            UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{chain_id}\". Try adding the chain using wallet_addEthereumChain first."),
        )
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN
    }
}

impl From<AbiError> for ProviderError {
    fn from(value: AbiError) -> Self {
        ProviderError::internal(value.to_string())
    }
}

/// Chain identifier as reported by a wallet: a `0x` prefixed hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        ChainId(id.into())
    }

    pub fn from_u64(id: u64) -> Self {
        ChainId(format!("0x{id:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison with another textual chain id.
    pub fn matches(&self, other: &ChainId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    pub fn to_u64(&self) -> Result<u64, AbiError> {
        parse_u64(&self.0)
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Parameters of `wallet_addEthereumChain` (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDefinition {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

/// Transaction to be signed and sent by the wallet; nonce, gas and gas price
/// are filled in by the wallet itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

impl TransactionRequest {
    pub(crate) fn to_json(&self) -> Value {
        let mut object = json!({
            "to": self.to,
            "value": self.value,
            "data": Bytes::copy_from_slice(&self.data),
        });
        if let (Some(from), Some(map)) = (self.from, object.as_object_mut()) {
            map.insert("from".to_owned(), json!(from));
        }
        object
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` when reverted
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() != Some("0x0")
    }
}

/// Requests of the provider surface used by the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRequest {
    RequestAccounts,
    Accounts,
    ChainId,
    SwitchChain { chain_id: ChainId },
    AddChain(ChainDefinition),
    GetCode { address: Address },
    Call { to: Address, data: Vec<u8> },
    SendTransaction(TransactionRequest),
    TransactionReceipt { hash: TxHash },
}

impl ProviderRequest {
    pub fn method(&self) -> &'static str {
        match self {
            ProviderRequest::RequestAccounts => "eth_requestAccounts",
            ProviderRequest::Accounts => "eth_accounts",
            ProviderRequest::ChainId => "eth_chainId",
            ProviderRequest::SwitchChain { .. } => "wallet_switchEthereumChain",
            ProviderRequest::AddChain(_) => "wallet_addEthereumChain",
            ProviderRequest::GetCode { .. } => "eth_getCode",
            ProviderRequest::Call { .. } => "eth_call",
            ProviderRequest::SendTransaction(_) => "eth_sendTransaction",
            ProviderRequest::TransactionReceipt { .. } => "eth_getTransactionReceipt",
        }
    }

    pub fn params(&self) -> Value {
        match self {
            ProviderRequest::RequestAccounts
            | ProviderRequest::Accounts
            | ProviderRequest::ChainId => json!([]),
            ProviderRequest::SwitchChain { chain_id } => json!([{ "chainId": chain_id }]),
            ProviderRequest::AddChain(definition) => json!([definition]),
            ProviderRequest::GetCode { address } => json!([address, "latest"]),
            ProviderRequest::Call { to, data } => {
                json!([{ "to": to, "data": Bytes::copy_from_slice(data) }, "latest"])
            }
            ProviderRequest::SendTransaction(tx) => json!([tx.to_json()]),
            ProviderRequest::TransactionReceipt { hash } => json!([hash.to_string()]),
        }
    }
}

/// Events emitted by a provider at arbitrary times.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

pub type ListenerId = u64;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Executes a request, returning the raw JSON result.
    async fn request(&self, request: ProviderRequest) -> Result<Value, ProviderError>;

    /// Registers a listener of [ProviderEvent]s.
    fn subscribe(&self) -> (ListenerId, mpsc::UnboundedReceiver<ProviderEvent>);

    fn remove_listener(&self, id: ListenerId) -> Result<(), ProviderError>;
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, ProviderError> {
    serde_json::from_value(value)
        .map_err(|e| ProviderError::internal(format!("invalid {method} response: {e}")))
}

/// Typed helpers over [WalletProvider::request].
#[async_trait]
pub trait WalletProviderExt: WalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.request(ProviderRequest::RequestAccounts).await?;
        decode("eth_requestAccounts", value)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.request(ProviderRequest::Accounts).await?;
        decode("eth_accounts", value)
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let value = self.request(ProviderRequest::ChainId).await?;
        decode("eth_chainId", value)
    }

    async fn switch_chain(&self, chain_id: &ChainId) -> Result<(), ProviderError> {
        self.request(ProviderRequest::SwitchChain {
            chain_id: chain_id.clone(),
        })
        .await
        .map(|_| ())
    }

    async fn add_chain(&self, definition: &ChainDefinition) -> Result<(), ProviderError> {
        self.request(ProviderRequest::AddChain(definition.clone()))
            .await
            .map(|_| ())
    }

    async fn get_code(&self, address: Address) -> Result<Vec<u8>, ProviderError> {
        let value = self.request(ProviderRequest::GetCode { address }).await?;
        let code: Bytes = decode("eth_getCode", value)?;
        Ok(code.to_vec())
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
        let value = self.request(ProviderRequest::Call { to, data }).await?;
        let output: Bytes = decode("eth_call", value)?;
        Ok(output.to_vec())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ProviderError> {
        let value = self.request(ProviderRequest::SendTransaction(tx)).await?;
        decode("eth_sendTransaction", value)
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        let value = self
            .request(ProviderRequest::TransactionReceipt { hash })
            .await?;
        decode("eth_getTransactionReceipt", value)
    }
}

impl<T: WalletProvider + ?Sized> WalletProviderExt for T {}

/// Registry of event listeners shared by provider implementations.
#[derive(Default)]
pub struct EventListeners {
    inner: Mutex<ListenersInner>,
}

#[derive(Default)]
struct ListenersInner {
    next_id: ListenerId,
    senders: BTreeMap<ListenerId, mpsc::UnboundedSender<ProviderEvent>>,
}

impl EventListeners {
    pub fn subscribe(&self) -> (ListenerId, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("lock is poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.senders.insert(id, sender);
        (id, receiver)
    }

    pub fn remove(&self, id: ListenerId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().expect("lock is poisoned");
        inner
            .senders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::internal(format!("no listener with id {id}")))
    }

    /// Delivers an event to every listener, forgetting the ones whose
    /// receivers are gone.
    pub fn emit(&self, event: ProviderEvent) {
        let mut inner = self.inner.lock().expect("lock is poisoned");
        inner
            .senders
            .retain(|_, sender| sender.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_compare_ignoring_case() {
        let expected = ChainId::new("0xaa36a7");
        assert!(ChainId::new("0xAA36A7").matches(&expected));
        assert!(!ChainId::new("0x1").matches(&expected));
        assert_eq!(ChainId::from_u64(11_155_111), expected);
        assert_eq!(ChainId::new("0xAA36A7").to_u64().unwrap(), 11_155_111);
    }

    #[test]
    fn request_wire_shapes() {
        let chain_id = ChainId::new("0xaa36a7");
        let request = ProviderRequest::SwitchChain {
            chain_id: chain_id.clone(),
        };
        assert_eq!(request.method(), "wallet_switchEthereumChain");
        assert_eq!(request.params(), json!([{ "chainId": "0xaa36a7" }]));

        let definition = ChainDefinition {
            chain_id,
            chain_name: "Sepolia Test Network".to_owned(),
            native_currency: NativeCurrency {
                name: "Sepolia ETH".to_owned(),
                symbol: "ETH".to_owned(),
                decimals: 18,
            },
            rpc_urls: vec!["https://rpc.sepolia.org".to_owned()],
            block_explorer_urls: vec!["https://sepolia.etherscan.io".to_owned()],
        };
        assert_eq!(
            ProviderRequest::AddChain(definition).params(),
            json!([{
                "chainId": "0xaa36a7",
                "chainName": "Sepolia Test Network",
                "nativeCurrency": { "name": "Sepolia ETH", "symbol": "ETH", "decimals": 18 },
                "rpcUrls": ["https://rpc.sepolia.org"],
                "blockExplorerUrls": ["https://sepolia.etherscan.io"],
            }])
        );
    }

    #[test]
    fn transaction_wire_shape() {
        let tx = TransactionRequest {
            from: None,
            to: Address::with_last_byte(1),
            value: U256::from(1024),
            data: vec![0xde, 0xad],
        };
        assert_eq!(
            tx.to_json(),
            json!({
                "to": "0x0000000000000000000000000000000000000001",
                "value": "0x400",
                "data": "0xdead",
            })
        );
    }

    #[test]
    fn receipt_status() {
        let reverted: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x01",
            "status": "0x0",
        }))
        .unwrap();
        assert!(!reverted.succeeded());

        let mined: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x01",
            "blockNumber": "0x10",
            "status": "0x1",
        }))
        .unwrap();
        assert!(mined.succeeded());
    }

    #[test]
    fn listeners_receive_until_removed() {
        let listeners = EventListeners::default();
        let (first, mut first_rx) = listeners.subscribe();
        let (_second, mut second_rx) = listeners.subscribe();

        listeners.emit(ProviderEvent::ChainChanged(ChainId::new("0x1")));
        assert_eq!(
            first_rx.try_recv().unwrap(),
            ProviderEvent::ChainChanged(ChainId::new("0x1"))
        );
        assert!(second_rx.try_recv().is_ok());

        listeners.remove(first).unwrap();
        assert!(listeners.remove(first).is_err());

        listeners.emit(ProviderEvent::AccountsChanged(vec![]));
        assert!(first_rx.try_recv().is_err());
        assert_eq!(
            second_rx.try_recv().unwrap(),
            ProviderEvent::AccountsChanged(vec![])
        );
    }
}
