//! Wallet backed by a single secp256k1 private key.
//!
//! Account and network requests are answered locally the way an injected
//! browser wallet answers them; transactions are signed locally (legacy
//! EIP-155 format) and every other request is forwarded to the JSON-RPC
//! endpoint of the active chain.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use rlp::RlpStream;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::{
    rpc::JsonRpcClient, ChainDefinition, ChainId, EventListeners, ListenerId, ProviderError,
    ProviderEvent, ProviderRequest, TransactionRequest, WalletProvider, INVALID_PARAMS,
    UNAUTHORIZED,
};
use crate::backend::abi::{keccak256, Address, Bytes, U256};

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("private key is not valid hex: {0}")]
    KeyEncoding(#[from] hex::FromHexError),
    #[error("invalid private key: {0}")]
    Key(#[from] k256::ecdsa::Error),
}

struct Chains {
    active: ChainId,
    active_endpoint: Arc<JsonRpcClient>,
    /// Known endpoints by lowercase chain id
    endpoints: BTreeMap<String, Arc<JsonRpcClient>>,
}

pub struct KeyWallet {
    signing_key: SigningKey,
    address: Address,
    chains: Mutex<Chains>,
    listeners: EventListeners,
}

impl fmt::Debug for KeyWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain_id = self.active().0;
        f.debug_struct("KeyWallet")
            .field("signing_key", &"<redacted>")
            .field("address", &format_args!("{}", self.address))
            .field("chain_id", &chain_id)
            .finish_non_exhaustive()
    }
}

impl KeyWallet {
    /// Creates a wallet from a hex private key (with or without `0x`) that
    /// starts on `chain_id`, reachable through `rpc_url`.
    pub fn new(private_key: &str, chain_id: ChainId, rpc_url: &str) -> Result<Self, WalletError> {
        let key_bytes = hex::decode(private_key.trim().trim_start_matches("0x"))?;
        let signing_key = SigningKey::from_slice(&key_bytes)?;
        let address = address_of(&signing_key);

        let endpoint = Arc::new(JsonRpcClient::new(rpc_url));
        let mut endpoints = BTreeMap::new();
        endpoints.insert(chain_id.as_str().to_lowercase(), Arc::clone(&endpoint));

        tracing::info!(%address, %chain_id, rpc_url, "key wallet loaded");

        Ok(KeyWallet {
            signing_key,
            address,
            chains: Mutex::new(Chains {
                active: chain_id,
                active_endpoint: endpoint,
                endpoints,
            }),
            listeners: EventListeners::default(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn active(&self) -> (ChainId, Arc<JsonRpcClient>) {
        let chains = self.chains.lock().expect("lock is poisoned");
        (chains.active.clone(), Arc::clone(&chains.active_endpoint))
    }

    fn switch_chain(&self, chain_id: &ChainId) -> Result<(), ProviderError> {
        let changed = {
            let mut chains = self.chains.lock().expect("lock is poisoned");
            let endpoint = chains
                .endpoints
                .get(&chain_id.as_str().to_lowercase())
                .cloned()
                .ok_or_else(|| ProviderError::unrecognized_chain(chain_id))?;
            let changed = !chains.active.matches(chain_id);
            chains.active = chain_id.clone();
            chains.active_endpoint = endpoint;
            changed
        };

        if changed {
            tracing::info!(%chain_id, "switched chain");
            self.listeners
                .emit(ProviderEvent::ChainChanged(chain_id.clone()));
        }
        Ok(())
    }

    fn add_chain(&self, definition: &ChainDefinition) -> Result<(), ProviderError> {
        let rpc_url = definition
            .rpc_urls
            .first()
            .ok_or_else(|| ProviderError::new(INVALID_PARAMS, "rpcUrls must not be empty"))?;
        self.chains
            .lock()
            .expect("lock is poisoned")
            .endpoints
            .entry(definition.chain_id.as_str().to_lowercase())
            .or_insert_with(|| Arc::new(JsonRpcClient::new(rpc_url.as_str())));

        tracing::info!(chain_id = %definition.chain_id, name = definition.chain_name, "added chain");

        // Adding a chain is followed by switching to it, as browser wallets do
        self.switch_chain(&definition.chain_id)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<Value, ProviderError> {
        if tx.from.is_some_and(|from| from != self.address) {
            return Err(ProviderError::new(
                UNAUTHORIZED,
                format!("account {} is not managed by this wallet", tx.from.unwrap_or_default()),
            ));
        }

        let (chain_id, rpc) = self.active();
        let chain_id = chain_id.to_u64()?;
        let from = self.address;
        let estimate = json!({
            "from": from,
            "to": tx.to,
            "value": tx.value,
            "data": Bytes::copy_from_slice(&tx.data),
        });

        let (nonce, gas_price, gas) = futures::try_join!(
            rpc.request("eth_getTransactionCount", json!([from, "pending"])),
            rpc.request("eth_gasPrice", json!([])),
            rpc.request("eth_estimateGas", json!([estimate])),
        )?;

        let transaction = LegacyTransaction {
            nonce: u64::try_from(quantity("eth_getTransactionCount", nonce)?)
                .map_err(|_| ProviderError::internal("nonce out of range"))?,
            gas_price: quantity("eth_gasPrice", gas_price)?,
            gas: quantity("eth_estimateGas", gas)?,
            to: tx.to,
            value: tx.value,
            data: tx.data,
        };
        let raw = transaction.sign(&self.signing_key, chain_id)?;

        tracing::info!(to = %transaction.to, nonce = transaction.nonce, chain_id, "sending signed transaction");

        rpc.request("eth_sendRawTransaction", json!([Bytes::from(raw)]))
            .await
    }
}

#[async_trait]
impl WalletProvider for KeyWallet {
    async fn request(&self, request: ProviderRequest) -> Result<Value, ProviderError> {
        match request {
            ProviderRequest::RequestAccounts | ProviderRequest::Accounts => {
                Ok(json!([self.address]))
            }
            ProviderRequest::ChainId => Ok(json!(self.active().0)),
            ProviderRequest::SwitchChain { chain_id } => {
                self.switch_chain(&chain_id).map(|_| Value::Null)
            }
            ProviderRequest::AddChain(definition) => {
                self.add_chain(&definition).map(|_| Value::Null)
            }
            ProviderRequest::SendTransaction(tx) => self.send_transaction(tx).await,
            other => {
                let (_, rpc) = self.active();
                rpc.request(other.method(), other.params()).await
            }
        }
    }

    fn subscribe(&self) -> (ListenerId, mpsc::UnboundedReceiver<ProviderEvent>) {
        self.listeners.subscribe()
    }

    fn remove_listener(&self, id: ListenerId) -> Result<(), ProviderError> {
        self.listeners.remove(id)
    }
}

fn quantity(method: &str, value: Value) -> Result<U256, ProviderError> {
    serde_json::from_value(value)
        .map_err(|e| ProviderError::internal(format!("invalid {method} response: {e}")))
}

fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    Address::from_raw_public_key(&point.as_bytes()[1..])
}

/// Big-endian bytes without leading zeros, the integer form RLP expects.
fn uint_bytes(value: U256) -> Vec<u8> {
    value.to_be_bytes_trimmed_vec()
}

/// Pre-EIP-2718 transaction, replay protected with EIP-155.
#[derive(Debug, Clone, PartialEq)]
struct LegacyTransaction {
    nonce: u64,
    gas_price: U256,
    gas: U256,
    to: Address,
    value: U256,
    data: Vec<u8>,
}

impl LegacyTransaction {
    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&uint_bytes(self.gas_price));
        stream.append(&uint_bytes(self.gas));
        stream.append(&self.to.to_vec());
        stream.append(&uint_bytes(self.value));
        stream.append(&self.data);
    }

    fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(stream.out()).0
    }

    fn sign(&self, key: &SigningKey, chain_id: u64) -> Result<Vec<u8>, ProviderError> {
        let hash = self.signing_hash(chain_id);
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| ProviderError::internal(format!("signing failed: {e}")))?;
        let rs = signature.to_bytes();

        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&(u64::from(recovery_id.to_byte()) + chain_id * 2 + 35));
        stream.append(&uint_bytes(U256::from_be_slice(&rs[..32])));
        stream.append(&uint_bytes(U256::from_be_slice(&rs[32..])));
        Ok(stream.out().to_vec())
    }
}
