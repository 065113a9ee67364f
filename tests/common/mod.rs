#![allow(dead_code)]

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use inheritance_console::{
    backend::{
        abi::{
            as_address, as_uint, decode_params, selector, Address, Bytes, DynSolType, DynSolValue,
            U256,
        },
        contract::{signatures, Beneficiary},
        wallet::{
            ChainId, EventListeners, ListenerId, ProviderError, ProviderEvent, ProviderRequest,
            TransactionRequest, TxHash, WalletProvider, USER_REJECTED,
        },
        Backend,
    },
    config::{DispatchSettings, Network},
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub const SEPOLIA: &str = "0xaa36a7";
pub const CHECK_IN_TIME: u128 = 1_700_000_000;

pub fn address(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

pub fn owner() -> Address {
    address("0x1111111111111111111111111111111111111111")
}

pub fn stranger() -> Address {
    address("0x2222222222222222222222222222222222222222")
}

pub fn uint(value: u128) -> U256 {
    U256::from(value)
}

/// Contract storage as seen through `eth_call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractStorage {
    pub owner: Address,
    pub is_deceased: bool,
    pub heartbeat_interval: U256,
    pub last_check_in: U256,
    pub beneficiaries: Vec<(Address, U256)>,
    pub balance: U256,
}

impl ContractStorage {
    fn read(&self, data: &[u8]) -> Option<Vec<u8>> {
        let function: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let output = if function == selector(signatures::OWNER) {
            DynSolValue::Address(self.owner)
        } else if function == selector(signatures::IS_DECEASED) {
            DynSolValue::Bool(self.is_deceased)
        } else if function == selector(signatures::HEARTBEAT_INTERVAL) {
            DynSolValue::Uint(self.heartbeat_interval, 256)
        } else if function == selector(signatures::LAST_CHECK_IN) {
            DynSolValue::Uint(self.last_check_in, 256)
        } else if function == selector(signatures::GET_BENEFICIARIES) {
            DynSolValue::Array(
                self.beneficiaries
                    .iter()
                    .map(|(wallet, share)| {
                        Beneficiary {
                            wallet: *wallet,
                            share: *share,
                        }
                        .to_sol_value()
                    })
                    .collect(),
            )
        } else {
            return None;
        };
        Some(DynSolValue::Tuple(vec![output]).abi_encode_params())
    }

    fn apply(&mut self, tx: &TransactionRequest) {
        if tx.data.is_empty() {
            self.balance += tx.value;
            return;
        }
        let function: [u8; 4] = tx.data[..4].try_into().unwrap();
        let args = &tx.data[4..];
        let wallet_and_share = || {
            let values =
                decode_params(vec![DynSolType::Address, DynSolType::Uint(256)], args).unwrap();
            (as_address(&values[0]).unwrap(), as_uint(&values[1]).unwrap())
        };
        let wallet_arg = || {
            let values = decode_params(vec![DynSolType::Address], args).unwrap();
            as_address(&values[0]).unwrap()
        };

        if function == selector(signatures::CHECK_IN) {
            self.last_check_in = uint(CHECK_IN_TIME);
        } else if function == selector(signatures::DECLARE_DECEASED) {
            self.is_deceased = true;
        } else if function == selector(signatures::ADD_BENEFICIARY) {
            self.beneficiaries.push(wallet_and_share());
        } else if function == selector(signatures::REMOVE_BENEFICIARY) {
            let wallet = wallet_arg();
            self.beneficiaries.retain(|(w, _)| *w != wallet);
        } else if function == selector(signatures::UPDATE_BENEFICIARY_SHARE) {
            let (wallet, share) = wallet_and_share();
            for entry in self.beneficiaries.iter_mut().filter(|(w, _)| *w == wallet) {
                entry.1 = share;
            }
        } else if function == selector(signatures::SET_HEARTBEAT_INTERVAL) {
            let values = decode_params(vec![DynSolType::Uint(256)], args).unwrap();
            self.heartbeat_interval = as_uint(&values[0]).unwrap();
        }
    }
}

/// Knobs and records of [FakeWallet].
#[derive(Debug)]
pub struct WalletScript {
    pub accounts: Vec<Address>,
    /// Accounts are exposed without prompting only once connected
    pub connected: bool,
    pub chain_id: ChainId,
    pub known_chains: Vec<ChainId>,
    pub has_code: bool,
    pub contract: ContractStorage,
    /// Reads answered with an execution error
    pub failing_reads: Vec<&'static str>,
    /// Latency of every `eth_call`
    pub read_delay: Option<Duration>,
    /// Answer to `wallet_switchEthereumChain` instead of switching
    pub switch_error: Option<ProviderError>,
    /// Answer to `wallet_addEthereumChain` instead of adding the chain
    pub add_chain_error: Option<ProviderError>,
    pub reject_connection: bool,
    pub reject_transactions: bool,
    pub revert_transactions: bool,
    pub withhold_receipts: bool,
    /// Methods in the order they were requested
    pub requests: Vec<&'static str>,
    pub sent: Vec<TransactionRequest>,
}

/// In-memory wallet in front of a scripted inheritance contract.
pub struct FakeWallet {
    script: Mutex<WalletScript>,
    listeners: EventListeners,
}

impl FakeWallet {
    /// Connected wallet of the contract owner on Sepolia, the contract
    /// deployed with a one day heartbeat and no beneficiaries.
    pub fn new() -> Arc<Self> {
        Arc::new(FakeWallet {
            script: Mutex::new(WalletScript {
                accounts: vec![owner()],
                connected: true,
                chain_id: ChainId::new(SEPOLIA),
                known_chains: vec![ChainId::new(SEPOLIA), ChainId::new("0x1")],
                has_code: true,
                contract: ContractStorage {
                    owner: owner(),
                    is_deceased: false,
                    heartbeat_interval: uint(86_400),
                    last_check_in: U256::ZERO,
                    beneficiaries: vec![],
                    balance: U256::ZERO,
                },
                failing_reads: vec![],
                read_delay: None,
                switch_error: None,
                add_chain_error: None,
                reject_connection: false,
                reject_transactions: false,
                revert_transactions: false,
                withhold_receipts: false,
                requests: vec![],
                sent: vec![],
            }),
            listeners: EventListeners::default(),
        })
    }

    pub fn script<R>(&self, update: impl FnOnce(&mut WalletScript) -> R) -> R {
        update(&mut self.script.lock().unwrap())
    }

    pub fn requests(&self) -> Vec<&'static str> {
        self.script(|script| script.requests.clone())
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.script(|script| script.sent.clone())
    }

    pub fn emit(&self, event: ProviderEvent) {
        self.listeners.emit(event)
    }

    fn handle(&self, request: ProviderRequest) -> Result<(Value, Option<ProviderEvent>), ProviderError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request.method());

        let value = match request {
            ProviderRequest::RequestAccounts => {
                if script.reject_connection {
                    return Err(ProviderError::new(USER_REJECTED, "User rejected the request."));
                }
                script.connected = true;
                json!(script.accounts)
            }
            ProviderRequest::Accounts if script.connected => json!(script.accounts),
            ProviderRequest::Accounts => json!([]),
            ProviderRequest::ChainId => json!(script.chain_id),
            ProviderRequest::SwitchChain { chain_id } => {
                if let Some(error) = script.switch_error.clone() {
                    return Err(error);
                }
                if !script.known_chains.iter().any(|known| known.matches(&chain_id)) {
                    return Err(ProviderError::unrecognized_chain(&chain_id));
                }
                script.chain_id = chain_id.clone();
                return Ok((Value::Null, Some(ProviderEvent::ChainChanged(chain_id))));
            }
            ProviderRequest::AddChain(definition) => {
                if let Some(error) = script.add_chain_error.clone() {
                    return Err(error);
                }
                script.known_chains.push(definition.chain_id.clone());
                script.chain_id = definition.chain_id.clone();
                return Ok((
                    Value::Null,
                    Some(ProviderEvent::ChainChanged(definition.chain_id)),
                ));
            }
            ProviderRequest::GetCode { .. } if script.has_code => json!("0x6080604052"),
            ProviderRequest::GetCode { .. } => json!("0x"),
            ProviderRequest::Call { data, .. } => {
                let failing = script
                    .failing_reads
                    .iter()
                    .any(|signature| data.starts_with(&selector(signature)));
                if failing {
                    return Err(ProviderError::new(-32000, "execution reverted"));
                }
                let output = script
                    .contract
                    .read(&data)
                    .ok_or_else(|| ProviderError::new(-32000, "unknown function"))?;
                json!(Bytes::from(output))
            }
            ProviderRequest::SendTransaction(tx) => {
                if script.reject_transactions {
                    return Err(ProviderError::new(
                        USER_REJECTED,
                        "MetaMask Tx Signature: User denied transaction signature.",
                    ));
                }
                if !script.revert_transactions {
                    script.contract.apply(&tx);
                }
                script.sent.push(tx);
                json!(tx_hash(script.sent.len()).to_string())
            }
            ProviderRequest::TransactionReceipt { hash } => {
                if script.withhold_receipts {
                    Value::Null
                } else {
                    let status = if script.revert_transactions { "0x0" } else { "0x1" };
                    json!({
                        "transactionHash": hash.to_string(),
                        "blockNumber": "0x10",
                        "status": status,
                    })
                }
            }
        };
        Ok((value, None))
    }
}

pub fn tx_hash(n: usize) -> TxHash {
    TxHash::repeat_byte(n as u8)
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request(&self, request: ProviderRequest) -> Result<Value, ProviderError> {
        if matches!(request, ProviderRequest::Call { .. }) {
            if let Some(delay) = self.script(|script| script.read_delay) {
                tokio::time::sleep(delay).await;
            }
        }
        let (value, event) = self.handle(request)?;
        if let Some(event) = event {
            self.listeners.emit(event);
        }
        Ok(value)
    }

    fn subscribe(&self) -> (ListenerId, mpsc::UnboundedReceiver<ProviderEvent>) {
        self.listeners.subscribe()
    }

    fn remove_listener(&self, id: ListenerId) -> Result<(), ProviderError> {
        self.listeners.remove(id)
    }
}

pub fn test_settings() -> DispatchSettings {
    DispatchSettings {
        confirmation_timeout: Duration::from_millis(300),
        receipt_poll_interval: Duration::from_millis(10),
    }
}

pub fn backend(wallet: &Arc<FakeWallet>) -> Backend {
    Backend::new(
        Some(wallet.clone() as Arc<dyn WalletProvider>),
        Network::sepolia(),
        test_settings(),
    )
}

pub fn backend_without_wallet() -> Backend {
    Backend::new(None, Network::sepolia(), test_settings())
}
