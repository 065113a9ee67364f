use std::{
    fmt,
    net::{AddrParseError, SocketAddr},
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hex_literal::hex;
use reqwest::Url;
use serde::Deserialize;

use crate::backend::{
    abi::Address,
    wallet::{ChainDefinition, ChainId, NativeCurrency},
};

/// Address of the deployed inheritance contract on Sepolia.
pub const SEPOLIA_CONTRACT_ADDRESS: Address =
    Address::new(hex!("0a3d1643A50EF6AC192F359cD5A6c08Bf444977C"));

/// Network the contract lives on, as presented to the wallet and the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    /// Short name used in status messages
    pub name: &'static str,
    pub chain_id: ChainId,
    pub contract_address: Address,
    /// Submitted to the wallet if it doesn't know the chain yet
    pub definition: ChainDefinition,
}

impl Network {
    pub fn sepolia() -> Self {
        let chain_id = ChainId::new("0xaa36a7");
        Network {
            name: "Sepolia",
            chain_id: chain_id.clone(),
            contract_address: SEPOLIA_CONTRACT_ADDRESS,
            definition: ChainDefinition {
                chain_id,
                chain_name: "Sepolia Test Network".to_owned(),
                native_currency: NativeCurrency {
                    name: "Sepolia ETH".to_owned(),
                    symbol: "ETH".to_owned(),
                    decimals: 18,
                },
                rpc_urls: vec!["https://rpc.sepolia.org".to_owned()],
                block_explorer_urls: vec!["https://sepolia.etherscan.io".to_owned()],
            },
        }
    }
}

/// Transaction confirmation settings of the action dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            confirmation_timeout: Duration::from_secs(default_confirmation_timeout_secs()),
            receipt_poll_interval: Duration::from_millis(default_receipt_poll_interval_ms()),
        }
    }
}

fn default_confirmation_timeout_secs() -> u64 {
    600
}

fn default_receipt_poll_interval_ms() -> u64 {
    2000
}

fn load_dotenv() {
    if let Err(err) = dotenvy::from_path(".env") {
        tracing::warn!(?err, "failed to load config file");
    }
}

#[derive(Clone, Deserialize)]
/// Configuration of the inheritance console.
///
/// Content of this configuration is loaded from environment variables or `.env`
/// file when the [Config::load()] is called.
/// Variable names in the enviroment and `.env` file must be prefixed with
/// [INHERITANCE_](Config::CONFIG_PREFIX) and written as SCREAMING_SNAKE_CASE
/// (e.g. `INHERITANCE_RPC_URL`).
pub struct Config {
    /// JSON-RPC endpoint the wallet talks to, normally the relay
    pub rpc_url: String,
    /// Hex private key of the wallet account; no wallet is available without it
    #[serde(default)]
    pub wallet_private_key: Option<String>,
    /// How long to wait for a transaction to be mined
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Delay between two transaction receipt queries
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field(
                "wallet_private_key",
                &self.wallet_private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .field("receipt_poll_interval_ms", &self.receipt_poll_interval_ms)
            .finish()
    }
}

impl Config {
    /// Prefix of configuration options in the environment variables and `.env`
    /// file.
    const CONFIG_PREFIX: &'static str = "INHERITANCE_";

    /// Loads a configuration from operating system environment variables and
    /// `.env` file.
    ///
    /// Panics if the configuration is missing or invalid.
    pub fn load() -> Self {
        load_dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Builds a configuration from `(name, value)` pairs, ignoring variables
    /// without the [INHERITANCE_](Config::CONFIG_PREFIX) prefix.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let config: Self = envy::prefixed(Self::CONFIG_PREFIX)
            .from_iter(vars)
            .expect("configuration error");

        if !config.is_valid() {
            panic!("invalid configuration: {:?}", config);
        }

        config
    }

    /// Check if configuration is set
    pub fn is_valid(&self) -> bool {
        Url::parse(&self.rpc_url).is_ok()
            && self.confirmation_timeout_secs > 0
            && self.receipt_poll_interval_ms > 0
            && self
                .wallet_private_key
                .as_ref()
                .map_or(true, |key| !key.trim().is_empty())
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
        }
    }
}

fn default_upstream_url() -> String {
    "https://sepolia.infura.io/v3".to_owned()
}

fn default_listen() -> String {
    "127.0.0.1:8787".to_owned()
}

fn default_route() -> String {
    "/api/rpc".to_owned()
}

#[derive(Clone, Deserialize)]
/// Configuration of the JSON-RPC relay.
///
/// Loaded like [Config], with the [RELAY_](RelayConfig::CONFIG_PREFIX) prefix
/// (e.g. `RELAY_PROJECT_ID`).
pub struct RelayConfig {
    /// Project identifier of the upstream provider, part of the endpoint URL
    pub project_id: String,
    /// Project secret, sent upstream as basic auth password only
    pub project_secret: String,
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_route")]
    pub route: String,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("project_id", &self.project_id)
            .field("project_secret", &"<redacted>")
            .field("upstream_url", &self.upstream_url)
            .field("listen", &self.listen)
            .field("route", &self.route)
            .finish()
    }
}

impl RelayConfig {
    const CONFIG_PREFIX: &'static str = "RELAY_";

    /// Loads the relay configuration from operating system environment
    /// variables and `.env` file.
    ///
    /// Panics if the configuration is missing or invalid.
    pub fn load() -> Self {
        load_dotenv();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let config: Self = envy::prefixed(Self::CONFIG_PREFIX)
            .from_iter(vars)
            .expect("configuration error");

        if !config.is_valid() {
            panic!("invalid configuration: {:?}", config);
        }

        config
    }

    pub fn is_valid(&self) -> bool {
        !self.project_id.is_empty()
            && !self.project_secret.is_empty()
            && self.route.starts_with('/')
            && self.listen_addr().is_ok()
            && Url::parse(&self.upstream_endpoint()).is_ok()
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.listen.parse()
    }

    /// Upstream JSON-RPC endpoint: the base URL followed by the project id.
    pub fn upstream_endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.upstream_url.trim_end_matches('/'),
            self.project_id
        )
    }

    /// `Authorization` header value carrying the project credentials.
    pub fn basic_authorization(&self) -> String {
        let credentials = format!("{}:{}", self.project_id, self.project_secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}
