use std::{fs::File, path::PathBuf, sync::Arc};

use clap::Parser;
use inheritance_console::{
    backend::{
        wallet::{key_wallet::KeyWallet, WalletProvider},
        Backend,
    },
    config::{Config, Network},
    log_panics, ui,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "inheritance.log", help = "Log file path.")]
    log: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logger
    let log_file = File::create(&args.log).expect("create log file");

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(log_file)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

    log_panics();

    // Load configuration
    let config = Config::load();
    tracing::info!(?config, "configuration loaded");

    let network = Network::sepolia();

    let wallet = config.wallet_private_key.as_deref().map(|private_key| {
        let wallet = KeyWallet::new(private_key, network.chain_id.clone(), &config.rpc_url)
            .expect("invalid wallet private key");
        tracing::info!(address = %wallet.address(), "wallet loaded");
        Arc::new(wallet) as Arc<dyn WalletProvider>
    });
    if wallet.is_none() {
        tracing::warn!("no wallet private key configured");
    }

    let backend = Backend::new(wallet, network, config.dispatch_settings());

    ui::run_ui(&backend).await;

    backend.teardown();
}
