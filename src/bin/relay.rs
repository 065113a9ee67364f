use clap::Parser;
use inheritance_console::{config::RelayConfig, log_panics, relay};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(about = "JSON-RPC relay hiding the upstream project credentials", long_about = None)]
struct Args {
    #[arg(short, long, help = "Address to listen on, overrides RELAY_LISTEN.")]
    listen: Option<String>,

    #[arg(short, long, help = "Path of the relay route, overrides RELAY_ROUTE.")]
    route: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

    log_panics();

    let mut config = RelayConfig::load();
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(route) = args.route {
        config.route = route;
    }
    if !config.is_valid() {
        panic!("invalid configuration: {:?}", config);
    }

    tracing::info!(?config, "starting relay");

    if let Err(error) = relay::serve(config).await {
        tracing::error!(%error, "relay stopped");
        std::process::exit(1);
    }
}
