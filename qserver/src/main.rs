use std::path::PathBuf;

use clap::Parser;
use common::config::{read_config, QueryCoreConfig};
use common::lifecycle::Lifecycle;
use common::log::tracing_factory::TracingFactory;

use qserver::server::QueryCore;

#[derive(Parser, Debug)]
#[command(name = "qserver")]
#[command(version = "0.1.0")]
#[command(author = "rust-us")]
#[command(about = "Time-series SQL query core over a partitioned key/value store")]
struct CliArgs {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides `timeseries_query_max_quanta_span` from the config file.
    #[arg(long, value_name = "N")]
    max_quanta_span: Option<u32>,

    /// Enable debug-level logging.
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    TracingFactory::init_log(args.debug);

    let mut config = args
        .config
        .as_ref()
        .and_then(|path| read_config(path).ok())
        .unwrap_or_default();
    if let Some(span) = args.max_quanta_span {
        config.query.max_quanta_span = span;
    }

    tracing::info!(max_quanta_span = config.query.max_quanta_span, "starting qserver");

    // The wire listener that would accept client submissions is an
    // external collaborator (spec.md §1, "Out of scope"). This process
    // wires up the core (C1-C5) against the in-memory demo doubles and
    // waits to be stopped; a real deployment swaps `bootstrap_demo` for
    // `QueryCore::bootstrap` with live `storage_iface` implementations.
    let ring = vec!["node-a".to_string(), "node-b".to_string(), "node-c".to_string()];
    let (mut core, _catalog, _backend) = QueryCore::bootstrap_demo("node-a", config, ring);
    core.setup();
    core.start();

    tracing::info!(node = %core.node(), "qserver ready");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
    core.stop();
}
