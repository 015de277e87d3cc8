use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use plo_server::config::TableConfig;
use plo_server::server::{router, ServerContext, TableRegistry};

const LOG_TARGET: &str = "bin::plo_dev_server";
const DEFAULT_BIND: &str = "127.0.0.1:4000";

#[derive(Debug, Parser)]
#[command(name = "plo_dev_server")]
#[command(about = "Development WebSocket server for PLO tables", long_about = None)]
struct Args {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SERVER_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Small blind for every table
    #[arg(long, env = "TABLE_SMALL_BLIND", default_value_t = 1)]
    small_blind: u64,

    /// Big blind for every table
    #[arg(long, env = "TABLE_BIG_BLIND", default_value_t = 2)]
    big_blind: u64,

    /// Run tables as fast-fold (deal only on a full table)
    #[arg(long, env = "TABLE_FAST_FOLD", default_value_t = false)]
    fast_fold: bool,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "SERVER_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let config = if args.fast_fold {
        TableConfig::fast_fold(args.small_blind, args.big_blind)
    } else {
        TableConfig::new(args.small_blind, args.big_blind)
    };
    let ctx = Arc::new(ServerContext {
        registry: TableRegistry::new(config),
    });

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(
        target: LOG_TARGET,
        bind = %args.bind,
        small_blind = args.small_blind,
        big_blind = args.big_blind,
        fast_fold = args.fast_fold,
        "dev server listening"
    );
    axum::serve(listener, router(ctx))
        .await
        .context("server exited with error")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }
}
