//! Process bootstrap for the review-slot guard bot: wires C1-C9 together,
//! runs the reconciliation loop (C7) on an interval, and dispatches one
//! chat event at a time (C8/C9) per invocation. Chat transport and
//! webhook plumbing are out of scope (spec §1) — this crate's `dispatch`
//! command is the seam an external transport invokes into, one event per
//! call, exit code carrying no meaning beyond "the event was processed."

mod config;
mod event_arg;

pub use config::Cli;
pub use config::Command;
pub use config::Config;
pub use config::DispatchArgs;

use std::sync::Arc;
use std::time::Duration;

use guard_dispatch::Services;
use guard_reconcile::Reconciler;
use guard_store::StoreRuntime;
use guard_vault::TokenVault;
use tokio::sync::watch;

/// Build every long-lived collaborator from `config`. Shared by both the
/// `run` and `dispatch` subcommands so their wiring never drifts apart.
async fn build(config: &Config) -> anyhow::Result<(StoreRuntime, Arc<TokenVault>, guard_chat::Client, Arc<dyn guard_clock::Clock>)> {
    let store = StoreRuntime::init(&config.database_path).await?;
    let clock: Arc<dyn guard_clock::Clock> = Arc::new(guard_clock::SystemClock);
    let vault = Arc::new(TokenVault::new(Arc::new(store.clone()), clock.clone(), config.token_cache_ttl_minutes));
    let chat = guard_chat::Client::new(config.chat_base_url.clone(), config.chat_bot_token.clone());
    Ok((store, vault, chat, clock))
}

/// Entry point shared by `main`. Dispatches to the `run` (reconciliation
/// daemon) or `dispatch` (single chat event) subcommand.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run_daemon(&cli.config, args.tick_interval_secs).await,
        Command::Dispatch(args) => run_dispatch(&cli.config, args).await,
    }
}

async fn run_daemon(config: &Config, tick_interval_secs: u64) -> anyhow::Result<()> {
    let (store, vault, chat, clock) = build(config).await?;
    let reconciler = Reconciler::new(store, vault, chat, config.school_base_url.clone(), clock)
        .with_call_timeout(Duration::from_secs(config.call_timeout_secs));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs(tick_interval_secs));
    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        interval.tick().await;
        if *shutdown_rx.borrow() {
            break;
        }
        if let Err(err) = reconciler.run_tick(shutdown_rx.clone()).await {
            tracing::error!(error = %err, "reconciliation tick failed");
        }
    }
    tracing::info!("reconciliation loop stopped");
    Ok(())
}

async fn run_dispatch(config: &Config, args: DispatchArgs) -> anyhow::Result<()> {
    let (store, vault, chat, clock) = build(config).await?;
    let services = Services::new(store, vault, chat, config.school_base_url.clone(), clock)
        .with_call_timeout(Duration::from_secs(config.call_timeout_secs));

    let event = event_arg::into_inbound_event(args)?;
    guard_dispatch::handle_event(&services, event).await;
    Ok(())
}
