use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

/// Configuration shared by every subcommand. Populated from flags or the
/// matching `GUARD_*` environment variable.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base URL of the school's booking API (C4).
    #[arg(long, env = "GUARD_SCHOOL_BASE_URL")]
    pub school_base_url: String,

    /// Base URL of the chat transport's API (C5).
    #[arg(long, env = "GUARD_CHAT_BASE_URL")]
    pub chat_base_url: String,

    /// Bot credential used for every chat API call.
    #[arg(long, env = "GUARD_CHAT_BOT_TOKEN")]
    pub chat_bot_token: String,

    /// Path to the SQLite database backing the persistence gateway (C3)
    /// and, doubling as the token vault's backing store (C2).
    #[arg(long, env = "GUARD_DATABASE_PATH")]
    pub database_path: PathBuf,

    /// How long a cached token bundle is trusted before re-reading the
    /// backing store. See spec §5.
    #[arg(long, env = "GUARD_TOKEN_CACHE_TTL_MINUTES", default_value_t = 5)]
    pub token_cache_ttl_minutes: i64,

    /// Per-call timeout applied to every outbound school/chat API call.
    #[arg(long, env = "GUARD_CALL_TIMEOUT_SECS", default_value_t = 10)]
    pub call_timeout_secs: u64,
}

#[derive(Debug, Parser)]
#[command(name = "guard", about = "Review-slot guard bot for a programming school's reviewer calendar")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the reconciliation loop (C7) on a fixed interval until
    /// interrupted. See spec §4.2.
    Run(RunArgs),
    /// Process exactly one inbound chat event (C8/C9) and exit. The seam
    /// an external chat transport invokes into, one event per call.
    Dispatch(DispatchArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Seconds between reconciliation ticks.
    #[arg(long, env = "GUARD_TICK_INTERVAL_SECS", default_value_t = 60)]
    pub tick_interval_secs: u64,
}

/// One inbound chat event, expressed as CLI flags. Exactly one of
/// `--text` or the `--callback-id`/`--payload` pair must be given.
#[derive(Debug, Args)]
pub struct DispatchArgs {
    /// The chat the event arrived in.
    #[arg(long)]
    pub chat_id: String,

    /// Free text: a command (`/status`), a credential (`login:password`),
    /// or anything else. Mutually exclusive with `--callback-id`.
    #[arg(long, conflicts_with_all = ["callback_id", "payload"])]
    pub text: Option<String>,

    /// The tapped button's callback id, used to acknowledge the tap.
    #[arg(long, requires = "payload")]
    pub callback_id: Option<String>,

    /// The callback's wire payload, `ACTION:review_id`.
    #[arg(long, requires = "callback_id")]
    pub payload: Option<String>,
}
