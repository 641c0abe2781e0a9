use clap::Parser;
use guard_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    guard_cli::run(Cli::parse()).await
}
