use anyhow::Result;
use clap::Parser;
use printpass::{
    cmd::{Cli, Commands},
    utils::logs_fmt::UptimeSeconds,
};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_timer(UptimeSeconds)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Tiers(cmd) => cmd.execute().await?,
        Commands::Gate(cmd) => cmd.execute().await?,
        Commands::Subscription(cmd) => cmd.execute().await?,
    }

    if cli.verbose {
        debug!("metrics:\n{}", printpass::subscription::metrics::METRICS.encode());
    }

    Ok(())
}
