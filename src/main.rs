use anyhow::Context;
use clap::Parser;
use tmon_collector::cli::Cli;
use tmon_collector::config::Config;
use tmon_collector::shutdown::ShutdownToken;
use tmon_collector::supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    let config = Config::load(&cli.config, cli.transport.as_deref())
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let shutdown = ShutdownToken::new();
    shutdown.install_signal_handlers();

    supervisor::run(config, shutdown).await
}
