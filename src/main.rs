mod command;
mod config;
mod transport;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use config::{Cli, Config};
use transport::{SerialConnector, Session};

use tracing::{debug, error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_from(config::normalize_args(std::env::args_os()));

    init_tracing(cli.debug);

    // Usage errors end here, before the port is ever opened
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    if let Err(e) = run(&config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing on stderr; stdout carries raw actuator replies
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

async fn run(config: &Config) -> Result<()> {
    debug!(
        "{} command for {} on {}",
        config.command.name(),
        config.address,
        config.serial.port
    );

    let connector = SerialConnector::new(config.serial.clone());
    let mut session = Session::open(&connector).await?;
    let mut stdout = tokio::io::stdout();

    let result = command::dispatch(&mut session, config.address, &config.command, &mut stdout).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close {}: {}", connector.config().port, e);
    }

    let outcome = result?;
    match outcome.reply_bytes {
        Some(n) => debug!("{} byte frame sent, {} reply bytes", outcome.sent, n),
        None => debug!("{} byte frame sent", outcome.sent),
    }

    Ok(())
}
