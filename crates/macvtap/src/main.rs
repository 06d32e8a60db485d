//! macvtap CNI plugin entry point.

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use macvtap::cli::{Cli, LogFormat};
use macvtap_network::NetlinkManager;

// Namespace switches apply to the calling OS thread only, so every step of
// the invocation runs on this one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments and CNI_* variables
    let cli = Cli::parse();

    // Initialize tracing; stdout carries the protocol result
    let filter = EnvFilter::from_default_env().add_directive("macvtap=warn".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    // Execute command
    cli.execute(&NetlinkManager::new()).await
}
