//! `latchkey` - RFID door access gateway.
//!
//! Opens the serial link to the door controller, authenticates with the
//! membership directory, loads the offline login cache and runs the gateway
//! until the link is lost or a shutdown signal arrives. The process always
//! exits non-zero so a supervisor restarts it.

mod config;
mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use latchkey_core::Connectivity;
use latchkey_core::constants::EXIT_CODE_STARTUP;
use latchkey_directory::WildApricotClient;
use latchkey_gateway::{AccessEngine, Gateway, GatewayContext, Termination};
use latchkey_hardware::serial::{self, SerialReader, SerialWriter};
use latchkey_storage::OfflineLoginCache;
use latchkey_telemetry::{DisabledTelemetry, MqttTelemetry, TelemetrySink};
use tracing::{error, info, warn};

use crate::config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level, cli.json_logs) {
        eprintln!("Failed to initialize logging: {e:#}");
        return exit_code(EXIT_CODE_STARTUP);
    }

    info!("Starting latchkey v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(termination) => exit_code(termination.exit_code),
        Err(e) => {
            error!("Startup failed: {e:#}");
            exit_code(EXIT_CODE_STARTUP)
        }
    }
}

async fn run(cli: Cli) -> Result<Termination> {
    cli.validate().context("invalid configuration")?;

    let serial_config = cli.serial_config();
    let (reader, writer) = serial::open(&serial_config)
        .with_context(|| format!("failed to open serial device {}", serial_config.port))?;

    let connectivity = Connectivity::new();
    let mut directory = WildApricotClient::new(cli.directory_config(), connectivity.clone())
        .context("failed to build membership directory client")?;
    if !directory.connect().await {
        warn!("(Network Disconnected) Starting with the offline login cache only");
    }

    let cache = OfflineLoginCache::load(cli.cache_path.clone());
    info!(entries = cache.len(), "Offline login cache loaded");

    let context = GatewayContext::new(&cli.door_name, connectivity);
    let termination = match cli.telemetry_config() {
        Some(config) => {
            let telemetry = MqttTelemetry::start(config);
            serve(context, reader, writer, directory, telemetry, cache).await
        }
        None => {
            info!("No MQTT host configured, telemetry disabled");
            serve(context, reader, writer, directory, DisabledTelemetry, cache).await
        }
    };

    Ok(termination)
}

async fn serve<T: TelemetrySink>(
    context: GatewayContext,
    reader: SerialReader,
    writer: SerialWriter,
    directory: WildApricotClient,
    telemetry: T,
    cache: OfflineLoginCache,
) -> Termination {
    let engine = AccessEngine::new(context, directory, telemetry, writer, cache);
    Gateway::new(reader, engine).run(shutdown_signal()).await
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Shutdown requested (Ctrl+C)"),
        () = terminate => info!("Shutdown requested (SIGTERM)"),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
