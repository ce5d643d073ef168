//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod config;

use clap::{App, Arg};
use config::{Config, LoggingFileRotation, LoggingFmtStyle};
use lsr_ldp::{Instance, PeerEvent};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

fn init_tracing(config: &config::Logging) {
    // Enable logging to journald.
    let journald = config.journald.enabled.then(tracing_journald::layer);
    let journald = match journald {
        Some(Err(error)) => {
            eprintln!("couldn't connect to journald: {error}");
            None
        }
        Some(Ok(layer)) => Some(layer),
        None => None,
    };

    // Enable logging to a file.
    let file = config.file.enabled.then(|| {
        let file_appender = match config.file.rotation {
            LoggingFileRotation::Never => {
                rolling::never(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Hourly => {
                rolling::hourly(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Daily => {
                rolling::daily(&config.file.dir, &config.file.name)
            }
        };

        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(false)
            .with_thread_ids(config.file.fmt.show_thread_id)
            .with_file(config.file.fmt.show_source)
            .with_line_number(config.file.fmt.show_source)
            .with_ansi(config.file.fmt.colors);
        let layer = match config.file.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    // Enable logging to stdout.
    let stdout = config.stdout.enabled.then(|| {
        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(config.stdout.fmt.show_thread_id)
            .with_file(config.stdout.fmt.show_source)
            .with_line_number(config.stdout.fmt.show_source)
            .with_ansi(config.stdout.fmt.colors);
        let layer = match config.stdout.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lsr=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(journald)
        .with(file)
        .with(stdout)
        .init();
}

fn signal_listener() -> std::io::Result<mpsc::Receiver<()>> {
    let (signal_tx, signal_rx) = mpsc::channel(1);
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::task::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                info!("received SIGINT");
                let _ = signal_tx.send(()).await;
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                let _ = signal_tx.send(()).await;
            }
        }
    });

    Ok(signal_rx)
}

async fn run(
    config: lsr_ldp::Config,
    mut signal_rx: mpsc::Receiver<()>,
) -> Result<(), lsr_ldp::Error> {
    // Start the LDP instance.
    let mut instance = Instance::new();
    let handle = instance.start(config).await?;
    let mut peer_eventc = handle.subscribe();
    info!(router_id = %handle.router_id(), "LDP instance started");

    loop {
        tokio::select! {
            _ = signal_rx.recv() => break,
            event = peer_eventc.recv() => match event {
                Ok(PeerEvent::Up(lsr_id)) => {
                    info!(%lsr_id, "peer up");
                }
                Ok(PeerEvent::Down(lsr_id)) => {
                    info!(%lsr_id, "peer down");
                }
                Err(RecvError::Lagged(count)) => {
                    warn!(%count, "missed peer events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    instance.stop().await
}

// ===== main =====

fn main() {
    // Parse command-line parameters.
    let matches = App::new("LDP label switching router daemon")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    // Read configuration file.
    let config_file = matches.value_of("config");
    let config = match Config::load(config_file) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    // Initialize tracing.
    init_tracing(&config.logging);

    // We're ready to go!
    info!("starting up");

    // Main loop.
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(%error, "failed to create async runtime");
            std::process::exit(1);
        }
    };
    let result = runtime.block_on(async {
        // Spawn signal listener.
        let signal_rx = match signal_listener() {
            Ok(signal_rx) => signal_rx,
            Err(error) => {
                error!(%error, "failed to install signal handlers");
                std::process::exit(1);
            }
        };

        run(config.ldp, signal_rx).await
    });
    if let Err(error) = result {
        error.log();
        std::process::exit(1);
    }

    info!("exiting");
}
