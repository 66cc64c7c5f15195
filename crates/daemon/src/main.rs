// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreman orchestrator daemon (fmd)
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout and drives the background
//! manager cycle. Logging goes to stderr; stdout carries only protocol
//! frames.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use fm_core::Policy;
use fm_daemon::engine::{run_auto_cycle, Engine};
use fm_daemon::rpc::{self, ServerCtx};
use fm_daemon::env;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("fmd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("fmd {}", env!("CARGO_PKG_VERSION"));
                println!("Foreman orchestrator daemon - JSON-RPC tool server on stdin/stdout");
                println!();
                println!("USAGE:");
                println!("    fmd");
                println!();
                println!("Configuration is taken from the environment:");
                println!("    ORCHESTRATOR_ROOT                        project root (default: binary directory)");
                println!("    ORCHESTRATOR_EXPECTED_ROOT               startup guard: must equal the resolved root");
                println!("    ORCHESTRATOR_POLICY                      policy JSON (default: <root>/config/policy.json)");
                println!("    ORCHESTRATOR_AUTO_MANAGER_CYCLE_SECONDS  manager cycle interval, 5-300 (default: 15)");
                println!("    ORCHESTRATOR_STATUS_VERBOSE_PATHS        include full paths in status output");
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: fmd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    setup_logging();

    let root = env::root_dir();
    if let Some(expected) = env::expected_root() {
        if root != expected {
            return Err(format!(
                "ORCHESTRATOR_ROOT mismatch: got '{}', expected '{}'",
                root.display(),
                expected.display()
            )
            .into());
        }
    }

    let policy_path = env::policy_path(&root);
    let policy = if policy_path.exists() {
        Policy::load(&policy_path)?
    } else {
        warn!(path = %policy_path.display(), "policy file not found, using built-in defaults");
        Policy::default()
    };

    info!(root = %root.display(), policy = %policy.name, "starting orchestrator");
    let engine = Arc::new(Engine::open(&root, policy)?);

    let interval = env::auto_cycle_interval();
    let cancel = CancellationToken::new();
    let cycle_task = tokio::spawn(run_auto_cycle(
        Arc::clone(&engine),
        interval,
        cancel.clone(),
    ));

    let ctx = ServerCtx {
        engine,
        policy_path,
        verbose_paths: env::status_verbose_paths(),
        auto_cycle: Some(interval),
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        served = rpc::serve(ctx) => {
            if let Err(error) = served {
                warn!(error = %error, "request loop ended with error");
            } else {
                info!("stdin closed, shutting down");
            }
        }
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    cancel.cancel();
    let _ = cycle_task.await;
    info!("orchestrator stopped");
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
