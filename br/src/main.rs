//! blockrender - render templates from reusable text blocks
//!
//! CLI entry point: one render pass, or watch mode with `--watch`.

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};

use blockrender::cli::Cli;
use blockrender::config::Config;
use blockrender::cycle::RenderCycle;
use blockrender::watcher;

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(level: &str) -> Result<()> {
    let level = parse_level(level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("{}", e))?;
    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn run_once(mut cycle: RenderCycle) -> Result<()> {
    let report = cycle.run().context("Render failed")?;
    if !report.is_success() {
        return Err(eyre!(
            "{} template(s) failed to render:\n  {}",
            report.failures.len(),
            report.failure_lines().join("\n  ")
        ));
    }
    println!(
        "{} Rendered {} template(s) into {}",
        "✓".green(),
        report.rendered.len(),
        cycle.config().rendered_dir.display().to_string().cyan()
    );
    Ok(())
}

async fn run_watch(cycle: RenderCycle) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let watch_stop = Arc::clone(&stop);
    let mut handle = tokio::task::spawn_blocking(move || {
        let mut cycle = cycle;
        watcher::watch(&mut cycle, &watch_stop)
    });

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = &mut handle => {
            return result.context("Watcher task panicked")?.context("Watcher failed");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("SIGINT received");
        }
        _ = terminate => {
            warn!("SIGTERM received");
        }
    }

    stop.store(true, Ordering::SeqCst);
    handle
        .await
        .context("Watcher task panicked")?
        .context("Watcher failed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(&cli.effective_log_level(config_log_level.as_deref())).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(
        "blockrender: blocks={} templates={} rendered={}",
        config.blocks_dir.display(),
        config.templates_dir.display(),
        config.rendered_dir.display()
    );

    let cycle = RenderCycle::new(config);
    if cli.watch {
        debug!("main: entering watch mode");
        run_watch(cycle).await
    } else {
        debug!("main: single render pass");
        run_once(cycle)
    }
}
