#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `probe`: replay recorded load-cell probe traces through the analysis engine.

mod analyse;
mod cli;
mod error_fmt;

use clap::Parser;
use eyre::WrapErr;
use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE};

fn main() {
    // Install color-eyre for nicer reports when stderr is a terminal.
    let _ = color_eyre::install();

    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let mut log_guard = None;
    if let Err(err) = run(cli, &mut log_guard) {
        let code = error_fmt::exit_code_for_error(&err);
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        tracing::debug!(error = ?err, code, "exiting with error");
        // process::exit skips destructors; flush the log file first.
        drop(log_guard);
        std::process::exit(code);
    }
}

fn run(cli: Cli, log_guard: &mut Option<WorkerGuard>) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    *log_guard = init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    match cli.cmd {
        Commands::Analyse { trace, features } => {
            analyse::run_analyse(&cfg, &trace, features, cli.json)
        }
        Commands::SelfCheck => analyse::run_self_check(&cfg, cli.json),
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<probe_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            probe_config::load_toml(&text)
                .wrap_err_with(|| format!("parse config {}", p.display()))?
        }
        None => probe_config::Config::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Console logs go to stderr (pretty or JSON); `[logging].file` adds a JSON
/// lines file, rotated per `[logging].rotation`. `RUST_LOG` wins over both
/// `--log-level` and `[logging].level`. The returned guard must outlive all
/// logging to the file.
fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &probe_config::Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    let level = cli_level.or(logging.level.as_deref()).unwrap_or("warn");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level)
            .wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut file_guard = None;
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let Some(name) = path.file_name() else {
            eyre::bail!("logging.file must name a file, got {file:?}");
        };
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(file_guard)
}
