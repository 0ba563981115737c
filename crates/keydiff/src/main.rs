//! keydiff: diff terminal key encoders against the kitty keyboard protocol.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use keydiff_core::config::{Config, LogFormat};
use keydiff_core::exec::Executor;
use keydiff_core::keys::KeyCatalog;
use keydiff_core::logging::init_logging;
use keydiff_core::matrix::Matrix;
use keydiff_core::report::{ArtifactWriter, render_progress, render_summary};
use keydiff_core::runner::{ProgressSink, RunController, RunState};
use keydiff_core::target::{REFERENCE_NAME, TargetRegistry};
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(
    name = "keydiff",
    about = "Compare terminal key encoders against the kitty keyboard protocol reference",
    version
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "KEYDIFF_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Echo every tester command line and its stderr
    #[arg(long)]
    debug: bool,

    /// Cap the number of cases (0 = unlimited)
    #[arg(long, default_value_t = 0, value_name = "N")]
    limit: usize,

    /// Resume at this percentage of the full matrix
    #[arg(
        long,
        value_name = "PCT",
        value_parser = clap::value_parser!(u8).range(0..100)
    )]
    start_at_percent: Option<u8>,

    /// Target to diff against the reference
    #[arg(long, value_name = "NAME")]
    target: Option<String>,

    /// Structured results file
    #[arg(long, value_name = "PATH")]
    results_file: Option<PathBuf>,

    /// Mismatch report file
    #[arg(long, value_name = "PATH")]
    mismatch_log: Option<PathBuf>,

    /// Per-invocation timeout in milliseconds
    #[arg(
        long,
        value_name = "MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_ms: Option<u64>,

    /// Log output format (pretty, json)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Print registered targets and exit
    #[arg(long)]
    list_targets: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.results_file {
            config.run.results_file.clone_from(path);
        }
        if let Some(path) = &self.mismatch_log {
            config.run.mismatch_log.clone_from(path);
        }
        if let Some(ms) = self.timeout_ms {
            config.run.timeout_ms = ms;
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
        if self.debug {
            config.log.level = "debug".to_string();
        }
    }
}

/// Prints progress lines to stdout.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn progress(&mut self, processed: usize, total: usize) {
        println!("{}", render_progress(processed, total));
    }
}

async fn wait_for_interrupt() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Unable to listen for Ctrl-C; run cannot be interrupted");
        std::future::pending::<()>().await;
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate().map_err(keydiff_core::Error::from)?;
    init_logging(&config.log).context("failed to initialize logging")?;
    debug!(config = ?cli.config, "Configuration loaded");

    let registry = TargetRegistry::from_config(&config);
    if cli.list_targets {
        println!("{REFERENCE_NAME} (reference)");
        for name in registry.names() {
            if name == config.run.default_target {
                println!("{name} (default)");
            } else {
                println!("{name}");
            }
        }
        return Ok(());
    }

    let target_name = cli
        .target
        .clone()
        .unwrap_or_else(|| config.run.default_target.clone());
    let target = registry.target(&target_name)?;
    registry.preflight(target.as_ref())?;

    let limit = (cli.limit > 0).then_some(cli.limit);
    let cases = Matrix::standard(&KeyCatalog::standard()).into_cases(limit, cli.start_at_percent);
    if cases.start_index() > 0 {
        println!(
            "Resuming at case {} of {}.",
            cases.start_index(),
            cases.matrix_len()
        );
    }
    println!(
        "Starting tests against '{target_name}'. Combinations to check: {}",
        cases.len()
    );

    let executor = Executor::new(config.run.timeout()).with_debug(cli.debug);
    let artifacts = ArtifactWriter::new(
        &config.run.results_file,
        &config.run.mismatch_log,
        target_name.as_str(),
    );
    let mut controller = RunController::new(registry.reference(), target, executor, artifacts)
        .with_intervals(config.run.save_interval, config.run.progress_interval);

    let report = controller
        .run(cases, wait_for_interrupt(), &mut ConsoleProgress)
        .await?;

    if report.state == RunState::Interrupted {
        println!("\nTest interrupted by user. Saved current results.");
    }
    println!();
    print!(
        "{}",
        render_summary(&report.summary, &report.keys, controller.artifacts())
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        if let Some(remediation) = err
            .downcast_ref::<keydiff_core::Error>()
            .and_then(keydiff_core::Error::remediation)
        {
            eprintln!();
            eprint!("{}", remediation.render_plain());
        }
        std::process::exit(1);
    }
}
