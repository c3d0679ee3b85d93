//! `squish`: minify and compress TIC-80 Lua carts.

mod cli;
mod cost;
mod output;
mod prepare;
mod telemetry;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::Cli;
use cost::PackedSize;
use output::BestWriter;
use squish_core::SearchConfig;
use squish_search::{optimize, CancelToken};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.log_json)?;

    let config = cli.search_config()?;
    let inputs = cli.input_paths()?;

    let interrupted = Arc::new(AtomicBool::new(false));
    tokio::spawn(interrupt_on_ctrl_c(interrupted.clone()));

    tokio::task::spawn_blocking(move || pack_all(&cli, &config, &inputs, &interrupted)).await?
}

async fn interrupt_on_ctrl_c(interrupted: Arc<AtomicBool>) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
            interrupted.store(true, Ordering::SeqCst);
        }
        Err(e) => warn!("cannot listen for Ctrl+C: {}", e),
    }
}

/// Byte counts of one packed input, or of all of them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Summary {
    elapsed: Duration,
    original: u64,
    minified: u64,
    packed: u64,
}

impl Summary {
    fn add(&mut self, other: &Summary) {
        self.original += other.original;
        self.minified += other.minified;
        self.packed += other.packed;
    }

    fn line(&self, label: &str, width: usize) -> String {
        format!(
            "{label:<width$} Time:{} Orig:{:<5} Min:{:<5} Pack:{:<5}",
            format_elapsed(self.elapsed),
            self.original,
            self.minified,
            self.packed,
        )
    }
}

/// Packs every input in turn, printing a summary line per input and a
/// totals line when there is more than one. An interrupt stops the current
/// search and skips the inputs after it.
fn pack_all(
    cli: &Cli,
    config: &SearchConfig,
    inputs: &[PathBuf],
    interrupted: &Arc<AtomicBool>,
) -> Result<()> {
    let started = Instant::now();
    let width = inputs
        .iter()
        .map(|path| path.display().to_string().len())
        .max()
        .unwrap_or_default();
    let mut totals = Summary::default();
    let mut failed = 0;

    for input in inputs {
        if interrupted.load(Ordering::SeqCst) {
            warn!(input = %input.display(), "interrupted, skipping");
            continue;
        }
        let cancel = CancelToken::from_flag(interrupted.clone());
        match pack_file(cli, config, input, &cancel) {
            Ok(summary) => {
                println!("{}", summary.line(&input.display().to_string(), width));
                totals.add(&summary);
            }
            Err(err) => {
                error!(input = %input.display(), "{:#}", err);
                failed += 1;
            }
        }
    }

    if inputs.len() > 1 {
        totals.elapsed = started.elapsed();
        println!("{}\n{}", "-".repeat(80), totals.line("Totals", width));
    }
    if failed > 0 {
        bail!("{failed} of {} inputs failed", inputs.len());
    }
    Ok(())
}

/// Searches for the smallest packed form of `input`, keeping the best one
/// written so far on disk.
fn pack_file(
    cli: &Cli,
    config: &SearchConfig,
    input: &Path,
    cancel: &CancelToken,
) -> Result<Summary> {
    let started = Instant::now();
    let source =
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let initial =
        prepare::prepare(&source).with_context(|| format!("parsing {}", input.display()))?;

    let target = cli.target();
    let cost = PackedSize::new(cli.no_load, cli.compressed().then_some(cli.level))
        .with_target(target);
    let mut writer = BestWriter::new(cli.output_path(input), cli.print_best).with_target(target);
    info!(
        input = %input.display(),
        output = %writer.path().display(),
        algorithm = %config.algorithm,
        steps = config.steps,
        target_size = target.size,
        "packing"
    );

    let outcome = optimize(&initial, cost, config, &mut writer, cancel)?;
    if outcome.cancelled {
        warn!(input = %input.display(), "interrupted, keeping the best result so far");
    }

    Ok(Summary {
        elapsed: started.elapsed(),
        original: source.len() as u64,
        minified: writer.baseline_size().unwrap_or_default(),
        packed: writer.final_size().unwrap_or_default(),
    })
}

/// `h.mm.ss`
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}.{:02}.{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
