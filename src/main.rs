//! pcopy - parallel local directory copier
//!
//! Walks SOURCE_DIR, copies every matching file into OUTPUT_DIR with a pool of worker threads,
//! and shows file-count and byte progress while it goes.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::MultiProgress;

use pcopy::cli::CopyArgs;
use pcopy::logger::{announce, init_logging, open_log_file};
use pcopy::prompt::TerminalPrompt;
use pcopy::{run_copy, CancelFlag, TransferBars};

/// 128 + SIGINT
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> Result<ExitCode> {
    let args = CopyArgs::parse();
    let config = args.copy_config();
    let output = args.output_config();

    // bad roots must not cost an existing log file
    config.validate()?;

    // the log file has to be settled before anything gets logged
    let log_file = output
        .log_file
        .as_deref()
        .map(|path| open_log_file(path, args.force, &TerminalPrompt))
        .transpose()?;

    let multi = if output.progress {
        MultiProgress::new()
    } else {
        TransferBars::hidden_multi()
    };
    init_logging(&output, &multi, log_file)?;
    announce(output.verbose, args.force);
    args.log_params(&config);

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        if !on_interrupt.is_cancelled() {
            eprintln!("\nInterrupted by user. Waiting for running jobs to finish (Ctrl-C)...");
        }
        on_interrupt.cancel();
    })
    .context("Error setting Ctrl-C handler")?;

    let bars = TransferBars::new(&multi);
    let summary = run_copy(&config, &bars, &cancel)?;

    if !output.quiet {
        println!("{summary}");
    }

    if summary.interrupted {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
