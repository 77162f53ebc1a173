// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! quarry - structural code search and replace.
//!
//! Exit codes: 0 success, 1 user error (bad pattern, missing file),
//! 2 internal error, 3 cancelled.

mod apply;
mod cache;
mod cli;
mod discovery;
mod orchestrator;
mod output;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::Parser as _;
use quarry_engine::{Pattern, Template};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, OutputFormat};
use crate::discovery::Filters;
use crate::orchestrator::{Limits, RunError, RunOptions};
use crate::progress::{ProgressEvent, ProgressReporter, Stage};

const EXIT_OK: u8 = 0;
const EXIT_USER: u8 = 1;
const EXIT_INTERNAL: u8 = 2;
const EXIT_CANCELLED: u8 = 3;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    ExitCode::from(run(Cli::parse()))
}

fn run(args: Cli) -> u8 {
    let pattern = match Pattern::parse(&args.pattern) {
        Ok(pattern) => pattern,
        Err(err) => {
            eprintln!("error: {err}");
            return EXIT_USER;
        }
    };
    let template = match &args.replace {
        Some(src) => match Template::for_pattern(src, &pattern) {
            Ok(template) => Some(template),
            Err(err) => {
                eprintln!("error: {err}");
                return EXIT_USER;
            }
        },
        None => None,
    };

    let reporter = ProgressReporter::spawn();
    reporter.emit(ProgressEvent::new(Stage::Scanning, "scanning", 0, 0));
    let files = match gather_files(&args) {
        Ok(files) => files,
        Err(err) => {
            eprintln!("error: {err:#}");
            reporter.finish();
            return EXIT_USER;
        }
    };

    let limits = Limits {
        // replace batches get the global budget; search runs per-file only
        global_timeout: template.as_ref().map(|_| Duration::from_secs(120)),
        ..Limits::default()
    };
    let replace_mode = template.is_some();
    let opts = RunOptions {
        pattern,
        template,
        apply: args.apply,
        parallelism: args.parallelism,
        limits,
    };

    let cancel = AtomicBool::new(false);
    let outcome = orchestrator::run(files, &opts, &cancel, &reporter);
    reporter.finish();

    match outcome {
        Ok(report) => {
            let rendered = match args.output {
                OutputFormat::Text => output::render_text(&report, replace_mode),
                OutputFormat::Json => output::render_json(&report, replace_mode, args.apply),
            };
            print!("{rendered}");
            if report.cancelled {
                EXIT_CANCELLED
            } else {
                EXIT_OK
            }
        }
        Err(err @ RunError::TooManyMatches { .. }) => {
            eprintln!("error: {err}");
            EXIT_INTERNAL
        }
        Err(RunError::Internal(err)) => {
            eprintln!("internal error: {err:#}");
            EXIT_INTERNAL
        }
    }
}

fn gather_files(args: &Cli) -> anyhow::Result<Vec<PathBuf>> {
    if let Some(file) = &args.file {
        anyhow::ensure!(file.is_file(), "file not found: {}", file.display());
        return Ok(vec![file.clone()]);
    }
    let root = args
        .workspace
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    anyhow::ensure!(root.is_dir(), "workspace not found: {}", root.display());
    let filters = Filters {
        file_filter: args.file_filter.clone(),
        folder_filter: args.folder_filter.clone(),
        project_filter: args.project_filter.clone(),
    };
    discovery::discover(&root, &filters)
}
