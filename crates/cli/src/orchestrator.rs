// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The driver loop.
//!
//! Files are processed in parallel on a rayon pool, one worker per hardware
//! thread unless `--parallelism` overrides it. Matching is read-only over
//! shared pattern/template/cache state; each worker accumulates into a local
//! vector and the accumulators are merged after all workers quiesce. Nothing
//! about processing order is guaranteed; the final report is sorted by
//! `(file, start)` and deduplicated on `(file, start, end, node)`.
//!
//! Per-file failures (unreadable, unparseable, timed out) become `errors[]`
//! entries and never abort the batch. The batch itself only fails on the
//! match-count ceiling or an internal error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use quarry_engine::error::MatchAbort;
use quarry_engine::matcher::{MatchContext, Searcher};
use quarry_engine::{Pattern, Template, planner};
use rayon::prelude::*;
use thiserror::Error;

use crate::apply::write_atomic;
use crate::cache::ParseCache;
use crate::progress::{ProgressEvent, ProgressReporter, Stage};

/// Resource ceilings for one run.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub per_file_timeout: Duration,
    pub global_timeout: Option<Duration>,
    pub max_matches: usize,
    pub progress_every: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            per_file_timeout: Duration::from_secs(60),
            global_timeout: None,
            max_matches: 1_000_000,
            progress_every: 10,
        }
    }
}

pub struct RunOptions {
    pub pattern: Pattern,
    pub template: Option<Template>,
    pub apply: bool,
    pub parallelism: Option<usize>,
    pub limits: Limits,
}

#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
    pub node: usize,
    pub matched_code: String,
    pub placeholders: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct FileError {
    pub file: PathBuf,
    pub error_type: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ReplacementRecord {
    pub file: PathBuf,
    pub line: usize,
    pub original_code: String,
    pub replacement_code: String,
}

#[derive(Debug, Clone)]
pub struct ApplicationRecord {
    pub file: PathBuf,
    pub replacements_applied: usize,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub matches: Vec<MatchRecord>,
    pub errors: Vec<FileError>,
    pub replacements: Vec<ReplacementRecord>,
    pub applications: Vec<ApplicationRecord>,
    pub dropped_overlaps: usize,
    pub cancelled: bool,
    pub total_files: usize,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("too many matches: {found} (limit {limit})")]
    TooManyMatches { found: usize, limit: usize },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Default)]
struct FileOutcome {
    matches: Vec<MatchRecord>,
    error: Option<FileError>,
    replacements: Vec<ReplacementRecord>,
    new_text: Option<(PathBuf, String, usize)>,
    dropped: usize,
}

pub fn run(
    files: Vec<PathBuf>,
    opts: &RunOptions,
    cancel: &AtomicBool,
    reporter: &ProgressReporter,
) -> Result<RunReport, RunError> {
    let total = files.len();
    reporter.emit(ProgressEvent::new(
        Stage::Loading,
        "loading and parsing files",
        total,
        0,
    ));

    let cache = ParseCache::new();
    let started = Instant::now();
    let global_deadline = opts.limits.global_timeout.map(|t| started + t);
    let processed = AtomicUsize::new(0);
    let match_count = AtomicUsize::new(0);

    reporter.emit(ProgressEvent::new(Stage::Searching, "searching", total, 0));
    let progress = reporter.sender();

    let worker = |path: &PathBuf| -> FileOutcome {
        let outcome = process_file(
            path,
            opts,
            &cache,
            cancel,
            global_deadline,
            &match_count,
        );
        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % opts.limits.progress_every == 0 || done == total {
            let _ = progress.send(ProgressEvent::new(
                Stage::Searching,
                format!("searched {done}/{total} files"),
                total,
                done,
            ));
        }
        outcome
    };

    let collect = || {
        files
            .par_iter()
            .fold(Vec::new, |mut acc, path| {
                acc.push(worker(path));
                acc
            })
            .reduce(Vec::new, |mut left, mut right| {
                left.append(&mut right);
                left
            })
    };
    let outcomes = match opts.parallelism {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .context("building worker pool")?
            .install(collect),
        None => collect(),
    };

    let found = match_count.load(Ordering::Relaxed);
    if found > opts.limits.max_matches {
        return Err(RunError::TooManyMatches {
            found,
            limit: opts.limits.max_matches,
        });
    }

    let mut report = RunReport {
        total_files: total,
        ..RunReport::default()
    };
    let mut pending_writes = Vec::new();
    for outcome in outcomes {
        report.matches.extend(outcome.matches);
        report.replacements.extend(outcome.replacements);
        report.dropped_overlaps += outcome.dropped;
        if let Some(err) = outcome.error {
            report.errors.push(err);
        }
        if let Some(write) = outcome.new_text {
            pending_writes.push(write);
        }
    }

    report
        .matches
        .sort_by(|a, b| (&a.file, a.start, a.end, a.node).cmp(&(&b.file, b.start, b.end, b.node)));
    report
        .matches
        .dedup_by(|a, b| (&a.file, a.start, a.end, a.node) == (&b.file, b.start, b.end, b.node));
    report.errors.sort_by(|a, b| a.file.cmp(&b.file));
    report
        .replacements
        .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    if opts.apply {
        pending_writes.sort_by(|a, b| a.0.cmp(&b.0));
        for (path, text, count) in pending_writes {
            // between-file cancellation: never start a write after cancel
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let result = write_atomic(&path, &text);
            report.applications.push(ApplicationRecord {
                file: path,
                replacements_applied: count,
                success: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            });
        }
    }

    report.cancelled = cancel.load(Ordering::Relaxed);
    reporter.emit(ProgressEvent::new(
        Stage::Complete,
        "complete",
        total,
        processed.load(Ordering::Relaxed),
    ));
    Ok(report)
}

fn process_file(
    path: &Path,
    opts: &RunOptions,
    cache: &ParseCache,
    cancel: &AtomicBool,
    global_deadline: Option<Instant>,
    match_count: &AtomicUsize,
) -> FileOutcome {
    let mut outcome = FileOutcome::default();
    if cancel.load(Ordering::Relaxed) {
        return outcome;
    }
    if global_deadline.is_some_and(|d| Instant::now() >= d) {
        outcome.error = Some(FileError {
            file: path.to_path_buf(),
            error_type: "Timeout",
            message: "global time budget exhausted before this file".into(),
        });
        return outcome;
    }

    let loaded = cache.load(path);
    let loaded = match loaded.as_ref() {
        Ok(loaded) => loaded,
        Err(err) => {
            outcome.error = Some(FileError {
                file: path.to_path_buf(),
                error_type: err.kind.error_type(),
                message: err.message.clone(),
            });
            return outcome;
        }
    };

    let mut deadline = Instant::now() + opts.limits.per_file_timeout;
    if let Some(global) = global_deadline {
        deadline = deadline.min(global);
    }
    let ctx = MatchContext {
        cancel: Some(cancel),
        deadline: Some(deadline),
    };
    let unit = &loaded.unit;
    let searcher = Searcher::new(&opts.pattern, unit, Some(&loaded.oracle));
    let matches = match searcher.find_all(&ctx) {
        Ok(matches) => matches,
        Err(MatchAbort::Cancelled) => return outcome,
        Err(MatchAbort::Timeout) => {
            outcome.error = Some(FileError {
                file: path.to_path_buf(),
                error_type: "Timeout",
                message: "file exceeded its time budget".into(),
            });
            return outcome;
        }
    };
    match_count.fetch_add(matches.len(), Ordering::Relaxed);

    for m in &matches {
        let (line, column) = unit.line_col(m.span.start);
        outcome.matches.push(MatchRecord {
            file: path.to_path_buf(),
            line,
            column,
            start: m.span.start,
            end: m.span.end,
            node: m.node.index(),
            matched_code: unit.surface(&m.span).to_string(),
            placeholders: m
                .bindings
                .iter()
                .map(|(name, capture)| (name.to_string(), capture.surface(unit)))
                .collect(),
        });
    }

    if let Some(template) = &opts.template {
        let plan = planner::plan(unit, &matches, template);
        outcome.dropped = plan.dropped.len();
        for span in &plan.dropped {
            tracing::info!(
                file = %path.display(),
                start = span.start,
                end = span.end,
                "dropped overlapping edit"
            );
        }
        for edit in &plan.edits {
            outcome.replacements.push(ReplacementRecord {
                file: path.to_path_buf(),
                line: unit.line_col(edit.start).0,
                original_code: unit.surface(&(edit.start..edit.end)).to_string(),
                replacement_code: edit.text.clone(),
            });
        }
        if opts.apply && !plan.edits.is_empty() {
            let buffer = planner::apply(&unit.text, &plan.edits);
            outcome.new_text = Some((path.to_path_buf(), buffer, plan.edits.len()));
        }
    }
    outcome
}
