// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result rendering: the stable JSON contract and the human text form.
//!
//! Results always go to stdout; progress and diagnostics go to stderr.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::orchestrator::RunReport;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport {
    match_count: usize,
    matches: Vec<JsonMatch>,
    errors: Vec<JsonError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacements: Option<Vec<JsonReplacement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_results: Option<Vec<JsonApplication>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMatch {
    file_path: String,
    line: usize,
    column: usize,
    matched_code: String,
    placeholders: BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonError {
    file_path: String,
    error_type: String,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReplacement {
    file_path: String,
    line: usize,
    original_code: String,
    replacement_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonApplication {
    file_path: String,
    replacements_applied: usize,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Serialize the report to the stable JSON contract. `replace_mode` adds
/// `replacements`; `apply_mode` adds `applicationResults`.
pub fn render_json(report: &RunReport, replace_mode: bool, apply_mode: bool) -> String {
    let json = JsonReport {
        match_count: report.matches.len(),
        matches: report
            .matches
            .iter()
            .map(|m| JsonMatch {
                file_path: m.file.display().to_string(),
                line: m.line,
                column: m.column,
                matched_code: m.matched_code.clone(),
                placeholders: m.placeholders.clone(),
            })
            .collect(),
        errors: report
            .errors
            .iter()
            .map(|e| JsonError {
                file_path: e.file.display().to_string(),
                error_type: e.error_type.to_string(),
                message: e.message.clone(),
            })
            .collect(),
        replacements: replace_mode.then(|| {
            report
                .replacements
                .iter()
                .map(|r| JsonReplacement {
                    file_path: r.file.display().to_string(),
                    line: r.line,
                    original_code: r.original_code.clone(),
                    replacement_code: r.replacement_code.clone(),
                })
                .collect()
        }),
        application_results: apply_mode.then(|| {
            report
                .applications
                .iter()
                .map(|a| JsonApplication {
                    file_path: a.file.display().to_string(),
                    replacements_applied: a.replacements_applied,
                    success: a.success,
                    error: a.error.clone(),
                })
                .collect()
        }),
    };
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
}

/// Human-readable rendering.
pub fn render_text(report: &RunReport, replace_mode: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} match(es):", report.matches.len());
    for m in &report.matches {
        let _ = writeln!(out, "{}:{}:{}", m.file.display(), m.line, m.column);
        let _ = writeln!(out, "  {}", m.matched_code);
        if !m.placeholders.is_empty() {
            let _ = writeln!(out, "  Placeholders:");
            for (name, value) in &m.placeholders {
                let _ = writeln!(out, "    {name} = {value}");
            }
        }
    }

    if replace_mode && !report.replacements.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} replacement(s):", report.replacements.len());
        for r in &report.replacements {
            let _ = writeln!(out, "{}:{}", r.file.display(), r.line);
            let _ = writeln!(out, "  - {}", r.original_code);
            let _ = writeln!(out, "  + {}", r.replacement_code);
        }
    }
    if report.dropped_overlaps > 0 {
        let _ = writeln!(
            out,
            "note: {} overlapping edit(s) dropped",
            report.dropped_overlaps
        );
    }

    if !report.applications.is_empty() {
        let _ = writeln!(out);
        for a in &report.applications {
            if a.success {
                let _ = writeln!(
                    out,
                    "applied {} replacement(s) to {}",
                    a.replacements_applied,
                    a.file.display()
                );
            } else {
                let _ = writeln!(
                    out,
                    "failed to apply to {}: {}",
                    a.file.display(),
                    a.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} error(s):", report.errors.len());
        for e in &report.errors {
            let _ = writeln!(out, "{}: {}: {}", e.file.display(), e.error_type, e.message);
        }
    }
    if report.cancelled {
        let _ = writeln!(out, "cancelled; results are partial");
    }
    out
}
