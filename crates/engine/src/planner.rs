// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replacement planning: template expansion, indentation reflow, overlap
//! resolution and edit application.
//!
//! The planner turns matches plus a template into a set of non-overlapping
//! [`Edit`]s per file. It never writes files; it returns the edited buffer
//! and leaves I/O to the caller.
//!
//! Overlapping edits are resolved leftmost/outermost-wins: edits are sorted
//! by start ascending then end descending, and any edit starting inside a
//! kept edit is dropped and reported. Rejecting the whole batch instead
//! would punish every match for one nested pair.

use std::ops::Range;

use crate::matcher::Match;
use crate::template::{Template, TemplatePart};
use crate::tree::SourceUnit;

/// One textual replacement. Half-open byte interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Whitespace prefix of the line the match starts on.
    pub base_indent: String,
}

/// The planner's output for one file: kept edits (sorted, pairwise
/// non-overlapping) and the spans of matches dropped for overlapping them.
#[derive(Debug, Default)]
pub struct Plan {
    pub edits: Vec<Edit>,
    pub dropped: Vec<Range<usize>>,
}

/// Expand `template` for one match, substituting captured surface text.
/// The result is unindented; [`plan`] applies the reflow.
#[must_use]
pub fn expand(template: &Template, m: &Match, unit: &SourceUnit) -> String {
    let mut out = String::new();
    for part in template.parts() {
        match part {
            TemplatePart::Text(text) => out.push_str(text),
            TemplatePart::Hole(name) => {
                if let Some(capture) = m.bindings.get(name) {
                    out.push_str(&capture.surface(unit));
                }
            }
        }
    }
    out
}

/// Plan edits for all matches of one file.
#[must_use]
pub fn plan(unit: &SourceUnit, matches: &[Match], template: &Template) -> Plan {
    let mut edits: Vec<Edit> = matches
        .iter()
        .map(|m| {
            let base_indent = unit.line_indent(m.span.start).to_string();
            let text = reindent(&expand(template, m, unit), &base_indent);
            Edit {
                start: m.span.start,
                end: m.span.end,
                text,
                base_indent,
            }
        })
        .collect();
    edits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut plan = Plan::default();
    let mut kept_end = 0;
    for edit in edits {
        if !plan.edits.is_empty() && edit.start < kept_end {
            plan.dropped.push(edit.start..edit.end);
        } else {
            kept_end = edit.end;
            plan.edits.push(edit);
        }
    }
    plan
}

/// Prefix every line after the first with the match's base indentation.
/// Tabs and spaces are taken as found; no re-tabification.
fn reindent(text: &str, base_indent: &str) -> String {
    if base_indent.is_empty() || !text.contains('\n') {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let mut out = String::with_capacity(text.len());
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push_str(base_indent);
        out.push_str(line);
    }
    out
}

/// Apply a plan's edits to the file buffer. Edits are applied in reverse
/// start order so earlier offsets stay valid.
#[must_use]
pub fn apply(text: &str, edits: &[Edit]) -> String {
    let mut buf = text.to_string();
    for edit in edits.iter().rev() {
        buf.replace_range(edit.start..edit.end, &edit.text);
    }
    buf
}

