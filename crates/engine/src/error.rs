// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the engine.
//!
//! Pattern and template errors are fatal to a run and are reported before any
//! file is opened. [`MatchAbort`] is the only way a search can stop early;
//! a pattern that simply does not match a node is a normal outcome, not an
//! error.

use thiserror::Error;

/// Errors raised while parsing a search pattern.
///
/// All of these are structural: the parser never panics on user input.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A `$` opened a placeholder that never closed.
    #[error("unterminated placeholder starting at offset {0}")]
    UnterminatedPlaceholder(usize),

    /// `$$` escapes a dollar; `$...$` with nothing identifier-like inside is rejected.
    #[error("placeholder at offset {0} has an empty name")]
    EmptyName(usize),

    /// The `:KIND` tail named a kind that does not exist.
    #[error("unknown placeholder kind `{0}` (expected expr, id, stmt, type, member, args or any)")]
    UnknownKind(String),

    /// `count=` did not parse as `N`, `MIN-`, `-MAX` or `MIN-MAX`.
    #[error("malformed count constraint `{0}`")]
    MalformedCount(String),

    /// `exact=` was not a double-quoted string with `\"` and `\\` escapes.
    #[error("malformed exact constraint: {0}")]
    MalformedExact(String),

    /// A constraint keyword the grammar does not know.
    #[error("unknown constraint `{0}`")]
    UnknownConstraint(String),

    /// The `regex=` pattern failed to compile.
    #[error("invalid regex in constraint: {0}")]
    RegexCompile(#[from] regex::Error),

    /// For example `count=` on a non-`args` placeholder.
    #[error("constraint `{constraint}` cannot apply to placeholder kind `{kind}`")]
    ConstraintIncompatibleWithKind { constraint: &'static str, kind: String },

    /// Two placeholders with no literal text between them. There is no
    /// principled way to split the captured tokens, so the pattern is refused.
    #[error("placeholders `${0}$` and `${1}$` are adjacent with no text between them")]
    AmbiguousAdjacentPlaceholders(String, String),
}

/// Errors raised while parsing or validating a replacement template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at offset {0}")]
    UnterminatedPlaceholder(usize),

    #[error("placeholder at offset {0} has an empty name")]
    EmptyName(usize),

    /// The template refers to a hole the search pattern does not capture.
    /// The anonymous hole `$_$` is never captured and cannot be referenced.
    #[error("replacement refers to `${0}$` which is not captured by the search pattern")]
    UnknownHole(String),
}

/// Why a search over one file stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchAbort {
    /// The shared cancellation token was set.
    #[error("search cancelled")]
    Cancelled,

    /// The per-file (or global) deadline passed.
    #[error("search timed out")]
    Timeout,
}
