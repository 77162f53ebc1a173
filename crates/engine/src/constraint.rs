// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constraints attached to placeholders.
//!
//! Every constraint is a predicate over a captured value. They are compiled
//! once at pattern-parse time and shared immutably between workers.

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::oracle::SemanticOracle;
use crate::token::{canonical_text, tokenize};
use crate::tree::{NodeId, SourceUnit};

/// A predicate a captured value must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// The whole captured text (canonical form) must match the regex.
    Regex(RegexPredicate),
    /// The oracle-inferred type of the captured node must equal this simple
    /// name. Unsatisfiable without an oracle or a node-shaped capture.
    Type { name: String },
    /// Bounds on the length of a captured argument list. `None` bounds are
    /// unbounded. Only valid on `args` placeholders; the pattern parser
    /// rejects it elsewhere.
    Count {
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Canonical text equality, optionally case-folded.
    Exact { text: String, ignore_case: bool },
}

/// A compiled regex that remembers its source pattern. The pattern is
/// implicitly anchored: `regex=temp.*` means the whole capture looks like
/// `temp.*`, not that it merely contains a match.
#[derive(Debug, Clone)]
pub struct RegexPredicate {
    pattern: String,
    re: Regex,
}

impl RegexPredicate {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            re,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl PartialEq for RegexPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Serialize for RegexPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

/// The shape of a captured value as seen by `validate`.
pub struct Candidate<'a> {
    /// Canonical text of the capture; comma-joined canonical element texts
    /// for argument lists.
    pub canonical: &'a str,
    /// Set when the capture is exactly one syntax node.
    pub node: Option<NodeId>,
    /// Set when the capture is an argument list.
    pub list_len: Option<usize>,
}

impl Constraint {
    /// Build an `Exact` constraint, canonicalizing the comparison text so
    /// that whitespace differences in the pattern do not matter.
    #[must_use]
    pub fn exact_match(raw: &str, ignore_case: bool) -> Self {
        Self::Exact {
            text: canonical_text(&tokenize(raw)),
            ignore_case,
        }
    }

    /// Keyword used in pattern syntax, for diagnostics.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Regex(_) => "regex",
            Self::Type { .. } => "type",
            Self::Count { .. } => "count",
            Self::Exact { .. } => "exact",
        }
    }

    /// Whether `cand` satisfies this constraint. Missing information (no
    /// oracle for `type=`, no list for `count=`) fails rather than passes.
    pub fn validate(
        &self,
        cand: &Candidate<'_>,
        unit: &SourceUnit,
        oracle: Option<&dyn SemanticOracle>,
    ) -> bool {
        match self {
            Self::Regex(pred) => pred.re.is_match(cand.canonical),
            Self::Type { name } => match (oracle, cand.node) {
                (Some(oracle), Some(node)) => {
                    oracle.resolve_type(unit, node).as_deref() == Some(name)
                }
                _ => false,
            },
            Self::Count { min, max } => cand.list_len.is_some_and(|len| {
                min.is_none_or(|lo| len >= lo) && max.is_none_or(|hi| len <= hi)
            }),
            Self::Exact { text, ignore_case } => {
                if *ignore_case {
                    cand.canonical.eq_ignore_ascii_case(text)
                } else {
                    cand.canonical == text
                }
            }
        }
    }
}
