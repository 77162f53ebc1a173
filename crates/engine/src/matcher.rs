// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural matching of patterns against syntax trees.
//!
//! [`Searcher::find_all`] attempts a unification of the pattern at every
//! node of the target tree, in pre-order. Unification has two shapes:
//!
//! - a pattern that is one bare hole unifies against the node itself
//!   (kind check, then constraints, then binding);
//! - a mixed pattern unifies against the node's token extent, anchored at
//!   both ends: literal fragments must appear in order and each hole
//!   greedily captures the longest token span that still lets the rest of
//!   the pattern match.
//!
//! A capture must make structural sense: its span may not cross a node
//! boundary, may not contain a top-level `;` (unless the hole is `stmt` or
//! `any` kinded), and may be empty only for `args` holes. Repeated hole
//! names must capture canonically equal text. None of these failures is an
//! error; they just mean "no match here". The only ways a search stops
//! early are the cancellation token and the deadline.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::constraint::Candidate;
use crate::error::MatchAbort;
use crate::oracle::SemanticOracle;
use crate::pattern::{HoleKind, Pattern, Placeholder, Segment};
use crate::token::Token;
use crate::tree::{NodeId, SourceUnit};

/// How often (in visited nodes) the searcher polls cancellation and the
/// deadline.
pub const CANCEL_POLL_STRIDE: usize = 4096;

/// Shared cancellation token and deadline for one search.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchContext<'a> {
    pub cancel: Option<&'a AtomicBool>,
    pub deadline: Option<Instant>,
}

impl MatchContext<'_> {
    fn poll(&self) -> Result<(), MatchAbort> {
        if let Some(cancel) = self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(MatchAbort::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(MatchAbort::Timeout);
            }
        }
        Ok(())
    }
}

/// A value captured by one hole.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// The capture is exactly one syntax node.
    Node { id: NodeId, span: Range<usize> },
    /// A token span that tiles node boundaries but is not a single node.
    Span { span: Range<usize> },
    /// An ordered argument list. `span` covers the captured tokens,
    /// trailing comma included if one was written.
    List { ids: Vec<NodeId>, span: Range<usize> },
}

impl Capture {
    #[must_use]
    pub fn span(&self) -> &Range<usize> {
        match self {
            Self::Node { span, .. } | Self::Span { span } | Self::List { span, .. } => span,
        }
    }

    /// The capture as it appears in the source. Argument lists render as
    /// the comma-joined element surfaces, which drops any trailing comma.
    #[must_use]
    pub fn surface(&self, unit: &SourceUnit) -> String {
        match self {
            Self::Node { span, .. } | Self::Span { span } => unit.surface(span).to_string(),
            Self::List { ids, .. } => ids
                .iter()
                .map(|id| unit.surface(&unit.tree.span(*id)))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Single-spaced canonical text, used for binding equality and
    /// constraint checks. Lists normalize their separators and drop any
    /// trailing comma.
    #[must_use]
    pub fn canonical(&self, unit: &SourceUnit) -> String {
        match self {
            Self::Node { span, .. } | Self::Span { span } => unit.canonical(span),
            Self::List { ids, .. } => ids
                .iter()
                .map(|id| unit.canonical(&unit.tree.span(*id)))
                .collect::<Vec<_>>()
                .join(" , "),
        }
    }

    fn node(&self) -> Option<NodeId> {
        match self {
            Self::Node { id, .. } => Some(*id),
            _ => None,
        }
    }

    fn list_len(&self) -> Option<usize> {
        match self {
            Self::List { ids, .. } => Some(ids.len()),
            _ => None,
        }
    }
}

/// Name-to-capture map produced by a successful unification. Immutable once
/// the match is constructed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings(BTreeMap<String, Capture>);

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capture> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Capture)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bind `ph` to `capture`, or check consistency against an existing
    /// binding of the same name. The anonymous hole binds nothing.
    fn unify(
        &mut self,
        ph: &Placeholder,
        capture: Capture,
        unit: &SourceUnit,
    ) -> Result<(), UnifyFailure> {
        if ph.is_anonymous() {
            return Ok(());
        }
        if let Some(existing) = self.0.get(&ph.name) {
            if existing.canonical(unit) == capture.canonical(unit) {
                Ok(())
            } else {
                Err(UnifyFailure::BindingConflict(ph.name.clone()))
            }
        } else {
            self.0.insert(ph.name.clone(), capture);
            Ok(())
        }
    }
}

/// One reported match: the node unification anchored at, the matched byte
/// span, and the captured bindings.
#[derive(Debug, Clone)]
pub struct Match {
    pub node: NodeId,
    pub span: Range<usize>,
    pub bindings: Bindings,
}

/// Why one unification attempt failed. Used only for trace diagnostics;
/// every variant means "no match at this node", not an error.
#[derive(Debug)]
enum UnifyFailure {
    KindMismatch,
    MissingOracle,
    ConstraintFailed(&'static str),
    BindingConflict(String),
    StatementBoundary,
    Misaligned,
    EmptyCapture,
    NotArgumentList,
    NoFit,
}

/// Matches one pattern against one file. Cheap to construct; all referenced
/// data is borrowed and immutable.
pub struct Searcher<'a> {
    pattern: &'a Pattern,
    unit: &'a SourceUnit,
    oracle: Option<&'a dyn SemanticOracle>,
}

impl<'a> Searcher<'a> {
    #[must_use]
    pub fn new(
        pattern: &'a Pattern,
        unit: &'a SourceUnit,
        oracle: Option<&'a dyn SemanticOracle>,
    ) -> Self {
        Self {
            pattern,
            unit,
            oracle,
        }
    }

    /// All matches in pre-order. Sub-matches of other matches are reported
    /// too; overlap policy belongs to the caller.
    pub fn find_all(&self, ctx: &MatchContext<'_>) -> Result<Vec<Match>, MatchAbort> {
        let mut out = Vec::new();
        for (visited, node) in self.unit.tree.preorder().enumerate() {
            if visited % CANCEL_POLL_STRIDE == 0 {
                ctx.poll()?;
            }
            if let Some(m) = self.try_match(node) {
                out.push(m);
            }
        }
        Ok(out)
    }

    fn try_match(&self, node: NodeId) -> Option<Match> {
        let attempt = if let Some(ph) = self.pattern.as_single_hole() {
            self.unify_single_hole(node, ph)
        } else {
            self.unify_sequence(node)
        };
        match attempt {
            Ok((bindings, span)) => Some(Match {
                node,
                span,
                bindings,
            }),
            Err(reason) => {
                tracing::trace!(node = node.index(), ?reason, "unification failed");
                None
            }
        }
    }

    /// Case 1: the whole pattern is one hole. Kind check against the node,
    /// then constraints, then binding.
    fn unify_single_hole(
        &self,
        node: NodeId,
        ph: &Placeholder,
    ) -> Result<(Bindings, Range<usize>), UnifyFailure> {
        let span = self.unit.tree.span(node);
        let capture = if ph.kind == HoleKind::Arguments {
            let oracle = self.oracle.ok_or(UnifyFailure::MissingOracle)?;
            let ids = oracle
                .arguments_of(self.unit, node)
                .ok_or(UnifyFailure::NotArgumentList)?;
            Capture::List {
                ids,
                span: span.clone(),
            }
        } else {
            if !self.node_kind_ok(ph.kind, node)? {
                return Err(UnifyFailure::KindMismatch);
            }
            Capture::Node {
                id: node,
                span: span.clone(),
            }
        };
        let mut bindings = Bindings::new();
        self.check_constraints_and_bind(ph, capture, &mut bindings)?;
        Ok((bindings, span))
    }

    /// Case 2: mixed literals and holes, matched against the node's token
    /// extent, anchored at both ends.
    fn unify_sequence(&self, node: NodeId) -> Result<(Bindings, Range<usize>), UnifyFailure> {
        let node_span = self.unit.tree.span(node);
        let toks = self.unit.tokens_in(&node_span);
        if toks.is_empty() {
            return Err(UnifyFailure::NoFit);
        }
        // defer to the deepest node with this token extent: a wrapper whose
        // only child covers the same tokens would produce the same match twice
        let extent = toks[0].span.start..toks[toks.len() - 1].span.end;
        for child in self.unit.tree.children(node) {
            let cs = self.unit.tree.span(child);
            if cs.start <= extent.start && extent.end <= cs.end {
                return Err(UnifyFailure::NoFit);
            }
        }
        let mut bindings = Bindings::new();
        self.match_segments(
            self.pattern.segments(),
            toks,
            toks[0].span.start,
            &mut bindings,
        )?;
        let span = toks[0].span.start..toks[toks.len() - 1].span.end;
        Ok((bindings, span))
    }

    /// Anchored tokenwise unification. `pos` is the byte offset of the
    /// current match position, used to place empty captures.
    fn match_segments(
        &self,
        segs: &[Segment],
        toks: &[Token],
        pos: usize,
        bindings: &mut Bindings,
    ) -> Result<(), UnifyFailure> {
        let Some((seg, rest)) = segs.split_first() else {
            return if toks.is_empty() {
                Ok(())
            } else {
                Err(UnifyFailure::NoFit)
            };
        };
        match seg {
            Segment::Literal(lits) => {
                if !literal_matches_at(lits, toks) {
                    return Err(UnifyFailure::NoFit);
                }
                let consumed = &toks[..lits.len()];
                let next_pos = consumed.last().map_or(pos, |t| t.span.end);
                self.match_segments(rest, &toks[lits.len()..], next_pos, bindings)
            }
            Segment::Hole(idx) => {
                let ph = &self.pattern.holes()[*idx];
                let Some(Segment::Literal(lits)) = rest.first() else {
                    // trailing hole captures to the end of the extent
                    return self.bind_capture(ph, toks, pos, bindings);
                };
                // greedy: longest capture first, backtrack on failure
                let max_take = toks.len().saturating_sub(lits.len());
                let mut last_failure = UnifyFailure::NoFit;
                for take in (0..=max_take).rev() {
                    if !literal_matches_at(lits, &toks[take..]) {
                        continue;
                    }
                    let mut attempt = bindings.clone();
                    let outcome = self
                        .bind_capture(ph, &toks[..take], pos, &mut attempt)
                        .and_then(|()| {
                            let next_pos = toks[take + lits.len() - 1].span.end;
                            self.match_segments(
                                &rest[1..],
                                &toks[take + lits.len()..],
                                next_pos,
                                &mut attempt,
                            )
                        });
                    match outcome {
                        Ok(()) => {
                            *bindings = attempt;
                            return Ok(());
                        }
                        Err(failure) => last_failure = failure,
                    }
                }
                Err(last_failure)
            }
        }
    }

    /// Validate a hole's captured token span and record the binding.
    /// This is the `KindCheck -> ConstraintCheck -> BindingUnify` leg of the
    /// unification state machine for sequence holes.
    fn bind_capture(
        &self,
        ph: &Placeholder,
        toks: &[Token],
        anchor: usize,
        bindings: &mut Bindings,
    ) -> Result<(), UnifyFailure> {
        if toks.is_empty() && ph.kind != HoleKind::Arguments {
            return Err(UnifyFailure::EmptyCapture);
        }
        let span = if toks.is_empty() {
            anchor..anchor
        } else {
            toks[0].span.start..toks[toks.len() - 1].span.end
        };
        // a hole never spans a statement boundary unless it binds statements
        if !matches!(ph.kind, HoleKind::Statement | HoleKind::Any)
            && contains_top_level_semicolon(toks)
        {
            return Err(UnifyFailure::StatementBoundary);
        }
        if !toks.is_empty() && self.unit.tree.crosses_any_node(&span) {
            return Err(UnifyFailure::Misaligned);
        }

        let capture = if ph.kind == HoleKind::Arguments {
            let ids = self.resolve_argument_list(&span)?;
            Capture::List { ids, span }
        } else if let Some(id) = self.exact_node(&span) {
            if !self.node_kind_ok_lenient(ph.kind, id)? {
                return Err(UnifyFailure::KindMismatch);
            }
            Capture::Node { id, span }
        } else {
            // multi-node spans cannot satisfy single-node kinds
            if matches!(
                ph.kind,
                HoleKind::Identifier | HoleKind::Type | HoleKind::Member
            ) {
                return Err(UnifyFailure::KindMismatch);
            }
            Capture::Span { span }
        };
        self.check_constraints_and_bind(ph, capture, bindings)
    }

    fn check_constraints_and_bind(
        &self,
        ph: &Placeholder,
        capture: Capture,
        bindings: &mut Bindings,
    ) -> Result<(), UnifyFailure> {
        if !ph.constraints.is_empty() {
            let canonical = capture.canonical(self.unit);
            let candidate = Candidate {
                canonical: &canonical,
                node: capture.node(),
                list_len: capture.list_len(),
            };
            for constraint in &ph.constraints {
                if !constraint.validate(&candidate, self.unit, self.oracle) {
                    return Err(UnifyFailure::ConstraintFailed(constraint.keyword()));
                }
            }
        }
        bindings.unify(ph, capture, self.unit)
    }

    /// Strict category check used when the pattern is a single hole: the
    /// node must be of the hole's kind, and every kind except `any` needs
    /// the oracle to vouch for it.
    fn node_kind_ok(&self, kind: HoleKind, node: NodeId) -> Result<bool, UnifyFailure> {
        if kind == HoleKind::Any {
            return Ok(true);
        }
        let oracle = self.oracle.ok_or(UnifyFailure::MissingOracle)?;
        Ok(match kind {
            HoleKind::Expression => oracle.is_expression(self.unit, node),
            HoleKind::Identifier => oracle.is_identifier(self.unit, node),
            HoleKind::Statement => oracle.is_statement(self.unit, node),
            HoleKind::Type => oracle.is_type_ref(self.unit, node),
            HoleKind::Member => oracle.is_member_selector(self.unit, node),
            HoleKind::Arguments | HoleKind::Any => true,
        })
    }

    /// Category check for sequence captures that landed exactly on a node.
    /// Only the single-node kinds are enforced here: broad kinds stay
    /// textual so that, for example, an `expr` hole between call parens can
    /// capture a whole argument list.
    fn node_kind_ok_lenient(&self, kind: HoleKind, node: NodeId) -> Result<bool, UnifyFailure> {
        match kind {
            HoleKind::Identifier | HoleKind::Type | HoleKind::Member => {
                self.node_kind_ok(kind, node)
            }
            _ => Ok(true),
        }
    }

    /// The deepest node whose span is exactly `span`, if any.
    fn exact_node(&self, span: &Range<usize>) -> Option<NodeId> {
        let id = self.unit.tree.covering(span);
        (self.unit.tree.span(id) == *span).then_some(id)
    }

    /// Map a captured span to the argument nodes it covers, by walking up
    /// from the covering node until something owns an argument list.
    fn resolve_argument_list(&self, span: &Range<usize>) -> Result<Vec<NodeId>, UnifyFailure> {
        let oracle = self.oracle.ok_or(UnifyFailure::MissingOracle)?;
        let mut id = self.unit.tree.covering(span);
        loop {
            if let Some(args) = oracle.arguments_of(self.unit, id) {
                let within = |arg: &NodeId| {
                    let s = self.unit.tree.span(*arg);
                    span.start <= s.start && s.end <= span.end
                };
                return Ok(args.into_iter().filter(within).collect());
            }
            match self.unit.tree.parent(id) {
                Some(parent) => id = parent,
                None => return Err(UnifyFailure::NotArgumentList),
            }
        }
    }
}

fn literal_matches_at(lits: &[Token], toks: &[Token]) -> bool {
    toks.len() >= lits.len() && lits.iter().zip(toks).all(|(l, t)| l.text == t.text)
}

/// Whether the tokens contain a `;` outside all brackets.
fn contains_top_level_semicolon(toks: &[Token]) -> bool {
    let mut depth = 0usize;
    for tok in toks {
        match tok.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            ";" if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

