// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Search pattern parsing.
//!
//! A pattern is ordinary source text with named holes:
//!
//! ```text
//! Console.WriteLine($arg$)
//! $v:id=regex=temp.*$ = $val$
//! string.Format($args:args=count=2-$)
//! ```
//!
//! A hole is `$NAME$`, optionally `$NAME:KIND$`, optionally with a
//! `=CONSTRAINT,...` tail. `$$` writes a literal dollar. The parser produces
//! both the surface [`PatternNode`] list (spans and all, for tooling) and a
//! compiled segment list the matcher consumes: literal fragments are
//! pre-tokenized so whitespace differences never matter at match time.
//!
//! Two holes with nothing but whitespace between them are refused outright:
//! there is no principled way to split the tokens between them.

use std::ops::Range;

use serde::Serialize;

use crate::constraint::{Constraint, RegexPredicate};
use crate::error::PatternError;
use crate::token::{Token, tokenize};

/// The syntactic category a hole binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HoleKind {
    Expression,
    Identifier,
    Statement,
    Type,
    Member,
    Arguments,
    Any,
}

impl HoleKind {
    fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "expr" => Self::Expression,
            "id" => Self::Identifier,
            "stmt" => Self::Statement,
            "type" => Self::Type,
            "member" => Self::Member,
            "args" => Self::Arguments,
            "any" => Self::Any,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Expression => "expr",
            Self::Identifier => "id",
            Self::Statement => "stmt",
            Self::Type => "type",
            Self::Member => "member",
            Self::Arguments => "args",
            Self::Any => "any",
        }
    }
}

/// A named hole with its kind and constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placeholder {
    pub name: String,
    pub kind: HoleKind,
    pub constraints: Vec<Constraint>,
    pub span: Range<usize>,
}

impl Placeholder {
    /// `$_$` matches like any hole but is never captured and is exempt from
    /// binding consistency.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name == "_"
    }
}

/// One surface element of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternNode {
    Literal { text: String, span: Range<usize> },
    Placeholder(Placeholder),
}

/// Compiled element consumed by the matcher.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    /// A pre-tokenized literal fragment. Never empty.
    Literal(Vec<Token>),
    /// Index into [`Pattern::holes`].
    Hole(usize),
}

/// A parsed, compiled search pattern. Immutable and shared across workers.
#[derive(Debug, Clone, Serialize)]
pub struct Pattern {
    source: String,
    nodes: Vec<PatternNode>,
    holes: Vec<Placeholder>,
    #[serde(skip)]
    segments: Vec<Segment>,
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Pattern {
    pub fn parse(src: &str) -> Result<Self, PatternError> {
        let nodes = parse_nodes(src)?;
        let (holes, segments) = compile(&nodes)?;
        Ok(Self {
            source: src.to_string(),
            nodes,
            holes,
            segments,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    #[must_use]
    pub fn holes(&self) -> &[Placeholder] {
        &self.holes
    }

    /// Whether a replacement template may refer to `name`.
    #[must_use]
    pub fn captures_hole(&self, name: &str) -> bool {
        name != "_" && self.holes.iter().any(|h| h.name == name)
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `Some` when the whole pattern is one hole, the unification fast path.
    pub(crate) fn as_single_hole(&self) -> Option<&Placeholder> {
        match self.segments.as_slice() {
            [Segment::Hole(i)] => Some(&self.holes[*i]),
            _ => None,
        }
    }
}

fn parse_nodes(src: &str) -> Result<Vec<PatternNode>, PatternError> {
    fn flush(lit: &mut String, start: usize, end: usize, nodes: &mut Vec<PatternNode>) {
        if !lit.is_empty() {
            nodes.push(PatternNode::Literal {
                text: std::mem::take(lit),
                span: start..end,
            });
        }
    }

    let mut nodes = Vec::new();
    let mut lit = String::new();
    let mut lit_start = 0;
    let mut i = 0;

    while i < src.len() {
        let Some(off) = src[i..].find('$') else {
            if lit.is_empty() {
                lit_start = i;
            }
            lit.push_str(&src[i..]);
            i = src.len();
            break;
        };
        if off > 0 {
            if lit.is_empty() {
                lit_start = i;
            }
            lit.push_str(&src[i..i + off]);
            i += off;
        }
        // i is now at a '$'
        if src[i + 1..].starts_with('$') {
            if lit.is_empty() {
                lit_start = i;
            }
            lit.push('$');
            i += 2;
            continue;
        }
        flush(&mut lit, lit_start, i, &mut nodes);
        let (ph, next) = parse_placeholder(src, i)?;
        nodes.push(PatternNode::Placeholder(ph));
        i = next;
    }
    flush(&mut lit, lit_start, i, &mut nodes);
    Ok(nodes)
}

/// Parse one `$NAME(:KIND)?(=CONSTRAINTS)?$` starting at the `$` at `start`.
/// Returns the placeholder and the offset just past the closing `$`.
fn parse_placeholder(src: &str, start: usize) -> Result<(Placeholder, usize), PatternError> {
    let bytes = src.as_bytes();
    let mut i = start + 1;

    let name_start = i;
    if i < bytes.len() && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
        i += 1;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
    }
    let name = &src[name_start..i];
    if name.is_empty() {
        // distinguish "ran off the end" from "bad first character"
        if i >= bytes.len() {
            return Err(PatternError::UnterminatedPlaceholder(start));
        }
        return Err(PatternError::EmptyName(start));
    }

    let mut kind = HoleKind::Expression;
    let mut constraints = Vec::new();
    if i < bytes.len() && bytes[i] == b':' {
        i += 1;
        let kw_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
            i += 1;
        }
        let kw = &src[kw_start..i];
        match HoleKind::from_keyword(kw) {
            Some(parsed) => kind = parsed,
            // `$v:regex=...$` - a constraint keyword right after the colon
            // is a constraint list on the default kind
            None if CONSTRAINT_KEYWORDS.contains(&kw) && bytes.get(i) == Some(&b'=') => {
                let tail_end = scan_constraint_tail(src, kw_start)
                    .ok_or(PatternError::UnterminatedPlaceholder(start))?;
                constraints = parse_constraints(&src[kw_start..tail_end])?;
                i = tail_end;
            }
            None => return Err(PatternError::UnknownKind(kw.to_string())),
        }
    }

    if constraints.is_empty() && i < bytes.len() && bytes[i] == b'=' {
        i += 1;
        let tail_start = i;
        let tail_end = scan_constraint_tail(src, i)
            .ok_or(PatternError::UnterminatedPlaceholder(start))?;
        constraints = parse_constraints(&src[tail_start..tail_end])?;
        i = tail_end;
    }

    if i >= bytes.len() {
        return Err(PatternError::UnterminatedPlaceholder(start));
    }
    if bytes[i] != b'$' {
        return Err(PatternError::UnterminatedPlaceholder(start));
    }
    i += 1;

    Ok((
        Placeholder {
            name: name.to_string(),
            kind,
            constraints,
            span: start..i,
        },
        i,
    ))
}

const CONSTRAINT_KEYWORDS: &[&str] = &["regex", "type", "count", "exact"];

/// Find the unquoted `$` that closes a constraint tail starting at `from`.
fn scan_constraint_tail(src: &str, from: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    let mut in_quote = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'"' => in_quote = !in_quote,
            b'$' if !in_quote => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn parse_constraints(tail: &str) -> Result<Vec<Constraint>, PatternError> {
    split_top_level(tail)
        .into_iter()
        .map(|item| parse_one_constraint(item.trim()))
        .collect()
}

/// Split on commas that are not inside a quoted string.
fn split_top_level(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut part_start = 0;
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'"' => in_quote = !in_quote,
            b',' if !in_quote => {
                parts.push(&s[part_start..i]);
                part_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&s[part_start..]);
    parts
}

fn parse_one_constraint(item: &str) -> Result<Constraint, PatternError> {
    let Some((key, value)) = item.split_once('=') else {
        return Err(PatternError::UnknownConstraint(item.to_string()));
    };
    match key {
        "regex" => Ok(Constraint::Regex(RegexPredicate::new(value)?)),
        "type" => Ok(Constraint::Type {
            name: value.trim().to_string(),
        }),
        "count" => parse_count(value.trim()),
        "exact" => parse_exact(value.trim()),
        other => Err(PatternError::UnknownConstraint(other.to_string())),
    }
}

/// `count=3` is exact; `count=MIN-MAX` with either bound optional.
fn parse_count(raw: &str) -> Result<Constraint, PatternError> {
    let malformed = || PatternError::MalformedCount(raw.to_string());
    let parse_bound = |s: &str| -> Result<Option<usize>, PatternError> {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse().map(Some).map_err(|_| malformed())
        }
    };
    let (min, max) = if let Some((lo, hi)) = raw.split_once('-') {
        (parse_bound(lo)?, parse_bound(hi)?)
    } else {
        let n = parse_bound(raw)?;
        if n.is_none() {
            return Err(malformed());
        }
        (n, n)
    };
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(malformed());
        }
    }
    Ok(Constraint::Count { min, max })
}

/// `exact="TEXT"` with `\"` and `\\` escapes; a trailing `i` folds case.
fn parse_exact(raw: &str) -> Result<Constraint, PatternError> {
    let malformed = |why: &str| PatternError::MalformedExact(why.to_string());
    let bytes = raw.as_bytes();
    if bytes.first() != Some(&b'"') {
        return Err(malformed("expected a double-quoted string"));
    }
    let mut text = String::new();
    let mut i = 1;
    loop {
        match bytes.get(i) {
            None => return Err(malformed("unterminated string")),
            Some(b'"') => {
                i += 1;
                break;
            }
            Some(b'\\') => match bytes.get(i + 1) {
                Some(b'"') => {
                    text.push('"');
                    i += 2;
                }
                Some(b'\\') => {
                    text.push('\\');
                    i += 2;
                }
                _ => return Err(malformed("unknown escape")),
            },
            Some(_) => {
                // advance one full char, the text may be non-ascii
                let ch = raw[i..].chars().next().expect("in bounds");
                text.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    let ignore_case = match &raw[i..] {
        "" => false,
        "i" => true,
        other => return Err(malformed(&format!("trailing `{other}` after string"))),
    };
    Ok(Constraint::exact_match(&text, ignore_case))
}

/// Lower surface nodes to matcher segments and check pattern invariants.
fn compile(nodes: &[PatternNode]) -> Result<(Vec<Placeholder>, Vec<Segment>), PatternError> {
    let mut holes: Vec<Placeholder> = Vec::new();
    let mut segments = Vec::new();
    for node in nodes {
        match node {
            PatternNode::Literal { text, .. } => {
                let toks = tokenize(text);
                if !toks.is_empty() {
                    segments.push(Segment::Literal(toks));
                }
            }
            PatternNode::Placeholder(ph) => {
                check_constraint_kinds(ph)?;
                if let Some(Segment::Hole(prev)) = segments.last() {
                    return Err(PatternError::AmbiguousAdjacentPlaceholders(
                        holes[*prev].name.clone(),
                        ph.name.clone(),
                    ));
                }
                holes.push(ph.clone());
                segments.push(Segment::Hole(holes.len() - 1));
            }
        }
    }
    Ok((holes, segments))
}

fn check_constraint_kinds(ph: &Placeholder) -> Result<(), PatternError> {
    for c in &ph.constraints {
        let compatible = match c {
            Constraint::Count { .. } => ph.kind == HoleKind::Arguments,
            Constraint::Type { .. } => ph.kind != HoleKind::Arguments,
            Constraint::Regex(_) | Constraint::Exact { .. } => true,
        };
        if !compatible {
            return Err(PatternError::ConstraintIncompatibleWithKind {
                constraint: c.keyword(),
                kind: ph.kind.keyword().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn hole(p: &Pattern, i: usize) -> &Placeholder {
        &p.holes()[i]
    }

    #[test]
    fn test_literal_and_hole() {
        let p = Pattern::parse("Console.WriteLine($arg$)").unwrap();
        assert_eq!(p.holes().len(), 1);
        assert_eq!(hole(&p, 0).name, "arg");
        assert_eq!(hole(&p, 0).kind, HoleKind::Expression);
        assert_eq!(p.nodes().len(), 3);
    }

    #[test]
    fn test_kind_keywords() {
        for (kw, kind) in [
            ("expr", HoleKind::Expression),
            ("id", HoleKind::Identifier),
            ("stmt", HoleKind::Statement),
            ("type", HoleKind::Type),
            ("member", HoleKind::Member),
            ("args", HoleKind::Arguments),
            ("any", HoleKind::Any),
        ] {
            let p = Pattern::parse(&format!("$h:{kw}$")).unwrap();
            assert_eq!(hole(&p, 0).kind, kind, "kind {kw}");
        }
    }

    #[test]
    fn test_dollar_escape() {
        let p = Pattern::parse("cost$$ + $x$").unwrap();
        match &p.nodes()[0] {
            PatternNode::Literal { text, .. } => assert_eq!(text, "cost$ + "),
            PatternNode::Placeholder(_) => panic!("expected literal"),
        }
    }

    #[test]
    fn test_constraints_parse() {
        let p = Pattern::parse("$a:args=count=1-3$").unwrap();
        assert_eq!(
            hole(&p, 0).constraints,
            vec![Constraint::Count {
                min: Some(1),
                max: Some(3)
            }]
        );
        let p = Pattern::parse("$v=regex=temp.*$").unwrap();
        assert_eq!(hole(&p, 0).constraints.len(), 1);
        // a constraint keyword after the colon also reads as a constraint
        let p = Pattern::parse("$v:regex=temp.*$").unwrap();
        assert_eq!(hole(&p, 0).kind, HoleKind::Expression);
        assert_eq!(hole(&p, 0).constraints.len(), 1);
        let p = Pattern::parse("$t=type=int$").unwrap();
        assert_eq!(
            hole(&p, 0).constraints,
            vec![Constraint::Type { name: "int".into() }]
        );
    }

    #[test]
    fn test_multiple_constraints() {
        let p = Pattern::parse(r#"$v=regex=t.*,exact="tx"i$"#).unwrap();
        assert_eq!(hole(&p, 0).constraints.len(), 2);
    }

    #[test]
    fn test_exact_escapes() {
        let p = Pattern::parse(r#"$v=exact="say \"hi\" \\ now"$"#).unwrap();
        match &hole(&p, 0).constraints[0] {
            Constraint::Exact { text, ignore_case } => {
                assert!(text.contains(r#""hi""#));
                assert!(!ignore_case);
            }
            other => panic!("expected exact, got {other:?}"),
        }
    }

    #[test]
    fn test_count_forms() {
        for (spec, min, max) in [
            ("3", Some(3), Some(3)),
            ("1-", Some(1), None),
            ("-5", None, Some(5)),
            ("2-4", Some(2), Some(4)),
        ] {
            let p = Pattern::parse(&format!("$a:args=count={spec}$")).unwrap();
            assert_eq!(
                hole(&p, 0).constraints,
                vec![Constraint::Count { min, max }],
                "spec {spec}"
            );
        }
    }

    #[test]
    fn test_error_unterminated() {
        assert!(matches!(
            Pattern::parse("f($arg"),
            Err(PatternError::UnterminatedPlaceholder(2))
        ));
    }

    #[test]
    fn test_error_empty_name() {
        assert!(matches!(
            Pattern::parse("f($:expr$)"),
            Err(PatternError::EmptyName(_))
        ));
        // digit-led names are not identifier-like
        assert!(matches!(
            Pattern::parse("f($1x$)"),
            Err(PatternError::EmptyName(_))
        ));
    }

    #[test]
    fn test_error_unknown_kind() {
        assert!(matches!(
            Pattern::parse("$x:wibble$"),
            Err(PatternError::UnknownKind(k)) if k == "wibble"
        ));
    }

    #[test]
    fn test_error_malformed_count() {
        assert!(matches!(
            Pattern::parse("$a:args=count=x$"),
            Err(PatternError::MalformedCount(_))
        ));
        assert!(matches!(
            Pattern::parse("$a:args=count=5-2$"),
            Err(PatternError::MalformedCount(_))
        ));
    }

    #[test]
    fn test_error_count_needs_args() {
        assert!(matches!(
            Pattern::parse("$x=count=2$"),
            Err(PatternError::ConstraintIncompatibleWithKind { constraint: "count", .. })
        ));
    }

    #[test]
    fn test_error_type_on_args() {
        assert!(matches!(
            Pattern::parse("$x:args=type=int$"),
            Err(PatternError::ConstraintIncompatibleWithKind { constraint: "type", .. })
        ));
    }

    #[test]
    fn test_error_bad_regex() {
        assert!(matches!(
            Pattern::parse("$x=regex=(unclosed$"),
            Err(PatternError::RegexCompile(_))
        ));
    }

    #[test]
    fn test_error_adjacent_holes() {
        assert!(matches!(
            Pattern::parse("$a$$b$"),
            Err(PatternError::AmbiguousAdjacentPlaceholders(a, b)) if a == "a" && b == "b"
        ));
        // whitespace between holes does not separate them: it lexes to nothing
        assert!(matches!(
            Pattern::parse("$a$  $b$"),
            Err(PatternError::AmbiguousAdjacentPlaceholders(..))
        ));
    }

    #[test]
    fn test_repeated_names_allowed() {
        let p = Pattern::parse("$x$ + $x$").unwrap();
        assert_eq!(p.holes().len(), 2);
        assert_eq!(hole(&p, 0).name, hole(&p, 1).name);
    }

    #[test]
    fn test_spans_monotonic() {
        let p = Pattern::parse("foo($a$, $b$) + bar($$)").unwrap();
        let mut last = 0;
        for node in p.nodes() {
            let span = match node {
                PatternNode::Literal { span, .. } => span,
                PatternNode::Placeholder(ph) => &ph.span,
            };
            assert!(span.start >= last);
            assert!(span.end >= span.start);
            last = span.start;
        }
    }

    #[test]
    fn test_anonymous_hole() {
        let p = Pattern::parse("f($_$)").unwrap();
        assert!(hole(&p, 0).is_anonymous());
        assert!(!p.captures_hole("_"));
    }

    #[test]
    fn test_equality_and_serialization() {
        let a = Pattern::parse("f($x$)").unwrap();
        let b = Pattern::parse("f($x$)").unwrap();
        assert_eq!(a, b);
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("nodes").is_some());
    }
}
