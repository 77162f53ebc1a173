// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
This crate is the core of quarry: structural search and replace over syntax
trees of curly-brace languages.

It provides APIs for parsing search patterns with typed, constrained holes,
matching them against front-end-supplied trees with capture and binding
consistency, and planning indentation-aware rewrites.

The engine never parses a target language itself. Front-ends hand it a
[`SourceUnit`] (text + arena tree + token stream) and optionally a
[`SemanticOracle`] for category and type questions.
*/

pub mod constraint;
pub mod error;
pub mod matcher;
pub mod oracle;
pub mod pattern;
pub mod planner;
pub mod template;
pub mod token;
pub mod tree;

pub use constraint::Constraint;
pub use error::{MatchAbort, PatternError, TemplateError};
pub use matcher::{Bindings, Capture, Match, MatchContext, Searcher};
pub use oracle::SemanticOracle;
pub use pattern::{HoleKind, Pattern, PatternNode, Placeholder};
pub use planner::{Edit, Plan};
pub use template::Template;
pub use token::{Token, TokenKind, tokenize};
pub use tree::{NodeId, SourceUnit, SyntaxTree, TreeBuilder};
