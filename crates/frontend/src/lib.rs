// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Demo front-end for quarry.

The engine is front-end-agnostic; this crate supplies the collaborator it
needs to run end-to-end: a parser for a deliberately small statically-typed
curly-brace language ("brace", extension `.brace`), producing the engine's
[`SourceUnit`](quarry_engine::SourceUnit) bundle, plus a [`DemoOracle`]
answering the engine's category and type questions.

The language covers just enough surface to exercise every engine feature:
`var` and typed declarations, `if`/`while`/`return`/blocks, C-precedence
binary operators, calls, member access chains and literals.
*/

mod oracle;
mod parser;

pub use oracle::DemoOracle;
pub use parser::{ParseError, parse_source};

/// File extension handled by this front-end.
pub const FILE_EXTENSION: &str = "brace";
