// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The semantic oracle interface.
//!
//! The engine never parses the target language and never does type
//! inference. Everything it wants to know about the *meaning* of a node it
//! asks through this trait; positional questions (spans, tokens, surface
//! text) are answered by [`SourceUnit`](crate::tree::SourceUnit) directly.
//!
//! The oracle is optional at every call site. Without one, only `any`-kind
//! placeholders pass kind checks and `type=` constraints reject the match -
//! missing information never silently passes.

use crate::tree::{NodeId, SourceUnit};

/// Answers syntactic-category and type questions about nodes.
///
/// Implementations must be pure and thread-safe: the matcher calls them from
/// worker threads with shared references.
pub trait SemanticOracle: Send + Sync {
    /// The inferred type name of a node, if known. Simple names only
    /// (`"int"`, not `"System.Int32"`).
    fn resolve_type(&self, unit: &SourceUnit, node: NodeId) -> Option<String>;

    fn is_expression(&self, unit: &SourceUnit, node: NodeId) -> bool;

    fn is_statement(&self, unit: &SourceUnit, node: NodeId) -> bool;

    fn is_identifier(&self, unit: &SourceUnit, node: NodeId) -> bool;

    fn is_type_ref(&self, unit: &SourceUnit, node: NodeId) -> bool;

    /// Whether the node is a member-access selector (`recv.member`).
    fn is_member_selector(&self, unit: &SourceUnit, node: NodeId) -> bool;

    /// The ordered argument nodes if `node` is an argument list (or a node,
    /// like a call, that directly owns one). `None` for everything else.
    fn arguments_of(&self, unit: &SourceUnit, node: NodeId) -> Option<Vec<NodeId>>;
}
