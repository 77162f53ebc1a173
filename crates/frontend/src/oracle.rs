// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic oracle for the demo language.
//!
//! Categories are read straight off node labels. Types come from a single
//! forward pass over the declarations of one file: literals type themselves,
//! `var` locals take the type of their initializer when it is known, typed
//! declarations take their declared type. Scoping is flat; the demo language
//! has no shadowing worth modelling.

use std::collections::HashMap;

use quarry_engine::oracle::SemanticOracle;
use quarry_engine::tree::{NodeId, SourceUnit};

const EXPRESSION_LABELS: &[&str] = &[
    "assign", "binary", "unary", "call", "member", "paren", "ident", "number", "string", "bool",
];
const STATEMENT_LABELS: &[&str] = &[
    "var_decl",
    "expr_stmt",
    "return_stmt",
    "if_stmt",
    "while_stmt",
    "block",
];

/// Per-file oracle. Build one with [`DemoOracle::for_unit`] after parsing.
#[derive(Debug, Clone, Default)]
pub struct DemoOracle {
    local_types: HashMap<String, String>,
}

impl DemoOracle {
    #[must_use]
    pub fn for_unit(unit: &SourceUnit) -> Self {
        let mut local_types = HashMap::new();
        for node in unit.tree.preorder() {
            if unit.tree.label(node) != "var_decl" {
                continue;
            }
            let children: Vec<_> = unit.tree.children(node).collect();
            let declared = children
                .iter()
                .find(|c| unit.tree.label(**c) == "type_ref")
                .map(|c| unit.surface(&unit.tree.span(*c)).to_string());
            let Some(declarator) = children
                .iter()
                .find(|c| unit.tree.label(**c) == "declarator")
            else {
                continue;
            };
            let parts: Vec<_> = unit.tree.children(*declarator).collect();
            let Some(name_node) = parts.first() else {
                continue;
            };
            let name = unit.surface(&unit.tree.span(*name_node)).to_string();
            let inferred = declared.or_else(|| {
                parts
                    .get(1)
                    .and_then(|init| self_type(&local_types, unit, *init))
            });
            if let Some(ty) = inferred {
                local_types.insert(name, ty);
            }
        }
        Self { local_types }
    }
}

/// Type of an expression node, given the locals known so far.
fn self_type(
    locals: &HashMap<String, String>,
    unit: &SourceUnit,
    node: NodeId,
) -> Option<String> {
    match unit.tree.label(node) {
        "number" => Some("int".to_string()),
        "string" => Some("string".to_string()),
        "bool" => Some("bool".to_string()),
        "ident" => locals.get(unit.surface(&unit.tree.span(node))).cloned(),
        "paren" => {
            let inner = unit.tree.children(node).next()?;
            self_type(locals, unit, inner)
        }
        _ => None,
    }
}

impl SemanticOracle for DemoOracle {
    fn resolve_type(&self, unit: &SourceUnit, node: NodeId) -> Option<String> {
        self_type(&self.local_types, unit, node)
    }

    fn is_expression(&self, unit: &SourceUnit, node: NodeId) -> bool {
        EXPRESSION_LABELS.contains(&unit.tree.label(node))
    }

    fn is_statement(&self, unit: &SourceUnit, node: NodeId) -> bool {
        STATEMENT_LABELS.contains(&unit.tree.label(node))
    }

    fn is_identifier(&self, unit: &SourceUnit, node: NodeId) -> bool {
        unit.tree.label(node) == "ident"
    }

    fn is_type_ref(&self, unit: &SourceUnit, node: NodeId) -> bool {
        unit.tree.label(node) == "type_ref"
    }

    fn is_member_selector(&self, unit: &SourceUnit, node: NodeId) -> bool {
        unit.tree.label(node) == "member"
    }

    fn arguments_of(&self, unit: &SourceUnit, node: NodeId) -> Option<Vec<NodeId>> {
        (unit.tree.label(node) == "arg_list").then(|| unit.tree.children(node).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse_source;

    fn oracle_and_unit(src: &str) -> (DemoOracle, SourceUnit) {
        let unit = parse_source("t.brace", src).expect("parses");
        (DemoOracle::for_unit(&unit), unit)
    }

    fn node_labeled(unit: &SourceUnit, label: &str) -> NodeId {
        unit.tree
            .preorder()
            .find(|n| unit.tree.label(*n) == label)
            .expect("node exists")
    }

    #[test]
    fn test_literal_types() {
        let (oracle, unit) = oracle_and_unit("f(1, \"s\", true);");
        assert_eq!(
            oracle.resolve_type(&unit, node_labeled(&unit, "number")),
            Some("int".into())
        );
        assert_eq!(
            oracle.resolve_type(&unit, node_labeled(&unit, "string")),
            Some("string".into())
        );
        assert_eq!(
            oracle.resolve_type(&unit, node_labeled(&unit, "bool")),
            Some("bool".into())
        );
    }

    #[test]
    fn test_var_inference_and_propagation() {
        let (oracle, unit) = oracle_and_unit("var x = 1; var y = x; f(y);");
        // the `y` in f(y)
        let uses: Vec<_> = unit
            .tree
            .preorder()
            .filter(|n| unit.tree.label(*n) == "ident" && unit.surface(&unit.tree.span(*n)) == "y")
            .collect();
        let last_use = *uses.last().unwrap();
        assert_eq!(oracle.resolve_type(&unit, last_use), Some("int".into()));
    }

    #[test]
    fn test_declared_type_wins() {
        let (oracle, unit) = oracle_and_unit("long x = 1; f(x);");
        let use_site = node_labeled(&unit, "call");
        let arg = unit
            .tree
            .preorder()
            .filter(|n| unit.tree.label(*n) == "ident")
            .find(|n| unit.tree.span(*n).start > unit.tree.span(use_site).start)
            .unwrap();
        assert_eq!(oracle.resolve_type(&unit, arg), Some("long".into()));
    }

    #[test]
    fn test_categories() {
        let (oracle, unit) = oracle_and_unit("a.b(x);");
        assert!(oracle.is_member_selector(&unit, node_labeled(&unit, "member")));
        assert!(oracle.is_expression(&unit, node_labeled(&unit, "call")));
        assert!(oracle.is_statement(&unit, node_labeled(&unit, "expr_stmt")));
        assert!(oracle.is_identifier(&unit, node_labeled(&unit, "ident")));
        assert!(!oracle.is_expression(&unit, node_labeled(&unit, "file")));
    }

    #[test]
    fn test_arguments_only_for_arg_lists() {
        let (oracle, unit) = oracle_and_unit("f(1, 2);");
        let args = oracle
            .arguments_of(&unit, node_labeled(&unit, "arg_list"))
            .unwrap();
        assert_eq!(args.len(), 2);
        assert!(oracle.arguments_of(&unit, node_labeled(&unit, "call")).is_none());
    }
}
