// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replacement template parsing.
//!
//! The replacement side mirrors the pattern syntax but is much simpler: a
//! template is literal text with `$NAME$` references back to holes captured
//! by the search pattern. No kinds, no constraints; `$$` writes a dollar.

use serde::Serialize;

use crate::error::TemplateError;
use crate::pattern::Pattern;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePart {
    Text(String),
    Hole(String),
}

/// A parsed replacement template, validated against its search pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    source: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    /// Parse a template and check every hole reference against `pattern`.
    pub fn for_pattern(src: &str, pattern: &Pattern) -> Result<Self, TemplateError> {
        let template = Self::parse(src)?;
        for part in &template.parts {
            if let TemplatePart::Hole(name) = part {
                if !pattern.captures_hole(name) {
                    return Err(TemplateError::UnknownHole(name.clone()));
                }
            }
        }
        Ok(template)
    }

    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let bytes = src.as_bytes();
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;
        while i < src.len() {
            let Some(off) = src[i..].find('$') else {
                text.push_str(&src[i..]);
                break;
            };
            text.push_str(&src[i..i + off]);
            i += off;
            if src[i + 1..].starts_with('$') {
                text.push('$');
                i += 2;
                continue;
            }
            let start = i;
            let mut j = i + 1;
            if j < bytes.len() && (bytes[j].is_ascii_alphabetic() || bytes[j] == b'_') {
                j += 1;
                while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                    j += 1;
                }
            }
            let name = &src[start + 1..j];
            if name.is_empty() {
                return Err(if j >= bytes.len() {
                    TemplateError::UnterminatedPlaceholder(start)
                } else {
                    TemplateError::EmptyName(start)
                });
            }
            if bytes.get(j) != Some(&b'$') {
                return Err(TemplateError::UnterminatedPlaceholder(start));
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            parts.push(TemplatePart::Hole(name.to_string()));
            i = j + 1;
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(Self {
            source: src.to_string(),
            parts,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parts() {
        let t = Template::parse("log.info($a$)").unwrap();
        assert_eq!(
            t.parts(),
            &[
                TemplatePart::Text("log.info(".into()),
                TemplatePart::Hole("a".into()),
                TemplatePart::Text(")".into()),
            ]
        );
    }

    #[test]
    fn test_dollar_escape() {
        let t = Template::parse("costs $$$n$").unwrap();
        assert_eq!(
            t.parts(),
            &[
                TemplatePart::Text("costs $".into()),
                TemplatePart::Hole("n".into()),
            ]
        );
    }

    #[test]
    fn test_unknown_hole_rejected() {
        let p = Pattern::parse("f($a$)").unwrap();
        assert!(Template::for_pattern("g($a$)", &p).is_ok());
        assert!(matches!(
            Template::for_pattern("g($b$)", &p),
            Err(TemplateError::UnknownHole(name)) if name == "b"
        ));
    }

    #[test]
    fn test_anonymous_hole_not_referenceable() {
        let p = Pattern::parse("f($_$)").unwrap();
        assert!(matches!(
            Template::for_pattern("g($_$)", &p),
            Err(TemplateError::UnknownHole(_))
        ));
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            Template::parse("g($a"),
            Err(TemplateError::UnterminatedPlaceholder(2))
        ));
    }
}
