//! Generic parse tree handed over by the external CSV Schema parser.
//!
//! A node is a grammar rule tag plus its ordered children; each child is
//! either a terminal token (raw source text) or another node. The tree is
//! serde-enabled so a parser living in another process can ship it as JSON:
//!
//! ```json
//! { "tag": "is_expr", "children": [
//!     { "tag": "string_provider", "children": ["\"abc\""] } ] }
//! ```

use crate::Span;
use serde::{Deserialize, Serialize};

/// A tagged parse node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseNode {
    pub tag: String,
    #[serde(default)]
    pub children: Vec<ParseChild>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// One child of a [`ParseNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParseChild {
    Token(String),
    Node(ParseNode),
}

impl ParseNode {
    pub fn new(tag: impl Into<String>, children: Vec<ParseChild>) -> Self {
        Self {
            tag: tag.into(),
            children,
            span: None,
        }
    }

    /// A node with no children, e.g. `empty_expr` or `optional_directive`.
    pub fn leaf(tag: impl Into<String>) -> Self {
        Self::new(tag, Vec::new())
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl ParseChild {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token(text.into())
    }
}

impl From<ParseNode> for ParseChild {
    fn from(node: ParseNode) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for ParseChild {
    fn from(text: &str) -> Self {
        Self::Token(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_json_shape() {
        let tree = ParseNode::new(
            "is_expr",
            vec![ParseNode::new("string_provider", vec!["\"abc\"".into()]).into()],
        );
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            json,
            r#"{"tag":"is_expr","children":[{"tag":"string_provider","children":["\"abc\""]}]}"#
        );
        let back: ParseNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_leaf_without_children_field() {
        let node: ParseNode = serde_json::from_str(r#"{"tag":"empty_expr"}"#).unwrap();
        assert_eq!(node, ParseNode::leaf("empty_expr"));
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_span_is_carried() {
        let node: ParseNode = serde_json::from_str(
            r#"{"tag":"uri_expr","span":{"line":3,"column":5,"end_line":3,"end_column":8}}"#,
        )
        .unwrap();
        assert_eq!(node.span, Some(Span::new(3, 5, 3, 8)));
    }
}
