/*! Solidity text to source AST.
 *
 * tree-sitter does the parsing; this module only walks the concrete syntax tree and builds the
 * serde-friendly [`SourceUnit`] the IR builder consumes. Syntax errors are scoped as tightly as
 * the tree allows: a contract whose subtree contains an error node is kept with `parse_error`
 * set, so its siblings in the same file still translate.
 */

mod expressions;
mod statements;
mod structural;

use crate::errors::{Result, TranspileError};
use solmove_core::source::SourceUnit;
use tracing::debug;
use tree_sitter::{Node, Parser};

pub fn parse_solidity(path: &str, source: &str) -> Result<SourceUnit> {
    let mut parser = Parser::new();
    let language = tree_sitter_solidity::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| TranspileError::Parse {
            line: 0,
            column: 0,
            message: format!("failed to load the Solidity grammar: {}", e),
        })?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| TranspileError::Parse {
            line: 0,
            column: 0,
            message: "parser produced no tree".to_string(),
        })?;

    let root = tree.root_node();
    let lowerer = Lowerer::new(source);
    let mut unit = SourceUnit::new(path);
    lowerer.source_file(root, &mut unit);

    let attributed = unit.contracts.iter().any(|c| c.parse_error.is_some());
    if root.has_error() && !attributed {
        let (line, column, message) = lowerer.error_location(root);
        return Err(TranspileError::Parse {
            line,
            column,
            message,
        });
    }
    debug!(
        path,
        contracts = unit.contracts.len(),
        "parsed Solidity source"
    );
    Ok(unit)
}

/// Converts CST nodes into source AST values. Stateless apart from the source text.
pub(crate) struct Lowerer<'s> {
    source: &'s str,
}

impl<'s> Lowerer<'s> {
    fn new(source: &'s str) -> Self {
        Self { source }
    }

    pub(super) fn text(&self, node: Node) -> &'s str {
        &self.source[node.byte_range()]
    }

    pub(super) fn line(&self, node: Node) -> usize {
        node.start_position().row + 1
    }

    /// Line, column and a short message for the first error or missing node under `node`.
    pub(super) fn error_location(&self, node: Node) -> (usize, usize, String) {
        match first_error(node) {
            Some(bad) => {
                let pos = bad.start_position();
                let message = if bad.is_missing() {
                    format!("missing {}", bad.kind())
                } else {
                    let snippet: String = self.text(bad).chars().take(40).collect();
                    format!("unexpected `{}`", snippet.trim())
                };
                (pos.row + 1, pos.column + 1, message)
            }
            None => {
                let pos = node.start_position();
                (pos.row + 1, pos.column + 1, "syntax error".to_string())
            }
        }
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}

/// First of several alternative field names; grammar revisions disagree on a few of them.
pub(super) fn field<'t>(node: Node<'t>, names: &[&str]) -> Option<Node<'t>> {
    names.iter().find_map(|n| node.child_by_field_name(n))
}

/// Like [`field`], but skips keyword tokens sharing the field name (`else` in `if` statements).
pub(super) fn named_field<'t>(node: Node<'t>, names: &[&str]) -> Option<Node<'t>> {
    names.iter().find_map(|n| {
        let mut cursor = node.walk();
        let found = node
            .children_by_field_name(n, &mut cursor)
            .find(|c| c.is_named() && c.kind() != "comment");
        found
    })
}

pub(super) fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

pub(super) fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Strips the `expression` / `statement` / `call_argument` wrapper layers.
pub(super) fn unwrap_node(mut node: Node) -> Node {
    while matches!(node.kind(), "expression" | "statement" | "call_argument") {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

#[cfg(test)]
mod tests;
