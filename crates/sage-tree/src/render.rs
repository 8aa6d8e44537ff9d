//! Plain-text outline of a workflow tree

use crate::node::WorkflowNode;
use crate::tree::WorkflowTree;
use std::fmt::Write;

/// Render the tree as an indented outline
///
/// One line per node: kind, branch index, short id, and `*` on the active
/// node. Top-level nodes appear oldest first; children in insertion order.
#[must_use]
pub fn outline(tree: &WorkflowTree) -> String {
    let mut out = String::new();
    for top in tree.top_level() {
        write_node(tree, top, 0, &mut out);
    }
    out
}

fn write_node(tree: &WorkflowTree, node: &WorkflowNode, depth: usize, out: &mut String) {
    let marker = if tree.active_node_id() == Some(node.id) { " *" } else { "" };
    let _ = writeln!(
        out,
        "{:indent$}{} [b{}] {}{}",
        "",
        node.kind,
        node.branch_index,
        node.id.short(),
        marker,
        indent = depth * 2
    );
    for child in tree.children(&node.id) {
        write_node(tree, child, depth + 1, out);
    }
}
