//! Structural consistency checks
//!
//! Tree operations never fail, so nothing here runs on the mutation path.
//! [`WorkflowTree::validate`] is for tests and diagnostics.

use crate::node::NodeId;
use crate::tree::WorkflowTree;
use std::collections::HashSet;

/// A broken structural invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeViolation {
    /// Root pointer names a missing node
    #[error("root {0} does not exist")]
    MissingRoot(NodeId),

    /// Root has a parent
    #[error("root {0} has a parent")]
    RootHasParent(NodeId),

    /// Active pointer names a missing node
    #[error("active node {0} does not exist")]
    MissingActive(NodeId),

    /// Child list names a missing node
    #[error("{parent} lists missing child {child}")]
    MissingChild { parent: NodeId, child: NodeId },

    /// Child list names a node with a different parent
    #[error("{parent} lists {child} whose parent is {actual:?}")]
    ForeignChild {
        parent: NodeId,
        child: NodeId,
        actual: Option<NodeId>,
    },

    /// Parent pointer names a missing node
    #[error("{child} points at missing parent {parent}")]
    MissingParent { child: NodeId, parent: NodeId },

    /// Parent does not list the child
    #[error("{parent} does not list child {child}")]
    UnlistedChild { parent: NodeId, child: NodeId },

    /// Child id appears more than once in a child list
    #[error("{parent} lists {child} more than once")]
    DuplicateChild { parent: NodeId, child: NodeId },

    /// Child sits on a lower branch than its parent
    #[error("{child} has branch index {child_index} below parent index {parent_index}")]
    BranchIndexRegression {
        child: NodeId,
        child_index: u32,
        parent_index: u32,
    },

    /// Parent chain loops
    #[error("cycle through {0}")]
    Cycle(NodeId),

    /// Stored data belongs to another step kind
    #[error("{0} carries data of another step kind")]
    DataKindMismatch(NodeId),
}

impl WorkflowTree {
    /// Check every structural invariant, returning all violations found
    #[must_use]
    pub fn validate(&self) -> Vec<TreeViolation> {
        let mut violations = Vec::new();

        if let Some(root) = self.root_id() {
            match self.node(&root) {
                None => violations.push(TreeViolation::MissingRoot(root)),
                Some(node) if node.parent_id.is_some() => {
                    violations.push(TreeViolation::RootHasParent(root));
                }
                Some(_) => {}
            }
        }

        if let Some(active) = self.active_node_id() {
            if !self.contains(&active) {
                violations.push(TreeViolation::MissingActive(active));
            }
        }

        for node in self.nodes() {
            if node.data.as_ref().is_some_and(|d| d.kind() != node.kind) {
                violations.push(TreeViolation::DataKindMismatch(node.id));
            }

            let mut listed = HashSet::new();
            for child_id in &node.children {
                if !listed.insert(*child_id) {
                    violations.push(TreeViolation::DuplicateChild {
                        parent: node.id,
                        child: *child_id,
                    });
                    continue;
                }
                match self.node(child_id) {
                    None => violations.push(TreeViolation::MissingChild {
                        parent: node.id,
                        child: *child_id,
                    }),
                    Some(child) if child.parent_id != Some(node.id) => {
                        violations.push(TreeViolation::ForeignChild {
                            parent: node.id,
                            child: *child_id,
                            actual: child.parent_id,
                        });
                    }
                    Some(child) if child.branch_index < node.branch_index => {
                        violations.push(TreeViolation::BranchIndexRegression {
                            child: child.id,
                            child_index: child.branch_index,
                            parent_index: node.branch_index,
                        });
                    }
                    Some(_) => {}
                }
            }

            if let Some(parent_id) = node.parent_id {
                match self.node(&parent_id) {
                    None => violations.push(TreeViolation::MissingParent {
                        child: node.id,
                        parent: parent_id,
                    }),
                    Some(parent) if !parent.children.contains(&node.id) => {
                        violations.push(TreeViolation::UnlistedChild {
                            parent: parent_id,
                            child: node.id,
                        });
                    }
                    Some(_) => {}
                }
            }

            if self.has_cycle_from(&node.id) {
                violations.push(TreeViolation::Cycle(node.id));
            }
        }

        violations
    }

    fn has_cycle_from(&self, id: &NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(*id);
        while let Some(cur) = current {
            if !seen.insert(cur) {
                return true;
            }
            current = self.node(&cur).and_then(|n| n.parent_id);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;
    use crate::step::StepKind;

    #[test]
    fn empty_tree_is_valid() {
        assert!(WorkflowTree::new().validate().is_empty());
    }

    #[test]
    fn built_tree_is_valid() {
        let (t, a) = WorkflowTree::new().add_node(None, false, NodeSpec::new(StepKind::Papers));
        let (t, b) = t.add_node(Some(&a), false, NodeSpec::new(StepKind::Method));
        let (t, _) = t.create_branch_from_node(&b, NodeSpec::new(StepKind::Method)).unwrap();
        let (t, _) = t.add_node(None, true, NodeSpec::new(StepKind::Papers));
        assert_eq!(t.validate(), Vec::new());
    }

    #[test]
    fn corrupted_tree_reports_violations() {
        let (t, a) = WorkflowTree::new().add_node(None, false, NodeSpec::new(StepKind::Papers));
        let (t, b) = t.add_node(Some(&a), false, NodeSpec::new(StepKind::Method));

        // Serialize, strip the child link, and reload.
        let mut value = serde_json::to_value(&t).unwrap();
        value["nodes"][a.to_string()]["children"] = serde_json::json!([]);
        let broken: WorkflowTree = serde_json::from_value(value).unwrap();

        assert_eq!(
            broken.validate(),
            vec![TreeViolation::UnlistedChild { parent: a, child: b }]
        );
    }
}
