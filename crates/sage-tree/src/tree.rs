//! Workflow tree
//!
//! Arena of [`WorkflowNode`]s keyed by [`NodeId`], plus root and active
//! pointers. Every mutation returns a new tree value; the node map is an
//! [`im::HashMap`], so old values share structure with new ones and stay
//! valid.
//!
//! Unknown ids never raise: they degrade to "no parent", "no change" or
//! `None`.

use crate::node::{NodeId, NodeSpec, WorkflowNode};
use crate::payload::{Snapshot, StepPayload};
use chrono::Utc;
use im::HashMap;
use serde::{Deserialize, Serialize};

/// Branchable tree of workflow steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTree {
    nodes: HashMap<NodeId, WorkflowNode>,
    root_id: Option<NodeId>,
    active_node_id: Option<NodeId>,
    next_seq: u64,
}

impl WorkflowTree {
    /// Create empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node ever created
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    /// Node currently being viewed
    #[inline]
    #[must_use]
    pub fn active_node_id(&self) -> Option<NodeId> {
        self.active_node_id
    }

    /// Active node record
    #[inline]
    #[must_use]
    pub fn active_node(&self) -> Option<&WorkflowNode> {
        self.active_node_id.as_ref().and_then(|id| self.nodes.get(id))
    }

    /// Look up a node
    #[inline]
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&WorkflowNode> {
        self.nodes.get(id)
    }

    /// Whether a node exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &WorkflowNode> + '_ {
        self.nodes.values()
    }

    /// Children of a node in insertion order
    #[must_use]
    pub fn children(&self, id: &NodeId) -> Vec<&WorkflowNode> {
        self.nodes
            .get(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parentless nodes, oldest first
    #[must_use]
    pub fn top_level(&self) -> Vec<&WorkflowNode> {
        let mut tops: Vec<_> = self.nodes.values().filter(|n| n.is_top_level()).collect();
        tops.sort_by_key(|n| n.recency());
        tops
    }

    /// Insert a new node and make it active
    ///
    /// Branch index rules:
    /// - under a known parent, linear: the parent's index
    /// - under a known parent, branch: one above the parent and every child
    ///   it already has
    /// - no known parent, branch: one above every index in the tree
    /// - otherwise 0
    ///
    /// An unknown `parent` is treated as no parent. A payload whose kind
    /// differs from `spec.kind` is dropped.
    #[must_use]
    pub fn add_node(
        &self,
        parent: Option<&NodeId>,
        is_branch: bool,
        spec: NodeSpec,
    ) -> (Self, NodeId) {
        let parent_node = parent.and_then(|id| self.nodes.get(id));
        if let (Some(requested), None) = (parent, parent_node) {
            tracing::warn!(parent = %requested, "unknown parent node, adding as top-level");
        }

        let branch_index = self.branch_index_for(parent_node, is_branch);
        let id = NodeId::new();

        let data = match spec.data {
            Some(payload) if payload.kind() != spec.kind => {
                tracing::warn!(
                    node_kind = %spec.kind,
                    payload_kind = %payload.kind(),
                    "payload kind mismatch, dropping node data"
                );
                None
            }
            other => other,
        };

        let node = WorkflowNode {
            id,
            kind: spec.kind,
            branch_index,
            parent_id: parent_node.map(|p| p.id),
            children: Vec::new(),
            data,
            snapshot: spec.snapshot,
            created_at: Utc::now(),
            seq: self.next_seq,
        };

        let mut next = self.clone();
        if let Some(parent_node) = parent_node {
            let mut updated = parent_node.clone();
            updated.children.push(id);
            next.nodes.insert(updated.id, updated);
        }
        next.nodes.insert(id, node);
        next.root_id = self.root_id.or(Some(id));
        next.active_node_id = Some(id);
        next.next_seq = self.next_seq + 1;

        tracing::debug!(
            node = %id,
            kind = %spec.kind,
            branch_index,
            parent = ?parent_node.map(|p| p.id),
            is_branch,
            "added workflow node"
        );

        (next, id)
    }

    /// Start an alternate path from an existing node
    ///
    /// A top-level source has no sibling level, so the new node becomes a
    /// linear child of the source. Any other source gets a new sibling under
    /// its parent with a fresh branch index. Returns `None` for an unknown
    /// source.
    #[must_use]
    pub fn create_branch_from_node(
        &self,
        source: &NodeId,
        spec: NodeSpec,
    ) -> Option<(Self, NodeId)> {
        let Some(source_node) = self.nodes.get(source) else {
            tracing::warn!(source = %source, "unknown branch source node");
            return None;
        };

        Some(match source_node.parent_id {
            None => self.add_node(Some(source), false, spec),
            Some(parent) => self.add_node(Some(&parent), true, spec),
        })
    }

    /// Make a node active; unknown ids leave the tree unchanged
    #[must_use]
    pub fn set_active_node(&self, id: &NodeId) -> Self {
        if !self.nodes.contains_key(id) {
            tracing::debug!(node = %id, "ignoring activation of unknown node");
            return self.clone();
        }
        let mut next = self.clone();
        next.active_node_id = Some(*id);
        next
    }

    /// Replace a node's snapshot; unknown ids leave the tree unchanged
    #[must_use]
    pub fn update_node_snapshot(&self, id: &NodeId, snapshot: Snapshot) -> Self {
        self.update_node(id, |node| node.snapshot = Some(snapshot))
    }

    /// Replace a node's data
    ///
    /// Unknown ids and payloads of a different kind leave the tree unchanged.
    #[must_use]
    pub fn update_node_data(&self, id: &NodeId, data: StepPayload) -> Self {
        match self.nodes.get(id) {
            Some(node) if node.kind != data.kind() => {
                tracing::warn!(
                    node = %id,
                    node_kind = %node.kind,
                    payload_kind = %data.kind(),
                    "payload kind mismatch, ignoring data update"
                );
                self.clone()
            }
            _ => self.update_node(id, |node| node.data = Some(data)),
        }
    }

    fn update_node(&self, id: &NodeId, f: impl FnOnce(&mut WorkflowNode)) -> Self {
        let Some(node) = self.nodes.get(id) else {
            tracing::debug!(node = %id, "ignoring update of unknown node");
            return self.clone();
        };
        let mut updated = node.clone();
        f(&mut updated);
        let mut next = self.clone();
        next.nodes.insert(*id, updated);
        next
    }

    fn branch_index_for(&self, parent: Option<&WorkflowNode>, is_branch: bool) -> u32 {
        match (parent, is_branch) {
            (Some(parent), false) => parent.branch_index,
            (Some(parent), true) => parent
                .children
                .iter()
                .filter_map(|child| self.nodes.get(child))
                .map(|child| child.branch_index)
                .fold(parent.branch_index, u32::max)
                .saturating_add(1),
            (None, true) => self
                .nodes
                .values()
                .map(|node| node.branch_index)
                .max()
                .unwrap_or(0)
                .saturating_add(1),
            (None, false) => 0,
        }
    }
}
