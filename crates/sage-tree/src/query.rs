//! Read-only queries over a [`WorkflowTree`]

use crate::node::{NodeId, WorkflowNode};
use crate::payload::StepData;
use crate::step::StepKind;
use crate::tree::WorkflowTree;
use std::collections::HashSet;

impl WorkflowTree {
    /// Ids from `id` up to its top-level ancestor, self first
    ///
    /// Empty for unknown ids.
    #[must_use]
    pub fn path_to_root(&self, id: &NodeId) -> Vec<NodeId> {
        self.ancestry(id).map(|node| node.id).collect()
    }

    /// Effective data for every step kind visible from a node
    ///
    /// Walks self, parent, grandparent and so on, keeping the first payload
    /// found for each kind; closer nodes win. Unknown ids yield empty data.
    #[must_use]
    pub fn node_path_data(&self, id: &NodeId) -> StepData {
        let mut resolved = StepData::new();
        for node in self.ancestry(id) {
            if let Some(payload) = &node.data {
                if !resolved.contains(payload.kind()) {
                    resolved.insert(payload.clone());
                }
            }
        }
        resolved
    }

    /// Most recently created node of a kind
    ///
    /// With `prefer_branch`, a node on that branch index beats any node on
    /// another branch; recency decides within each group.
    #[must_use]
    pub fn latest_of_kind(&self, kind: StepKind, prefer_branch: Option<u32>) -> Option<NodeId> {
        self.nodes()
            .filter(|node| node.kind == kind)
            .max_by_key(|node| {
                let on_branch = prefer_branch.is_some_and(|b| node.branch_index == b);
                (on_branch, node.recency())
            })
            .map(|node| node.id)
    }

    /// Iterate ancestors starting at `id` itself
    ///
    /// Stops on a missing link or a repeated id.
    pub fn ancestry<'a>(&'a self, id: &NodeId) -> Ancestry<'a> {
        Ancestry {
            tree: self,
            next: Some(*id),
            seen: HashSet::new(),
        }
    }
}

/// Iterator over a node and its ancestors
#[derive(Debug)]
pub struct Ancestry<'a> {
    tree: &'a WorkflowTree,
    next: Option<NodeId>,
    seen: HashSet<NodeId>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a WorkflowNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            return None;
        }
        let node = self.tree.node(&id)?;
        self.next = node.parent_id;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;
    use crate::payload::{MethodPayload, Paper, PapersPayload};
    use pretty_assertions::assert_eq;

    fn papers(id: &str) -> PapersPayload {
        PapersPayload {
            queries: vec![],
            papers: vec![Paper::new(id, id)],
        }
    }

    fn method(h: &str) -> MethodPayload {
        MethodPayload {
            hypothesis: h.to_string(),
            ..MethodPayload::default()
        }
    }

    #[test]
    fn closer_ancestor_wins() {
        let t = WorkflowTree::new();
        let (t, root) = t.add_node(None, false, NodeSpec::from_payload(papers("A")));
        let (t, child) = t.add_node(Some(&root), false, NodeSpec::from_payload(method("B")));
        let (t, grandchild) =
            t.add_node(Some(&child), false, NodeSpec::from_payload(papers("A2")));

        let data = t.node_path_data(&grandchild);
        let expected = StepData::new().with(papers("A2")).with(method("B"));
        assert_eq!(data, expected);

        assert_eq!(t.path_to_root(&grandchild), vec![grandchild, child, root]);
    }

    #[test]
    fn nodes_without_data_are_skipped() {
        let t = WorkflowTree::new();
        let (t, root) = t.add_node(None, false, NodeSpec::from_payload(papers("A")));
        let (t, bare) = t.add_node(Some(&root), false, NodeSpec::new(StepKind::Method));
        let data = t.node_path_data(&bare);
        assert_eq!(data.kinds().collect::<Vec<_>>(), vec![StepKind::Papers]);
    }

    #[test]
    fn unknown_node_resolves_empty() {
        let t = WorkflowTree::new();
        assert!(t.node_path_data(&NodeId::new()).is_empty());
        assert!(t.path_to_root(&NodeId::new()).is_empty());
    }

    #[test]
    fn latest_of_kind_prefers_branch_then_recency() {
        let t = WorkflowTree::new();
        let (t, root) = t.add_node(None, false, NodeSpec::from_payload(papers("A")));
        let (t, main) = t.add_node(Some(&root), false, NodeSpec::from_payload(method("m")));
        let (t, alt) = t.add_node(Some(&root), true, NodeSpec::from_payload(method("b")));

        assert_eq!(t.latest_of_kind(StepKind::Method, None), Some(alt));
        assert_eq!(t.latest_of_kind(StepKind::Method, Some(0)), Some(main));
        assert_eq!(t.latest_of_kind(StepKind::Method, Some(1)), Some(alt));
        // No node on branch 7: falls back to the overall most recent.
        assert_eq!(t.latest_of_kind(StepKind::Method, Some(7)), Some(alt));
        assert_eq!(t.latest_of_kind(StepKind::Analysis, None), None);
    }

    #[test]
    fn latest_of_kind_is_truly_most_recent() {
        let mut t = WorkflowTree::new();
        let mut last = None;
        for i in 0..20 {
            let (next, id) = t.add_node(None, true, NodeSpec::from_payload(papers(&i.to_string())));
            t = next;
            last = Some(id);
        }
        assert_eq!(t.latest_of_kind(StepKind::Papers, None), last);
    }
}
