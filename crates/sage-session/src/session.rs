//! Workflow session
//!
//! Owns the [`WorkflowTree`] and the visible per-step state of the
//! research workflow, and decides where new steps go:
//!
//! - **Step executed**: the new node attaches to a node of the preceding
//!   step kind, preferring the active node, then the most recent node of that
//!   kind on the active branch, then the most recent overall.
//! - **Branch created**: the user revised a confirmed step. Downstream state
//!   is cleared first, then a sibling branch is started next to the most
//!   recent node of the revised kind.
//!
//! Activating a node restores the visible state from its snapshot. The
//! activation caused by creating a node skips that pass once, because the
//! visible state already holds what was just computed.

use sage_tree::{NodeId, NodeSpec, Snapshot, StepData, StepKind, StepPayload, WorkflowTree};

/// Where a restoration pass took the visible state from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    /// The node's snapshot
    Snapshot,
    /// The node's path data; the node had no snapshot
    PathData,
    /// Restoration was suppressed
    Skipped,
}

/// Single research session
#[derive(Debug, Clone, Default)]
pub struct WorkflowSession {
    tree: WorkflowTree,
    state: StepData,
    suppress_next_restore: bool,
}

impl WorkflowSession {
    /// Create empty session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session over an existing tree, hydrated from its active node
    #[must_use]
    pub fn from_tree(tree: WorkflowTree) -> Self {
        let mut session = Self {
            tree,
            ..Self::default()
        };
        session.restore_active();
        session
    }

    /// Current tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &WorkflowTree {
        &self.tree
    }

    /// Visible per-step state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &StepData {
        &self.state
    }

    /// Active node
    #[inline]
    #[must_use]
    pub fn active_node_id(&self) -> Option<NodeId> {
        self.tree.active_node_id()
    }

    /// Consume the session, keeping the tree
    #[inline]
    #[must_use]
    pub fn into_tree(self) -> WorkflowTree {
        self.tree
    }

    /// Replace a step's visible state without creating a node
    ///
    /// Used for form edits that have not been confirmed yet.
    pub fn stage(&mut self, payload: impl Into<StepPayload>) -> Option<StepPayload> {
        self.state.insert(payload.into())
    }

    /// Record a completed step as linear progress
    pub fn execute_step(&mut self, payload: impl Into<StepPayload>) -> NodeId {
        let payload = payload.into();
        let kind = payload.kind();

        let parent = kind.previous().and_then(|prev| self.attach_point(prev));

        self.state.insert(payload.clone());
        let spec = NodeSpec::from_payload(payload).with_snapshot(self.state.through(kind));
        let (tree, id) = self.tree.add_node(parent.as_ref(), false, spec);
        self.tree = tree;

        tracing::info!(
            node = %id,
            %kind,
            parent = ?parent,
            "step executed"
        );
        self.after_creation();
        id
    }

    /// Record a revision of a confirmed step as a new branch
    ///
    /// Falls back to [`WorkflowSession::execute_step`] when no node of the
    /// revised kind exists yet.
    pub fn create_branch(&mut self, payload: impl Into<StepPayload>) -> NodeId {
        let payload = payload.into();
        let kind = payload.kind();

        self.state.clear_downstream_of(kind);

        let Some(source) = self.branch_source(kind) else {
            tracing::debug!(%kind, "no node to branch from, executing step instead");
            return self.execute_step(payload);
        };

        self.state.insert(payload.clone());
        let spec = NodeSpec::from_payload(payload).with_snapshot(self.state.through(kind));
        let (tree, id) = match self.tree.create_branch_from_node(&source, spec.clone()) {
            Some(created) => created,
            None => self.tree.add_node(None, true, spec),
        };
        self.tree = tree;

        tracing::info!(
            node = %id,
            %kind,
            source = %source,
            branch_index = self.tree.node(&id).map(|n| n.branch_index),
            "branch created"
        );
        self.after_creation();
        id
    }

    /// Activate a node and restore its state
    ///
    /// Returns `None` for unknown ids, leaving the session unchanged.
    pub fn navigate(&mut self, id: &NodeId) -> Option<RestoreSource> {
        if !self.tree.contains(id) {
            tracing::debug!(node = %id, "ignoring navigation to unknown node");
            return None;
        }
        self.tree = self.tree.set_active_node(id);
        Some(self.restore_active())
    }

    /// Write the visible state into the active node's snapshot
    ///
    /// Returns `false` when no node is active.
    pub fn save_snapshot(&mut self) -> bool {
        let Some(active) = self.tree.active_node() else {
            return false;
        };
        let id = active.id;
        let snapshot = self.state.through(active.kind);
        self.tree = self.tree.update_node_snapshot(&id, snapshot);
        true
    }

    /// Replace a node's snapshot
    pub fn update_node_snapshot(&mut self, id: &NodeId, snapshot: Snapshot) {
        self.tree = self.tree.update_node_snapshot(id, snapshot);
    }

    /// Replace a node's data
    pub fn update_node_data(&mut self, id: &NodeId, data: impl Into<StepPayload>) {
        self.tree = self.tree.update_node_data(id, data.into());
    }

    /// Effective data visible from a node
    #[must_use]
    pub fn node_path_data(&self, id: &NodeId) -> StepData {
        self.tree.node_path_data(id)
    }

    /// Node a new step of the kind after `prev` should attach to
    fn attach_point(&self, prev: StepKind) -> Option<NodeId> {
        self.preferred_node_of_kind(prev)
    }

    /// Node a revision of `kind` should branch from
    fn branch_source(&self, kind: StepKind) -> Option<NodeId> {
        self.preferred_node_of_kind(kind)
    }

    fn preferred_node_of_kind(&self, kind: StepKind) -> Option<NodeId> {
        let active = self.tree.active_node();
        match active {
            Some(node) if node.kind == kind => Some(node.id),
            _ => self
                .tree
                .latest_of_kind(kind, active.map(|node| node.branch_index)),
        }
    }

    fn after_creation(&mut self) {
        self.suppress_next_restore = true;
        self.restore_active();
    }

    fn restore_active(&mut self) -> RestoreSource {
        if std::mem::take(&mut self.suppress_next_restore) {
            tracing::debug!("restoration skipped after node creation");
            return RestoreSource::Skipped;
        }
        let Some(node) = self.tree.active_node() else {
            return RestoreSource::Skipped;
        };
        let (state, source) = match &node.snapshot {
            Some(snapshot) => (snapshot.clone(), RestoreSource::Snapshot),
            None => (self.tree.node_path_data(&node.id), RestoreSource::PathData),
        };
        tracing::debug!(node = %node.id, ?source, kinds = state.len(), "restored step state");
        self.state = state;
        source
    }
}
