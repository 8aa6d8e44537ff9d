//! Workflow nodes

use crate::payload::{Snapshot, StepPayload};
use crate::step::StepKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique node identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Ulid);

impl NodeId {
    /// Generate new node ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Last six characters, for compact display
    #[must_use]
    pub fn short(&self) -> String {
        let full = self.0.to_string();
        full[full.len() - 6..].to_string()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Content of a node to be created
///
/// Placement (parent and branch flag) is decided by the tree operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    /// Step kind of the new node
    pub kind: StepKind,
    /// Payload for the node's own step
    pub data: Option<StepPayload>,
    /// Workflow state as of this node
    pub snapshot: Option<Snapshot>,
}

impl NodeSpec {
    /// Spec with no data and no snapshot
    #[inline]
    #[must_use]
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            data: None,
            snapshot: None,
        }
    }

    /// Spec whose kind is taken from the payload
    #[inline]
    #[must_use]
    pub fn from_payload(payload: impl Into<StepPayload>) -> Self {
        let payload = payload.into();
        Self {
            kind: payload.kind(),
            data: Some(payload),
            snapshot: None,
        }
    }

    /// With data
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: impl Into<StepPayload>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// With snapshot
    #[inline]
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

/// A single step in the workflow tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Node ID
    pub id: NodeId,
    /// Step kind
    pub kind: StepKind,
    /// 0 for the main line, greater for alternate branches
    pub branch_index: u32,
    /// Node this one was derived from
    pub parent_id: Option<NodeId>,
    /// Child IDs in insertion order
    pub children: Vec<NodeId>,
    /// Payload of this node's own step
    pub data: Option<StepPayload>,
    /// Full workflow state as of this node
    pub snapshot: Option<Snapshot>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Creation ordinal within the tree
    pub seq: u64,
}

impl WorkflowNode {
    /// Whether the node has no parent
    #[inline]
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Recency ordering key
    #[inline]
    #[must_use]
    pub fn recency(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.seq)
    }
}
