//! Sage Tree - branchable workflow tree
//!
//! Models an assisted-research session as a tree of workflow steps:
//! - Typed payloads per step kind
//! - Linear progress and explicit branches with branch indices
//! - Per-node snapshots for restoring state on navigation
//! - Path resolution of the effective data visible from any node
//!
//! # Example
//!
//! ```rust
//! use sage_tree::{NodeSpec, PapersPayload, MethodPayload, WorkflowTree};
//!
//! let tree = WorkflowTree::new();
//! let (tree, papers) = tree.add_node(None, false, NodeSpec::from_payload(PapersPayload::default()));
//! let (tree, method) = tree.add_node(Some(&papers), false, NodeSpec::from_payload(MethodPayload::default()));
//! let (tree, alt) = tree
//!     .create_branch_from_node(&method, NodeSpec::from_payload(MethodPayload::default()))
//!     .expect("source exists");
//!
//! assert_eq!(tree.node(&alt).unwrap().branch_index, 1);
//! assert_eq!(tree.root_id(), Some(papers));
//! ```

#![warn(unreachable_pub)]

pub mod node;
pub mod payload;
pub mod query;
pub mod render;
pub mod step;
pub mod tree;
pub mod validate;

pub use node::{NodeId, NodeSpec, WorkflowNode};
pub use payload::{
    AnalysisPayload, CodeGenerationPayload, ExperimentConfigPayload, ExperimentRunPayload,
    GeneratedFile, MethodPayload, Paper, PaperSection, PaperWritingPayload, PapersPayload,
    RunStatus, Snapshot, StepData, StepPayload,
};
pub use query::Ancestry;
pub use render::outline;
pub use step::{StepKind, UnknownStepKind};
pub use tree::WorkflowTree;
pub use validate::TreeViolation;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
