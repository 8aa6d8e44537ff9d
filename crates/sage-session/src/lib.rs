//! Sage Session - research session controller
//!
//! The layer between a user-facing surface and the workflow tree:
//! - Decides where executed steps attach and where revisions branch
//! - Keeps the visible per-step state and snapshots it into nodes
//! - Restores state when the user revisits a node
//! - Drives the backend step by step through [`ResearchAssistant`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sage_backend::{HttpBackend, SageConfig, StatusPoller};
//! use sage_session::ResearchAssistant;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SageConfig::new();
//! let backend = HttpBackend::new(&config.backend)?;
//! let mut assistant = ResearchAssistant::new(backend, StatusPoller::new(&config.polling));
//!
//! assistant.search_papers(vec!["sparse attention".into()], Some(10)).await?;
//! assistant.propose_method(None).await?;
//! assistant.configure_experiment().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod assistant;
pub mod error;
pub mod session;

pub use assistant::ResearchAssistant;
pub use error::SessionError;
pub use session::{RestoreSource, WorkflowSession};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with research sessions
    pub use crate::{ResearchAssistant, RestoreSource, SessionError, WorkflowSession};
    pub use sage_tree::{NodeId, StepData, StepKind, StepPayload, WorkflowTree};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
