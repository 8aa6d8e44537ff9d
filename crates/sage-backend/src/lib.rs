//! Sage Backend - research service client
//!
//! Provides:
//! - The [`ResearchBackend`] trait, one async call per workflow step
//! - [`HttpBackend`], its JSON-over-HTTP implementation
//! - [`StatusPoller`] for following experiment runs to completion
//! - [`SageConfig`], TOML configuration with environment overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use sage_backend::{HttpBackend, SageConfig, StatusPoller};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SageConfig::load("sage.toml")?.with_env_overrides()?;
//! let backend = Arc::new(HttpBackend::new(&config.backend)?);
//!
//! let handle = StatusPoller::new(&config.polling).spawn(backend, "run-42");
//! let report = handle.finish().await?;
//! println!("run finished: {:?}", report.status);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod poller;
pub mod wire;

pub use client::ResearchBackend;
pub use config::{BackendConfig, ConfigError, PollingConfig, SageConfig, BACKEND_URL_ENV};
pub use error::BackendError;
pub use http::HttpBackend;
pub use poller::{PollHandle, RunStatusSource, StatusPoller};
pub use wire::{
    AnalysisRequest, CodeGenerationRequest, ExperimentConfigRequest, ExperimentRunRequest,
    MethodRequest, PaperSearchRequest, PaperSearchResponse, PaperWritingRequest, RunHandle,
    RunStatusReport,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
