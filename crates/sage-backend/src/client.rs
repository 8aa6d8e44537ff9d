//! Research backend abstraction
//!
//! One async method per backend call. [`crate::HttpBackend`] is the real
//! implementation; tests plug in fakes or mocks.

use crate::error::BackendError;
use crate::wire::{
    AnalysisRequest, CodeGenerationRequest, ExperimentConfigRequest, ExperimentRunRequest,
    MethodRequest, PaperSearchRequest, PaperSearchResponse, PaperWritingRequest, RunHandle,
    RunStatusReport,
};
use async_trait::async_trait;
use sage_tree::{
    AnalysisPayload, CodeGenerationPayload, ExperimentConfigPayload, MethodPayload,
    PaperWritingPayload,
};

/// Remote research service driving each workflow step
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    /// Run a literature search
    async fn search_papers(
        &self,
        request: &PaperSearchRequest,
    ) -> Result<PaperSearchResponse, BackendError>;

    /// Generate a hypothesis and method from selected papers
    async fn generate_method(&self, request: &MethodRequest)
        -> Result<MethodPayload, BackendError>;

    /// Generate an experiment configuration for a method
    async fn generate_experiment_config(
        &self,
        request: &ExperimentConfigRequest,
    ) -> Result<ExperimentConfigPayload, BackendError>;

    /// Generate experiment code
    async fn generate_code(
        &self,
        request: &CodeGenerationRequest,
    ) -> Result<CodeGenerationPayload, BackendError>;

    /// Dispatch an experiment run
    async fn start_experiment(
        &self,
        request: &ExperimentRunRequest,
    ) -> Result<RunHandle, BackendError>;

    /// Fetch the current status of a run
    async fn experiment_status(&self, run_id: &str) -> Result<RunStatusReport, BackendError>;

    /// Analyze a finished run
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, BackendError>;

    /// Draft the paper
    async fn write_paper(
        &self,
        request: &PaperWritingRequest,
    ) -> Result<PaperWritingPayload, BackendError>;
}
