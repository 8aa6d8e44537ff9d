//! Request and response bodies exchanged with the research backend
//!
//! Responses for generation steps are the step payloads from `sage-tree`
//! themselves; only requests and run bookkeeping live here.

use sage_tree::{
    AnalysisPayload, CodeGenerationPayload, ExperimentConfigPayload, ExperimentRunPayload,
    MethodPayload, Paper, RunStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Literature search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSearchRequest {
    /// Queries to run
    pub queries: Vec<String>,
    /// Maximum results per query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Literature search response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaperSearchResponse {
    /// Matching papers
    #[serde(default)]
    pub papers: Vec<Paper>,
}

/// Hypothesis and method generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRequest {
    /// Papers to build on
    pub papers: Vec<Paper>,
    /// Optional user guidance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

/// Experiment configuration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfigRequest {
    /// Method to configure an experiment for
    pub method: MethodPayload,
}

/// Code generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeGenerationRequest {
    /// Method being implemented
    pub method: MethodPayload,
    /// Experiment configuration
    pub config: ExperimentConfigPayload,
}

/// Experiment run dispatch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRunRequest {
    /// Code to execute
    pub code: CodeGenerationPayload,
}

/// Run identifier returned on dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    /// Backend run identifier
    pub run_id: String,
}

/// Status report for a dispatched run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatusReport {
    /// Backend run identifier
    pub run_id: String,
    /// Current status
    pub status: RunStatus,
    /// Logs captured so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    /// Results, once available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<JsonValue>,
    /// Error detail for failed runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunStatusReport {
    /// Report with only a status
    #[inline]
    #[must_use]
    pub fn new(run_id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            run_id: run_id.into(),
            status,
            logs: None,
            results: None,
            error: None,
        }
    }

    /// Whether polling should stop
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<RunStatusReport> for ExperimentRunPayload {
    fn from(report: RunStatusReport) -> Self {
        let logs = match (report.logs, report.error) {
            (Some(logs), Some(error)) => Some(format!("{logs}\n{error}")),
            (logs, error) => logs.or(error),
        };
        Self {
            run_id: report.run_id,
            status: report.status,
            logs,
            results: report.results,
        }
    }
}

/// Analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Method under test
    pub method: MethodPayload,
    /// Finished run
    pub run: ExperimentRunPayload,
}

/// Paper writing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperWritingRequest {
    /// Cited papers
    pub papers: Vec<Paper>,
    /// Method
    pub method: MethodPayload,
    /// Experiment configuration
    pub config: ExperimentConfigPayload,
    /// Analysis of the results
    pub analysis: AnalysisPayload,
}
