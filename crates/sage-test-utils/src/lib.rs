//! Testing utilities for the sage workspace
//!
//! Payload fixtures and a deterministic in-memory backend.

#![allow(missing_docs)]

use async_trait::async_trait;
use sage_backend::{
    AnalysisRequest, BackendError, CodeGenerationRequest, ExperimentConfigRequest,
    ExperimentRunRequest, MethodRequest, PaperSearchRequest, PaperSearchResponse,
    PaperWritingRequest, ResearchBackend, RunHandle, RunStatusReport,
};
use sage_tree::{
    AnalysisPayload, CodeGenerationPayload, ExperimentConfigPayload, GeneratedFile,
    MethodPayload, Paper, PaperSection, PaperWritingPayload, PapersPayload, RunStatus,
};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

pub fn paper(id: &str) -> Paper {
    Paper {
        authors: vec!["A. Author".to_string()],
        year: Some(2024),
        ..Paper::new(id, format!("Paper {id}"))
    }
}

pub fn papers_payload(ids: &[&str]) -> PapersPayload {
    PapersPayload {
        queries: vec!["test query".to_string()],
        papers: ids.iter().map(|id| paper(id)).collect(),
    }
}

pub fn method_payload(hypothesis: &str) -> MethodPayload {
    MethodPayload {
        hypothesis: hypothesis.to_string(),
        method: format!("test {hypothesis}"),
        source_paper_ids: Vec::new(),
    }
}

pub fn config_payload(name: &str) -> ExperimentConfigPayload {
    ExperimentConfigPayload {
        name: name.to_string(),
        parameters: [("learning_rate".to_string(), json!(0.001))].into_iter().collect(),
        datasets: vec!["cifar10".to_string()],
        metrics: vec!["accuracy".to_string()],
    }
}

pub fn code_payload() -> CodeGenerationPayload {
    CodeGenerationPayload {
        language: "python".to_string(),
        files: vec![GeneratedFile {
            path: "train.py".to_string(),
            contents: "print('train')\n".to_string(),
        }],
    }
}

pub fn analysis_payload(summary: &str) -> AnalysisPayload {
    AnalysisPayload {
        summary: summary.to_string(),
        findings: vec!["baseline beaten".to_string()],
        figures: Vec::new(),
    }
}

pub fn paper_draft(title: &str) -> PaperWritingPayload {
    PaperWritingPayload {
        title: title.to_string(),
        sections: vec![PaperSection {
            heading: "Introduction".to_string(),
            body: "...".to_string(),
        }],
    }
}

/// Deterministic backend answering every call from fixtures
///
/// Run statuses are replayed in order; the last one repeats.
#[derive(Debug)]
pub struct FakeBackend {
    run_statuses: Mutex<VecDeque<RunStatus>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_run_statuses(vec![RunStatus::Running, RunStatus::Completed])
    }

    pub fn with_run_statuses(statuses: Vec<RunStatus>) -> Self {
        Self {
            run_statuses: Mutex::new(statuses.into()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make a call fail with a 500 from now on
    pub fn fail(&self, call: &'static str) {
        self.failing.lock().unwrap().insert(call);
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(call) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("{call} failed"),
            });
        }
        Ok(())
    }

    fn next_status(&self) -> RunStatus {
        let mut statuses = self.run_statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_default()
        } else {
            statuses.front().copied().unwrap_or_default()
        }
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResearchBackend for FakeBackend {
    async fn search_papers(
        &self,
        request: &PaperSearchRequest,
    ) -> Result<PaperSearchResponse, BackendError> {
        self.record("search_papers")?;
        Ok(PaperSearchResponse {
            papers: request
                .queries
                .iter()
                .map(|q| paper(&format!("{q}-1")))
                .collect(),
        })
    }

    async fn generate_method(
        &self,
        request: &MethodRequest,
    ) -> Result<MethodPayload, BackendError> {
        self.record("generate_method")?;
        let mut method = method_payload(request.guidance.as_deref().unwrap_or("generated"));
        method.source_paper_ids = request.papers.iter().map(|p| p.id.clone()).collect();
        Ok(method)
    }

    async fn generate_experiment_config(
        &self,
        request: &ExperimentConfigRequest,
    ) -> Result<ExperimentConfigPayload, BackendError> {
        self.record("generate_experiment_config")?;
        Ok(config_payload(&format!("{}-config", request.method.hypothesis)))
    }

    async fn generate_code(
        &self,
        _request: &CodeGenerationRequest,
    ) -> Result<CodeGenerationPayload, BackendError> {
        self.record("generate_code")?;
        Ok(code_payload())
    }

    async fn start_experiment(
        &self,
        _request: &ExperimentRunRequest,
    ) -> Result<RunHandle, BackendError> {
        self.record("start_experiment")?;
        Ok(RunHandle {
            run_id: "run-1".to_string(),
        })
    }

    async fn experiment_status(&self, run_id: &str) -> Result<RunStatusReport, BackendError> {
        self.record("experiment_status")?;
        let status = self.next_status();
        let mut report = RunStatusReport::new(run_id, status);
        if status == RunStatus::Completed {
            report.results = Some(json!({ "accuracy": 0.91 }));
        }
        Ok(report)
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, BackendError> {
        self.record("analyze")?;
        Ok(analysis_payload(&format!("analysis of {}", request.run.run_id)))
    }

    async fn write_paper(
        &self,
        request: &PaperWritingRequest,
    ) -> Result<PaperWritingPayload, BackendError> {
        self.record("write_paper")?;
        Ok(paper_draft(&request.method.hypothesis))
    }
}
