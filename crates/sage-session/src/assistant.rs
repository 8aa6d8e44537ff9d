//! Research assistant
//!
//! Connects a [`ResearchBackend`] to a [`WorkflowSession`]. Each step
//! operation builds its request from the visible state, calls the backend,
//! and records the result as linear progress. A failed backend call leaves
//! the session untouched so the caller can resubmit.

use crate::error::SessionError;
use crate::session::{RestoreSource, WorkflowSession};
use sage_backend::{
    AnalysisRequest, CodeGenerationRequest, ExperimentConfigRequest, ExperimentRunRequest,
    MethodRequest, PaperSearchRequest, PaperWritingRequest, ResearchBackend, RunStatusReport,
    StatusPoller,
};
use sage_tree::{
    ExperimentRunPayload, NodeId, PapersPayload, RunStatus, StepKind, StepPayload,
};

/// Drives a research session through a backend
#[derive(Debug)]
pub struct ResearchAssistant<B> {
    backend: B,
    poller: StatusPoller,
    session: WorkflowSession,
}

impl<B: ResearchBackend> ResearchAssistant<B> {
    /// Create assistant with an empty session
    #[inline]
    #[must_use]
    pub fn new(backend: B, poller: StatusPoller) -> Self {
        Self::with_session(backend, poller, WorkflowSession::new())
    }

    /// Create assistant over an existing session
    #[inline]
    #[must_use]
    pub fn with_session(backend: B, poller: StatusPoller, session: WorkflowSession) -> Self {
        Self {
            backend,
            poller,
            session,
        }
    }

    /// Current session
    #[inline]
    #[must_use]
    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    /// Mutable session, for form edits and direct tree updates
    #[inline]
    pub fn session_mut(&mut self) -> &mut WorkflowSession {
        &mut self.session
    }

    /// Backend
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Search literature and record the results
    ///
    /// # Errors
    /// Returns error if the backend call fails
    pub async fn search_papers(
        &mut self,
        queries: Vec<String>,
        limit: Option<u32>,
    ) -> Result<NodeId, SessionError> {
        tracing::info!(queries = queries.len(), "searching papers");
        let request = PaperSearchRequest { queries, limit };
        let response = self.backend.search_papers(&request).await?;
        Ok(self.session.execute_step(PapersPayload {
            queries: request.queries,
            papers: response.papers,
        }))
    }

    /// Generate a hypothesis and method from the selected papers
    ///
    /// # Errors
    /// Returns error if no papers are selected or the backend call fails
    pub async fn propose_method(&mut self, guidance: Option<String>) -> Result<NodeId, SessionError> {
        let papers = self
            .session
            .state()
            .papers()
            .filter(|p| !p.papers.is_empty())
            .ok_or(SessionError::MissingPrerequisite(StepKind::Papers))?;
        let request = MethodRequest {
            papers: papers.papers.clone(),
            guidance,
        };
        tracing::info!(papers = request.papers.len(), "generating method");
        let method = self.backend.generate_method(&request).await?;
        Ok(self.session.execute_step(method))
    }

    /// Generate an experiment configuration for the current method
    ///
    /// # Errors
    /// Returns error if no method exists or the backend call fails
    pub async fn configure_experiment(&mut self) -> Result<NodeId, SessionError> {
        let method = self
            .session
            .state()
            .method()
            .ok_or(SessionError::MissingPrerequisite(StepKind::Method))?;
        let request = ExperimentConfigRequest {
            method: method.clone(),
        };
        tracing::info!("generating experiment configuration");
        let config = self.backend.generate_experiment_config(&request).await?;
        Ok(self.session.execute_step(config))
    }

    /// Generate experiment code
    ///
    /// # Errors
    /// Returns error if method or configuration is missing or the backend
    /// call fails
    pub async fn generate_code(&mut self) -> Result<NodeId, SessionError> {
        let state = self.session.state();
        let method = state
            .method()
            .ok_or(SessionError::MissingPrerequisite(StepKind::Method))?;
        let config = state
            .experiment_config()
            .ok_or(SessionError::MissingPrerequisite(StepKind::ExperimentConfig))?;
        let request = CodeGenerationRequest {
            method: method.clone(),
            config: config.clone(),
        };
        tracing::info!(experiment = %request.config.name, "generating code");
        let code = self.backend.generate_code(&request).await?;
        Ok(self.session.execute_step(code))
    }

    /// Dispatch the generated code, poll to a terminal status, record the run
    ///
    /// Failed runs are recorded too; only backend errors abort.
    ///
    /// # Errors
    /// Returns error if no code exists, dispatch fails, or polling gives up
    pub async fn run_experiment(&mut self) -> Result<NodeId, SessionError> {
        let code = self
            .session
            .state()
            .code_generation()
            .ok_or(SessionError::MissingPrerequisite(StepKind::CodeGeneration))?;
        let request = ExperimentRunRequest { code: code.clone() };

        let handle = self.backend.start_experiment(&request).await?;
        tracing::info!(run_id = %handle.run_id, "experiment dispatched");

        let report: RunStatusReport = self
            .poller
            .poll_until_terminal(&self.backend, &handle.run_id, |report| {
                tracing::debug!(run_id = %report.run_id, status = ?report.status, "run progress");
            })
            .await?;
        Ok(self.session.execute_step(ExperimentRunPayload::from(report)))
    }

    /// Analyze the completed run
    ///
    /// # Errors
    /// Returns error if method or run is missing, the run did not complete,
    /// or the backend call fails
    pub async fn analyze(&mut self) -> Result<NodeId, SessionError> {
        let state = self.session.state();
        let method = state
            .method()
            .ok_or(SessionError::MissingPrerequisite(StepKind::Method))?;
        let run = state
            .experiment_run()
            .ok_or(SessionError::MissingPrerequisite(StepKind::ExperimentRun))?;
        if run.status != RunStatus::Completed {
            return Err(SessionError::RunNotFinished(run.status));
        }
        let request = AnalysisRequest {
            method: method.clone(),
            run: run.clone(),
        };
        tracing::info!(run_id = %request.run.run_id, "analyzing results");
        let analysis = self.backend.analyze(&request).await?;
        Ok(self.session.execute_step(analysis))
    }

    /// Draft the paper from every upstream step
    ///
    /// # Errors
    /// Returns error if an upstream step is missing or the backend call
    /// fails
    pub async fn write_paper(&mut self) -> Result<NodeId, SessionError> {
        let state = self.session.state();
        let papers = state
            .papers()
            .ok_or(SessionError::MissingPrerequisite(StepKind::Papers))?;
        let method = state
            .method()
            .ok_or(SessionError::MissingPrerequisite(StepKind::Method))?;
        let config = state
            .experiment_config()
            .ok_or(SessionError::MissingPrerequisite(StepKind::ExperimentConfig))?;
        let analysis = state
            .analysis()
            .ok_or(SessionError::MissingPrerequisite(StepKind::Analysis))?;
        let request = PaperWritingRequest {
            papers: papers.papers.clone(),
            method: method.clone(),
            config: config.clone(),
            analysis: analysis.clone(),
        };
        tracing::info!("writing paper");
        let paper = self.backend.write_paper(&request).await?;
        Ok(self.session.execute_step(paper))
    }

    /// Record a user revision of a confirmed step as a new branch
    pub fn revise(&mut self, payload: impl Into<StepPayload>) -> NodeId {
        self.session.create_branch(payload)
    }

    /// Revisit a node
    pub fn navigate(&mut self, id: &NodeId) -> Option<RestoreSource> {
        self.session.navigate(id)
    }
}
