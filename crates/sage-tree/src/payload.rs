//! Typed step payloads
//!
//! Each workflow step produces one strongly typed payload. [`StepPayload`]
//! is the tagged union over all of them, and [`StepData`] holds at most one
//! payload per step kind. `StepData` doubles as the snapshot format and as
//! the result of path resolution.

use crate::step::StepKind;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A paper returned by literature search
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paper {
    /// Backend identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Author names
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Abstract
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Landing page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Paper {
    /// Create paper with id and title
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Output of the papers step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PapersPayload {
    /// Search queries that produced the results
    #[serde(default)]
    pub queries: Vec<String>,
    /// Papers the user selected
    #[serde(default)]
    pub papers: Vec<Paper>,
}

/// Output of the method step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodPayload {
    /// Research hypothesis
    pub hypothesis: String,
    /// Proposed method
    pub method: String,
    /// Papers the method was derived from
    #[serde(default)]
    pub source_paper_ids: Vec<String>,
}

/// Output of the experiment-config step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentConfigPayload {
    /// Experiment name
    pub name: String,
    /// Free-form hyperparameters
    #[serde(default)]
    pub parameters: BTreeMap<String, JsonValue>,
    /// Datasets to run on
    #[serde(default)]
    pub datasets: Vec<String>,
    /// Metrics to report
    #[serde(default)]
    pub metrics: Vec<String>,
}

/// A single generated source file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Relative path
    pub path: String,
    /// File contents
    pub contents: String,
}

/// Output of the code-generation step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeGenerationPayload {
    /// Source language
    pub language: String,
    /// Generated files
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
}

/// Backend status of an experiment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Accepted, not yet started
    #[default]
    #[serde(alias = "queued")]
    Pending,
    /// Executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
    /// Backend-side error
    Error,
}

impl RunStatus {
    /// Whether polling should stop at this status
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Error)
    }

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the experiment-run step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentRunPayload {
    /// Backend run identifier
    pub run_id: String,
    /// Last observed status
    #[serde(default)]
    pub status: RunStatus,
    /// Captured logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    /// Metric results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<JsonValue>,
}

/// Output of the analysis step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Narrative summary
    pub summary: String,
    /// Key findings
    #[serde(default)]
    pub findings: Vec<String>,
    /// Figure references
    #[serde(default)]
    pub figures: Vec<String>,
}

/// A section of a drafted paper
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaperSection {
    /// Section heading
    pub heading: String,
    /// Section body
    pub body: String,
}

/// Output of the paper-writing step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaperWritingPayload {
    /// Paper title
    pub title: String,
    /// Sections in order
    #[serde(default)]
    pub sections: Vec<PaperSection>,
}

/// Payload of a single step, tagged by its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum StepPayload {
    /// Papers step output
    Papers(PapersPayload),
    /// Method step output
    Method(MethodPayload),
    /// Experiment-config step output
    ExperimentConfig(ExperimentConfigPayload),
    /// Code-generation step output
    CodeGeneration(CodeGenerationPayload),
    /// Experiment-run step output
    ExperimentRun(ExperimentRunPayload),
    /// Analysis step output
    Analysis(AnalysisPayload),
    /// Paper-writing step output
    PaperWriting(PaperWritingPayload),
}

impl StepPayload {
    /// The step kind this payload belongs to
    #[must_use]
    pub fn kind(&self) -> StepKind {
        match self {
            StepPayload::Papers(_) => StepKind::Papers,
            StepPayload::Method(_) => StepKind::Method,
            StepPayload::ExperimentConfig(_) => StepKind::ExperimentConfig,
            StepPayload::CodeGeneration(_) => StepKind::CodeGeneration,
            StepPayload::ExperimentRun(_) => StepKind::ExperimentRun,
            StepPayload::Analysis(_) => StepKind::Analysis,
            StepPayload::PaperWriting(_) => StepKind::PaperWriting,
        }
    }
}

macro_rules! payload_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for StepPayload {
                #[inline]
                fn from(payload: $ty) -> Self {
                    StepPayload::$variant(payload)
                }
            }
        )*
    };
}

payload_from!(
    Papers(PapersPayload),
    Method(MethodPayload),
    ExperimentConfig(ExperimentConfigPayload),
    CodeGeneration(CodeGenerationPayload),
    ExperimentRun(ExperimentRunPayload),
    Analysis(AnalysisPayload),
    PaperWriting(PaperWritingPayload),
);

/// At most one payload per step kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepData {
    entries: BTreeMap<StepKind, StepPayload>,
}

/// Full accumulated workflow state captured for a node
pub type Snapshot = StepData;

impl StepData {
    /// Create empty step data
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload for a kind
    #[inline]
    #[must_use]
    pub fn get(&self, kind: StepKind) -> Option<&StepPayload> {
        self.entries.get(&kind)
    }

    /// Whether a kind has a payload
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: StepKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Store a payload under its own kind, returning the replaced one
    #[inline]
    pub fn insert(&mut self, payload: StepPayload) -> Option<StepPayload> {
        self.entries.insert(payload.kind(), payload)
    }

    /// Builder form of [`StepData::insert`]
    #[inline]
    #[must_use]
    pub fn with(mut self, payload: impl Into<StepPayload>) -> Self {
        self.insert(payload.into());
        self
    }

    /// Remove the payload of a kind
    #[inline]
    pub fn remove(&mut self, kind: StepKind) -> Option<StepPayload> {
        self.entries.remove(&kind)
    }

    /// Drop every payload strictly downstream of `kind`
    pub fn clear_downstream_of(&mut self, kind: StepKind) {
        self.entries.retain(|k, _| *k <= kind);
    }

    /// Copy holding only payloads up to and including `kind`
    #[must_use]
    pub fn through(&self, kind: StepKind) -> Self {
        let mut copy = self.clone();
        copy.clear_downstream_of(kind);
        copy
    }

    /// Kinds that have a payload, in workflow order
    pub fn kinds(&self) -> impl Iterator<Item = StepKind> + '_ {
        self.entries.keys().copied()
    }

    /// Payloads in workflow order
    pub fn iter(&self) -> impl Iterator<Item = (StepKind, &StepPayload)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Number of filled kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no kind is filled
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Papers payload, if any
    #[must_use]
    pub fn papers(&self) -> Option<&PapersPayload> {
        match self.get(StepKind::Papers) {
            Some(StepPayload::Papers(p)) => Some(p),
            _ => None,
        }
    }

    /// Method payload, if any
    #[must_use]
    pub fn method(&self) -> Option<&MethodPayload> {
        match self.get(StepKind::Method) {
            Some(StepPayload::Method(p)) => Some(p),
            _ => None,
        }
    }

    /// Experiment-config payload, if any
    #[must_use]
    pub fn experiment_config(&self) -> Option<&ExperimentConfigPayload> {
        match self.get(StepKind::ExperimentConfig) {
            Some(StepPayload::ExperimentConfig(p)) => Some(p),
            _ => None,
        }
    }

    /// Code-generation payload, if any
    #[must_use]
    pub fn code_generation(&self) -> Option<&CodeGenerationPayload> {
        match self.get(StepKind::CodeGeneration) {
            Some(StepPayload::CodeGeneration(p)) => Some(p),
            _ => None,
        }
    }

    /// Experiment-run payload, if any
    #[must_use]
    pub fn experiment_run(&self) -> Option<&ExperimentRunPayload> {
        match self.get(StepKind::ExperimentRun) {
            Some(StepPayload::ExperimentRun(p)) => Some(p),
            _ => None,
        }
    }

    /// Analysis payload, if any
    #[must_use]
    pub fn analysis(&self) -> Option<&AnalysisPayload> {
        match self.get(StepKind::Analysis) {
            Some(StepPayload::Analysis(p)) => Some(p),
            _ => None,
        }
    }

    /// Paper-writing payload, if any
    #[must_use]
    pub fn paper_writing(&self) -> Option<&PaperWritingPayload> {
        match self.get(StepKind::PaperWriting) {
            Some(StepPayload::PaperWriting(p)) => Some(p),
            _ => None,
        }
    }
}

impl FromIterator<StepPayload> for StepData {
    fn from_iter<I: IntoIterator<Item = StepPayload>>(iter: I) -> Self {
        let mut data = Self::new();
        for payload in iter {
            data.insert(payload);
        }
        data
    }
}
