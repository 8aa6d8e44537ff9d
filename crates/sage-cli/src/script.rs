//! Replay scripts
//!
//! A replay script is a YAML list of session actions. Nodes created by
//! `execute` and `branch` can be labelled and navigated to by label later in
//! the script.
//!
//! ```yaml
//! steps:
//!   - action: execute
//!     label: search
//!     payload:
//!       type: papers
//!       data: { queries: ["sparse attention"], papers: [] }
//!   - action: navigate
//!     to: search
//!   - action: snapshot
//! ```

use sage_session::WorkflowSession;
use sage_tree::{NodeId, StepData, StepPayload, WorkflowTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Replay error
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Script file could not be read
    #[error("failed to read script {path}: {source}")]
    Io {
        /// Script path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Script is not valid YAML or has unknown actions
    #[error("invalid replay script: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Navigation target is neither a known label nor a node id
    #[error("step {step}: unknown navigation target '{target}'")]
    UnknownTarget {
        /// Zero-based step index
        step: usize,
        /// Target as written
        target: String,
    },

    /// Label already names another node
    #[error("step {step}: label '{label}' is already in use")]
    DuplicateLabel {
        /// Zero-based step index
        step: usize,
        /// Label as written
        label: String,
    },
}

/// Parsed replay script
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    /// Actions in order
    #[serde(default)]
    pub steps: Vec<ScriptAction>,
}

impl ReplayScript {
    /// Parse a script from YAML text
    ///
    /// # Errors
    /// Returns error if the text is not a valid script
    pub fn from_yaml(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a script file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

/// One session action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ScriptAction {
    /// Record a completed step
    Execute {
        /// Name for the created node
        #[serde(default)]
        label: Option<String>,
        /// Step output
        payload: StepPayload,
    },
    /// Record a revision as a new branch
    Branch {
        /// Name for the created node
        #[serde(default)]
        label: Option<String>,
        /// Revised step output
        payload: StepPayload,
    },
    /// Activate a node by label or id
    Navigate {
        /// Label or node id
        to: String,
    },
    /// Save visible state into the active node
    Snapshot,
}

/// Session built by replaying a script
#[derive(Debug, Default)]
pub struct Replay {
    session: WorkflowSession,
    labels: BTreeMap<String, NodeId>,
}

impl Replay {
    /// Start from an empty session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay every action of a script
    ///
    /// # Errors
    /// Returns the first action error
    pub fn run(script: &ReplayScript) -> Result<Self, ScriptError> {
        let mut replay = Self::new();
        for (step, action) in script.steps.iter().enumerate() {
            replay.apply(step, action)?;
        }
        Ok(replay)
    }

    /// Apply one action
    ///
    /// # Errors
    /// Returns error for unknown navigation targets and reused labels
    pub fn apply(&mut self, step: usize, action: &ScriptAction) -> Result<(), ScriptError> {
        match action {
            ScriptAction::Execute { label, payload } => {
                self.check_label(step, label.as_deref())?;
                let id = self.session.execute_step(payload.clone());
                self.remember(label.as_deref(), id);
            }
            ScriptAction::Branch { label, payload } => {
                self.check_label(step, label.as_deref())?;
                let id = self.session.create_branch(payload.clone());
                self.remember(label.as_deref(), id);
            }
            ScriptAction::Navigate { to } => {
                let id = self.resolve(step, to)?;
                match self.session.navigate(&id) {
                    Some(source) => tracing::debug!(step, node = %id, ?source, "navigated"),
                    None => tracing::warn!(step, node = %id, "navigation target not in tree"),
                }
            }
            ScriptAction::Snapshot => {
                if !self.session.save_snapshot() {
                    tracing::warn!(step, "snapshot skipped, no active node");
                }
            }
        }
        Ok(())
    }

    /// Session after replay
    #[inline]
    #[must_use]
    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    /// Node labels
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &BTreeMap<String, NodeId> {
        &self.labels
    }

    /// Node for a label
    #[must_use]
    pub fn labelled(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }

    /// Plain-text report: outline, labels, then visible step kinds
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = sage_tree::outline(self.session.tree());
        if !self.labels.is_empty() {
            out.push('\n');
            for (label, id) in &self.labels {
                let _ = writeln!(out, "{label} = {}", id.short());
            }
        }
        let kinds: Vec<&str> = self.session.state().kinds().map(|k| k.as_str()).collect();
        let _ = write!(out, "\nvisible: {}\n", kinds.join(", "));
        out
    }

    /// Machine-readable report
    #[must_use]
    pub fn report(&self) -> ReplayReport<'_> {
        ReplayReport {
            tree: self.session.tree(),
            labels: &self.labels,
            state: self.session.state(),
        }
    }

    fn check_label(&self, step: usize, label: Option<&str>) -> Result<(), ScriptError> {
        match label {
            Some(label) if self.labels.contains_key(label) => Err(ScriptError::DuplicateLabel {
                step,
                label: label.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn remember(&mut self, label: Option<&str>, id: NodeId) {
        if let Some(label) = label {
            self.labels.insert(label.to_string(), id);
        }
    }

    fn resolve(&self, step: usize, target: &str) -> Result<NodeId, ScriptError> {
        self.labelled(target)
            .or_else(|| target.parse().ok())
            .ok_or_else(|| ScriptError::UnknownTarget {
                step,
                target: target.to_string(),
            })
    }
}

/// Serializable view of a finished replay
#[derive(Debug, Serialize)]
pub struct ReplayReport<'a> {
    /// Full tree
    pub tree: &'a WorkflowTree,
    /// Node labels
    pub labels: &'a BTreeMap<String, NodeId>,
    /// Visible step state
    pub state: &'a StepData,
}
