//! Step kinds of the assisted-research workflow
//!
//! The workflow is a fixed, ordered sequence of stages. Ordering matters:
//! a linear step attaches to a node of the preceding kind, and revising a
//! step invalidates everything downstream of it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stage of the research workflow, in workflow order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Literature search and paper selection
    Papers,
    /// Hypothesis and method generation
    Method,
    /// Experiment configuration
    ExperimentConfig,
    /// Experiment code generation
    CodeGeneration,
    /// Experiment execution on the backend
    ExperimentRun,
    /// Result analysis
    Analysis,
    /// Paper drafting
    PaperWriting,
}

impl StepKind {
    /// All kinds in workflow order
    pub const ALL: [StepKind; 7] = [
        StepKind::Papers,
        StepKind::Method,
        StepKind::ExperimentConfig,
        StepKind::CodeGeneration,
        StepKind::ExperimentRun,
        StepKind::Analysis,
        StepKind::PaperWriting,
    ];

    /// Zero-based position in the workflow
    #[inline]
    #[must_use]
    pub fn position(self) -> usize {
        match self {
            StepKind::Papers => 0,
            StepKind::Method => 1,
            StepKind::ExperimentConfig => 2,
            StepKind::CodeGeneration => 3,
            StepKind::ExperimentRun => 4,
            StepKind::Analysis => 5,
            StepKind::PaperWriting => 6,
        }
    }

    /// The step immediately before this one, if any
    #[inline]
    #[must_use]
    pub fn previous(self) -> Option<StepKind> {
        self.position()
            .checked_sub(1)
            .map(|idx| Self::ALL[idx])
    }

    /// The step immediately after this one, if any
    #[inline]
    #[must_use]
    pub fn next(self) -> Option<StepKind> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// Every step strictly after this one
    #[inline]
    #[must_use]
    pub fn downstream(self) -> &'static [StepKind] {
        &Self::ALL[self.position() + 1..]
    }

    /// Wire name (kebab-case)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Papers => "papers",
            StepKind::Method => "method",
            StepKind::ExperimentConfig => "experiment-config",
            StepKind::CodeGeneration => "code-generation",
            StepKind::ExperimentRun => "experiment-run",
            StepKind::Analysis => "analysis",
            StepKind::PaperWriting => "paper-writing",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a step kind from its wire name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step kind: {0}")]
pub struct UnknownStepKind(pub String);

impl FromStr for StepKind {
    type Err = UnknownStepKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownStepKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_workflow_order() {
        assert!(StepKind::Papers < StepKind::Method);
        assert!(StepKind::Analysis < StepKind::PaperWriting);
        for (idx, kind) in StepKind::ALL.iter().enumerate() {
            assert_eq!(kind.position(), idx);
        }
    }

    #[test]
    fn previous_and_next() {
        assert_eq!(StepKind::Papers.previous(), None);
        assert_eq!(StepKind::Method.previous(), Some(StepKind::Papers));
        assert_eq!(StepKind::PaperWriting.next(), None);
        assert_eq!(
            StepKind::CodeGeneration.next(),
            Some(StepKind::ExperimentRun)
        );
    }

    #[test]
    fn downstream_excludes_self() {
        assert_eq!(
            StepKind::Analysis.downstream(),
            &[StepKind::PaperWriting]
        );
        assert!(StepKind::PaperWriting.downstream().is_empty());
        assert_eq!(StepKind::Papers.downstream().len(), 6);
    }

    #[test]
    fn wire_names_round_trip() {
        for kind in StepKind::ALL {
            assert_eq!(kind.as_str().parse::<StepKind>(), Ok(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("hypothesis".parse::<StepKind>().is_err());
    }
}
