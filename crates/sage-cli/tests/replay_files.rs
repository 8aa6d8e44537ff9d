//! Replay scripts loaded from disk

use pretty_assertions::assert_eq;
use sage_cli::{Replay, ReplayScript, ScriptError};
use sage_tree::{RunStatus, StepKind};
use std::io::Write;

const FULL_RUN: &str = r#"
steps:
  - action: execute
    label: search
    payload:
      type: papers
      data:
        queries: ["graph transformers"]
        papers:
          - { id: p1, title: Graphormer, abstract: "Transformers on graphs" }
  - action: execute
    label: method
    payload:
      type: method
      data: { hypothesis: positional encodings matter, method: ablate encodings }
  - action: execute
    payload:
      type: experiment-config
      data:
        name: ablation
        parameters: { lr: 0.0003, layers: 6 }
  - action: execute
    label: run
    payload:
      type: experiment-run
      data: { run_id: r-42, status: failed, logs: "CUDA OOM" }
  - action: branch
    label: retry
    payload:
      type: experiment-run
      data: { run_id: r-43, status: completed, results: { accuracy: 0.82 } }
  - action: snapshot
  - action: navigate
    to: run
"#;

fn script_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn replays_script_from_file() {
    let file = script_file(FULL_RUN);
    let script = ReplayScript::load(file.path()).unwrap();
    let replay = Replay::run(&script).unwrap();

    let session = replay.session();
    let tree = session.tree();
    assert_eq!(tree.len(), 5);
    assert!(tree.validate().is_empty());

    let run = replay.labelled("run").unwrap();
    let retry = replay.labelled("retry").unwrap();
    assert_eq!(tree.node(&retry).unwrap().parent_id, tree.node(&run).unwrap().parent_id);
    assert_eq!(tree.node(&retry).unwrap().branch_index, 1);

    // Back on the failed run, its own snapshot is visible.
    assert_eq!(session.active_node_id(), Some(run));
    let state = session.state();
    assert_eq!(state.experiment_run().unwrap().status, RunStatus::Failed);
    assert_eq!(
        state.kinds().collect::<Vec<_>>(),
        vec![
            StepKind::Papers,
            StepKind::Method,
            StepKind::ExperimentConfig,
            StepKind::ExperimentRun,
        ]
    );
    assert_eq!(
        state.papers().unwrap().papers[0].summary.as_deref(),
        Some("Transformers on graphs")
    );
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = ReplayScript::load(&path).unwrap_err();
    assert!(matches!(err, ScriptError::Io { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn payload_type_must_be_known() {
    let file = script_file(
        "steps:\n  - action: execute\n    payload:\n      type: peer-review\n      data: {}\n",
    );
    let err = ReplayScript::load(file.path()).unwrap_err();
    assert!(matches!(err, ScriptError::Parse(_)));
}
