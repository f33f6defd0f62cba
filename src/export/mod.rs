//! Frame pacing and the public export orchestrator.

/// `initialize` / `add_frame` / `commit_file` orchestration.
pub mod exporter;
/// Repeated-frame detection and timestamp assignment.
pub mod sequencer;
