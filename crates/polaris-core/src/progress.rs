//! Progress reporting from the pipeline to its observers.
//!
//! The pipeline emits [`ProgressEvent`]s through a [`ProgressSink`] as it
//! advances: status transitions, a progress percentage, human-readable
//! log lines, and the growing report preview during streaming synthesis.
//! [`SessionState`] is the standard sink: it applies events onto the
//! fields the dashboard reads. All of it is ephemeral -- reset at the
//! start of each run, kept visible after a failure for postmortem until
//! the next run clears it.

use polaris_types::{PipelineStatus, Report, SimulationReport};

/// One progress notification from the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The pipeline entered a new status.
    Status(PipelineStatus),
    /// Overall progress, 0 to 100, non-decreasing within a run.
    Progress(u8),
    /// A human-readable log line.
    Log(String),
    /// The accumulated report text so far (streaming synthesis).
    Preview(String),
    /// The run failed with this terminal error message.
    Failed(String),
}

/// Receiver of pipeline progress events.
///
/// Implementations can update dashboard state, write tracing logs, or
/// record events for assertions. The pipeline is the only writer; sinks
/// only observe.
pub trait ProgressSink: Send {
    /// Called for every event, in emission order.
    fn on_event(&mut self, event: &ProgressEvent);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    fn on_event(&mut self, _event: &ProgressEvent) {}
}

/// Application-visible state of the AI subsystem.
///
/// Owned by the embedding application and passed to the pipeline by
/// reference; created at startup, mutated by pipeline events, reset on
/// every new run. Exactly one of `report` / `error` is set once a run
/// reaches a terminal state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Current pipeline status.
    pub status: PipelineStatus,
    /// Progress percentage of the current run.
    pub progress: u8,
    /// Log lines of the current run, append-only.
    pub logs: Vec<String>,
    /// Streaming preview of the report being synthesized.
    pub preview: String,
    /// Terminal error of the last run, if it failed.
    pub error: Option<String>,
    /// Report content of the last run, if it succeeded.
    pub report: Option<SimulationReport>,
    /// Persisted reports, newest first.
    pub reports: Vec<Report>,
}

impl SessionState {
    /// Fresh state with an empty report list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all per-run state ahead of a new run.
    ///
    /// The persisted `reports` list survives resets.
    pub fn reset_run(&mut self) {
        self.status = PipelineStatus::Ready;
        self.progress = 0;
        self.logs.clear();
        self.preview.clear();
        self.error = None;
        self.report = None;
    }

    /// Record a completed run's report: keep the content for the result
    /// view and prepend the wrapper to the persisted list.
    pub fn record_report(&mut self, report: Report) {
        self.report = Some(report.content.clone());
        self.reports.insert(0, report);
    }
}

impl ProgressSink for SessionState {
    fn on_event(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Status(status) => self.status = *status,
            ProgressEvent::Progress(percent) => self.progress = *percent,
            ProgressEvent::Log(line) => self.logs.push(line.clone()),
            ProgressEvent::Preview(text) => {
                self.preview.clear();
                self.preview.push_str(text);
            }
            ProgressEvent::Failed(message) => {
                self.error = Some(message.clone());
                self.report = None;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_run_state_but_keeps_reports() {
        let mut session = SessionState::new();
        session.progress = 60;
        session.logs.push(String::from("step 3/5"));
        session.preview.push_str("partial");
        session.error = Some(String::from("boom"));

        session.reset_run();

        assert_eq!(session.progress, 0);
        assert!(session.logs.is_empty());
        assert!(session.preview.is_empty());
        assert!(session.error.is_none());
        assert_eq!(session.status, PipelineStatus::Ready);
    }

    #[test]
    fn preview_events_replace_not_append() {
        let mut session = SessionState::new();
        session.on_event(&ProgressEvent::Preview(String::from("Hel")));
        session.on_event(&ProgressEvent::Preview(String::from("Hello")));
        assert_eq!(session.preview, "Hello");
    }

    #[test]
    fn failure_clears_any_report() {
        let mut session = SessionState::new();
        session.on_event(&ProgressEvent::Failed(String::from("vendor down")));
        assert_eq!(session.error.as_deref(), Some("vendor down"));
        assert!(session.report.is_none());
    }
}
