//! Progress sink that forwards pipeline events to `tracing`.
//!
//! The driver binary has no dashboard; status transitions, progress
//! percentages, and log lines go to structured logs instead. Preview
//! snapshots arrive on every streamed token, so only their size is
//! logged, at debug level.

use polaris_core::{ProgressEvent, ProgressSink};
use tracing::{debug, error, info};

/// Sink for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_event(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Status(status) => {
                info!(status = status.as_str(), "pipeline status changed");
            }
            ProgressEvent::Progress(percent) => {
                info!(percent = *percent, "pipeline progress");
            }
            ProgressEvent::Log(line) => info!("{line}"),
            ProgressEvent::Preview(text) => {
                debug!(chars = text.chars().count(), "report preview grew");
            }
            ProgressEvent::Failed(message) => {
                error!(message = %message, "pipeline run failed");
            }
        }
    }
}
