//! Error types for the simulation pipeline.
//!
//! Uses `thiserror` for typed errors that surface through the whole
//! pipeline: precondition validation, vendor client failures, template
//! rendering, and final-report parsing. Validation messages carry no
//! prefix because they surface verbatim in the dashboard.

use polaris_client::ClientError;

/// Errors that can occur during a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A precondition failed before any network call was attempted.
    #[error("{0}")]
    Validation(String),

    /// The vendor client failed (transport, vendor code, malformed JSON).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A prompt template could not be loaded or rendered.
    #[error("template error: {0}")]
    Template(String),

    /// The final report JSON did not match the expected schema.
    #[error("the synthesized report was not usable: {0}")]
    Report(String),
}
