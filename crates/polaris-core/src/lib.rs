//! Simulation pipeline and orchestration for Polaris.
//!
//! This crate turns a company roster and a policy text into a
//! multi-turn game simulation and a final assessment report:
//!
//! ```text
//! validate -> parse policy -> load DNA -> N decision turns
//!          -> aggregate -> stream report synthesis
//! ```
//!
//! The model operations behind each stage go through a
//! [`SimulationBackend`], selected at startup: the live GLM backend
//! when a credential is configured, a deterministic mock otherwise.
//! Progress flows to observers through [`ProgressSink`] events.
//!
//! [`SimulationBackend`]: backend::SimulationBackend
//! [`ProgressSink`]: progress::ProgressSink

pub mod backend;
pub mod dna;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompt;
mod report_fixture;

pub use backend::{LiveBackend, MockBackend, SimulationBackend};
pub use dna::{DnaOutcome, generate_dna_batch, generate_missing_dna};
pub use error::PipelineError;
pub use pipeline::{SimulationPipeline, SimulationRequest, fallback_decision};
pub use progress::{NoOpSink, ProgressEvent, ProgressSink, SessionState};
pub use prompt::{PromptEngine, RenderedPrompt};
