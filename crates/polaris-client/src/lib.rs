//! GLM API client for the Polaris policy simulation.
//!
//! Everything Polaris knows about the vendor lives here: the
//! chat-completion transport (buffered and streaming), translation of
//! vendor error codes into human-readable messages, best-effort JSON
//! recovery from model output, a bounded retry wrapper, a
//! bounded-concurrency scheduler for respecting per-model quotas, and
//! the asynchronous batch-job protocol.
//!
//! The crate is deliberately type-free about the simulation domain: it
//! moves strings and JSON values. `polaris-core` owns the prompts and
//! the typed interpretation of responses.

pub mod batch;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod retry;
pub mod scheduler;

pub use batch::{BatchClient, BatchLine, request_line};
pub use chat::{ChatClient, ChatMessage, ChatOptions, Role};
pub use config::{LlmConfig, ModelTier};
pub use error::ClientError;
pub use extract::extract_json;
pub use retry::{RetryPolicy, with_retry};
pub use scheduler::run_bounded;
