//! Enumeration types for the Polaris policy simulation.
//!
//! Covers the pipeline status machine the dashboard observes and the
//! fixed vocabularies agents use when predicting their next state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Pipeline status
// ---------------------------------------------------------------------------

/// The status of the AI subsystem as observed by the dashboard.
///
/// One flat machine covers both DNA generation and the five-stage
/// simulation pipeline. A run walks `PolicyParsing` through
/// `SynthesizingReport` in order and ends at `Completed`; any terminal
/// failure resets to `Ready` so a fresh run can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "bindings/")]
pub enum PipelineStatus {
    /// Idle; a new run or DNA generation may start.
    #[default]
    Ready,
    /// A single company's DNA profile is being generated.
    GeneratingDna,
    /// A bulk DNA batch job is in flight.
    GeneratingBatchDna,
    /// Stage 1: the policy text is being parsed and validated.
    PolicyParsing,
    /// Stage 2: participant DNA profiles are being loaded.
    DnaLoading,
    /// Stage 3: decision turns are being executed.
    RunningTurns,
    /// Stage 4: turn history is being aggregated.
    Aggregation,
    /// Stage 5: the final report is being synthesized (streamed).
    SynthesizingReport,
    /// The run finished with a report.
    Completed,
}

impl PipelineStatus {
    /// Human-readable name for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::GeneratingDna => "generating_dna",
            Self::GeneratingBatchDna => "generating_batch_dna",
            Self::PolicyParsing => "policy_parsing",
            Self::DnaLoading => "dna_loading",
            Self::RunningTurns => "running_turns",
            Self::Aggregation => "aggregation",
            Self::SynthesizingReport => "synthesizing_report",
            Self::Completed => "completed",
        }
    }
}

// ---------------------------------------------------------------------------
// Next-state vocabularies
// ---------------------------------------------------------------------------

/// Predicted cash-flow condition after a turn.
///
/// The decision prompt pins the model to this vocabulary; an
/// off-vocabulary value degrades to [`CashFlowStatus::Unknown`] instead
/// of failing the whole decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "bindings/")]
pub enum CashFlowStatus {
    /// Runway measured in months; survival actions dominate.
    Critical,
    /// Operations covered, limited discretionary spend.
    #[default]
    Stable,
    /// Free cash available for aggressive moves.
    Abundant,
    /// The model emitted a value outside the vocabulary.
    #[serde(other)]
    Unknown,
}

/// Predicted competitive position after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "bindings/")]
pub enum MarketPosition {
    /// Sets prices and technology direction for the sector.
    Leader,
    /// Credible threat to the leader.
    #[default]
    Challenger,
    /// Defensible specialty segment.
    Niche,
    /// Losing share and relevance.
    Laggard,
    /// The model emitted a value outside the vocabulary.
    #[serde(other)]
    Unknown,
}
