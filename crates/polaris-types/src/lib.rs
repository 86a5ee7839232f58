//! Shared type definitions for the Polaris policy simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Polaris workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the decision-support dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Pipeline status and next-state vocabularies
//! - [`dna`] -- Company roster entries and strategic DNA profiles
//! - [`simulation`] -- Turn and decision records
//! - [`report`] -- The final report and its persisted wrapper

pub mod dna;
pub mod enums;
pub mod ids;
pub mod report;
pub mod simulation;

// Re-export all public types at crate root for convenience.
pub use dna::{Company, EnterpriseDna, LegacyProfile, PolicySensitivities, RiskProfile};
pub use enums::{CashFlowStatus, MarketPosition, PipelineStatus};
pub use ids::{CompanyId, ReportId};
pub use report::{
    EmergentPattern, IndustryOutlook, MicroAnalysis, PolicyEffectiveness, PolicyRecommendations,
    RecommendedAction, Report, SimulationReport,
};
pub use simulation::{AgentDecision, NextState, PolicyStructure, SimulationTurn, StrategicMemo};
