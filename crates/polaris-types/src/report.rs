//! The final simulation report and its persisted wrapper.
//!
//! A [`SimulationReport`] is produced exactly once at the end of a
//! successful pipeline run and is immutable afterwards. The dashboard
//! stores it inside a [`Report`] wrapper in its reports list.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ReportId;
use crate::simulation::SimulationTurn;

/// Assessment of how well the policy met its goals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PolicyEffectiveness {
    /// How closely observed behavior matched the policy's stated goals.
    pub alignment: String,
    /// How strongly the policy moved company behavior.
    pub impact_strength: String,
    /// Unintended effects and deviations from the goal.
    pub deviations: String,
}

/// A recurring behavior pattern that emerged across companies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EmergentPattern {
    /// Short name for the pattern.
    pub pattern_name: String,
    /// Cause, transmission path, and policy implication.
    pub mechanism: String,
}

/// Forward-looking view of the industry after the simulated horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct IndustryOutlook {
    /// Opportunities the policy opens up.
    #[serde(default)]
    pub new_opportunities: Vec<String>,
    /// Risks the policy introduces or amplifies.
    #[serde(default)]
    pub new_risks: Vec<String>,
    /// Predicted market structure (oligopoly, fragmentation, ...).
    pub market_structure_prediction: String,
}

/// Per-company analysis of the most instructive participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MicroAnalysis {
    /// Company under analysis.
    pub company_name: String,
    /// How strongly the policy affected this company, 0 to 10.
    #[ts(as = "String")]
    pub impact_score: Decimal,
    /// What the company did across the turns and why.
    pub behavior_analysis: String,
    /// What this behavior implies for the policy.
    pub policy_implication: String,
}

/// One concrete recommendation with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RecommendedAction {
    /// The action to take.
    pub action: String,
    /// Why, anchored in simulation evidence.
    pub rationale: String,
}

/// Recommendations layered by time horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PolicyRecommendations {
    /// 0 to 6 months: firefighting and loss-stopping.
    #[serde(default)]
    pub immediate: Vec<RecommendedAction>,
    /// 6 to 24 months: adjustment and optimization.
    #[serde(default)]
    pub mid_term: Vec<RecommendedAction>,
    /// 24 months and beyond: positioning and reform.
    #[serde(default)]
    pub long_term: Vec<RecommendedAction>,
}

/// The terminal artifact of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SimulationReport {
    /// Report title.
    pub title: String,
    /// Three-sentence bottom-line-up-front summary for decision makers.
    pub executive_summary: String,
    /// Goal-match assessment.
    pub policy_effectiveness: PolicyEffectiveness,
    /// Two or three key emergent patterns.
    #[serde(default)]
    pub emergent_patterns: Vec<EmergentPattern>,
    /// Industry structure outlook.
    pub industry_outlook: IndustryOutlook,
    /// Per-company micro analysis.
    #[serde(default)]
    pub micro_analysis: Vec<MicroAnalysis>,
    /// Layered recommendations.
    #[serde(default)]
    pub policy_recommendations: PolicyRecommendations,
    /// Strategy-label glossary (internal code -> plain language).
    #[serde(default)]
    pub glossary: BTreeMap<String, String>,
    /// The full turn history the report was synthesized from.
    ///
    /// Attached by the pipeline after parsing; the model never emits it.
    #[serde(default)]
    pub turn_history: Vec<SimulationTurn>,
}

/// Persisted wrapper around a [`SimulationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Report {
    /// Stable identifier.
    pub id: ReportId,
    /// Title copied from the report content.
    pub title: String,
    /// Date the run completed.
    pub date: NaiveDate,
    /// Number of participating companies.
    pub company_count: u32,
    /// The report itself.
    pub content: SimulationReport,
}
