//! Company roster entries and their strategic DNA profiles.
//!
//! An [`EnterpriseDna`] is generated once per company by an LLM call and
//! treated as immutable afterwards; regeneration replaces the whole
//! profile. Field names serialize in `camelCase` because the same JSON
//! shape flows through the model prompts and to the dashboard.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::CompanyId;

// ---------------------------------------------------------------------------
// EnterpriseDna
// ---------------------------------------------------------------------------

/// Strategic profile of a simulated company.
///
/// R&D effectiveness is scored against an industry benchmark of 1.0
/// (the fastest-iterating launch provider); sensitivities are 0.0 to 1.0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EnterpriseDna {
    /// Company name as identified by the analyst model.
    pub name: String,
    /// Strategic archetype (e.g. "technology disruptor", "state-backed").
    pub archetype: String,
    /// One-line profile summary.
    pub description: String,
    /// R&D conversion efficiency, roughly 0.1 to 1.2.
    #[ts(as = "String")]
    pub rd_effectiveness: Decimal,
    /// Stated corporate values.
    #[serde(default)]
    pub corporate_values: Vec<String>,
    /// Appetite for risk.
    pub risk_profile: RiskProfile,
    /// Structural burdens carried from the company's history.
    pub legacy: LegacyProfile,
    /// How strongly the company reacts to specific policy levers.
    pub policy_sensitivities: PolicySensitivities,
    /// Core technology bets (e.g. reusable boosters, methalox engines).
    #[serde(default)]
    pub technology_focus: Vec<String>,
    /// Primary funding source (venture capital, state budget, revenue).
    pub funding_source: String,
    /// Dominant internal culture in a phrase.
    pub corporate_culture: String,
}

/// Ambition and financial risk posture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct RiskProfile {
    /// What the company is playing for (survival, share, dominance).
    pub ambition_level: String,
    /// Aversion to financial risk (low, medium, high).
    pub financial_risk_aversion: String,
}

/// Structural burdens inherited from the company's past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LegacyProfile {
    /// Accumulated technical debt (low, medium, high).
    pub technological_debt: String,
    /// Weight of existing regulatory obligations (low, medium, high).
    pub regulatory_burden: String,
}

/// Reaction strength to the two main policy levers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PolicySensitivities {
    /// Responsiveness to subsidies, 0.0 to 1.0.
    #[ts(as = "String")]
    pub subsidy_sensitivity: Decimal,
    /// Responsiveness to regulation, 0.0 to 1.0.
    #[ts(as = "String")]
    pub regulation_sensitivity: Decimal,
}

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

/// A roster entry: one company that can participate in simulations.
///
/// The roster itself is owned by the dashboard (persisted client-side);
/// the pipeline only reads entries and the DNA generators only write the
/// `dna` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Company {
    /// Stable identifier; also the key batch jobs map results back to.
    pub id: CompanyId,
    /// Display name.
    pub name: String,
    /// Source URL or free-form handle the analyst model starts from.
    pub url: String,
    /// Country of incorporation, `"unknown"` when not provided.
    pub country: String,
    /// When the entry was added to the roster.
    #[serde(default)]
    pub created_date: Option<NaiveDate>,
    /// Strategic profile; `None` until generated.
    #[serde(default)]
    pub dna: Option<EnterpriseDna>,
    /// True while a DNA generation call for this entry is in flight.
    #[serde(default)]
    pub is_generating: bool,
}

impl Company {
    /// Create a fresh roster entry with no DNA, dated `created`.
    pub fn new(name: impl Into<String>, url: impl Into<String>, created: NaiveDate) -> Self {
        Self {
            id: CompanyId::new(),
            name: name.into(),
            url: url.into(),
            country: String::from("unknown"),
            created_date: Some(created),
            dna: None,
            is_generating: false,
        }
    }

    /// Whether this entry is ready to participate in a simulation.
    pub const fn has_dna(&self) -> bool {
        self.dna.is_some()
    }
}
