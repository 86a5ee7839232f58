//! Turn-by-turn simulation records.
//!
//! Each simulation turn collects one [`AgentDecision`] per participating
//! company. Turns are append-only: later turns read earlier ones as
//! context but never mutate them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CashFlowStatus, MarketPosition};
use crate::ids::CompanyId;

/// Key levers extracted from a policy text by the parsing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "bindings/")]
pub struct PolicyStructure {
    /// Incentive clauses (subsidies, tax relief, procurement set-asides).
    #[serde(default)]
    pub incentives: Vec<String>,
    /// Constraint clauses (compliance bars, safety red lines, quotas).
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// The structured memo a company CEO produces for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StrategicMemo {
    /// Key environmental signals the company noticed.
    pub perception: String,
    /// First-person internal monologue weighing the options.
    pub internal_monologue: String,
    /// Concrete actions committed to this turn.
    pub actions: Vec<String>,
    /// Why these actions follow from the company's DNA and the policy.
    pub reasoning: String,
}

/// Predicted company state after the turn resolves.
///
/// Field names are `snake_case` on the wire -- the decision schema grew
/// this block later than the `camelCase` memo fields and the dashboard
/// already depends on the mixed casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NextState {
    /// Cash runway after this turn's commitments.
    pub cash_flow_status: CashFlowStatus,
    /// Competitive standing after this turn.
    pub market_position: MarketPosition,
    /// Alignment with the policy, 0 to 100.
    pub policy_compliance_score: u8,
    /// Technology readiness level, 1 to 9.
    pub tech_readiness_level: u8,
}

/// One company's decision within a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AgentDecision {
    /// The deciding company.
    pub company_id: CompanyId,
    /// Display name, denormalized for report rendering.
    pub company_name: String,
    /// The strategic memo backing the decision.
    pub memo: StrategicMemo,
    /// Predicted next state; absent for fallback decisions.
    #[serde(default, rename = "next_state")]
    pub next_state: Option<NextState>,
}

/// One round of the simulation: every participant decides once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationTurn {
    /// 1-based turn number.
    pub turn: u32,
    /// Optional calendar label (e.g. "2026 H1").
    #[serde(default)]
    pub year: Option<String>,
    /// Decisions in roster order, one per participant.
    pub decisions: Vec<AgentDecision>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_parses_mixed_casing() {
        let raw = r#"{
            "companyId": "01945c2a-3b4f-7def-8a12-bc34567890ab",
            "companyName": "Meridian Launch",
            "memo": {
                "perception": "Strong methalox subsidy signal.",
                "internalMonologue": "Cash is tight but the window is open.",
                "actions": ["Accelerate engine qualification"],
                "reasoning": "Subsidy offsets the burn rate."
            },
            "next_state": {
                "cash_flow_status": "Critical",
                "market_position": "Challenger",
                "policy_compliance_score": 82,
                "tech_readiness_level": 6
            }
        }"#;
        let decision: Result<AgentDecision, _> = serde_json::from_str(raw);
        assert!(decision.is_ok(), "decision with next_state should parse");
        let state = decision.ok().and_then(|d| d.next_state);
        assert_eq!(
            state.map(|s| s.cash_flow_status),
            Some(CashFlowStatus::Critical)
        );
    }

    #[test]
    fn decision_without_next_state_parses() {
        let raw = r#"{
            "companyId": "01945c2a-3b4f-7def-8a12-bc34567890ab",
            "companyName": "Aurora Dynamics",
            "memo": {
                "perception": "p",
                "internalMonologue": "m",
                "actions": [],
                "reasoning": "r"
            }
        }"#;
        let decision: Result<AgentDecision, _> = serde_json::from_str(raw);
        assert!(decision.is_ok());
        assert!(decision.ok().and_then(|d| d.next_state).is_none());
    }

    #[test]
    fn policy_structure_defaults_empty() {
        let parsed: Result<PolicyStructure, _> = serde_json::from_str("{}");
        assert_eq!(parsed.ok(), Some(PolicyStructure::default()));
    }
}
