//! Canned report content for the mock backend.
//!
//! Stable fixtures keep demo runs reproducible and let tests assert
//! exact shapes. The scenario (a methalox engine subsidy) matches the
//! rest of the mock data.

use std::collections::BTreeMap;

use polaris_types::{
    EmergentPattern, IndustryOutlook, MicroAnalysis, PolicyEffectiveness, PolicyRecommendations,
    RecommendedAction, SimulationReport, SimulationTurn,
};
use rust_decimal::Decimal;

/// Text streamed as the report preview during mock synthesis.
pub(crate) const PREVIEW_TEXT: &str = "# Policy Stress-Test Assessment: Methalox Engine Subsidies\n\n\
The subsidy sharply accelerates technology iteration at the head of the field \
while inducing unproductive capacity at the tail. A sunset review in year three \
is advised.\n\n(demo synthesis in progress)";

/// Build the deterministic mock report over the given turn history.
pub(crate) fn build(history: &[SimulationTurn]) -> SimulationReport {
    SimulationReport {
        title: String::from("Policy Stress-Test Assessment: Methalox Engine Subsidies"),
        executive_summary: String::from(
            "The subsidy sharply accelerates technology iteration at the head of the field. \
             It also induces unproductive capacity at the tail. \
             A sunset review with an elimination mechanism is advised for year three.",
        ),
        policy_effectiveness: PolicyEffectiveness {
            alignment: String::from("high: core technology milestones arrive ahead of schedule"),
            impact_strength: String::from(
                "strong: leading firms raise R&D spending by roughly 40%",
            ),
            deviations: String::from(
                "moderate: concentrated procurement lifts raw material prices about 15%",
            ),
        },
        emergent_patterns: vec![
            EmergentPattern {
                pattern_name: String::from("technology route lock-in"),
                mechanism: String::from(
                    "Subsidy criteria favor methalox, so firms abandon kerolox en masse; \
                     supplier consolidation follows; route diversity becomes a policy risk.",
                ),
            },
            EmergentPattern {
                pattern_name: String::from("talent siphoning"),
                mechanism: String::from(
                    "Funded leaders outbid startups for propulsion engineers; core teams \
                     concentrate in three firms; the entry pipeline thins within two turns.",
                ),
            },
        ],
        industry_outlook: IndustryOutlook {
            new_opportunities: vec![
                String::from("earlier commercialization of space tourism services"),
                String::from("an engine export market opens"),
            ],
            new_risks: vec![
                String::from("supply chain delivery slips"),
                String::from("valuation correction after the funding rush"),
            ],
            market_structure_prediction: String::from(
                "from a wide field toward a two-leader oligopoly",
            ),
        },
        micro_analysis: micro_analysis(history),
        policy_recommendations: recommendations(),
        glossary: glossary(),
        turn_history: history.to_vec(),
    }
}

/// Micro analysis derived from the first turn's decisions.
fn micro_analysis(history: &[SimulationTurn]) -> Vec<MicroAnalysis> {
    history
        .first()
        .map(|turn| {
            turn.decisions
                .iter()
                .enumerate()
                .map(|(index, d)| MicroAnalysis {
                    company_name: d.company_name.clone(),
                    impact_score: Decimal::from(
                        8_u32.saturating_sub(u32::try_from(index).unwrap_or(8)),
                    ),
                    behavior_analysis: String::from(
                        "Expanded aggressively, converting subsidy into R&D headcount.",
                    ),
                    policy_implication: String::from(
                        "Low risk aversion turns subsidies into leveraged private capital.",
                    ),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn recommendations() -> PolicyRecommendations {
    PolicyRecommendations {
        immediate: vec![RecommendedAction {
            action: String::from("Cap the per-company subsidy draw"),
            rationale: String::from("Prevents the capacity hoarding observed in early turns."),
        }],
        mid_term: vec![RecommendedAction {
            action: String::from("Tie disbursement tranches to milestone audits"),
            rationale: String::from("Keeps laggards from banking subsidy without delivery."),
        }],
        long_term: vec![RecommendedAction {
            action: String::from("Schedule a sunset review with a competition assessment"),
            rationale: String::from("The simulated field trends toward a two-leader oligopoly."),
        }],
    }
}

fn glossary() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            String::from("R&D_Surge"),
            String::from("aggressive increase in research spending"),
        ),
        (
            String::from("Gov_Lobbying"),
            String::from("petitioning for targeted subsidies"),
        ),
        (
            String::from("Supply_Chain_Lock"),
            String::from("locking upstream critical suppliers"),
        ),
    ])
}
