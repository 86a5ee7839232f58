//! Simulation backend abstraction and implementations.
//!
//! Defines an enum-based dispatch for the model operations the pipeline
//! needs, avoiding the dyn-compatibility issues with async trait
//! methods. The [`LiveBackend`] drives the GLM API through
//! `polaris-client`; the [`MockBackend`] produces deterministic fixtures
//! so the pipeline runs end-to-end without a credential.
//!
//! Selection happens once at startup based on credential presence --
//! business logic never checks for an API key again.

use std::time::Duration;

use polaris_client::{
    ChatClient, ChatMessage, ChatOptions, ClientError, LlmConfig, ModelTier, RetryPolicy,
    extract_json, with_retry,
};
use polaris_types::{
    AgentDecision, CashFlowStatus, Company, CompanyId, EnterpriseDna, LegacyProfile,
    MarketPosition, NextState, PolicySensitivities, PolicyStructure, RiskProfile,
    SimulationReport, SimulationTurn, StrategicMemo,
};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::PipelineError;
use crate::prompt::PromptEngine;
use crate::report_fixture;

/// Character budget for the policy excerpt in the parsing stage.
const POLICY_ANALYSIS_EXCERPT: usize = 500;

/// Character budget for the policy excerpt in turn and report prompts.
const POLICY_PROMPT_EXCERPT: usize = 5000;

// ---------------------------------------------------------------------------
// Unified backend enum (dyn-compatible alternative to async trait)
// ---------------------------------------------------------------------------

/// A backend that can execute the pipeline's model operations.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
pub enum SimulationBackend {
    /// Live GLM API backend.
    Live(LiveBackend),
    /// Deterministic fixture backend, used when no credential is set.
    Mock(MockBackend),
}

impl SimulationBackend {
    /// Select a backend from the environment.
    ///
    /// With `POLARIS_API_KEY` set, builds a [`LiveBackend`] (loading
    /// prompt templates from `templates_dir`); without it, falls back to
    /// the [`MockBackend`] with a warning.
    pub fn from_env(templates_dir: &str) -> Result<Self, PipelineError> {
        if std::env::var("POLARIS_API_KEY").is_err() {
            warn!("POLARIS_API_KEY is not set, using the deterministic mock backend");
            return Ok(Self::Mock(MockBackend::new()));
        }
        let config = LlmConfig::from_env()?;
        let prompts = PromptEngine::new(templates_dir)?;
        Ok(Self::Live(LiveBackend::new(config, prompts)))
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Live(_) => "live",
            Self::Mock(_) => "mock",
        }
    }

    /// Scan the policy text and extract its incentive and constraint
    /// clauses.
    pub async fn analyze_policy(&self, policy_text: &str) -> Result<PolicyStructure, PipelineError> {
        match self {
            Self::Live(backend) => backend.analyze_policy(policy_text).await,
            Self::Mock(backend) => backend.analyze_policy().await,
        }
    }

    /// Generate a DNA profile for one company.
    pub async fn generate_dna(&self, company: &Company) -> Result<EnterpriseDna, PipelineError> {
        match self {
            Self::Live(backend) => backend.generate_dna(company).await,
            Self::Mock(backend) => backend.generate_dna(company).await,
        }
    }

    /// Produce one company's decision for one turn, given the policy and
    /// the completed turn history.
    pub async fn decide(
        &self,
        company: &Company,
        policy_text: &str,
        turn: u32,
        history: &[SimulationTurn],
    ) -> Result<AgentDecision, PipelineError> {
        match self {
            Self::Live(backend) => backend.decide(company, policy_text, turn, history).await,
            Self::Mock(backend) => backend.decide(company, turn, history).await,
        }
    }

    /// Synthesize the final report from the full turn history, streaming
    /// accumulated text snapshots through `on_token`.
    pub async fn synthesize_report(
        &self,
        policy_text: &str,
        companies: &[Company],
        history: &[SimulationTurn],
        on_token: impl FnMut(&str),
    ) -> Result<SimulationReport, PipelineError> {
        match self {
            Self::Live(backend) => {
                backend
                    .synthesize_report(policy_text, companies, history, on_token)
                    .await
            }
            Self::Mock(backend) => backend.synthesize_report(history, on_token).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Live backend
// ---------------------------------------------------------------------------

/// Backend that drives the GLM chat-completion API.
///
/// The smart tier handles game-theoretic reasoning (turn decisions,
/// report synthesis); the fast tier handles search-backed DNA lookups.
pub struct LiveBackend {
    chat: ChatClient,
    prompts: PromptEngine,
    retry: RetryPolicy,
}

impl LiveBackend {
    /// Create a live backend from configuration and loaded templates.
    pub fn new(config: LlmConfig, prompts: PromptEngine) -> Self {
        let retry = RetryPolicy::new(config.retry_attempts, config.retry_initial_delay);
        Self {
            chat: ChatClient::new(config),
            prompts,
            retry,
        }
    }

    /// The client configuration (model names, tiers).
    pub const fn config(&self) -> &LlmConfig {
        self.chat.config()
    }

    async fn analyze_policy(&self, policy_text: &str) -> Result<PolicyStructure, PipelineError> {
        let context = serde_json::json!({
            "excerpt": excerpt(policy_text, POLICY_ANALYSIS_EXCERPT),
        });
        let prompt = self.prompts.policy(&context)?;
        let content = self
            .complete_with_retry(ModelTier::Smart, &prompt.system, &prompt.user, ChatOptions::json())
            .await?;

        let value = extract_json(&content)?;
        serde_json::from_value(value).map_err(|e| {
            PipelineError::Client(ClientError::MalformedResponse(format!(
                "policy structure did not match the expected shape: {e}"
            )))
        })
    }

    async fn generate_dna(&self, company: &Company) -> Result<EnterpriseDna, PipelineError> {
        let context = serde_json::json!({
            "company": {"name": company.name, "url": company.url},
        });
        let prompt = self.prompts.dna(&context)?;
        let content = self
            .complete_with_retry(
                ModelTier::Fast,
                &prompt.system,
                &prompt.user,
                ChatOptions::json_with_search(),
            )
            .await?;

        let value = extract_json(&content)?;
        serde_json::from_value(value).map_err(|e| {
            PipelineError::Client(ClientError::MalformedResponse(format!(
                "DNA profile did not match the expected shape: {e}"
            )))
        })
    }

    async fn decide(
        &self,
        company: &Company,
        policy_text: &str,
        turn: u32,
        history: &[SimulationTurn],
    ) -> Result<AgentDecision, PipelineError> {
        let context = serde_json::json!({
            "company": {"name": company.name, "dna": company.dna},
            "turn": turn,
            "policy_excerpt": excerpt(policy_text, POLICY_PROMPT_EXCERPT),
            "history_summary": history_summary(history),
        });
        let prompt = self.prompts.turn(&context)?;
        let content = self
            .complete_with_retry(ModelTier::Smart, &prompt.system, &prompt.user, ChatOptions::json())
            .await?;

        let value = extract_json(&content)?;
        let memo: StrategicMemo = serde_json::from_value(value.clone()).map_err(|e| {
            PipelineError::Client(ClientError::MalformedResponse(format!(
                "decision memo did not match the expected shape: {e}"
            )))
        })?;
        // The predicted-state block is best-effort: an off-shape value
        // degrades the field, not the decision.
        let next_state = value
            .get("next_state")
            .cloned()
            .and_then(|v| serde_json::from_value::<NextState>(v).ok());

        Ok(AgentDecision {
            company_id: company.id,
            company_name: company.name.clone(),
            memo,
            next_state,
        })
    }

    async fn synthesize_report(
        &self,
        policy_text: &str,
        companies: &[Company],
        history: &[SimulationTurn],
        on_token: impl FnMut(&str),
    ) -> Result<SimulationReport, PipelineError> {
        let names: Vec<&str> = companies.iter().map(|c| c.name.as_str()).collect();
        let context = serde_json::json!({
            "policy_excerpt": excerpt(policy_text, POLICY_PROMPT_EXCERPT),
            "company_names": names.join(", "),
            "history_json": serde_json::to_string_pretty(&history_events(history))
                .unwrap_or_default(),
        });
        let prompt = self.prompts.report(&context)?;

        let model = self.config().model(ModelTier::Smart).to_owned();
        let messages = [
            ChatMessage::system(prompt.system),
            ChatMessage::user(prompt.user),
        ];
        let content = self
            .chat
            .complete_streaming(&model, &messages, ChatOptions::json(), on_token)
            .await?;

        let value = extract_json(&content)?;
        let mut report: SimulationReport = serde_json::from_value(value).map_err(|e| {
            PipelineError::Report(format!("report JSON did not match the expected schema: {e}"))
        })?;
        report.turn_history = history.to_vec();
        Ok(report)
    }

    /// One buffered call under the retry policy.
    async fn complete_with_retry(
        &self,
        tier: ModelTier,
        system: &str,
        user: &str,
        options: ChatOptions,
    ) -> Result<String, PipelineError> {
        let model = self.config().model(tier).to_owned();
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        let content = with_retry(self.retry, || {
            self.chat.complete(&model, &messages, options)
        })
        .await?;
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

/// Deterministic fixture backend.
///
/// Used when no API credential is configured, and by tests. Produces
/// stable, realistic-looking data with short synthetic delays so the
/// dashboard experience resembles a live run. Fault injection via
/// [`MockBackend::with_failing`] makes selected companies' decision
/// calls fail, exercising the pipeline's fallback substitution.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    failing: std::collections::BTreeSet<CompanyId>,
}

impl MockBackend {
    /// A mock backend where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock backend whose decision calls fail for the given companies.
    pub fn with_failing(failing: impl IntoIterator<Item = CompanyId>) -> Self {
        Self {
            failing: failing.into_iter().collect(),
        }
    }

    async fn analyze_policy(&self) -> Result<PolicyStructure, PipelineError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(PolicyStructure {
            incentives: vec![
                String::from("R&D subsidies"),
                String::from("tax relief"),
                String::from("talent acquisition programs"),
            ],
            constraints: vec![
                String::from("emission standards"),
                String::from("production safety red lines"),
            ],
        })
    }

    async fn generate_dna(&self, company: &Company) -> Result<EnterpriseDna, PipelineError> {
        tokio::time::sleep(Duration::from_millis(800)).await;
        Ok(mock_dna(company))
    }

    async fn decide(
        &self,
        company: &Company,
        turn: u32,
        history: &[SimulationTurn],
    ) -> Result<AgentDecision, PipelineError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if self.failing.contains(&company.id) {
            return Err(PipelineError::Client(ClientError::Vendor {
                code: String::from("1303"),
                message: String::from("request rate too high for this API, reduce the call frequency"),
            }));
        }

        let readiness = 4_u8.saturating_add(u8::try_from(turn.min(5)).unwrap_or(5));
        Ok(AgentDecision {
            company_id: company.id,
            company_name: company.name.clone(),
            memo: StrategicMemo {
                perception: format!(
                    "Reviewed {} completed rounds; the methalox support clause bears directly on our roadmap.",
                    history.len()
                ),
                internal_monologue: format!(
                    "Cash is tight, but sitting out round {turn} would hand the window to whoever moves first."
                ),
                actions: vec![
                    format!("Start special R&D program {turn} with a 15% budget increase"),
                    String::from("Apply for a coastal launch-site slot"),
                    String::from("Lock a long-term carbon-composite supply agreement"),
                ],
                reasoning: format!(
                    "{} expands aggressively while the policy window is open; the technology moat outweighs the short-term cash strain.",
                    company.name
                ),
            },
            next_state: Some(NextState {
                cash_flow_status: CashFlowStatus::Stable,
                market_position: MarketPosition::Challenger,
                policy_compliance_score: 85,
                tech_readiness_level: readiness.min(9),
            }),
        })
    }

    async fn synthesize_report(
        &self,
        history: &[SimulationTurn],
        mut on_token: impl FnMut(&str),
    ) -> Result<SimulationReport, PipelineError> {
        // Stream the preview in small slices so the dashboard sees the
        // same running-total behavior as a live run.
        let preview = report_fixture::PREVIEW_TEXT;
        let chars: Vec<char> = preview.chars().collect();
        let mut accumulated = String::new();
        for chunk in chars.chunks(5) {
            accumulated.extend(chunk.iter());
            on_token(&accumulated);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Ok(report_fixture::build(history))
    }
}

/// Deterministic DNA derived from the company's name and URL.
fn mock_dna(company: &Company) -> EnterpriseDna {
    let handle = format!("{} {}", company.name, company.url).to_lowercase();

    // R&D effectiveness benchmarks: the fastest-iterating launch
    // provider anchors 1.0; primes sit near the bottom.
    let (archetype, rd_effectiveness) = if handle.contains("spacex") {
        ("technology disruptor", Decimal::ONE)
    } else if handle.contains("blue origin") || handle.contains("blueorigin") {
        ("long-horizon builder", Decimal::new(6, 1))
    } else if handle.contains("boeing") || handle.contains("lockheed") {
        ("incumbent prime", Decimal::new(3, 1))
    } else {
        ("agile newcomer", Decimal::new(75, 2))
    };

    EnterpriseDna {
        name: company.name.clone(),
        archetype: String::from(archetype),
        description: String::from(
            "Demo profile: focused on low-cost orbital access and constellation deployment.",
        ),
        rd_effectiveness,
        corporate_values: vec![
            String::from("technology first"),
            String::from("long-term vision"),
        ],
        risk_profile: RiskProfile {
            ambition_level: String::from("sector leadership"),
            financial_risk_aversion: String::from("low"),
        },
        legacy: LegacyProfile {
            technological_debt: String::from("low"),
            regulatory_burden: String::from("medium"),
        },
        policy_sensitivities: PolicySensitivities {
            subsidy_sensitivity: Decimal::new(8, 1),
            regulation_sensitivity: Decimal::new(4, 1),
        },
        technology_focus: vec![
            String::from("reusable boosters"),
            String::from("methalox engines"),
        ],
        funding_source: String::from("venture capital"),
        corporate_culture: String::from("rapid iteration"),
    }
}

// ---------------------------------------------------------------------------
// Prompt context helpers
// ---------------------------------------------------------------------------

/// Truncate `text` to at most `max_chars` characters, marking the cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_owned();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str(" ...");
    out
}

/// Compact per-turn summary fed as market context to later turns.
fn history_summary(history: &[SimulationTurn]) -> String {
    if history.is_empty() {
        return String::from("This is the first turn; there is no history yet.");
    }
    let lines: Vec<String> = history
        .iter()
        .map(|turn| {
            let moves: Vec<String> = turn
                .decisions
                .iter()
                .map(|d| {
                    let lead_action = d
                        .memo
                        .actions
                        .first()
                        .cloned()
                        .unwrap_or_else(|| String::from("held position"));
                    format!("{}: {lead_action}", d.company_name)
                })
                .collect();
            format!("[turn {}] {}", turn.turn, moves.join("; "))
        })
        .collect();
    lines.join("\n")
}

/// The full game log reshaped for the report prompt: who did what, why,
/// and the state they predicted after.
fn history_events(history: &[SimulationTurn]) -> serde_json::Value {
    let turns: Vec<serde_json::Value> = history
        .iter()
        .map(|turn| {
            let events: Vec<serde_json::Value> = turn
                .decisions
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "who": d.company_name,
                        "did": d.memo.actions,
                        "why": d.memo.internal_monologue,
                        "state_after": d.next_state,
                    })
                })
                .collect();
            serde_json::json!({"turn": turn.turn, "events": events})
        })
        .collect();
    serde_json::Value::Array(turns)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn company(name: &str, url: &str) -> Company {
        let date = NaiveDate::from_ymd_opt(2025, 10, 25).unwrap_or_default();
        Company::new(name, url, date)
    }

    #[test]
    fn excerpt_short_text_is_untouched() {
        assert_eq!(excerpt("  short policy  ", 500), "short policy");
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        // Multibyte text must not be cut on a byte boundary.
        let text = "航天政策".repeat(300);
        let cut = excerpt(&text, 500);
        assert!(cut.ends_with(" ..."));
        assert_eq!(cut.chars().count(), 504);
    }

    #[test]
    fn history_summary_first_turn_message() {
        assert!(history_summary(&[]).contains("first turn"));
    }

    #[tokio::test(start_paused = true)]
    async fn history_summary_lists_lead_actions() {
        let backend = MockBackend::new();
        let a = company("Meridian Launch", "https://meridian.example");
        let decision = backend.decide(&a, 1, &[]).await.unwrap();
        let turn = SimulationTurn {
            turn: 1,
            year: None,
            decisions: vec![decision],
        };

        let summary = history_summary(&[turn]);
        assert!(summary.starts_with("[turn 1]"));
        assert!(summary.contains("Meridian Launch:"));
    }

    #[tokio::test(start_paused = true)]
    async fn history_events_shape_for_report_prompt() {
        let backend = MockBackend::new();
        let a = company("Meridian Launch", "https://meridian.example");
        let decision = backend.decide(&a, 1, &[]).await.unwrap();
        let turn = SimulationTurn {
            turn: 1,
            year: None,
            decisions: vec![decision],
        };

        let events = history_events(&[turn]);
        let first_event = events
            .get(0)
            .and_then(|t| t.get("events"))
            .and_then(|e| e.get(0))
            .cloned()
            .unwrap_or_default();
        assert!(first_event.get("who").is_some());
        assert!(first_event.get("did").is_some());
        assert!(first_event.get("state_after").is_some());
    }

    #[test]
    fn mock_dna_is_deterministic_per_company() {
        let benchmark = company("SpaceX", "https://www.spacex.com");
        let prime = company("Lockheed Martin", "https://www.lockheedmartin.com");
        let newcomer = company("Vector Orbital", "https://vectororbital.example");

        assert_eq!(mock_dna(&benchmark).rd_effectiveness, Decimal::ONE);
        assert_eq!(mock_dna(&prime).rd_effectiveness, Decimal::new(3, 1));
        assert_eq!(mock_dna(&newcomer).rd_effectiveness, Decimal::new(75, 2));
        // Same input, same profile.
        assert_eq!(mock_dna(&newcomer), mock_dna(&newcomer));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_decision_embeds_visible_history_depth() {
        let backend = MockBackend::new();
        let a = company("Meridian Launch", "https://meridian.example");

        let first = backend.decide(&a, 1, &[]).await.unwrap();
        assert!(first.memo.perception.contains("Reviewed 0 completed rounds"));

        let turn = SimulationTurn {
            turn: 1,
            year: None,
            decisions: vec![first],
        };
        let second = backend.decide(&a, 2, std::slice::from_ref(&turn)).await.unwrap();
        assert!(second.memo.perception.contains("Reviewed 1 completed rounds"));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_fault_injection_fails_selected_company() {
        let a = company("Meridian Launch", "https://meridian.example");
        let backend = MockBackend::with_failing([a.id]);

        let result = backend.decide(&a, 1, &[]).await;
        assert!(matches!(
            result,
            Err(PipelineError::Client(ClientError::Vendor { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_report_streams_running_totals_and_embeds_history() {
        let backend = MockBackend::new();
        let a = company("Meridian Launch", "https://meridian.example");
        let decision = backend.decide(&a, 1, &[]).await.unwrap();
        let history = vec![SimulationTurn {
            turn: 1,
            year: None,
            decisions: vec![decision],
        }];

        let mut previews: Vec<String> = Vec::new();
        let report = backend
            .synthesize_report(&history, |text| previews.push(text.to_owned()))
            .await
            .unwrap();

        // Every snapshot extends the previous one.
        for pair in previews.windows(2) {
            if let [earlier, later] = pair {
                assert!(later.starts_with(earlier.as_str()));
            }
        }
        assert!(!previews.is_empty());
        assert_eq!(report.turn_history, history);
        assert_eq!(report.micro_analysis.len(), 1);
    }
}
