//! The five-stage simulation pipeline.
//!
//! One run walks a fixed sequence: parse policy -> load DNA -> run N
//! decision turns -> aggregate -> synthesize the report, emitting
//! progress and log events at each step. Per-company decision failures
//! inside a turn are recovered locally with a deterministic fallback so
//! one bad company never aborts the run; every other failure aborts,
//! surfaces its message, and resets the status so the pipeline is fully
//! re-runnable.
//!
//! There is no cancellation: a run settles (success or failure) before a
//! new one may start.

use std::time::Duration;

use chrono::Utc;
use polaris_client::{ModelTier, run_bounded};
use polaris_types::{
    AgentDecision, Company, PipelineStatus, Report, ReportId, SimulationTurn, StrategicMemo,
};
use tracing::{info, warn};

use crate::backend::SimulationBackend;
use crate::error::PipelineError;
use crate::progress::{ProgressEvent, ProgressSink, SessionState};

/// Inputs for one pipeline run.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    /// The policy text under test.
    pub policy_text: String,
    /// Participating companies; each must carry a DNA profile.
    pub companies: Vec<Company>,
    /// Number of decision turns to run.
    pub depth: u32,
}

impl SimulationRequest {
    /// A request with the default depth of one turn.
    pub fn new(policy_text: impl Into<String>, companies: Vec<Company>) -> Self {
        Self {
            policy_text: policy_text.into(),
            companies,
            depth: 1,
        }
    }

    /// Set the number of turns.
    #[must_use]
    pub const fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// The simulation pipeline.
///
/// Owns the backend and the per-turn concurrency limit. The limit
/// defaults to the smart tier's quota; a limit of one degenerates to
/// fully serial decision calls.
pub struct SimulationPipeline {
    backend: SimulationBackend,
    turn_concurrency: usize,
}

impl SimulationPipeline {
    /// Create a pipeline over the given backend.
    pub const fn new(backend: SimulationBackend) -> Self {
        Self {
            backend,
            turn_concurrency: ModelTier::Smart.concurrency_limit(),
        }
    }

    /// Override the per-turn decision concurrency.
    #[must_use]
    pub const fn with_turn_concurrency(mut self, limit: usize) -> Self {
        self.turn_concurrency = limit;
        self
    }

    /// The backend this pipeline runs against.
    pub const fn backend(&self) -> &SimulationBackend {
        &self.backend
    }

    /// Execute one full run, emitting progress through `sink`.
    ///
    /// On success the returned [`Report`] is the single terminal
    /// artifact; on failure the terminal error has already been emitted
    /// as a [`ProgressEvent::Failed`] plus a status reset, and the same
    /// error is returned.
    pub async fn run(
        &self,
        request: &SimulationRequest,
        sink: &mut dyn ProgressSink,
    ) -> Result<Report, PipelineError> {
        match self.run_inner(request, sink).await {
            Ok(report) => Ok(report),
            Err(error) => {
                sink.on_event(&ProgressEvent::Log(format!("error: {error}")));
                sink.on_event(&ProgressEvent::Failed(error.to_string()));
                sink.on_event(&ProgressEvent::Status(PipelineStatus::Ready));
                Err(error)
            }
        }
    }

    /// Run against a [`SessionState`]: reset per-run fields, execute,
    /// and on success record the report into the session's list.
    pub async fn run_into_session(
        &self,
        request: &SimulationRequest,
        session: &mut SessionState,
    ) -> Result<(), PipelineError> {
        session.reset_run();
        let report = self.run(request, session).await?;
        session.record_report(report);
        Ok(())
    }

    async fn run_inner(
        &self,
        request: &SimulationRequest,
        sink: &mut dyn ProgressSink,
    ) -> Result<Report, PipelineError> {
        validate(request)?;

        // Stage 1/5: policy parsing.
        sink.on_event(&ProgressEvent::Status(PipelineStatus::PolicyParsing));
        sink.on_event(&ProgressEvent::Progress(5));
        sink.on_event(&ProgressEvent::Log(String::from(
            "step 1/5: parsing the policy's semantic structure...",
        )));
        let structure = self.backend.analyze_policy(&request.policy_text).await?;
        sink.on_event(&ProgressEvent::Log(format!(
            "policy parsed: {} incentives, {} constraints",
            structure.incentives.len(),
            structure.constraints.len()
        )));
        sink.on_event(&ProgressEvent::Progress(20));

        // Stage 2/5: DNA loading. The profiles were validated up front;
        // this stage exists so the dashboard timeline reads naturally.
        sink.on_event(&ProgressEvent::Status(PipelineStatus::DnaLoading));
        sink.on_event(&ProgressEvent::Log(String::from(
            "step 2/5: loading participant strategy profiles (DNA)...",
        )));
        tokio::time::sleep(Duration::from_millis(500)).await;
        sink.on_event(&ProgressEvent::Progress(30));

        // Stage 3/5: decision turns.
        sink.on_event(&ProgressEvent::Status(PipelineStatus::RunningTurns));
        sink.on_event(&ProgressEvent::Log(format!(
            "step 3/5: running the decision game ({} turns)...",
            request.depth
        )));
        let mut history: Vec<SimulationTurn> = Vec::new();
        for turn in 1..=request.depth {
            sink.on_event(&ProgressEvent::Log(format!(
                "[turn {turn}] agents are deciding against the policy and each other..."
            )));
            sink.on_event(&ProgressEvent::Progress(turn_percent(turn, request.depth)));
            let record = self.run_turn(request, turn, &history).await;
            history.push(record);
        }

        // Stage 4/5: aggregation placeholder; attribution happens inside
        // the report prompt.
        sink.on_event(&ProgressEvent::Status(PipelineStatus::Aggregation));
        sink.on_event(&ProgressEvent::Progress(75));
        sink.on_event(&ProgressEvent::Log(String::from(
            "step 4/5: aggregating game data for causal attribution...",
        )));
        tokio::time::sleep(Duration::from_millis(800)).await;
        sink.on_event(&ProgressEvent::Progress(85));

        // Stage 5/5: streamed report synthesis.
        sink.on_event(&ProgressEvent::Status(PipelineStatus::SynthesizingReport));
        sink.on_event(&ProgressEvent::Log(String::from(
            "step 5/5: synthesizing the final policy assessment report...",
        )));
        let content = {
            let forward = |text: &str| {
                sink.on_event(&ProgressEvent::Preview(text.to_owned()));
            };
            self.backend
                .synthesize_report(&request.policy_text, &request.companies, &history, forward)
                .await?
        };

        sink.on_event(&ProgressEvent::Progress(100));
        sink.on_event(&ProgressEvent::Log(String::from(
            "simulation complete; the report has been generated.",
        )));
        sink.on_event(&ProgressEvent::Status(PipelineStatus::Completed));

        let date = Utc::now().date_naive();
        let title = if content.title.trim().is_empty() {
            format!("Simulation Report - {date}")
        } else {
            content.title.clone()
        };
        info!(
            title = title,
            companies = request.companies.len(),
            turns = history.len(),
            backend = self.backend.name(),
            "simulation run completed"
        );

        Ok(Report {
            id: ReportId::new(),
            title,
            date,
            company_count: u32::try_from(request.companies.len()).unwrap_or(u32::MAX),
            content,
        })
    }

    /// Run one turn: every participant decides, concurrency-bounded,
    /// results collected in roster order.
    async fn run_turn(
        &self,
        request: &SimulationRequest,
        turn: u32,
        history: &[SimulationTurn],
    ) -> SimulationTurn {
        let decisions = run_bounded(
            request.companies.iter(),
            self.turn_concurrency,
            |company| async move {
                match self
                    .backend
                    .decide(company, &request.policy_text, turn, history)
                    .await
                {
                    Ok(decision) => decision,
                    Err(error) => {
                        warn!(
                            company = %company.name,
                            turn = turn,
                            error = %error,
                            "decision call failed, substituting fallback"
                        );
                        fallback_decision(company, turn)
                    }
                }
            },
        )
        .await;

        SimulationTurn {
            turn,
            year: None,
            decisions,
        }
    }
}

/// Check run preconditions before any network call.
fn validate(request: &SimulationRequest) -> Result<(), PipelineError> {
    if request.policy_text.trim().is_empty() {
        return Err(PipelineError::Validation(String::from(
            "enter a policy text before starting a simulation",
        )));
    }
    if request.companies.is_empty() {
        return Err(PipelineError::Validation(String::from(
            "select at least one company for the simulation",
        )));
    }
    if let Some(missing) = request.companies.iter().find(|c| c.dna.is_none()) {
        return Err(PipelineError::Validation(format!(
            "{} has no DNA profile yet; generate it before simulating",
            missing.name
        )));
    }
    if request.depth == 0 {
        return Err(PipelineError::Validation(String::from(
            "simulation depth must be at least one turn",
        )));
    }
    Ok(())
}

/// Progress percentage for a turn within the 30-70 band.
const fn turn_percent(turn: u32, depth: u32) -> u8 {
    let offset = match turn.saturating_mul(40).checked_div(depth) {
        Some(value) => value,
        None => 0,
    };
    let offset = if offset > 40 { 40 } else { offset };
    #[allow(clippy::cast_possible_truncation)]
    let offset = offset as u8;
    30_u8.saturating_add(offset)
}

/// The deterministic decision substituted when a company's model call
/// fails inside a turn.
pub fn fallback_decision(company: &Company, turn: u32) -> AgentDecision {
    AgentDecision {
        company_id: company.id,
        company_name: company.name.clone(),
        memo: StrategicMemo {
            perception: String::from(
                "Signal quality this round was too poor to act on with confidence.",
            ),
            internal_monologue: format!(
                "We could not complete a full assessment in round {turn}; holding beats guessing."
            ),
            actions: vec![
                String::from("Hold current strategy"),
                String::from("Monitor competitor moves"),
            ],
            reasoning: format!(
                "{} defaults to a holding pattern when no grounded memo can be produced.",
                company.name
            ),
        },
        next_state: None,
    }
}
