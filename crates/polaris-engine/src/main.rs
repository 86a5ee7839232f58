//! Driver binary for the Polaris policy simulation.
//!
//! Reads a policy text and a company roster, fills in missing DNA
//! profiles (direct calls or the vendor batch API), runs the five-stage
//! simulation pipeline, and writes the final report as JSON.
//!
//! ```text
//! polaris-engine <policy.txt> <roster.json> [depth] [--batch-dna]
//! ```
//!
//! With `POLARIS_API_KEY` set the live GLM backend is used; without it
//! the deterministic mock backend runs the same pipeline end to end.

mod log_sink;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use polaris_client::{BatchClient, LlmConfig};
use polaris_core::{
    PromptEngine, SimulationBackend, SimulationPipeline, SimulationRequest, generate_dna_batch,
    generate_missing_dna,
};
use polaris_types::Company;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::log_sink::TracingSink;

/// Application entry point.
///
/// Initializes logging, loads inputs, selects the backend by credential
/// presence, completes the roster's DNA, runs the pipeline, and writes
/// the report.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = CliArgs::parse(std::env::args().skip(1))?;
    info!(
        policy = %args.policy_path.display(),
        roster = %args.roster_path.display(),
        depth = args.depth,
        "polaris-engine starting"
    );

    let policy_text = std::fs::read_to_string(&args.policy_path)
        .with_context(|| format!("failed to read policy file {}", args.policy_path.display()))?;
    let roster_json = std::fs::read_to_string(&args.roster_path)
        .with_context(|| format!("failed to read roster file {}", args.roster_path.display()))?;
    let mut companies: Vec<Company> =
        serde_json::from_str(&roster_json).context("roster file is not a JSON array of companies")?;

    let templates_dir =
        std::env::var("POLARIS_TEMPLATES_DIR").unwrap_or_else(|_| String::from("templates"));
    let backend = SimulationBackend::from_env(&templates_dir)?;
    info!(backend = backend.name(), "simulation backend selected");

    complete_roster_dna(&backend, &templates_dir, &mut companies, args.batch_dna).await?;

    let pipeline = SimulationPipeline::new(backend);
    let request = SimulationRequest::new(policy_text, companies).with_depth(args.depth);

    let mut sink = TracingSink;
    let report = match pipeline.run(&request, &mut sink).await {
        Ok(report) => report,
        Err(error) => bail!("simulation failed: {error}"),
    };

    let out = serde_json::to_string_pretty(&report).context("failed to serialize the report")?;
    std::fs::write(&args.out_path, out)
        .with_context(|| format!("failed to write report to {}", args.out_path.display()))?;
    info!(
        out = %args.out_path.display(),
        title = report.title,
        companies = report.company_count,
        "report written"
    );

    Ok(())
}

/// Generate DNA for roster entries that lack a profile.
///
/// Uses the vendor batch API when requested and a live backend is
/// configured; otherwise falls back to direct bounded-concurrent calls.
async fn complete_roster_dna(
    backend: &SimulationBackend,
    templates_dir: &str,
    companies: &mut [Company],
    batch_requested: bool,
) -> Result<()> {
    let missing = companies.iter().filter(|c| c.dna.is_none()).count();
    if missing == 0 {
        return Ok(());
    }
    info!(missing, batch = batch_requested, "roster entries need DNA profiles");

    let outcomes = if batch_requested && matches!(backend, SimulationBackend::Live(_)) {
        let config = LlmConfig::from_env()?;
        let prompts = PromptEngine::new(templates_dir)?;
        let client = BatchClient::new(config.clone());
        generate_dna_batch(&client, &prompts, &config.fast_model, companies, |status| {
            info!(status = status, "batch DNA progress");
        })
        .await?
    } else {
        if batch_requested {
            warn!("batch DNA requested without a live backend, using direct generation");
        }
        generate_missing_dna(backend, companies).await
    };

    for outcome in outcomes {
        if let Some(company) = companies.iter_mut().find(|c| c.id == outcome.company_id) {
            company.dna = Some(outcome.dna);
        }
    }

    let still_missing = companies.iter().filter(|c| c.dna.is_none()).count();
    if still_missing > 0 {
        warn!(
            still_missing,
            "some companies still lack DNA; the pipeline will refuse to run with them selected"
        );
    }
    Ok(())
}

/// Parsed command-line arguments.
#[derive(Debug)]
struct CliArgs {
    policy_path: PathBuf,
    roster_path: PathBuf,
    depth: u32,
    out_path: PathBuf,
    batch_dna: bool,
}

impl CliArgs {
    const USAGE: &'static str = "usage: polaris-engine <policy.txt> <roster.json> [depth] [--batch-dna]";

    /// Parse positional arguments and flags.
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut batch_dna = false;
        for arg in args {
            if arg == "--batch-dna" {
                batch_dna = true;
            } else {
                positional.push(arg);
            }
        }

        let mut positional = positional.into_iter();
        let policy_path = PathBuf::from(positional.next().context(Self::USAGE)?);
        let roster_path = PathBuf::from(positional.next().context(Self::USAGE)?);
        let depth = positional
            .next()
            .map(|raw| raw.parse::<u32>())
            .transpose()
            .context("depth must be a positive integer")?
            .unwrap_or(1);

        let out_path = PathBuf::from(
            std::env::var("POLARIS_REPORT_OUT")
                .unwrap_or_else(|_| String::from("simulation-report.json")),
        );

        Ok(Self {
            policy_path,
            roster_path,
            depth,
            out_path,
            batch_dna,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> impl Iterator<Item = String> {
        args.iter()
            .map(|s| (*s).to_owned())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_positional_arguments_and_flag() {
        let args =
            CliArgs::parse(strings(&["policy.txt", "roster.json", "3", "--batch-dna"])).unwrap();
        assert_eq!(args.policy_path, PathBuf::from("policy.txt"));
        assert_eq!(args.roster_path, PathBuf::from("roster.json"));
        assert_eq!(args.depth, 3);
        assert!(args.batch_dna);
    }

    #[test]
    fn depth_defaults_to_one() {
        let args = CliArgs::parse(strings(&["policy.txt", "roster.json"])).unwrap();
        assert_eq!(args.depth, 1);
        assert!(!args.batch_dna);
    }

    #[test]
    fn missing_arguments_fail_with_usage() {
        let result = CliArgs::parse(strings(&["policy.txt"]));
        assert!(result.is_err());
    }

    #[test]
    fn bad_depth_is_rejected() {
        let result = CliArgs::parse(strings(&["policy.txt", "roster.json", "many"]));
        assert!(result.is_err());
    }
}
