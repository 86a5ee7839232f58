//! DNA generation paths for roster entries missing a profile.
//!
//! Two bulk paths exist:
//!
//! - [`generate_missing_dna`]: one interactive call per company, fanned
//!   out under the fast tier's concurrency cap. Per-company failures
//!   are logged and skipped.
//! - [`generate_dna_batch`]: the vendor's asynchronous batch API --
//!   upload a JSON Lines file, poll to completion, map results back by
//!   `custom_id`. Malformed output lines are dropped; a non-`completed`
//!   terminal status fails the whole batch.
//!
//! Both paths use the same prompt templates as single-company
//! generation, so prompt differences stay data.

use polaris_client::{BatchClient, ModelTier, extract_json, request_line, run_bounded};
use polaris_types::{Company, CompanyId, EnterpriseDna};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::SimulationBackend;
use crate::error::PipelineError;
use crate::prompt::PromptEngine;

/// One company's freshly generated DNA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnaOutcome {
    /// The company the profile belongs to.
    pub company_id: CompanyId,
    /// The generated profile.
    pub dna: EnterpriseDna,
}

/// Correlation key for one company in a batch input file.
pub fn custom_id(company_id: CompanyId) -> String {
    format!("req-{company_id}")
}

/// Recover the company id from a batch `custom_id`.
pub fn company_from_custom_id(custom: &str) -> Option<CompanyId> {
    custom
        .strip_prefix("req-")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(CompanyId::from)
}

/// Generate DNA for every roster entry without one, at most
/// fast-tier-many calls in flight at once.
///
/// Failed companies are skipped; the caller decides whether to retry
/// them individually.
pub async fn generate_missing_dna(
    backend: &SimulationBackend,
    companies: &[Company],
) -> Vec<DnaOutcome> {
    let targets: Vec<&Company> = companies.iter().filter(|c| c.dna.is_none()).collect();
    if targets.is_empty() {
        return Vec::new();
    }
    info!(
        count = targets.len(),
        backend = backend.name(),
        "generating missing DNA profiles"
    );

    let limit = ModelTier::Fast.concurrency_limit();
    let outcomes = run_bounded(targets, limit, |company| async move {
        match backend.generate_dna(company).await {
            Ok(dna) => Some(DnaOutcome {
                company_id: company.id,
                dna,
            }),
            Err(error) => {
                warn!(
                    company = %company.name,
                    error = %error,
                    "DNA generation failed, skipping company"
                );
                None
            }
        }
    })
    .await;

    outcomes.into_iter().flatten().collect()
}

/// Generate DNA for every profile-less roster entry through the
/// vendor's batch API.
///
/// `on_status` receives human-readable progress lines (upload, job
/// creation, poll counts, download).
pub async fn generate_dna_batch(
    client: &BatchClient,
    prompts: &PromptEngine,
    fast_model: &str,
    companies: &[Company],
    mut on_status: impl FnMut(&str),
) -> Result<Vec<DnaOutcome>, PipelineError> {
    let targets: Vec<&Company> = companies.iter().filter(|c| c.dna.is_none()).collect();
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    on_status("preparing the batch input file...");
    let mut lines = Vec::with_capacity(targets.len());
    for company in &targets {
        let context = serde_json::json!({
            "company": {"name": company.name, "url": company.url},
        });
        let prompt = prompts.dna(&context)?;
        lines.push(
            request_line(
                &custom_id(company.id),
                fast_model,
                &prompt.system,
                &prompt.user,
            )
            .to_string(),
        );
    }
    let payload = lines.join("\n");

    on_status("uploading the batch input file...");
    let file_id = client.upload_jsonl(payload).await?;

    on_status("creating the batch job...");
    let batch_id = client.create_batch(&file_id, "dna_batch").await?;

    let output_file_id = client.wait_for_completion(&batch_id, &mut on_status).await?;

    on_status("downloading batch results...");
    let output = client.download_output(&output_file_id).await?;

    let outcomes: Vec<DnaOutcome> = output
        .into_iter()
        .filter_map(|line| decode_batch_line(&line.custom_id, &line.content))
        .collect();
    info!(
        requested = targets.len(),
        recovered = outcomes.len(),
        "batch DNA generation finished"
    );
    Ok(outcomes)
}

/// Map one batch output line back to a company and its DNA.
///
/// Returns `None` (dropping the line) when the correlation key or the
/// embedded JSON cannot be recovered.
pub(crate) fn decode_batch_line(custom: &str, content: &str) -> Option<DnaOutcome> {
    let company_id = company_from_custom_id(custom)?;
    let value = extract_json(content).ok()?;
    let dna = serde_json::from_value(value).ok()?;
    Some(DnaOutcome { company_id, dna })
}
