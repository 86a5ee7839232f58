//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`
//! directory) so analysts can tune prompt wording without recompiling.
//! Every model operation has a system/user template pair; the four
//! operations share one engine, so prompt differences are data, never
//! code branches.

use minijinja::Environment;

use crate::error::PipelineError;

/// System/user template pairs, one per model operation.
const TEMPLATE_PREFIXES: [&str; 4] = ["dna", "policy", "turn", "report"];

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with all operation templates
/// pre-loaded. Templates can be edited on disk and are picked up on the
/// next call to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to the model.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the model's role.
    pub system: String,
    /// User message carrying the operation's inputs.
    pub user: String,
}

impl PromptEngine {
    /// Create a new prompt engine loading templates from the given
    /// directory.
    ///
    /// The directory must contain `<op>_system.j2` and `<op>_user.j2`
    /// for each of: `dna`, `policy`, `turn`, `report`.
    pub fn new(templates_dir: &str) -> Result<Self, PipelineError> {
        let mut env = Environment::new();

        for prefix in TEMPLATE_PREFIXES {
            for half in ["system", "user"] {
                let name = format!("{prefix}_{half}");
                let source = load_template(templates_dir, &name)?;
                env.add_template_owned(name.clone(), source).map_err(|e| {
                    PipelineError::Template(format!("failed to add template {name}: {e}"))
                })?;
            }
        }

        Ok(Self { env })
    }

    /// Render the DNA-generation prompt pair.
    ///
    /// Context: `{"company": {"name", "url"}}`.
    pub fn dna(&self, context: &serde_json::Value) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair("dna", context)
    }

    /// Render the policy-structure prompt pair.
    ///
    /// Context: `{"excerpt": "..."}`.
    pub fn policy(&self, context: &serde_json::Value) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair("policy", context)
    }

    /// Render the per-company turn-decision prompt pair.
    ///
    /// Context: `{"company": {"name", "dna"}, "turn", "policy_excerpt",
    /// "history_summary"}`.
    pub fn turn(&self, context: &serde_json::Value) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair("turn", context)
    }

    /// Render the final-report prompt pair.
    ///
    /// Context: `{"policy_excerpt", "company_names", "history_json"}`.
    pub fn report(&self, context: &serde_json::Value) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair("report", context)
    }

    /// Render one system/user pair by prefix.
    fn render_pair(
        &self,
        prefix: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, PipelineError> {
        Ok(RenderedPrompt {
            system: self.render_one(&format!("{prefix}_system"), context)?,
            user: self.render_one(&format!("{prefix}_user"), context)?,
        })
    }

    fn render_one(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> Result<String, PipelineError> {
        self.env
            .get_template(name)
            .map_err(|e| PipelineError::Template(format!("missing template {name}: {e}")))?
            .render(context)
            .map_err(|e| PipelineError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, name: &str) -> Result<String, PipelineError> {
    let path = format!("{dir}/{name}.j2");
    std::fs::read_to_string(&path)
        .map_err(|e| PipelineError::Template(format!("failed to read {path}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_test_templates(dir: &std::path::Path) {
        let pairs = [
            ("dna_system", "You are a business intelligence analyst."),
            ("dna_user", "Analyze: {{ company.name }} ({{ company.url }})"),
            ("policy_system", "You are a data preprocessing assistant."),
            ("policy_user", "Text under review:\n\"\"\"\n{{ excerpt }}\n\"\"\""),
            ("turn_system", "You are the CEO of {{ company.name }}."),
            (
                "turn_user",
                "Turn {{ turn }}. Policy:\n{{ policy_excerpt }}\nHistory:\n{{ history_summary }}",
            ),
            ("report_system", "You are a senior policy advisor."),
            (
                "report_user",
                "Companies: {{ company_names }}\nLog:\n{{ history_json }}",
            ),
        ];
        for (name, body) in pairs {
            std::fs::write(dir.join(format!("{name}.j2")), body).ok();
        }
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        // Unique directory per process and thread to avoid races when
        // tests run in parallel.
        let unique = format!(
            "polaris_prompt_{tag}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn template_loading_and_rendering() {
        let dir = temp_dir("load");
        write_test_templates(&dir);

        let engine = PromptEngine::new(dir.to_str().unwrap_or(""));
        assert!(engine.is_ok(), "engine should load a complete template set");
        let engine = match engine {
            Ok(e) => e,
            Err(_) => return,
        };

        let context = serde_json::json!({
            "company": {"name": "Meridian Launch", "url": "https://meridian.example"},
            "turn": 2,
            "policy_excerpt": "Section 4: methalox engine subsidies",
            "history_summary": "[turn 1] Meridian: accelerated engine qual",
        });

        let prompt = engine.turn(&context);
        assert!(prompt.is_ok());
        let prompt = match prompt {
            Ok(p) => p,
            Err(_) => return,
        };
        assert!(prompt.system.contains("Meridian Launch"));
        assert!(prompt.user.contains("Turn 2"));
        assert!(prompt.user.contains("methalox"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_template_returns_error() {
        let dir = temp_dir("missing");
        // Only one file of the required eight.
        std::fs::write(dir.join("dna_system.j2"), "test").ok();

        let result = PromptEngine::new(dir.to_str().unwrap_or(""));
        assert!(result.is_err(), "should fail when templates are missing");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn repo_templates_are_complete() {
        // The checked-in templates ship with the workspace; loading them
        // keeps the on-disk set honest.
        let dir = format!("{}/../../templates", env!("CARGO_MANIFEST_DIR"));
        if std::path::Path::new(&dir).is_dir() {
            let engine = PromptEngine::new(&dir);
            assert!(engine.is_ok(), "checked-in templates should load");
        }
    }
}
