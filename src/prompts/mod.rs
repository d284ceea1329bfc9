// Prompt resolution - builtin prompt texts with per-provider overrides
//
// Resolution order: provider-specific override, then the builtin default.
// The resolver is a plain value passed to the pipeline; there is no global
// registry.

use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::models::Provider;

pub const PROMPT_GENERATE: &str = "generate";
pub const PROMPT_EVALUATE: &str = "evaluate";
pub const PROMPT_COMPLETE: &str = "complete";

const GENERATE_DEFAULT: &str = "\
You are an application structure designer. From the user's description, \
produce the app structure as a single JSON object and nothing else.\n\
The object has these fields:\n\
- \"title\": short app name\n\
- \"description\": one or two sentences\n\
- \"modules\": array of module objects, each with \"id\", \"type\", \"title\", \
\"description\" and the payload field for its type (form: \"fields\", table: \
\"columns\", api: \"endpoints\", chart: \"chart_config\", auth: \"auth_config\", \
database: \"tables\", config: \"settings\", page: \"layout\", component: \
\"component_config\").\n\
Use double-quoted keys and valid JSON. Do not wrap the object in prose.";

const EVALUATE_DEFAULT: &str = "\
You are reviewing an application structure document. Judge how complete and \
internally consistent it is.\n\
Reply with a single JSON object: {\"score\": <number between 0 and 1>, \
\"feedback\": \"<short actionable feedback>\"}. No other text.";

const COMPLETE_DEFAULT: &str = "\
An application structure document is missing some required pieces, listed \
below. Produce a single JSON object with the same shape as the document that \
fills in the missing pieces while keeping every existing module unchanged. \
Reply with the JSON object only.";

/// Resolves prompt texts by name, with per-provider overrides
#[derive(Debug, Clone, Default)]
pub struct PromptResolver {
    overrides: HashMap<(Provider, String), String>,
}

impl PromptResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the prompt `name` for one provider
    pub fn set_override(&mut self, provider: Provider, name: &str, text: impl Into<String>) {
        self.overrides
            .insert((provider, name.to_string()), text.into());
    }

    /// Look up a prompt for a provider, falling back to the builtin default
    pub fn get_prompt(&self, provider: Provider, name: &str) -> Result<String> {
        if let Some(text) = self.overrides.get(&(provider, name.to_string())) {
            return Ok(text.clone());
        }
        match name {
            PROMPT_GENERATE => Ok(GENERATE_DEFAULT.to_string()),
            PROMPT_EVALUATE => Ok(EVALUATE_DEFAULT.to_string()),
            PROMPT_COMPLETE => Ok(COMPLETE_DEFAULT.to_string()),
            _ => bail!("Unknown prompt '{}' for provider '{}'", name, provider),
        }
    }
}
