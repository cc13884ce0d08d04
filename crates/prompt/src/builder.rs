//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptInputs};
use govbrief_core::{AppError, AppResult};
use handlebars::Handlebars;

/// Build a prompt from a definition and its inputs.
///
/// The system message is taken verbatim from the definition; the user
/// message is the rendered template.
///
/// # Example
/// ```no_run
/// use govbrief_prompt::{build_prompt, builtin_prompt, PromptInputs, NARRATIVE_PROMPT_ID};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(NARRATIVE_PROMPT_ID)?;
/// let built = build_prompt(&def, &PromptInputs::new("Should we expand school feeding?"))?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(definition: &PromptDefinition, inputs: &PromptInputs) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt: {} ({} documents, news: {}, sentiment: {})",
        definition.id,
        inputs.documents.len(),
        !inputs.news.is_empty(),
        inputs.sentiment.is_some()
    );

    let user = render_template(&definition.template, inputs)?;

    Ok(BuiltPrompt {
        system: definition.system.clone(),
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            expects_json: definition.output.is_json(),
            document_count: inputs.documents.len(),
            news_included: !inputs.news.is_empty(),
            sentiment_included: inputs.sentiment.is_some(),
        },
    })
}

/// Render a Handlebars template with the prompt inputs.
fn render_template(template: &str, inputs: &PromptInputs) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", inputs)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
