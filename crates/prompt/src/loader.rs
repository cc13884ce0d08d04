//! Prompt loader for YAML prompt definitions.
//!
//! Built-in definitions ship inside the binary. A workspace may override
//! any of them with `.govbrief/prompts/<id>.yml`.

use crate::types::PromptDefinition;
use crate::{NARRATIVE_PROMPT_ID, REPORT_PROMPT_ID, STRICT_REPORT_PROMPT_ID};
use govbrief_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        NARRATIVE_PROMPT_ID,
        include_str!("../prompts/govbrief.narrative.yml"),
    ),
    (REPORT_PROMPT_ID, include_str!("../prompts/govbrief.report.yml")),
    (
        STRICT_REPORT_PROMPT_ID,
        include_str!("../prompts/govbrief.report.strict.yml"),
    ),
];

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".govbrief/prompts")
}

/// Parse a built-in prompt definition.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown built-in prompt: {}", prompt_id)))?;

    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse built-in prompt {}: {}", prompt_id, e))
    })?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Load a prompt definition by ID.
///
/// Looks for `<workspace>/.govbrief/prompts/<id>.yml` first and falls
/// back to the built-in definition of the same ID.
///
/// # Example
/// ```no_run
/// use govbrief_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "govbrief.narrative")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        tracing::debug!("No override at {:?}, using built-in prompt", prompt_file);
        return builtin_prompt(prompt_id);
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        tracing::warn!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file,
            definition.id,
            prompt_id
        );
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List prompt IDs overridden in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, valid: bool) -> PathBuf {
        let prompts_dir = dir.join(".govbrief/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Override"
apiVersion: "1.0"
createdBy: test
behavior:
  tone: professional
  style: concise
template: "Custom: {{{{question}}}}"
output:
  format: markdown
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = prompts_dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_builtins_parse() {
        for (id, _) in BUILTIN_PROMPTS {
            let def = builtin_prompt(id).unwrap();
            assert_eq!(def.id, *id);
            assert!(def.system.is_some());
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_prompt("govbrief.nope").is_err());
    }

    #[test]
    fn test_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), NARRATIVE_PROMPT_ID).unwrap();
        assert_eq!(prompt.id, NARRATIVE_PROMPT_ID);
        assert!(!prompt.output.is_json());
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), REPORT_PROMPT_ID, true);

        let prompt = load_prompt(temp_dir.path(), REPORT_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Override");
        assert_eq!(prompt.template, "Custom: {{question}}");
    }

    #[test]
    fn test_invalid_override_is_error() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), NARRATIVE_PROMPT_ID, false);
        assert!(load_prompt(temp_dir.path(), NARRATIVE_PROMPT_ID).is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_prompts(temp_dir.path()).unwrap().is_empty());

        write_override(temp_dir.path(), "b.prompt", true);
        write_override(temp_dir.path(), "a.prompt", true);

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["a.prompt".to_string(), "b.prompt".to_string()]);
    }
}
