use std::path::Path;

use anyhow::Context;

use super::PromptsConfig;

const MODE_CLASSIFIER: &str = "You will be given a user input.
Your task is to answer with ONLY ONE word: 'chat', 'commits', or 'documentation'.
Rules:
- If the input asks to generate release notes, view commits, or mentions versioning, respond with: commits
- If the input asks about code structure, searching documentation, or understanding code, respond with: documentation
- If the input is anything else, respond with: chat
Do not explain. Do not add punctuation. Only answer with exactly one of these three words.";

const COMMIT_COUNT: &str = "You are a number extractor that ONLY outputs a single integer.
Your task is to extract the number of commits the user wants to see from their input.
If no specific number is mentioned, output 3.
ONLY output the number, nothing else.";

const QA_INSTRUCTION: &str = "You are an assistant that helps developers understand their code. \
Answer the question using only the code documentation provided by the user. \
Be clear and concise. If the documentation does not contain the relevant information, say so.";

const RELEASE_NOTES: &str = "You are a release manager writing release notes for a software project.
Group the changes below into sections such as Features, Fixes, and Maintenance.
Write one short bullet per change in plain language, and skip merge commits.
Do not invent changes that are not listed.

Commits:
{{$commits}}";

const TEMPLATE_MARKER: &str = "template: |";

/// Prompt text shared by the router and the workflows. Loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    /// System prompt for release notes. `{{$commits}}` is replaced with the commit list.
    pub release_notes: String,
    pub mode_classifier: String,
    pub commit_count: String,
    pub qa_instruction: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            release_notes: RELEASE_NOTES.to_owned(),
            mode_classifier: MODE_CLASSIFIER.to_owned(),
            commit_count: COMMIT_COUNT.to_owned(),
            qa_instruction: QA_INSTRUCTION.to_owned(),
        }
    }
}

impl PromptTemplates {
    /// Built-in prompts, with the release-notes template read from disk when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured release-notes file cannot be read.
    pub fn load(config: &PromptsConfig) -> anyhow::Result<Self> {
        let mut templates = Self::default();
        if let Some(path) = &config.release_notes_path {
            templates.release_notes = read_template(path)?;
            tracing::debug!(path = %path.display(), "loaded release notes template");
        }
        Ok(templates)
    }
}

fn read_template(path: &Path) -> anyhow::Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read prompt template {}", path.display()))?;
    Ok(template_body(&content))
}

/// Strip a prompt-file header, keeping only the text after `template: |`.
///
/// Only applies when the file starts with `name:` or `---`; anything else is used as is.
#[must_use]
pub fn template_body(content: &str) -> String {
    if (content.starts_with("name:") || content.starts_with("---"))
        && let Some(idx) = content.find(TEMPLATE_MARKER)
    {
        return content[idx + TEMPLATE_MARKER.len()..].trim().to_owned();
    }
    content.to_owned()
}
