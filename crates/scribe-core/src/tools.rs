//! Tools the chat workflow offers to models with native tool use.

use std::path::Path;
use std::sync::Arc;

use schemars::JsonSchema;
use scribe_index::{DocumentIndexer, DocumentRetriever, IndexError, format_search_results};
use scribe_llm::{LlmProvider, ToolDefinition, ToolUseRequest};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::config::CommitsConfig;
use crate::error::WorkflowError;
use crate::git::{GitError, GitRepository};
use crate::release_notes::ReleaseNotesGenerator;
use crate::workflow::{DocumentationSettings, render_progress};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    ReleaseNotes(#[from] WorkflowError),
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetRepositoryPathParams {
    /// Local path of the git repository.
    pub path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LatestCommitsParams {
    /// Number of commits to read, newest first.
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IngestCodeDirectoryParams {
    /// Directory to ingest recursively.
    pub directory: String,
    /// Comma-separated file suffixes, e.g. ".cs,.js".
    #[serde(default)]
    pub extensions: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScanDirectoryParams {
    /// Directory to scan file by file.
    pub directory: String,
    /// Comma-separated file suffixes, e.g. ".cs,.js".
    #[serde(default)]
    pub extensions: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnswerQuestionParams {
    /// Question about the ingested code.
    pub question: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateReleaseNotesParams {
    /// Commit list to summarize. Read from the selected repository when omitted.
    #[serde(default)]
    pub commits: Option<String>,
    /// Number of commits to read when `commits` is omitted.
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchDocumentationParams {
    /// What to look for in the ingested code.
    pub query: String,
    /// Maximum number of results.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// The closed set of chat tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTool {
    SetRepositoryPath,
    LatestCommits,
    IngestCodeDirectory,
    ScanDirectory,
    SearchDocumentation,
    AnswerQuestion,
    GenerateReleaseNotes,
}

impl ChatTool {
    pub const ALL: [Self; 7] = [
        Self::SetRepositoryPath,
        Self::LatestCommits,
        Self::IngestCodeDirectory,
        Self::ScanDirectory,
        Self::SearchDocumentation,
        Self::AnswerQuestion,
        Self::GenerateReleaseNotes,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SetRepositoryPath => "set_repository_path",
            Self::LatestCommits => "latest_commits",
            Self::IngestCodeDirectory => "ingest_code_directory",
            Self::ScanDirectory => "scan_directory",
            Self::SearchDocumentation => "search_documentation",
            Self::AnswerQuestion => "answer_question",
            Self::GenerateReleaseNotes => "generate_release_notes",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::SetRepositoryPath => "Select the git repository used by later commit lookups",
            Self::LatestCommits => "List the most recent commits of the selected repository",
            Self::IngestCodeDirectory => {
                "Ingest all code files from a directory into the documentation index"
            }
            Self::ScanDirectory => {
                "Scan a directory file by file, storing documentation for each code element"
            }
            Self::SearchDocumentation => "Search the ingested code documentation",
            Self::AnswerQuestion => "Answer a question using the ingested code documentation",
            Self::GenerateReleaseNotes => {
                "Write release notes from a commit list or the latest commits of the selected repository"
            }
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    fn schema(self) -> serde_json::Value {
        let schema = match self {
            Self::SetRepositoryPath => schemars::schema_for!(SetRepositoryPathParams),
            Self::LatestCommits => schemars::schema_for!(LatestCommitsParams),
            Self::IngestCodeDirectory => schemars::schema_for!(IngestCodeDirectoryParams),
            Self::ScanDirectory => schemars::schema_for!(ScanDirectoryParams),
            Self::SearchDocumentation => schemars::schema_for!(SearchDocumentationParams),
            Self::AnswerQuestion => schemars::schema_for!(AnswerQuestionParams),
            Self::GenerateReleaseNotes => schemars::schema_for!(GenerateReleaseNotesParams),
        };
        let mut params = serde_json::to_value(&schema).unwrap_or_default();
        if let serde_json::Value::Object(ref mut map) = params {
            map.remove("$schema");
            map.remove("title");
        }
        params
    }

    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.schema(),
        }
    }

    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.into_iter().map(Self::definition).collect()
    }
}

fn parse<T: for<'de> Deserialize<'de>>(
    tool: ChatTool,
    input: &serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(input.clone()).map_err(|source| ToolError::InvalidArguments {
        tool: tool.name(),
        source,
    })
}

/// Executes tool calls against the shared git, index and release-notes collaborators.
pub struct ToolRunner<P: LlmProvider> {
    git: Arc<GitRepository>,
    indexer: Arc<DocumentIndexer<P>>,
    retriever: Arc<DocumentRetriever<P>>,
    settings: Arc<DocumentationSettings>,
    commits: CommitsConfig,
    release_notes: ReleaseNotesGenerator<P>,
}

impl<P: LlmProvider> ToolRunner<P> {
    #[must_use]
    pub fn new(
        git: Arc<GitRepository>,
        indexer: Arc<DocumentIndexer<P>>,
        retriever: Arc<DocumentRetriever<P>>,
        settings: Arc<DocumentationSettings>,
        commits: CommitsConfig,
        release_notes: ReleaseNotesGenerator<P>,
    ) -> Self {
        Self {
            git,
            indexer,
            retriever,
            settings,
            commits,
            release_notes,
        }
    }

    fn commit_count(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.commits.default_count)
            .min(self.commits.max_count)
    }

    fn extensions_or_default(&self, requested: Option<String>) -> String {
        requested
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_extensions.clone())
    }

    /// Run one call. Failures become `[error] ...` text for the model to read.
    pub async fn run(&self, call: &ToolUseRequest) -> String {
        match self.execute(call).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %call.name, "tool call failed: {e}");
                format!("[error] {e}")
            }
        }
    }

    async fn execute(&self, call: &ToolUseRequest) -> Result<String, ToolError> {
        let tool = ChatTool::from_name(&call.name).ok_or_else(|| ToolError::Unknown(call.name.clone()))?;
        tracing::debug!(tool = tool.name(), id = %call.id, "executing tool");

        match tool {
            ChatTool::SetRepositoryPath => {
                let params: SetRepositoryPathParams = parse(tool, &call.input)?;
                let path = params.path.trim().to_owned();
                self.git.set_repository_path(&path).await;
                Ok(format!("Repository path set to {path}"))
            }
            ChatTool::LatestCommits => {
                let params: LatestCommitsParams = parse(tool, &call.input)?;
                let count = self.commit_count(params.count);
                let log = self.git.latest_commits(count).await?;
                if log.is_empty() {
                    Ok("No commits found.".to_owned())
                } else {
                    Ok(log)
                }
            }
            ChatTool::IngestCodeDirectory => {
                let params: IngestCodeDirectoryParams = parse(tool, &call.input)?;
                let extensions = self.extensions_or_default(params.extensions);
                let collection = &self.settings.collection;
                let summary = self
                    .indexer
                    .ingest_directory(Path::new(&params.directory), &extensions, collection)
                    .await?;
                Ok(format!(
                    "Successfully ingested {} documentation chunks from {} files into collection '{collection}'.",
                    summary.chunk_count, summary.file_count
                ))
            }
            ChatTool::SearchDocumentation => {
                let params: SearchDocumentationParams = parse(tool, &call.input)?;
                let limit = params
                    .limit
                    .filter(|n| *n > 0)
                    .unwrap_or(self.settings.search_limit);
                let hits = self
                    .retriever
                    .search(&self.settings.collection, &params.query, limit)
                    .await?;
                Ok(format_search_results(&hits, self.settings.preview_chars))
            }
            ChatTool::ScanDirectory => {
                let params: ScanDirectoryParams = parse(tool, &call.input)?;
                let extensions = self.extensions_or_default(params.extensions);
                let (tx, mut rx) = mpsc::unbounded_channel();
                let summary = self
                    .indexer
                    .scan_directory(
                        Path::new(&params.directory),
                        &extensions,
                        &self.settings.collection,
                        Some(&tx),
                    )
                    .await?;
                drop(tx);

                let mut lines = Vec::new();
                while let Some(event) = rx.recv().await {
                    lines.extend(render_progress(&event));
                }
                lines.push(format!(
                    "Successfully processed {} files, generated {} documentation chunks.",
                    summary.file_count, summary.chunk_count
                ));
                Ok(lines.join("\n"))
            }
            ChatTool::AnswerQuestion => {
                let params: AnswerQuestionParams = parse(tool, &call.input)?;
                let answer = self
                    .retriever
                    .answer(
                        &self.settings.collection,
                        &params.question,
                        self.settings.context_limit,
                    )
                    .await?;
                Ok(answer)
            }
            ChatTool::GenerateReleaseNotes => {
                let params: GenerateReleaseNotesParams = parse(tool, &call.input)?;
                let commits = match params.commits.filter(|c| !c.trim().is_empty()) {
                    Some(commits) => commits,
                    None => {
                        self.git
                            .latest_commits(self.commit_count(params.count))
                            .await?
                    }
                };
                if commits.trim().is_empty() {
                    return Ok("No commits found.".to_owned());
                }
                Ok(self.release_notes.generate(&commits).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scribe_index::{DocumentStore, IndexerConfig, RetrievalConfig};
    use scribe_index::retriever::INSUFFICIENT_INFORMATION;
    use scribe_llm::mock::MockProvider;
    use serde_json::json;

    use super::*;
    use crate::config::PromptTemplates;

    fn runner() -> ToolRunner<MockProvider> {
        runner_with(Arc::new(MockProvider::default().with_hashed_embeddings(64)))
    }

    fn runner_with(provider: Arc<MockProvider>) -> ToolRunner<MockProvider> {
        let store = Arc::new(DocumentStore::in_memory());
        ToolRunner::new(
            Arc::new(GitRepository::new()),
            Arc::new(DocumentIndexer::new(
                Arc::clone(&store),
                Arc::clone(&provider),
                IndexerConfig::default(),
            )),
            Arc::new(DocumentRetriever::new(
                store,
                Arc::clone(&provider),
                RetrievalConfig::default(),
            )),
            Arc::new(DocumentationSettings::default()),
            CommitsConfig::default(),
            ReleaseNotesGenerator::new(
                provider,
                Arc::new(PromptTemplates::default()),
                None,
                Duration::from_secs(5),
            ),
        )
    }

    fn call(name: &str, input: serde_json::Value) -> ToolUseRequest {
        ToolUseRequest {
            id: "call-1".into(),
            name: name.into(),
            input,
        }
    }

    #[test]
    fn names_round_trip() {
        for tool in ChatTool::ALL {
            assert_eq!(ChatTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(ChatTool::from_name("shell"), None);
    }

    #[test]
    fn definitions_carry_object_schemas() {
        let defs = ChatTool::definitions();
        assert_eq!(defs.len(), 7);
        let search = defs
            .iter()
            .find(|d| d.name == "search_documentation")
            .unwrap();
        assert_eq!(search.parameters["type"], "object");
        assert!(search.parameters["properties"]["query"].is_object());
        assert!(search.parameters.get("$schema").is_none());
        assert!(search.parameters.get("title").is_none());
        let required = search.parameters["required"].as_array().unwrap();
        assert_eq!(required, &vec![json!("query")]);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let out = runner().run(&call("shell", json!({}))).await;
        assert_eq!(out, "[error] unknown tool: shell");
    }

    #[tokio::test]
    async fn invalid_arguments_are_reported() {
        let out = runner()
            .run(&call("set_repository_path", json!({"dir": "x"})))
            .await;
        assert!(out.starts_with("[error] invalid arguments for set_repository_path"));
    }

    #[tokio::test]
    async fn set_path_then_commits_on_missing_repo() {
        let runner = runner();
        let out = runner
            .run(&call("set_repository_path", json!({"path": "/nonexistent/repo"})))
            .await;
        assert_eq!(out, "Repository path set to /nonexistent/repo");
        let out = runner.run(&call("latest_commits", json!({"count": 2}))).await;
        assert!(out.starts_with("[error] repository path does not exist"));
    }

    #[tokio::test]
    async fn ingest_then_search() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Foo.cs"), "class Foo { void Render() }").unwrap();
        let runner = runner();

        let out = runner
            .run(&call(
                "ingest_code_directory",
                json!({"directory": dir.path().to_string_lossy()}),
            ))
            .await;
        assert_eq!(
            out,
            "Successfully ingested 1 documentation chunks from 1 files into collection 'code_documentation'."
        );

        let out = runner
            .run(&call("search_documentation", json!({"query": "Foo"})))
            .await;
        assert!(out.starts_with("Found 1 relevant document(s):"));
        assert!(out.contains("## Class: Foo"));
    }

    #[tokio::test]
    async fn scan_reports_each_element() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Foo.cs"), "class Foo { }\nclass Bar { }").unwrap();
        std::fs::write(dir.path().join("Main.cs"), "static void Main() {}").unwrap();

        let out = runner()
            .run(&call(
                "scan_directory",
                json!({"directory": dir.path().to_string_lossy(), "extensions": ".cs"}),
            ))
            .await;

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Processing file 1/2: Foo.cs",
                "  Generated documentation for Class: Foo",
                "  Generated documentation for Class: Bar",
                "Processing file 2/2: Main.cs",
                "  Generated documentation for File: Main.cs",
                "Successfully processed 2 files, generated 3 documentation chunks.",
            ]
        );
    }

    #[tokio::test]
    async fn scan_missing_directory_is_reported() {
        let out = runner()
            .run(&call("scan_directory", json!({"directory": "/nonexistent/src"})))
            .await;
        assert!(out.starts_with("[error] directory not found"));
    }

    #[tokio::test]
    async fn answer_question_uses_ingested_code() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cart.cs"), "class Cart { void Add() }").unwrap();
        let provider = Arc::new(
            MockProvider::with_responses(vec!["Cart holds items.".into()])
                .with_hashed_embeddings(64),
        );
        let runner = runner_with(Arc::clone(&provider));

        let out = runner
            .run(&call("answer_question", json!({"question": "what is Cart?"})))
            .await;
        assert_eq!(out, INSUFFICIENT_INFORMATION);
        assert!(provider.requests().is_empty());

        runner
            .run(&call(
                "ingest_code_directory",
                json!({"directory": dir.path().to_string_lossy()}),
            ))
            .await;
        let out = runner
            .run(&call("answer_question", json!({"question": "what is Cart?"})))
            .await;
        assert_eq!(out, "Cart holds items.");
        let prompt = &provider.requests()[0].messages[1].content;
        assert!(prompt.ends_with("Question: what is Cart?"));
        assert!(prompt.contains("class Cart"));
    }

    #[tokio::test]
    async fn release_notes_from_given_commits() {
        let provider = Arc::new(MockProvider::with_responses(vec!["## Fixes\n- login".into()]));
        let runner = runner_with(Arc::clone(&provider));

        let out = runner
            .run(&call(
                "generate_release_notes",
                json!({"commits": "- fix login (Ada, 2024-01-01)"}),
            ))
            .await;

        assert_eq!(out, "## Fixes\n- login");
        assert!(
            provider.requests()[0].messages[1]
                .content
                .ends_with("- fix login (Ada, 2024-01-01)")
        );
    }

    #[tokio::test]
    async fn release_notes_without_commits_read_the_repository() {
        let runner = runner();
        let out = runner.run(&call("generate_release_notes", json!({}))).await;
        assert!(out.starts_with("[error] no repository path set"), "{out}");
    }
}
