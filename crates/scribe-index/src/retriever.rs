//! Similarity search over a collection and retrieval-augmented answering.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use scribe_llm::{ChatOptions, LlmProvider, Message};

use crate::document::DocumentChunk;
use crate::error::{IndexError, Result};
use crate::store::DocumentStore;

/// Returned by [`DocumentRetriever::answer`] when no chunk matched the question.
pub const INSUFFICIENT_INFORMATION: &str =
    "I don't have enough information to answer this question based on the available documentation.";

/// Returned by [`format_search_results`] for an empty result.
pub const NO_RESULTS: &str = "No relevant documentation found.";

const DEFAULT_QA_INSTRUCTION: &str = "You are an assistant that helps developers understand \
their code. Answer the question using only the code documentation provided by the user. \
Be clear and concise. If the documentation does not contain the relevant information, say so.";

/// Retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Upper bound on the context block passed to the model, in characters.
    pub max_context_chars: usize,
    /// Output cap for answers. `None` keeps the provider default.
    pub max_answer_tokens: Option<u32>,
    pub embedding_timeout: Duration,
    pub llm_timeout: Duration,
    /// System instruction for question answering.
    pub qa_instruction: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 12_000,
            max_answer_tokens: None,
            embedding_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(120),
            qa_instruction: DEFAULT_QA_INSTRUCTION.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Embeds queries and looks them up in a collection.
pub struct DocumentRetriever<P: LlmProvider> {
    store: Arc<DocumentStore>,
    provider: Arc<P>,
    config: RetrievalConfig,
}

impl<P: LlmProvider> DocumentRetriever<P> {
    #[must_use]
    pub fn new(store: Arc<DocumentStore>, provider: Arc<P>, config: RetrievalConfig) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// At most `limit` chunks closest to `query`, best first. No match is an empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query or the store lookup fails.
    pub async fn search(&self, collection: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let vector = match tokio::time::timeout(
            self.config.embedding_timeout,
            self.provider.embed(query),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(IndexError::Timeout {
                    operation: "query embedding",
                    seconds: self.config.embedding_timeout.as_secs(),
                });
            }
        };

        let hits: Vec<SearchHit> = self
            .store
            .search(collection, vector, limit)
            .await?
            .into_iter()
            .map(|(chunk, score)| SearchHit { chunk, score })
            .collect();
        tracing::debug!(collection, limit, hits = hits.len(), "documentation search");
        Ok(hits)
    }

    /// Answer `question` from the `context_limit` best-matching chunks.
    ///
    /// Makes no completion call when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or the completion call fails.
    pub async fn answer(&self, collection: &str, question: &str, context_limit: usize) -> Result<String> {
        let hits = self.search(collection, question, context_limit).await?;
        if hits.is_empty() {
            return Ok(INSUFFICIENT_INFORMATION.to_owned());
        }

        let context = build_context(&hits, self.config.max_context_chars);
        let messages = [
            Message::system(self.config.qa_instruction.clone()),
            Message::user(format!(
                "Based on the following code documentation:\n\n{context}\nQuestion: {question}"
            )),
        ];
        let options = ChatOptions {
            max_tokens: self.config.max_answer_tokens,
            temperature: None,
        };

        match tokio::time::timeout(
            self.config.llm_timeout,
            self.provider.chat_with_options(&messages, &options),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(IndexError::Timeout {
                operation: "answer completion",
                seconds: self.config.llm_timeout.as_secs(),
            }),
        }
    }
}

/// Concatenate hits into a labelled context block of at most `max_chars` characters.
///
/// The chunk that crosses the limit is cut and ends the block.
#[must_use]
pub fn build_context(hits: &[SearchHit], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for hit in hits {
        let meta = &hit.chunk.metadata;
        let block = format!(
            "--- {}: {} ({}) ---\n{}\n\n",
            meta.kind, meta.element_name, meta.file_name, hit.chunk.content
        );
        let len = block.chars().count();
        if used + len > max_chars {
            out.extend(block.chars().take(max_chars - used));
            break;
        }
        used += len;
        out.push_str(&block);
    }
    out
}

fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_owned(),
    }
}

/// Render hits for display: heading, file, tags, and a fenced preview per hit.
#[must_use]
pub fn format_search_results(hits: &[SearchHit], preview_chars: usize) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_owned();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Found {} relevant document(s):\n", hits.len());
    for hit in hits {
        let meta = &hit.chunk.metadata;
        let _ = writeln!(out, "## {}: {}", meta.kind, meta.element_name);
        let _ = writeln!(out, "File: {}", meta.file_name);
        if !meta.tags.is_empty() {
            let _ = writeln!(out, "Tags: {}", meta.tags.join(", "));
        }
        let _ = writeln!(out, "\n```\n{}\n```\n", preview(&hit.chunk.content, preview_chars));
    }
    out
}
