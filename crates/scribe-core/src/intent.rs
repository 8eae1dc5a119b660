//! Keyword routing inside the documentation workflow. No model calls.

use std::sync::LazyLock;

use regex::Regex;

static SEARCH_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:search|find|look\s+for|show\s+me|documentation|about|for|related\s+to)\b")
        .expect("search filler regex is valid")
});

const INGEST_WORDS: &[&str] = &["ingest", "import", "load"];
const SCAN_WORDS: &[&str] = &["scan", "analyze", "parse", "document"];
const SEARCH_WORDS: &[&str] = &["search", "find", "look for", "show me"];
const QUESTION_PREFIXES: &[&str] = &[
    "how", "what", "why", "when", "where", "who", "which", "can", "does", "do",
];
const DIRECTORY_KEYWORDS: &[&str] = &["directory", "folder", "path", "scan"];
const KNOWN_EXTENSIONS: &[&str] = &[".cs", ".js", ".py", ".java"];

/// What a documentation request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocIntent {
    /// Bulk-ingest a directory.
    Ingest,
    /// Ingest a directory file by file, reporting progress.
    Scan,
    /// Similarity search with the given query text.
    Search { query: String },
    /// Retrieval-augmented answer to the utterance.
    Question,
}

impl DocIntent {
    /// Classify by keyword, first match wins: ingest, scan, search, question.
    /// Anything else is a search for the raw utterance.
    #[must_use]
    pub fn classify(utterance: &str) -> Self {
        let lower = utterance.to_lowercase();
        let has = |word: &str| lower.contains(word);

        if INGEST_WORDS.iter().any(|w| has(w)) || (has("index") && has("code")) {
            return Self::Ingest;
        }
        if SCAN_WORDS.iter().any(|w| has(w)) || (has("directory") && (has("code") || has("files")))
        {
            return Self::Scan;
        }
        if SEARCH_WORDS.iter().any(|w| has(w)) {
            return Self::Search {
                query: clean_search_query(utterance),
            };
        }
        let trimmed = lower.trim();
        if trimmed.contains('?') || QUESTION_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            return Self::Question;
        }
        Self::Search {
            query: utterance.trim().to_owned(),
        }
    }
}

/// Path token following the first `directory`, `folder`, `path`, or `scan` keyword.
#[must_use]
pub fn extract_directory(utterance: &str) -> Option<String> {
    let tokens: Vec<&str> = utterance.split_whitespace().collect();
    tokens.windows(2).find_map(|pair| {
        let keyword = pair[0];
        DIRECTORY_KEYWORDS
            .iter()
            .any(|k| keyword.eq_ignore_ascii_case(k))
            .then(|| pair[1].trim_matches(|c| matches!(c, '\'' | '"' | '`')).to_owned())
            .filter(|path| !path.is_empty())
    })
}

/// First known extension literal mentioned in the utterance, else `default`.
#[must_use]
pub fn extract_extension(utterance: &str, default: &str) -> String {
    KNOWN_EXTENSIONS
        .iter()
        .find(|ext| utterance.contains(*ext))
        .map_or_else(|| default.to_owned(), |ext| (*ext).to_owned())
}

/// Drop search filler words (whole words, any case) and collapse whitespace.
///
/// Returns the trimmed utterance when nothing else is left.
#[must_use]
pub fn clean_search_query(utterance: &str) -> String {
    let stripped = SEARCH_FILLER.replace_all(utterance, " ");
    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        utterance.trim().to_owned()
    } else {
        cleaned
    }
}
