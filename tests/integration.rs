use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use scribe_core::bootstrap::AppBuilder;
use scribe_core::channel::{Channel, ChannelError, ChannelMessage};
use scribe_core::config::Config;
use scribe_core::session::{SESSION_PROMPT, welcome};
use scribe_index::DocumentStore;
use scribe_llm::mock::MockProvider;
use serial_test::serial;

// -- Mock Channel --

struct MockChannel {
    inputs: VecDeque<String>,
    outputs: Arc<Mutex<Vec<String>>>,
    chunks: Arc<Mutex<Vec<String>>>,
}

impl MockChannel {
    fn new(inputs: Vec<&str>, outputs: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            inputs: inputs.into_iter().map(String::from).collect(),
            outputs,
            chunks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Channel for MockChannel {
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        Ok(self.inputs.pop_front().map(|text| ChannelMessage { text }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.outputs.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: &str) -> Result<(), ChannelError> {
        self.chunks.lock().unwrap().push(chunk.to_string());
        Ok(())
    }

    async fn flush_chunks(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}

// -- Helpers --

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("scribe.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn source_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("Models")).unwrap();
    std::fs::write(
        dir.path().join("Models/Cart.cs"),
        "namespace Shop {\npublic class Cart {\n  public void Add(Item item) {}\n}\npublic class Item {\n}\n}\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("Program.cs"),
        "static void Main() { Console.WriteLine(\"hi\"); }\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("readme.md"), "# not indexed\n").unwrap();
    dir
}

async fn run_session(
    config_path: &Path,
    provider: &Arc<MockProvider>,
    inputs: Vec<&str>,
) -> Vec<String> {
    let builder = AppBuilder::from_path(config_path).unwrap();
    let store = Arc::new(DocumentStore::in_memory());
    let outputs = Arc::new(Mutex::new(Vec::new()));
    let channel = MockChannel::new(inputs, Arc::clone(&outputs));
    let mut session = builder
        .build_session(Arc::clone(provider), store, channel)
        .unwrap();
    session.run().await.unwrap();
    outputs.lock().unwrap().clone()
}

// -- Config tests --

#[test]
#[serial]
fn shipped_default_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = Config::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.index.collection, "code_documentation");
    assert_eq!(config.index.search_limit, 5);
    assert_eq!(config.commits.max_count, 20);
}

#[test]
#[serial]
fn invalid_config_is_rejected_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[timeouts]\nllm_seconds = 0\n");
    assert!(AppBuilder::from_path(&path).is_err());
}

// -- Session tests --

#[tokio::test]
#[serial]
async fn configured_app_name_appears_in_banner() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[app]\nname = \"Release Desk\"\n");
    let provider = Arc::new(MockProvider::default());

    let out = run_session(&config, &provider, vec!["exit"]).await;

    assert!(out[0].starts_with("Welcome to Release Desk."));
}

#[tokio::test]
#[serial]
async fn documentation_round_trip_then_chat() {
    let tree = source_tree();
    let src = tree.path().to_string_lossy().into_owned();
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "[index]\ncollection = \"shop_docs\"\ncontext_limit = 2\n",
    );
    let provider = Arc::new(
        MockProvider::with_responses(vec![
            "documentation".into(),
            "Cart collects items before checkout.".into(),
            "chat".into(),
            "Glad to help.".into(),
        ])
        .with_hashed_embeddings(64),
    );
    let ingest = format!("ingest the code in directory {src}");

    let out = run_session(
        &config,
        &provider,
        vec![
            &ingest,
            "what does the Cart class do?",
            "exit",
            "thanks",
            "exit",
            "quit",
        ],
    )
    .await;

    assert_eq!(out[0], welcome("Scribe"));
    assert_eq!(out[1], SESSION_PROMPT);
    assert!(out.contains(&format!(
        "Ingesting code from directory: '{src}' with extensions: .cs"
    )));
    assert!(out.contains(
        &"Successfully ingested 3 documentation chunks from 2 files into collection 'shop_docs'."
            .to_string()
    ));
    assert!(out.contains(&"Cart collects items before checkout.".to_string()));
    assert!(out.contains(&"Glad to help.".to_string()));
    assert_eq!(out.last().unwrap(), SESSION_PROMPT);

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    let answer_prompt = &requests[1].messages[1].content;
    assert!(answer_prompt.starts_with("Based on the following code documentation:"));
    assert!(answer_prompt.ends_with("Question: what does the Cart class do?"));
    assert_eq!(requests[1].options.max_tokens, Some(1024));
}

#[tokio::test]
#[serial]
async fn classifier_failure_falls_back_to_chat() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let provider = Arc::new(MockProvider::with_responses(vec![
        "I think this is about commits".into(),
        "Happy to chat.".into(),
    ]));

    let out = run_session(&config, &provider, vec!["hello there", "exit", "exit"]).await;

    assert_eq!(
        out,
        vec![
            welcome("Scribe"),
            SESSION_PROMPT.to_string(),
            "Happy to chat.".to_string(),
            "You >".to_string(),
            SESSION_PROMPT.to_string(),
        ]
    );
}

#[tokio::test]
#[serial]
async fn commits_error_returns_to_top_level() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let provider = Arc::new(MockProvider::with_responses(vec![
        "commits".into(),
        "5".into(),
    ]));

    let out = run_session(
        &config,
        &provider,
        vec!["release notes for the last 5 commits", "/nonexistent/repo", "exit"],
    )
    .await;

    assert!(out.contains(&"Enter the path to your Git repository:".to_string()));
    assert!(out.contains(
        &"Error processing your query: repository path does not exist: /nonexistent/repo"
            .to_string()
    ));
    assert_eq!(out.last().unwrap(), SESSION_PROMPT);
}

#[tokio::test]
#[serial]
async fn streaming_chat_reaches_the_channel_in_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let provider = Arc::new(
        MockProvider::with_responses(vec!["chat".into(), "ok".into()]).with_streaming(),
    );
    let builder = AppBuilder::from_path(&config).unwrap();
    let outputs = Arc::new(Mutex::new(Vec::new()));
    let channel = MockChannel::new(vec!["hi"], Arc::clone(&outputs));
    let chunks = Arc::clone(&channel.chunks);
    let mut session = builder
        .build_session(provider, Arc::new(DocumentStore::in_memory()), channel)
        .unwrap();

    session.run().await.unwrap();

    assert_eq!(*chunks.lock().unwrap(), vec!["o", "k"]);
    assert_eq!(session.registry().history().len(), 2);
}
