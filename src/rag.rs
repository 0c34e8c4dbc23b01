use crate::chunking::{chunk_text, TextChunk, DEFAULT_CHUNK_WORDS};
use crate::completion::{ChatMessage, CompletionProvider};
use crate::embeddings::{embed_chunks, EmbeddingProvider, DEFAULT_EMBEDDING_DIMENSION};
use crate::guard::contact_guard;
use crate::index::{FlatIndex, NearestNeighbors};
use anyhow::{Context, Result};
use log::{debug, error, info};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Instruction sent as the system message with every question
pub const SYSTEM_INSTRUCTION: &str = "You are a CV assistant for Maia Nagra.\n\
- Answer questions ONLY about Maia's professional experience, skills, education, and highlights.\n\
- If the question is unrelated to the CV, politely say you can only answer questions about Maia.";

/// Tunable parameters of the retrieval pipeline
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Maximum words per chunk
    pub chunk_words: usize,
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Sampling temperature for answer generation
    pub temperature: f32,
    /// Expected length of every embedding vector
    pub embedding_dimension: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        RagConfig {
            chunk_words: DEFAULT_CHUNK_WORDS,
            top_k: 2,
            temperature: 0.2,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// RAG (Retrieval-Augmented Generation) engine.
///
/// Built once from the CV text and never mutated afterwards, so a single
/// instance can be shared across concurrent requests.
pub struct RagEngine {
    chunks: Vec<TextChunk>,
    index: Box<dyn NearestNeighbors>,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    config: RagConfig,
}

impl RagEngine {
    /// Chunk the document, embed every chunk and build the index
    pub async fn build(
        document: &str,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        config: RagConfig,
    ) -> Result<Self> {
        let chunks = chunk_text(document, config.chunk_words);
        info!("Split into {} chunks", chunks.len());

        info!("Generating embeddings for chunks...");
        let embeddings = embed_chunks(embedder.as_ref(), &chunks, config.embedding_dimension)
            .await
            .context("Failed to embed document chunks")?;

        let index = FlatIndex::build(config.embedding_dimension, embeddings)?;
        info!("Indexed {} vectors of dimension {}", index.len(), index.dimension());

        Ok(RagEngine {
            chunks,
            index: Box::new(index),
            embedder,
            completer,
            config,
        })
    }

    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    /// Answer a single question about the CV
    pub async fn answer(&self, query: &str) -> Result<String> {
        let query = query.trim();

        if let Some(reply) = contact_guard(query) {
            debug!("Contact guard triggered");
            return Ok(reply.to_string());
        }

        let context = self.retrieve_context(query).await?;
        let messages = build_messages(&context, query);

        let answer = self
            .completer
            .complete(&messages, self.config.temperature)
            .await?;

        Ok(answer.trim().to_string())
    }

    /// Embed the question and join the nearest chunks, nearest first
    async fn retrieve_context(&self, query: &str) -> Result<String> {
        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_embedding, self.config.top_k)?;
        debug!("Retrieved {} chunks", hits.len());

        let context = hits
            .iter()
            .filter_map(|hit| self.chunks.get(hit.chunk_index))
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<&str>>()
            .join("\n\n");

        Ok(context)
    }

    /// Run an interactive question loop on the terminal
    pub async fn run_query_loop(&self) -> Result<()> {
        let stdin = io::stdin();
        self.query_loop(stdin.lock(), io::stdout()).await
    }

    /// Read questions line by line until `exit` or end of input
    pub async fn query_loop<R: BufRead, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> Result<()> {
        info!("Ready to answer questions about the CV. Type 'exit' to quit.");

        let mut buffer = String::new();

        loop {
            write!(output, "\nYour question: ")?;
            output.flush()?;

            buffer.clear();
            if input.read_line(&mut buffer)? == 0 {
                break;
            }

            let question = buffer.trim();

            if question.eq_ignore_ascii_case("exit") {
                writeln!(output, "Goodbye!")?;
                break;
            }

            if question.is_empty() {
                continue;
            }

            match self.answer(question).await {
                Ok(answer) => writeln!(output, "\n{}", answer)?,
                Err(e) => {
                    error!("Failed to answer question: {:#}", e);
                    writeln!(output, "\nError: {}", e)?;
                }
            }
        }

        Ok(())
    }
}

/// Build the completion request for a question and its retrieved context
pub fn build_messages(context: &str, query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::user(format!(
            "CV Context:\n{}\n\nUser Question: {}",
            context, query
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Role;
    use crate::embeddings::Embedding;
    use crate::guard::CONTACT_DEFLECTION;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Looks up fixed vectors by text; unknown text embeds to the origin
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        dimension: usize,
        fail_on: Option<String>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(dimension: usize, entries: &[(&str, Vec<f32>)]) -> Self {
            TableEmbedder {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                dimension,
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(text) {
                return Err(anyhow::anyhow!("embedding service unavailable"));
            }
            let values = self
                .table
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0; self.dimension]);
            Ok(Embedding::new(values))
        }
    }

    struct RecordingCompleter {
        reply: String,
        fail_with: Option<String>,
        requests: Mutex<Vec<(Vec<ChatMessage>, f32)>>,
    }

    impl RecordingCompleter {
        fn new(reply: &str) -> Self {
            RecordingCompleter {
                reply: reply.to_string(),
                fail_with: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            RecordingCompleter {
                fail_with: Some(message.to_string()),
                ..RecordingCompleter::new("unused")
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for RecordingCompleter {
        async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), temperature));
            match &self.fail_with {
                Some(message) => Err(anyhow::anyhow!("{}", message)),
                None => Ok(self.reply.clone()),
            }
        }
    }

    fn small_config() -> RagConfig {
        RagConfig {
            chunk_words: 3,
            embedding_dimension: 1,
            ..RagConfig::default()
        }
    }

    const DOCUMENT: &str = "alpha beta gamma delta epsilon zeta eta theta iota";

    /// Chunks sit at 5.0, 1.0 and 3.0 from the query at the origin
    fn distance_table() -> Vec<(&'static str, Vec<f32>)> {
        vec![
            ("alpha beta gamma", vec![5.0]),
            ("delta epsilon zeta", vec![1.0]),
            ("eta theta iota", vec![3.0]),
        ]
    }

    #[test]
    fn test_default_config() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_words, 200);
        assert_eq!(config.top_k, 2);
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.embedding_dimension, 1536);
    }

    #[tokio::test]
    async fn test_answer_uses_two_nearest_chunks() {
        let embedder = Arc::new(TableEmbedder::new(1, &distance_table()));
        let completer = Arc::new(RecordingCompleter::new("  Maia is an engineer.\n"));

        let engine =
            RagEngine::build(DOCUMENT, embedder.clone(), completer.clone(), small_config())
                .await
                .unwrap();
        assert_eq!(engine.chunks().len(), 3);

        let answer = engine.answer("  What does Maia do?  ").await.unwrap();
        assert_eq!(answer, "Maia is an engineer.");

        let requests = completer.requests.lock().unwrap();
        let (messages, temperature) = &requests[0];
        assert_eq!(*temperature, 0.2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "CV Context:\ndelta epsilon zeta\n\neta theta iota\n\nUser Question: What does Maia do?"
        );
        // Three chunks at build time plus one query
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_guard_skips_providers() {
        let embedder = Arc::new(TableEmbedder::new(1, &distance_table()));
        let completer = Arc::new(RecordingCompleter::new("unused"));
        let engine =
            RagEngine::build(DOCUMENT, embedder.clone(), completer.clone(), small_config())
                .await
                .unwrap();
        let calls_after_build = embedder.calls.load(Ordering::SeqCst);

        let answer = engine.answer("Tell me about Maia's LinkedIn").await.unwrap();

        assert_eq!(answer, CONTACT_DEFLECTION);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_build);
        assert_eq!(completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_guard_works_on_empty_index() {
        let embedder = Arc::new(TableEmbedder::new(1, &[]));
        let completer = Arc::new(RecordingCompleter::new("unused"));
        let engine = RagEngine::build("", embedder, completer, small_config())
            .await
            .unwrap();

        assert_eq!(engine.answer("EMAIL?").await.unwrap(), CONTACT_DEFLECTION);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_completion() {
        let mut embedder = TableEmbedder::new(1, &distance_table());
        embedder.fail_on = Some("Where did Maia study?".to_string());
        let completer = Arc::new(RecordingCompleter::new("unused"));
        let engine = RagEngine::build(
            DOCUMENT,
            Arc::new(embedder),
            completer.clone(),
            small_config(),
        )
        .await
        .unwrap();

        let err = engine.answer("Where did Maia study?").await.unwrap_err();

        assert!(err.to_string().contains("embedding service unavailable"));
        assert_eq!(completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_is_returned() {
        let embedder = Arc::new(TableEmbedder::new(1, &distance_table()));
        let completer = Arc::new(RecordingCompleter::failing("rate limited"));
        let engine = RagEngine::build(DOCUMENT, embedder, completer.clone(), small_config())
            .await
            .unwrap();

        let err = engine.answer("What does Maia do?").await.unwrap_err();

        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(completer.calls(), 1);
    }

    #[tokio::test]
    async fn test_query_loop_reports_failures_and_continues() {
        let embedder = Arc::new(TableEmbedder::new(1, &distance_table()));
        let completer = Arc::new(RecordingCompleter::failing("rate limited"));
        let engine = RagEngine::build(DOCUMENT, embedder, completer.clone(), small_config())
            .await
            .unwrap();

        let input = "first?\nsecond?\n".as_bytes();
        let mut output = Vec::new();
        engine.query_loop(input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(output.matches("Error: rate limited").count(), 2);
        assert_eq!(completer.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_still_answers() {
        let embedder = Arc::new(TableEmbedder::new(1, &[]));
        let completer = Arc::new(RecordingCompleter::new(
            "I can only answer questions about Maia.",
        ));
        let engine = RagEngine::build("   ", embedder, completer.clone(), small_config())
            .await
            .unwrap();

        assert!(engine.chunks().is_empty());
        let answer = engine.answer("What is the weather?").await.unwrap();
        assert_eq!(answer, "I can only answer questions about Maia.");

        let requests = completer.requests.lock().unwrap();
        assert_eq!(
            requests[0].0[1].content,
            "CV Context:\n\n\nUser Question: What is the weather?"
        );
    }

    #[tokio::test]
    async fn test_build_fails_on_dimension_mismatch() {
        let embedder = Arc::new(TableEmbedder::new(4, &[]));
        let completer = Arc::new(RecordingCompleter::new("unused"));

        let result = RagEngine::build(DOCUMENT, embedder, completer, small_config()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_query_loop_answers_until_exit() {
        let embedder = Arc::new(TableEmbedder::new(1, &distance_table()));
        let completer = Arc::new(RecordingCompleter::new("An engineer."));
        let engine = RagEngine::build(DOCUMENT, embedder, completer.clone(), small_config())
            .await
            .unwrap();

        let input = "What does Maia do?\n\nphone?\nexit\nnever asked\n".as_bytes();
        let mut output = Vec::new();
        engine.query_loop(input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("An engineer."));
        assert!(output.contains(CONTACT_DEFLECTION));
        assert!(output.ends_with("Goodbye!\n"));
        assert_eq!(completer.calls(), 1);
    }
}
