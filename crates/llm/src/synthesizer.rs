//! Grounded answer synthesis.
//!
//! Turns a question plus ranked context chunks into a single
//! natural-language answer via the configured completion provider. The
//! synthesizer never raises: provider failures, timeouts, and a missing
//! provider all degrade to deterministic fallback strings.

use std::time::Duration;

use docuquery_core::config::{LlmConfig, OllamaConfig};
use docuquery_core::Chunk;
use tracing::warn;

use crate::provider::{LlmProvider, Message, Role};
use crate::providers::create_provider;

/// Returned when the completion provider could not be initialized at all.
pub const UNAVAILABLE_FALLBACK: &str =
    "Could not generate an answer due to an API client initialization error.";

/// Returned when a single completion call fails or times out.
pub const ERROR_FALLBACK: &str = "Could not generate an answer due to an API error.";

/// Bounded wait for one completion call.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AnswerSynthesizer {
    provider: Option<Box<dyn LlmProvider>>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider: Some(provider),
            temperature,
            max_tokens,
            timeout: COMPLETION_TIMEOUT,
        }
    }

    /// A synthesizer with no provider: every call returns the
    /// initialization-error fallback without attempting network access.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            temperature: 0.0,
            max_tokens: 0,
            timeout: COMPLETION_TIMEOUT,
        }
    }

    /// Build from config; degrades to the disabled state when no provider
    /// can be created (missing credential, unknown provider name).
    pub fn from_config(llm_config: &LlmConfig, ollama_config: &OllamaConfig) -> Self {
        match create_provider(llm_config, ollama_config) {
            Ok(provider) => {
                tracing::info!("Answer synthesizer ready (provider: {})", llm_config.provider);
                Self::new(provider, llm_config.temperature, llm_config.max_tokens)
            }
            Err(e) => {
                warn!("LLM provider unavailable: {} — answers will degrade to a fallback", e);
                Self::disabled()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Generate an answer grounded strictly in the supplied context chunks.
    ///
    /// Always returns a plain, trimmed string; errors are downgraded to the
    /// fallback constants and logged with the truncated question.
    pub async fn generate(&self, question: &str, context_chunks: &[Chunk]) -> String {
        let Some(provider) = self.provider.as_ref() else {
            return UNAVAILABLE_FALLBACK.to_string();
        };

        let messages = build_messages(question, context_chunks);
        let call = provider.complete(messages, self.temperature, self.max_tokens);

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(answer)) => answer.trim().to_string(),
            Ok(Err(e)) => {
                warn!(
                    "Completion failed for question '{}…': {}",
                    truncate(question, 30),
                    e
                );
                ERROR_FALLBACK.to_string()
            }
            Err(_) => {
                warn!(
                    "Completion timed out after {:?} for question '{}…'",
                    self.timeout,
                    truncate(question, 30)
                );
                ERROR_FALLBACK.to_string()
            }
        }
    }
}

/// Build the grounding prompt: assistant instructions as the system
/// message, page-labeled excerpts plus the verbatim question as the user
/// message.
fn build_messages(question: &str, context_chunks: &[Chunk]) -> Vec<Message> {
    let context = context_chunks
        .iter()
        .map(|chunk| format!("Source: Page {}\n{}", chunk.page, chunk.text))
        .collect::<Vec<_>>()
        .join("\n---\n");

    let system = "You are an expert AI assistant for document analysis. Your task is to \
                  answer the user's question based ONLY on the provided document excerpts.\n\
                  Follow these instructions carefully:\n\
                  1. Synthesize information from all relevant excerpts into a single, cohesive answer.\n\
                  2. Write the answer in a complete, easy-to-understand paragraph.\n\
                  3. Do not just list facts. Summarize the key conditions and details.\n\
                  4. If the provided excerpts do not contain the answer, explicitly state that \
                  the information is not available in the provided text.";

    let user = format!("**Document Excerpts:**\n{context}\n\n**Question:**\n{question}");

    vec![
        Message {
            role: Role::System,
            content: system.to_string(),
        },
        Message {
            role: Role::User,
            content: user,
        },
    ]
}

/// Char-boundary-safe prefix for log lines.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::provider::LlmError;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Ok(format!("  echo: {}  ", messages.last().unwrap().content))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn complete(
            &self,
            _messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Err(LlmError::Api {
                status: 429,
                body: "quota exceeded".into(),
            })
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        async fn complete(
            &self,
            _messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok("too late".into())
        }
    }

    fn chunks() -> Vec<Chunk> {
        vec![Chunk::new("Clause A.", 1), Chunk::new("Clause B.", 2)]
    }

    #[test]
    fn prompt_labels_each_chunk_with_its_page() {
        let messages = build_messages("What is covered?", &chunks());
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0].role, Role::System));

        let user = &messages[1].content;
        assert!(user.contains("Source: Page 1\nClause A."));
        assert!(user.contains("Source: Page 2\nClause B."));
        assert!(user.ends_with("What is covered?"));
    }

    #[test]
    fn prompt_instructs_synthesis_and_refusal() {
        let messages = build_messages("q", &chunks());
        let system = &messages[0].content;
        assert!(system.contains("Synthesize"));
        assert!(system.contains("not available in the provided text"));
    }

    #[tokio::test]
    async fn answers_are_trimmed() {
        let synth = AnswerSynthesizer::new(Box::new(EchoProvider), 0.1, 256);
        let answer = synth.generate("q", &chunks()).await;
        assert!(answer.starts_with("echo:"));
        assert!(!answer.ends_with(' '));
    }

    #[tokio::test]
    async fn disabled_synthesizer_returns_unavailable_fallback() {
        let synth = AnswerSynthesizer::disabled();
        assert!(!synth.is_available());
        assert_eq!(synth.generate("q", &chunks()).await, UNAVAILABLE_FALLBACK);
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_error_fallback() {
        let synth = AnswerSynthesizer::new(Box::new(FailingProvider), 0.1, 256);
        assert_eq!(synth.generate("q", &chunks()).await, ERROR_FALLBACK);
    }

    #[tokio::test]
    async fn timed_out_call_degrades_to_error_fallback() {
        let synth = AnswerSynthesizer::new(Box::new(SlowProvider), 0.1, 256)
            .with_timeout(Duration::from_millis(20));
        assert_eq!(synth.generate("q", &chunks()).await, ERROR_FALLBACK);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("ab", 30), "ab");
    }
}
