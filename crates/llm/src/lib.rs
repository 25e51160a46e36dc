pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod synthesizer;

pub use orchestrator::{answer_batch, RetrievalResult, BATCH_TOP_K, CHAT_TOP_K, NO_INDEX_ADVISORY};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use synthesizer::{AnswerSynthesizer, ERROR_FALLBACK, UNAVAILABLE_FALLBACK};
