pub mod bedrock;
pub mod error;
pub mod executor;
pub mod family;
pub mod json;

pub use error::{LlmError, TransportError, TransportErrorKind};
pub use executor::{InvocationExecutor, RetryPolicy};
pub use family::{ModelFamily, ModelRequest};

pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Single logical "generate text" call. Implementations own retries; callers see
/// either the generated text or the error of the last attempt.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, LlmError>;
}

/// One outbound call to the inference service. Must not retry on its own.
#[async_trait::async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn invoke_model(
        &self,
        model_id: &str,
        request: &ModelRequest<'_>,
    ) -> Result<serde_json::Value, LlmError>;
}

/// Supplies the model identifier. Read at the start of every attempt so a
/// configuration change is picked up by the next retry.
pub trait ModelIdSource: Send + Sync {
    fn model_id(&self) -> String;
}

impl<F> ModelIdSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn model_id(&self) -> String {
        self()
    }
}

/// Reads `BEDROCK_MODEL_ID` on every call.
#[derive(Debug, Clone)]
pub struct EnvModelId {
    fallback: String,
}

impl EnvModelId {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }
}

impl ModelIdSource for EnvModelId {
    fn model_id(&self) -> String {
        std::env::var("BEDROCK_MODEL_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.fallback.clone())
    }
}
