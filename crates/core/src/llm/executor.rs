use crate::llm::{
    InferenceTransport, LlmError, ModelFamily, ModelIdSource, TextGenerator,
};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry: no backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Runs adapt → call → extract under [`RetryPolicy`]. Every failure kind is
/// retried, including malformed responses; the last error is returned as-is.
#[derive(Debug, Clone)]
pub struct InvocationExecutor<T, M> {
    transport: T,
    model_id: M,
    policy: RetryPolicy,
}

impl<T, M> InvocationExecutor<T, M>
where
    T: InferenceTransport,
    M: ModelIdSource,
{
    pub fn new(transport: T, model_id: M) -> Self {
        Self {
            transport,
            model_id,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn invoke(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, LlmError> {
        let max_attempts = self.policy.max_attempts;
        tracing::info!(
            prompt_chars = prompt.chars().count(),
            max_tokens,
            temperature,
            "text generation started"
        );

        let mut last_error: Option<LlmError> = None;
        for attempt in 1..=max_attempts {
            let model_id = self.model_id.model_id();
            match self.attempt(&model_id, prompt, max_tokens, temperature).await {
                Ok(text) => {
                    tracing::info!(
                        %model_id,
                        attempt,
                        response_chars = text.chars().count(),
                        "text generation completed"
                    );
                    return Ok(text);
                }
                Err(err) => {
                    match err.hint() {
                        Some(hint) => tracing::warn!(
                            %model_id,
                            attempt,
                            max_attempts,
                            error_kind = err.kind(),
                            error = %err,
                            hint,
                            "model invocation failed"
                        ),
                        None => tracing::warn!(
                            %model_id,
                            attempt,
                            max_attempts,
                            error_kind = err.kind(),
                            error = %err,
                            "model invocation failed"
                        ),
                    }
                    last_error = Some(err);

                    if attempt < max_attempts {
                        tracing::info!(
                            retry_delay_ms = self.policy.delay.as_millis() as u64,
                            next_attempt = attempt + 1,
                            "retrying model invocation"
                        );
                        tokio::time::sleep(self.policy.delay).await;
                    } else {
                        tracing::error!(
                            %model_id,
                            total_attempts = max_attempts,
                            "model invocation exhausted all attempts"
                        );
                    }
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::InvocationFailed {
            attempts: max_attempts,
        }))
    }

    async fn attempt(
        &self,
        model_id: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, LlmError> {
        let family = ModelFamily::resolve(model_id);
        if family == ModelFamily::Fallback {
            tracing::warn!(%model_id, "unknown model family; using the Claude request shape");
        }

        let request = family.build_request(prompt, max_tokens, temperature);
        let body = self.transport.invoke_model(model_id, &request).await?;
        family.extract_text(&body)
    }
}

#[async_trait::async_trait]
impl<T, M> TextGenerator for InvocationExecutor<T, M>
where
    T: InferenceTransport,
    M: ModelIdSource,
{
    async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, LlmError> {
        self.invoke(prompt, max_tokens, temperature).await
    }
}
