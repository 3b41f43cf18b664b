use crate::config::Settings;
use crate::llm::error::{LlmError, TransportError, TransportErrorKind};
use crate::llm::{InferenceTransport, ModelRequest};
use anyhow::Context;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;

const JSON_MEDIA_TYPE: &str = "application/json";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";
const ERROR_MESSAGE_PREVIEW_CHARS: usize = 300;

/// Bedrock runtime `InvokeModel` over HTTPS with API-key (bearer) auth.
///
/// `reqwest` performs no retries of its own, so each `invoke_model` call is
/// exactly one outbound request and [`crate::llm::InvocationExecutor`] keeps
/// sole control over retry semantics.
#[derive(Clone)]
pub struct BedrockClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for BedrockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl BedrockClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_bedrock_api_key()?.to_string();

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            endpoint: settings.bedrock_endpoint(),
            api_key,
        })
    }

    fn invoke_url(&self, model_id: &str) -> Result<reqwest::Url, LlmError> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| LlmError::Unexpected(format!("invalid Bedrock endpoint: {e}")))?;
        // Segments are percent-encoded, so ARNs containing '/' stay one segment.
        url.path_segments_mut()
            .map_err(|_| LlmError::Unexpected("Bedrock endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["model", model_id, "invoke"]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl InferenceTransport for BedrockClient {
    async fn invoke_model(
        &self,
        model_id: &str,
        request: &ModelRequest<'_>,
    ) -> Result<Value, LlmError> {
        let url = self.invoke_url(model_id)?;
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = res.status();
        let error_type = res
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(error_code_from_header);
        let text = res.text().await.map_err(TransportError::from_reqwest)?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), error_type, &text).into());
        }

        serde_json::from_str::<Value>(&text)
            .map_err(|e| LlmError::Unexpected(format!("Bedrock response body is not JSON: {e}")))
    }
}

/// `AccessDeniedException:http://internal.amazon.com/...` → `AccessDeniedException`.
fn error_code_from_header(raw: &str) -> String {
    raw.split(':').next().unwrap_or(raw).trim().to_string()
}

fn status_error(status: u16, error_type: Option<String>, body: &str) -> TransportError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(ERROR_MESSAGE_PREVIEW_CHARS).collect());
    let code = error_type
        .filter(|c| !c.is_empty())
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|v| v.get("__type"))
                .and_then(Value::as_str)
                .map(error_code_from_header)
        })
        .unwrap_or_else(|| "Unknown".to_string());

    TransportError::new(TransportErrorKind::Status(status), code, message)
}
