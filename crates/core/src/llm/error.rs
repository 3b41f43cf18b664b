use crate::llm::ModelFamily;
use std::fmt;

const ACCESS_DENIED_HINT: &str =
    "model access is denied by account policy; switch BEDROCK_MODEL_ID to a permitted model";
const INFERENCE_PROFILE_HINT: &str =
    "this model must be invoked through an inference profile id, e.g. us.amazon.nova-lite-v1:0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Status(u16),
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Connect => f.write_str("connect"),
            TransportErrorKind::Timeout => f.write_str("timeout"),
            TransportErrorKind::Status(status) => write!(f, "status={status}"),
            TransportErrorKind::Request => f.write_str("request"),
        }
    }
}

/// Failure reported by the inference service or the network in front of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} {code}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// Service error code, e.g. `ThrottlingException`; `Unknown` when absent.
    pub code: String,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Request
        };
        Self::new(kind, "Unknown", err.to_string())
    }

    /// Operator-facing hint for error signatures with a known remedy.
    pub fn hint(&self) -> Option<&'static str> {
        if self.code.contains("AccessDeniedException") {
            Some(ACCESS_DENIED_HINT)
        } else if self.code.contains("ValidationException")
            && self.message.to_lowercase().contains("inference profile")
        {
            Some(INFERENCE_PROFILE_HINT)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("model transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed {family} response: {detail}")]
    MalformedResponse {
        family: ModelFamily,
        detail: &'static str,
    },

    #[error("unexpected model response: {0}")]
    Unexpected(String),

    #[error("text generation failed after {attempts} attempts")]
    InvocationFailed { attempts: u32 },
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Transport(_) => "transport",
            LlmError::MalformedResponse { .. } => "malformed_response",
            LlmError::Unexpected(_) => "unexpected",
            LlmError::InvocationFailed { .. } => "invocation_failed",
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            LlmError::Transport(err) => err.hint(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_access_denied() {
        let err = TransportError::new(
            TransportErrorKind::Status(403),
            "AccessDeniedException",
            "You don't have access to the model with the specified model ID.",
        );
        assert_eq!(err.hint(), Some(ACCESS_DENIED_HINT));
        assert_eq!(LlmError::from(err).hint(), Some(ACCESS_DENIED_HINT));
    }

    #[test]
    fn hints_inference_profile_only_for_validation_errors() {
        let err = TransportError::new(
            TransportErrorKind::Status(400),
            "ValidationException",
            "Invocation of model ID amazon.nova-lite-v1:0 with on-demand throughput isn't supported. Retry your request with the ID or ARN of an inference profile that contains this model.",
        );
        assert_eq!(err.hint(), Some(INFERENCE_PROFILE_HINT));

        let other = TransportError::new(
            TransportErrorKind::Status(400),
            "ValidationException",
            "max_tokens must be positive",
        );
        assert_eq!(other.hint(), None);

        let throttled = TransportError::new(
            TransportErrorKind::Status(429),
            "ThrottlingException",
            "inference profile throttled",
        );
        assert_eq!(throttled.hint(), None);
    }

    #[test]
    fn display_includes_kind_and_code() {
        let err = LlmError::from(TransportError::new(
            TransportErrorKind::Status(429),
            "ThrottlingException",
            "Too many requests",
        ));
        assert_eq!(
            err.to_string(),
            "model transport failed: status=429 ThrottlingException: Too many requests"
        );
        assert_eq!(err.kind(), "transport");
    }
}
