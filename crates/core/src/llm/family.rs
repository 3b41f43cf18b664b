use crate::llm::error::LlmError;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Request/response contract of a model family. `Fallback` covers identifiers
/// that match no known family and speaks the Claude shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Claude,
    Nova,
    Fallback,
}

impl ModelFamily {
    pub fn resolve(model_id: &str) -> Self {
        let id = model_id.to_lowercase();
        if id.contains("claude") || id.contains("anthropic") {
            ModelFamily::Claude
        } else if id.contains("nova") {
            ModelFamily::Nova
        } else {
            ModelFamily::Fallback
        }
    }

    pub fn build_request(self, prompt: &str, max_tokens: u32, temperature: f64) -> ModelRequest<'_> {
        match self {
            ModelFamily::Claude | ModelFamily::Fallback => ModelRequest::Messages(MessagesRequest {
                anthropic_version: BEDROCK_ANTHROPIC_VERSION,
                max_tokens,
                temperature,
                messages: vec![TextMessage {
                    role: "user",
                    content: prompt,
                }],
            }),
            ModelFamily::Nova => ModelRequest::Nova(NovaRequest {
                messages: vec![NovaMessage {
                    role: "user",
                    content: vec![NovaContent { text: prompt }],
                }],
                inference_config: InferenceConfig {
                    max_new_tokens: max_tokens,
                    temperature,
                },
            }),
        }
    }

    pub fn extract_text(self, body: &Value) -> Result<String, LlmError> {
        let (pointer, detail) = match self {
            ModelFamily::Claude | ModelFamily::Fallback => {
                ("/content/0/text", "missing content[0].text")
            }
            ModelFamily::Nova => (
                "/output/message/content/0/text",
                "missing output.message.content[0].text",
            ),
        };

        body.pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(LlmError::MalformedResponse {
                family: self,
                detail,
            })
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelFamily::Claude => "claude",
            ModelFamily::Nova => "nova",
            ModelFamily::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModelRequest<'a> {
    Messages(MessagesRequest<'a>),
    Nova(NovaRequest<'a>),
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct TextMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NovaRequest<'a> {
    messages: Vec<NovaMessage<'a>>,
    #[serde(rename = "inferenceConfig")]
    inference_config: InferenceConfig,
}

#[derive(Debug, Clone, Serialize)]
struct NovaMessage<'a> {
    role: &'static str,
    content: Vec<NovaContent<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct NovaContent<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct InferenceConfig {
    max_new_tokens: u32,
    temperature: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape_a(prompt: &str) -> Value {
        json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": 2000,
            "temperature": 0.7,
            "messages": [{"role": "user", "content": prompt}],
        })
    }

    fn request_json(model_id: &str, prompt: &str) -> Value {
        let req = ModelFamily::resolve(model_id).build_request(prompt, 2000, 0.7);
        serde_json::to_value(&req).unwrap()
    }

    #[test]
    fn resolves_families_case_insensitively() {
        assert_eq!(
            ModelFamily::resolve("anthropic.claude-3-sonnet-20240229-v1:0"),
            ModelFamily::Claude
        );
        assert_eq!(ModelFamily::resolve("us.Anthropic.x"), ModelFamily::Claude);
        assert_eq!(ModelFamily::resolve("CLAUDE-instant"), ModelFamily::Claude);
        assert_eq!(ModelFamily::resolve("us.amazon.nova-lite-v1:0"), ModelFamily::Nova);
        assert_eq!(ModelFamily::resolve("amazon.NOVA-pro"), ModelFamily::Nova);
        assert_eq!(ModelFamily::resolve("meta.llama3-70b"), ModelFamily::Fallback);
        assert_eq!(ModelFamily::resolve(""), ModelFamily::Fallback);
    }

    #[test]
    fn claude_and_unknown_ids_build_shape_a() {
        for id in ["anthropic.claude-3-haiku", "claude-v2", "meta.llama3-70b", "mistral.x"] {
            assert_eq!(request_json(id, "hi"), shape_a("hi"), "model id {id}");
        }
    }

    #[test]
    fn nova_ids_build_shape_b() {
        assert_eq!(
            request_json("us.amazon.nova-lite-v1:0", "hi"),
            json!({
                "messages": [{"role": "user", "content": [{"text": "hi"}]}],
                "inferenceConfig": {"max_new_tokens": 2000, "temperature": 0.7},
            })
        );
    }

    #[test]
    fn extracts_text_per_family() {
        let claude = json!({"content": [{"type": "text", "text": "{\"a\":1}"}]});
        assert_eq!(ModelFamily::Claude.extract_text(&claude).unwrap(), "{\"a\":1}");
        assert_eq!(ModelFamily::Fallback.extract_text(&claude).unwrap(), "{\"a\":1}");

        let nova = json!({"output": {"message": {"role": "assistant", "content": [{"text": "ok"}]}}});
        assert_eq!(ModelFamily::Nova.extract_text(&nova).unwrap(), "ok");
    }

    #[test]
    fn missing_text_path_is_malformed() {
        let empty_content = json!({"content": []});
        assert!(matches!(
            ModelFamily::Claude.extract_text(&empty_content),
            Err(LlmError::MalformedResponse {
                family: ModelFamily::Claude,
                ..
            })
        ));

        // A Claude-shaped body does not satisfy the Nova path.
        let claude = json!({"content": [{"text": "hi"}]});
        assert!(matches!(
            ModelFamily::Nova.extract_text(&claude),
            Err(LlmError::MalformedResponse {
                family: ModelFamily::Nova,
                ..
            })
        ));

        let no_message = json!({"output": {}});
        assert!(ModelFamily::Nova.extract_text(&no_message).is_err());
    }
}
