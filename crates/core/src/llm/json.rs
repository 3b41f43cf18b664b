use serde_json::{Map, Value};

pub type ParsedTree = Map<String, Value>;

const PREVIEW_CHARS: usize = 200;

/// Model output that could not be read as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("model output is not a JSON object: {reason}")]
pub struct OutputParseError {
    pub reason: String,
    /// First 200 chars of the raw output.
    pub preview: String,
}

impl OutputParseError {
    fn new(raw: &str, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            preview: raw.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Removes a surrounding Markdown fence (```json ... ``` or ``` ... ```).
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    // The opening line may carry a language tag.
    let mut inner = match trimmed.split_once('\n') {
        Some((_, rest)) => rest,
        None => "",
    };
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim()
}

pub fn parse_tree(text: &str) -> Result<ParsedTree, OutputParseError> {
    match serde_json::from_str::<Value>(strip_fences(text)) {
        Ok(Value::Object(tree)) => Ok(tree),
        Ok(other) => Err(OutputParseError::new(
            text,
            format!("top-level value is {}", value_kind(&other)),
        )),
        Err(e) => Err(OutputParseError::new(text, e.to_string())),
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BODY: &str = r#"{"best_recommend": {"brand": "獺祭"}, "recommendations": []}"#;

    #[test]
    fn fenced_and_bare_json_parse_identically() {
        let bare = parse_tree(BODY).unwrap();
        for fenced in [
            format!("```json\n{BODY}\n```"),
            format!("```\n{BODY}\n```\n"),
            format!("  \n```JSON\n{BODY}\n```  "),
            format!("```json\n{BODY}```"),
        ] {
            assert_eq!(parse_tree(&fenced).unwrap(), bare, "input {fenced:?}");
        }
        assert_eq!(bare["best_recommend"]["brand"], json!("獺祭"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let tree = parse_tree("\n\n  {\"a\": 1}  \n").unwrap();
        assert_eq!(tree["a"], json!(1));
    }

    #[test]
    fn rejects_non_json_with_preview() {
        let err = parse_tree("not json at all").unwrap_err();
        assert_eq!(err.preview, "not json at all");

        let long = "x".repeat(500);
        let err = parse_tree(&long).unwrap_err();
        assert_eq!(err.preview.chars().count(), 200);
    }

    #[test]
    fn rejects_non_object_top_level() {
        let err = parse_tree("[1, 2, 3]").unwrap_err();
        assert_eq!(err.reason, "top-level value is an array");
        assert!(parse_tree("```json\n\"text\"\n```").is_err());
        assert!(parse_tree("```").is_err());
        assert!(parse_tree("").is_err());
    }

    #[test]
    fn prose_around_json_is_not_accepted() {
        assert!(parse_tree("Here you go: {\"a\": 1}").is_err());
    }
}
