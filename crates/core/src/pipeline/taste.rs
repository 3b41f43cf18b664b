use crate::domain::recommendation::Degradation;
use crate::domain::record::DrinkingRecord;
use crate::domain::taste::{rating_histogram, TasteProfile, SUMMARY_MAX_CHARS, SUMMARY_PLACEHOLDER};
use crate::llm::json::{parse_tree, ParsedTree};
use crate::pipeline::sanitize::{lookup, truncate_with_ellipsis};
use serde_json::Value;

const PREFERRED_KEYS: &[&str] = &["preferred_tastes", "preferred"];
const DISLIKED_KEYS: &[&str] = &["disliked_tastes", "disliked"];
const SUMMARY_KEYS: &[&str] = &["analysis_summary", "summary"];

/// Builds a profile from raw model text. The histogram always comes from
/// `history`; text fields fall back field by field.
pub fn assemble_taste_profile(text: &str, history: &[DrinkingRecord]) -> TasteProfile {
    match parse_tree(text) {
        Ok(tree) => from_tree(&tree, history),
        Err(err) => {
            tracing::warn!(
                reason = %err.reason,
                raw_chars = text.chars().count(),
                "taste analysis output unparsable; using placeholder"
            );
            TasteProfile {
                degraded: Some(Degradation::UnparsableOutput),
                ..placeholder(history)
            }
        }
    }
}

pub fn from_tree(tree: &ParsedTree, history: &[DrinkingRecord]) -> TasteProfile {
    let summary = match lookup(tree, SUMMARY_KEYS).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => truncate_with_ellipsis(s, SUMMARY_MAX_CHARS),
        _ => {
            tracing::debug!("taste summary missing; using placeholder");
            SUMMARY_PLACEHOLDER.to_string()
        }
    };

    TasteProfile {
        preferred: string_list(tree, PREFERRED_KEYS),
        disliked: string_list(tree, DISLIKED_KEYS),
        rating_histogram: rating_histogram(history),
        summary,
        degraded: None,
    }
}

/// Profile for when the model could not be reached at all.
pub fn unavailable(history: &[DrinkingRecord]) -> TasteProfile {
    TasteProfile {
        degraded: Some(Degradation::ModelUnavailable),
        ..placeholder(history)
    }
}

fn placeholder(history: &[DrinkingRecord]) -> TasteProfile {
    TasteProfile {
        preferred: Vec::new(),
        disliked: Vec::new(),
        rating_histogram: rating_histogram(history),
        summary: SUMMARY_PLACEHOLDER.to_string(),
        degraded: None,
    }
}

/// A list made only of strings is kept, trimmed and without blank entries;
/// anything else is empty.
fn string_list(tree: &ParsedTree, keys: &[&str]) -> Vec<String> {
    let Some(Value::Array(items)) = lookup(tree, keys) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(s) if s.trim().is_empty() => {}
            Some(s) => out.push(s.trim().to_string()),
            None => {
                tracing::warn!(field = keys[0], "taste list holds a non-string; discarding list");
                return Vec::new();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Rating;
    use serde_json::json;

    fn record(rating: Rating) -> DrinkingRecord {
        DrinkingRecord {
            id: None,
            user_id: "u1".to_string(),
            brand: "而今".to_string(),
            impression: "香りが良い".to_string(),
            rating,
            label_image_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn history() -> Vec<DrinkingRecord> {
        vec![record(Rating::VeryGood), record(Rating::Good), record(Rating::Good), record(Rating::VeryBad)]
    }

    #[test]
    fn reads_wire_keys() {
        let text = r#"```json
{"preferred_tastes": [" フルーティー ", "辛口"], "disliked_tastes": ["重い"], "analysis_summary": "  華やかな香りを好む傾向  "}
```"#;
        let profile = assemble_taste_profile(text, &history());
        assert_eq!(profile.preferred, ["フルーティー", "辛口"]);
        assert_eq!(profile.disliked, ["重い"]);
        assert_eq!(profile.summary, "華やかな香りを好む傾向");
        assert_eq!(profile.rating_histogram.get(&Rating::Good), Some(&2));
        assert_eq!(profile.degraded, None);
    }

    #[test]
    fn domain_names_are_accepted() {
        let tree = json!({"preferred": ["甘口"], "summary": "甘口派"});
        let profile = from_tree(tree.as_object().unwrap(), &[]);
        assert_eq!(profile.preferred, ["甘口"]);
        assert_eq!(profile.summary, "甘口派");
    }

    #[test]
    fn malformed_lists_become_empty() {
        let tree = json!({
            "preferred_tastes": ["甘口", 3],
            "disliked_tastes": "重い",
            "analysis_summary": "ok",
        });
        let profile = from_tree(tree.as_object().unwrap(), &history());
        assert!(profile.preferred.is_empty());
        assert!(profile.disliked.is_empty());
    }

    #[test]
    fn blank_list_entries_are_skipped() {
        let tree = json!({"preferred_tastes": ["  ", "", "甘口"], "disliked_tastes": ["\t"]});
        let profile = from_tree(tree.as_object().unwrap(), &[]);
        assert_eq!(profile.preferred, ["甘口"]);
        assert!(profile.disliked.is_empty());
    }

    #[test]
    fn summary_is_truncated_or_replaced() {
        let long = json!({"analysis_summary": "味".repeat(250)});
        let profile = from_tree(long.as_object().unwrap(), &[]);
        assert_eq!(profile.summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(profile.summary.ends_with("..."));

        for v in [json!({}), json!({"analysis_summary": "   "}), json!({"analysis_summary": 5})] {
            let profile = from_tree(v.as_object().unwrap(), &[]);
            assert_eq!(profile.summary, SUMMARY_PLACEHOLDER);
        }
    }

    #[test]
    fn garbage_keeps_histogram() {
        let profile = assemble_taste_profile("sorry, I can't", &history());
        assert_eq!(profile.summary, SUMMARY_PLACEHOLDER);
        assert!(profile.preferred.is_empty());
        assert_eq!(profile.rating_histogram.values().sum::<u32>(), 4);
        assert_eq!(profile.degraded, Some(Degradation::UnparsableOutput));

        let down = unavailable(&history());
        assert_eq!(down.rating_histogram, profile.rating_histogram);
        assert_eq!(down.degraded, Some(Degradation::ModelUnavailable));
    }
}
