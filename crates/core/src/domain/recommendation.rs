use serde::{Deserialize, Serialize};

pub use crate::domain::record::BRAND_MAX_CHARS;
pub const DESCRIPTION_MAX_CHARS: usize = 50;
pub const EXPERIENCE_MAX_CHARS: usize = 50;
pub const CATEGORY_MAX_CHARS: usize = 10;
pub const MATCH_SCORE_MIN: i64 = 1;
pub const MATCH_SCORE_MAX: i64 = 100;
pub const SECONDARY_MAX: usize = 9;

/// Substituted for a secondary item's category when the model's is unusable.
pub const DEFAULT_CATEGORY: &str = "おすすめ";

pub const NO_HISTORY_REASON: &str = "飲酒記録がありません。まずは飲んだお酒を記録してください";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestMatch {
    pub brand: String,
    #[serde(rename = "brand_description")]
    pub description: String,
    pub expected_experience: String,
    pub match_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryRecommendation {
    pub brand: String,
    #[serde(rename = "brand_description")]
    pub description: String,
    pub expected_experience: String,
    pub category: String,
    pub match_score: i64,
}

/// Why a result carries less than the model could have produced. Never serialized,
/// so the external contract is identical for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    UnparsableOutput,
    ModelUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResult {
    #[serde(rename = "best_recommend")]
    pub best_match: Option<BestMatch>,
    #[serde(rename = "recommendations")]
    pub secondary: Vec<SecondaryRecommendation>,
    #[serde(rename = "metadata", default, skip_serializing_if = "Option::is_none")]
    pub empty_reason: Option<String>,
    #[serde(skip)]
    pub degraded: Option<Degradation>,
}

impl RecommendationResult {
    /// Result for a user without any drinking history.
    pub fn no_history() -> Self {
        Self {
            best_match: None,
            secondary: Vec::new(),
            empty_reason: Some(NO_HISTORY_REASON.to_string()),
            degraded: None,
        }
    }

    pub fn degraded(reason: Degradation) -> Self {
        Self {
            best_match: None,
            secondary: Vec::new(),
            empty_reason: None,
            degraded: Some(reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.best_match.is_none() && self.secondary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_client_field_names() {
        let result = RecommendationResult {
            best_match: Some(BestMatch {
                brand: "獺祭".to_string(),
                description: "華やか".to_string(),
                expected_experience: "すっきり".to_string(),
                match_score: 95,
            }),
            secondary: vec![SecondaryRecommendation {
                brand: "新政 No.6".to_string(),
                description: "酸味".to_string(),
                expected_experience: "爽やか".to_string(),
                category: "次の一手".to_string(),
                match_score: 70,
            }],
            empty_reason: None,
            degraded: Some(Degradation::UnparsableOutput),
        };

        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(
            v,
            json!({
                "best_recommend": {
                    "brand": "獺祭",
                    "brand_description": "華やか",
                    "expected_experience": "すっきり",
                    "match_score": 95,
                },
                "recommendations": [{
                    "brand": "新政 No.6",
                    "brand_description": "酸味",
                    "expected_experience": "爽やか",
                    "category": "次の一手",
                    "match_score": 70,
                }],
            })
        );
        assert!(v["best_recommend"].get("category").is_none());
    }

    #[test]
    fn no_history_result_carries_reason() {
        let v = serde_json::to_value(RecommendationResult::no_history()).unwrap();
        assert_eq!(v["best_recommend"], json!(null));
        assert_eq!(v["recommendations"], json!([]));
        assert_eq!(v["metadata"], json!(NO_HISTORY_REASON));
    }
}
