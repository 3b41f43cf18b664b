use crate::domain::record::{DrinkingRecord, Rating};
use crate::domain::recommendation::Degradation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SUMMARY_MAX_CHARS: usize = 200;
pub const SUMMARY_PLACEHOLDER: &str = "味の好みを分析できませんでした。";
pub const NO_HISTORY_SUMMARY: &str = "飲酒履歴がないため、分析できません。";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasteProfile {
    #[serde(rename = "preferred_tastes")]
    pub preferred: Vec<String>,
    #[serde(rename = "disliked_tastes")]
    pub disliked: Vec<String>,
    #[serde(rename = "rating_distribution")]
    pub rating_histogram: BTreeMap<Rating, u32>,
    #[serde(rename = "analysis_summary")]
    pub summary: String,
    #[serde(skip)]
    pub degraded: Option<Degradation>,
}

impl TasteProfile {
    pub fn no_history() -> Self {
        Self {
            preferred: Vec::new(),
            disliked: Vec::new(),
            rating_histogram: BTreeMap::new(),
            summary: NO_HISTORY_SUMMARY.to_string(),
            degraded: None,
        }
    }
}

/// Counts every rating present in `history`; ratings that never occur are absent.
pub fn rating_histogram(history: &[DrinkingRecord]) -> BTreeMap<Rating, u32> {
    let mut out = BTreeMap::new();
    for record in history {
        *out.entry(record.rating).or_insert(0) += 1;
    }
    out
}
