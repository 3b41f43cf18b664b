//! Prompt text for the two model calls. Only the inputs are fixed; wording may change.

use crate::domain::record::{DrinkingRecord, Menu};
use crate::domain::recommendation::{
    BRAND_MAX_CHARS, CATEGORY_MAX_CHARS, DESCRIPTION_MAX_CHARS, EXPERIENCE_MAX_CHARS,
    MATCH_SCORE_MAX, MATCH_SCORE_MIN, SECONDARY_MAX,
};
use crate::domain::taste::SUMMARY_MAX_CHARS;

pub const RECENT_RECORDS: usize = 10;
const NO_ANALYSIS: &str = "分析データなし";

/// Up to [`RECENT_RECORDS`] records, newest first. Records without a timestamp
/// sort after dated ones and keep their relative order.
pub fn recent_records(history: &[DrinkingRecord]) -> Vec<&DrinkingRecord> {
    let mut recent: Vec<&DrinkingRecord> = history.iter().collect();
    recent.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    recent.truncate(RECENT_RECORDS);
    recent
}

pub fn recommendation_prompt(
    history: &[DrinkingRecord],
    taste_summary: &str,
    menu: Option<&Menu>,
) -> String {
    let summary = match taste_summary.trim() {
        "" => NO_ANALYSIS,
        s => s,
    };

    let mut out = String::new();
    out.push_str(
        "あなたは日本酒の専門家です。ユーザーの飲酒履歴と味の好みに基づいて、最適な日本酒を推薦してください。\n\n",
    );
    out.push_str("## ユーザーの味の好み分析\n");
    out.push_str(summary);
    out.push_str("\n\n");

    out.push_str(&format!("## 飲酒履歴（最新{RECENT_RECORDS}件）\n"));
    for record in recent_records(history) {
        out.push_str(&format!(
            "- {}: {} - {}\n",
            record.brand,
            record.rating.label(),
            record.impression
        ));
    }

    if let Some(menu) = menu {
        out.push_str("\n## 利用可能なメニュー\n");
        for brand in menu.brands() {
            out.push_str(&format!("- {brand}\n"));
        }
        out.push_str("\n推薦する銘柄は必ず上記のメニューから選んでください。\n");
    }

    out.push_str(&format!(
        r#"
## 推薦要件
- 最もおすすめの1件を best_recommend に入れる
- それ以外の候補を recommendations に最大{SECONDARY_MAX}件入れる
- 各推薦には以下を含める：
  - brand: 銘柄名（1-{BRAND_MAX_CHARS}文字）
  - brand_description: 銘柄の説明（{DESCRIPTION_MAX_CHARS}文字以内）
  - expected_experience: 期待できる味わい体験（{EXPERIENCE_MAX_CHARS}文字以内）
  - match_score: 好みとの一致度（{MATCH_SCORE_MIN}-{MATCH_SCORE_MAX}の整数）
  - category: recommendations のみ、推薦の切り口（{CATEGORY_MAX_CHARS}文字以内）

## 出力形式（JSONのみを出力）
{{
  "best_recommend": {{
    "brand": "銘柄名",
    "brand_description": "銘柄の説明",
    "expected_experience": "期待できる味わい体験",
    "match_score": 95
  }},
  "recommendations": [
    {{
      "brand": "銘柄名",
      "brand_description": "銘柄の説明",
      "expected_experience": "期待できる味わい体験",
      "category": "次の一手",
      "match_score": 80
    }}
  ]
}}
"#
    ));
    out
}

/// Liked and disliked records, each in history order.
pub fn split_by_rating(
    history: &[DrinkingRecord],
) -> (Vec<&DrinkingRecord>, Vec<&DrinkingRecord>) {
    history.iter().partition(|r| r.rating.is_liked())
}

pub fn taste_prompt(liked: &[&DrinkingRecord], disliked: &[&DrinkingRecord]) -> String {
    let mut out = String::new();
    out.push_str("あなたは日本酒の専門家です。ユーザーの飲酒履歴から味の好みを分析してください。\n\n");

    out.push_str("## 好きな日本酒の記録\n");
    push_records(&mut out, liked);
    out.push_str("\n## 合わなかった日本酒の記録\n");
    push_records(&mut out, disliked);

    out.push_str(&format!(
        r#"
## 分析要件
ユーザーの味の好みを以下の観点で分析してください：
- 好む味の特徴（甘口/辛口、フルーティ/スッキリなど）
- 避けるべき味の特徴
- 好みの傾向の要約

## 出力形式（JSONのみを出力）
{{
  "preferred_tastes": ["好む味の特徴"],
  "disliked_tastes": ["避けるべき味の特徴"],
  "analysis_summary": "味の好みの要約（{SUMMARY_MAX_CHARS}文字以内）"
}}
"#
    ));
    out
}

fn push_records(out: &mut String, records: &[&DrinkingRecord]) {
    if records.is_empty() {
        out.push_str("- なし\n");
        return;
    }
    for record in records {
        out.push_str(&format!(
            "- {} ({}): {}\n",
            record.brand,
            record.rating.label(),
            record.impression
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Rating;
    use chrono::{TimeZone, Utc};

    fn record(brand: &str, rating: Rating, day: Option<u32>) -> DrinkingRecord {
        DrinkingRecord {
            id: None,
            user_id: "u1".to_string(),
            brand: brand.to_string(),
            impression: format!("{brand}の感想"),
            rating,
            label_image_url: None,
            created_at: day.map(|d| Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap()),
            updated_at: None,
        }
    }

    #[test]
    fn recent_records_are_newest_first_and_capped() {
        let mut history: Vec<_> = (1..=12)
            .map(|d| record(&format!("b{d}"), Rating::Good, Some(d)))
            .collect();
        history.insert(0, record("undated", Rating::Good, None));

        let brands: Vec<_> = recent_records(&history).iter().map(|r| r.brand.clone()).collect();
        assert_eq!(brands.len(), RECENT_RECORDS);
        assert_eq!(brands[0], "b12");
        assert_eq!(brands[9], "b3");
        assert!(!brands.contains(&"undated".to_string()));
    }

    #[test]
    fn recommendation_prompt_lists_history_summary_and_menu() {
        let history = vec![record("獺祭", Rating::VeryGood, Some(1))];
        let menu = Menu::new(["新政", "十四代"]).unwrap();

        let prompt = recommendation_prompt(&history, "フルーティー好み", Some(&menu));
        assert!(prompt.contains("フルーティー好み"));
        assert!(prompt.contains("- 獺祭: 非常に好き - 獺祭の感想"));
        assert!(prompt.contains("## 利用可能なメニュー\n- 新政\n- 十四代\n"));
        assert!(prompt.contains("\"best_recommend\""));
        assert!(prompt.contains("1-100"));

        let bare = recommendation_prompt(&history, "  ", None);
        assert!(bare.contains(NO_ANALYSIS));
        assert!(!bare.contains("利用可能なメニュー"));
    }

    #[test]
    fn taste_prompt_splits_liked_and_disliked() {
        let liked = record("而今", Rating::Good, None);
        let disliked = record("重い酒", Rating::VeryBad, None);

        let prompt = taste_prompt(&[&liked], &[&disliked]);
        let liked_at = prompt.find("- 而今 (好き)").unwrap();
        let split_at = prompt.find("## 合わなかった日本酒の記録").unwrap();
        let disliked_at = prompt.find("- 重い酒 (非常に合わない)").unwrap();
        assert!(liked_at < split_at && split_at < disliked_at);
        assert!(prompt.contains("\"analysis_summary\""));

        let empty = taste_prompt(&[], &[&disliked]);
        assert!(empty.contains("## 好きな日本酒の記録\n- なし\n"));
    }

    #[test]
    fn output_schemas_render_with_single_braces_and_limits() {
        let history = vec![record("獺祭", Rating::Good, Some(1))];
        let rec = recommendation_prompt(&history, "", None);
        assert!(rec.contains("## 飲酒履歴（最新10件）\n- 獺祭: 好き - 獺祭の感想\n"));
        assert!(rec.contains("{\n  \"best_recommend\": {\n"));
        assert!(rec.contains("\"match_score\": 95\n  },"));
        assert!(rec.contains("最大9件"));
        assert!(rec.ends_with("  ]\n}\n"));
        assert!(!rec.contains("{{") && !rec.contains("}}"));

        let taste = taste_prompt(&[], &[]);
        assert!(taste.contains("要約（200文字以内）"));
        assert!(taste.ends_with("}\n"));
        assert!(!taste.contains("{{") && !taste.contains("}}"));
    }
}
