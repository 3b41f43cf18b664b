use crate::domain::recommendation::{
    BestMatch, Degradation, RecommendationResult, SecondaryRecommendation, BRAND_MAX_CHARS,
    CATEGORY_MAX_CHARS, DEFAULT_CATEGORY, DESCRIPTION_MAX_CHARS, EXPERIENCE_MAX_CHARS,
    MATCH_SCORE_MAX, MATCH_SCORE_MIN, SECONDARY_MAX,
};
use crate::llm::json::{parse_tree, ParsedTree};
use crate::pipeline::sanitize::{lookup, IntRule, Rejection, TextRule};
use serde_json::Value;

const BEST_MATCH_KEYS: &[&str] = &["best_recommend", "best_match"];
const SECONDARY_KEYS: &[&str] = &["recommendations", "secondary"];

const BRAND: TextRule = TextRule::reject(&["brand"], BRAND_MAX_CHARS);
const DESCRIPTION: TextRule =
    TextRule::truncate(&["brand_description", "description"], DESCRIPTION_MAX_CHARS);
const EXPERIENCE: TextRule = TextRule::truncate(&["expected_experience"], EXPERIENCE_MAX_CHARS);
const CATEGORY: TextRule =
    TextRule::defaulted(&["category"], CATEGORY_MAX_CHARS, DEFAULT_CATEGORY);
const MATCH_SCORE: IntRule = IntRule::new(&["match_score"], MATCH_SCORE_MIN, MATCH_SCORE_MAX);

/// Parses raw model text into a result. Unparsable text degrades to an empty
/// result instead of an error.
pub fn assemble_recommendations(text: &str) -> RecommendationResult {
    match parse_tree(text) {
        Ok(tree) => from_tree(&tree),
        Err(err) => {
            tracing::warn!(
                reason = %err.reason,
                raw_chars = text.chars().count(),
                "recommendation output unparsable; returning empty result"
            );
            RecommendationResult::degraded(Degradation::UnparsableOutput)
        }
    }
}

pub fn from_tree(tree: &ParsedTree) -> RecommendationResult {
    let best_match = match lookup(tree, BEST_MATCH_KEYS) {
        None => None,
        Some(Value::Object(obj)) => match sanitize_best_match(obj) {
            Ok(best) => Some(best),
            Err(rejection) => {
                tracing::warn!(%rejection, "best match dropped");
                None
            }
        },
        Some(_) => {
            tracing::warn!(rejection = %Rejection::NotAnObject, "best match dropped");
            None
        }
    };

    let items: &[Value] = match lookup(tree, SECONDARY_KEYS) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            tracing::warn!("secondary recommendations are not a list; treating as empty");
            &[]
        }
        None => &[],
    };

    let mut secondary = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let sanitized = item
            .as_object()
            .ok_or(Rejection::NotAnObject)
            .and_then(sanitize_secondary);
        match sanitized {
            Ok(rec) => secondary.push(rec),
            Err(rejection) => {
                tracing::warn!(index, %rejection, "secondary recommendation dropped");
            }
        }
    }

    let kept = secondary.len();
    rank_and_cap(&mut secondary);
    tracing::debug!(
        received = items.len(),
        kept,
        returned = secondary.len(),
        has_best_match = best_match.is_some(),
        "recommendations sanitized"
    );

    RecommendationResult {
        best_match,
        secondary,
        empty_reason: None,
        degraded: None,
    }
}

/// Stable sort by `match_score` descending, then keep the first [`SECONDARY_MAX`].
pub fn rank_and_cap(items: &mut Vec<SecondaryRecommendation>) {
    items.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    items.truncate(SECONDARY_MAX);
}

fn sanitize_best_match(obj: &ParsedTree) -> Result<BestMatch, Rejection> {
    Ok(BestMatch {
        brand: BRAND.apply(obj)?,
        description: DESCRIPTION.apply(obj)?,
        expected_experience: EXPERIENCE.apply(obj)?,
        match_score: MATCH_SCORE.apply(obj)?,
    })
}

fn sanitize_secondary(obj: &ParsedTree) -> Result<SecondaryRecommendation, Rejection> {
    Ok(SecondaryRecommendation {
        brand: BRAND.apply(obj)?,
        description: DESCRIPTION.apply(obj)?,
        expected_experience: EXPERIENCE.apply(obj)?,
        category: CATEGORY.apply(obj)?,
        match_score: MATCH_SCORE.apply(obj)?,
    })
}
