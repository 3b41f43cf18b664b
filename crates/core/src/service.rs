use crate::config::Settings;
use crate::domain::record::{DrinkingRecord, Menu};
use crate::domain::recommendation::RecommendationResult;
use crate::domain::taste::TasteProfile;
use crate::llm::bedrock::BedrockClient;
use crate::llm::{
    EnvModelId, InvocationExecutor, LlmError, TextGenerator, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
use crate::pipeline::{assemble_recommendations, assemble_taste_profile, taste};
use crate::prompt;
use crate::storage::HistoryStore;
use anyhow::Context;
use std::sync::Arc;

/// Entry point for both operations. Cheap to clone; one instance serves all requests.
#[derive(Clone)]
pub struct SakeAdvisor {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
    temperature: f64,
}

impl SakeAdvisor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Bedrock-backed advisor. The model id is re-read from the environment on
    /// every attempt, falling back to the configured one.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = BedrockClient::from_settings(settings)?;
        let executor =
            InvocationExecutor::new(client, EnvModelId::new(settings.bedrock_model_id.clone()));
        Ok(Self::new(Arc::new(executor)))
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, LlmError> {
        self.generator
            .generate_text(prompt, max_tokens, temperature)
            .await
    }

    /// Never fails: a model outage yields the histogram plus a placeholder summary.
    pub async fn build_taste_profile(&self, history: &[DrinkingRecord]) -> TasteProfile {
        match self.analyze_taste(history).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::error!(error_kind = err.kind(), error = %err, "taste analysis unavailable");
                taste::unavailable(history)
            }
        }
    }

    /// Errors only when the model could not be reached or answered. Bad model
    /// output degrades to an empty result.
    pub async fn build_recommendations(
        &self,
        history: &[DrinkingRecord],
        menu: Option<&Menu>,
    ) -> Result<RecommendationResult, LlmError> {
        if history.is_empty() {
            tracing::info!("no drinking history; skipping model call");
            return Ok(RecommendationResult::no_history());
        }

        let profile = self.analyze_taste(history).await?;
        let prompt = prompt::recommendation_prompt(history, &profile.summary, menu);
        let text = self
            .generate_text(&prompt, self.max_tokens, self.temperature)
            .await?;

        let result = assemble_recommendations(&text);
        tracing::info!(
            records = history.len(),
            menu_brands = menu.map_or(0, |m| m.brands().len()),
            has_best_match = result.best_match.is_some(),
            secondary = result.secondary.len(),
            degraded = ?result.degraded,
            "recommendations built"
        );
        Ok(result)
    }

    pub async fn recommend_for_user(
        &self,
        store: &dyn HistoryStore,
        user_id: &str,
        limit: i64,
        menu: Option<&Menu>,
    ) -> anyhow::Result<RecommendationResult> {
        let history = store
            .records_for_user(user_id, limit)
            .await
            .context("failed to load drinking history")?;
        let result = self
            .build_recommendations(&history, menu)
            .await
            .context("recommendation model call failed")?;
        Ok(result)
    }

    pub async fn taste_profile_for_user(
        &self,
        store: &dyn HistoryStore,
        user_id: &str,
        limit: i64,
    ) -> anyhow::Result<TasteProfile> {
        let history = store
            .records_for_user(user_id, limit)
            .await
            .context("failed to load drinking history")?;
        Ok(self.build_taste_profile(&history).await)
    }

    async fn analyze_taste(&self, history: &[DrinkingRecord]) -> Result<TasteProfile, LlmError> {
        if history.is_empty() {
            return Ok(TasteProfile::no_history());
        }

        let (liked, disliked) = prompt::split_by_rating(history);
        let prompt = prompt::taste_prompt(&liked, &disliked);
        let text = self
            .generate_text(&prompt, self.max_tokens, self.temperature)
            .await?;

        let profile = assemble_taste_profile(&text, history);
        tracing::info!(
            records = history.len(),
            liked = liked.len(),
            disliked = disliked.len(),
            preferred = profile.preferred.len(),
            degraded = ?profile.degraded,
            "taste profile built"
        );
        Ok(profile)
    }
}
