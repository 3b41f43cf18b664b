pub mod domain;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod service;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    pub const DEFAULT_BEDROCK_REGION: &str = "us-east-1";
    pub const DEFAULT_BEDROCK_MODEL_ID: &str = "anthropic.claude-3-sonnet-20240229-v1:0";
    const DEFAULT_READ_TIMEOUT_SECS: u64 = 15;
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_HISTORY_LIMIT: i64 = 100;

    const REDACTED: &str = "<redacted>";

    #[derive(Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub bedrock_region: String,
        pub bedrock_endpoint_url: Option<String>,
        pub bedrock_api_key: Option<String>,
        pub bedrock_model_id: String,
        pub read_timeout: Duration,
        pub connect_timeout: Duration,
        pub history_limit: i64,
    }

    // The bearer token never reaches logs or panic messages.
    impl std::fmt::Debug for Settings {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Settings")
                .field("database_url", &self.database_url.as_ref().map(|_| REDACTED))
                .field("sentry_dsn", &self.sentry_dsn)
                .field("bedrock_region", &self.bedrock_region)
                .field("bedrock_endpoint_url", &self.bedrock_endpoint_url)
                .field("bedrock_api_key", &self.bedrock_api_key.as_ref().map(|_| REDACTED))
                .field("bedrock_model_id", &self.bedrock_model_id)
                .field("read_timeout", &self.read_timeout)
                .field("connect_timeout", &self.connect_timeout)
                .field("history_limit", &self.history_limit)
                .finish()
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                bedrock_region: std::env::var("BEDROCK_REGION")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BEDROCK_REGION.to_string()),
                bedrock_endpoint_url: std::env::var("BEDROCK_ENDPOINT_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                bedrock_api_key: std::env::var("AWS_BEARER_TOKEN_BEDROCK").ok(),
                bedrock_model_id: std::env::var("BEDROCK_MODEL_ID")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BEDROCK_MODEL_ID.to_string()),
                read_timeout: Duration::from_secs(env_u64(
                    "BEDROCK_READ_TIMEOUT_SECS",
                    DEFAULT_READ_TIMEOUT_SECS,
                )),
                connect_timeout: Duration::from_secs(env_u64(
                    "BEDROCK_CONNECT_TIMEOUT_SECS",
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                )),
                history_limit: std::env::var("HISTORY_LIMIT")
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_HISTORY_LIMIT),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_bedrock_api_key(&self) -> anyhow::Result<&str> {
            self.bedrock_api_key
                .as_deref()
                .context("AWS_BEARER_TOKEN_BEDROCK is required")
        }

        pub fn bedrock_endpoint(&self) -> String {
            match &self.bedrock_endpoint_url {
                Some(url) => url.trim_end_matches('/').to_string(),
                None => format!("https://bedrock-runtime.{}.amazonaws.com", self.bedrock_region),
            }
        }
    }

    fn env_u64(key: &str, default: u64) -> u64 {
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(default)
    }
}
