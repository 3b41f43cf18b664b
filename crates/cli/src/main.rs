use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sake_core::domain::record::{parse_records, DrinkingRecord, Menu};
use sake_core::prompt;
use sake_core::service::SakeAdvisor;
use sake_core::storage::{HistoryStore, PgHistoryStore};

#[derive(Debug, Parser)]
#[command(name = "sake_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print the composed prompt(s) instead of calling the model.
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recommend sake from a drinking history.
    Recommend {
        #[command(flatten)]
        source: HistorySource,

        /// Restrict recommendations to these brands. Repeatable.
        #[arg(long = "menu", value_name = "BRAND")]
        menu: Vec<String>,
    },
    /// Summarize taste preferences from a drinking history.
    Taste {
        #[command(flatten)]
        source: HistorySource,
    },
}

#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct HistorySource {
    /// JSON file holding an array of drinking records.
    #[arg(long, value_name = "FILE")]
    records: Option<PathBuf>,

    /// Read the history from the database instead.
    #[arg(long)]
    user_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sake_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // stdout carries the JSON result only.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "sake_cli failed");
        return Err(err);
    }
    Ok(())
}

async fn run(args: Args, settings: &sake_core::config::Settings) -> anyhow::Result<()> {
    let source = match &args.command {
        Command::Recommend { source, .. } | Command::Taste { source } => source,
    };
    let history = load_history(source, settings).await?;
    tracing::info!(records = history.len(), dry_run = args.dry_run, "history loaded");

    if args.dry_run {
        for p in dry_run_prompts(&args.command, &history)? {
            println!("{p}");
        }
        return Ok(());
    }

    let advisor = SakeAdvisor::from_settings(settings)?;
    let output = match &args.command {
        Command::Recommend { menu, .. } => {
            let menu = parse_menu(menu)?;
            let result = advisor
                .build_recommendations(&history, menu.as_ref())
                .await
                .context("recommendation model call failed")?;
            serde_json::to_string_pretty(&result)?
        }
        Command::Taste { .. } => {
            serde_json::to_string_pretty(&advisor.build_taste_profile(&history).await)?
        }
    };
    println!("{output}");
    Ok(())
}

async fn load_history(
    source: &HistorySource,
    settings: &sake_core::config::Settings,
) -> anyhow::Result<Vec<DrinkingRecord>> {
    if let Some(path) = &source.records {
        return read_records_file(path);
    }

    let user_id = source
        .user_id
        .as_deref()
        .context("either --records or --user-id is required")?;
    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    PgHistoryStore::new(pool)
        .records_for_user(user_id, settings.history_limit)
        .await
}

fn read_records_file(path: &Path) -> anyhow::Result<Vec<DrinkingRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw: Vec<Value> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
    Ok(parse_records(raw))
}

fn parse_menu(brands: &[String]) -> anyhow::Result<Option<Menu>> {
    if brands.is_empty() {
        return Ok(None);
    }
    Ok(Some(Menu::new(brands).context("invalid --menu")?))
}

/// The recommendation prompt is shown with an empty taste summary, since the
/// summary only exists after the first model call.
fn dry_run_prompts(command: &Command, history: &[DrinkingRecord]) -> anyhow::Result<Vec<String>> {
    let (liked, disliked) = prompt::split_by_rating(history);
    let taste = prompt::taste_prompt(&liked, &disliked);

    Ok(match command {
        Command::Taste { .. } => vec![taste],
        Command::Recommend { menu, .. } => {
            let menu = parse_menu(menu)?;
            vec![taste, prompt::recommendation_prompt(history, "", menu.as_ref())]
        }
    })
}

fn init_sentry(settings: &sake_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
