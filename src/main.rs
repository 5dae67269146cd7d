use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod alerts;
mod config;
mod db;
mod engine;
mod error;
mod ingest;
mod models;
mod report;
mod rolling;
mod sentiment;
mod weekly;

use config::DetectorConfig;
use engine::Detection;
use models::ReviewRecord;
use report::RunOutcome;

#[derive(Parser)]
#[command(name = "review-sentiment-spike")]
#[command(about = "Weekly product review sentiment spike detector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct DetectorArgs {
    /// Trailing window, in weeks, for the rolling average
    #[arg(long, default_value_t = config::DEFAULT_WEEK_WINDOW)]
    week_window: usize,
    #[arg(long, default_value_t = config::DEFAULT_SPIKE_THRESHOLD)]
    spike_threshold: f64,
    #[arg(long, default_value_t = config::DEFAULT_TREND_SHIFT_THRESHOLD)]
    trend_shift_threshold: f64,
    /// Keep alerts this many days back from the newest alert
    #[arg(long, default_value_t = config::DEFAULT_RECENCY_DAYS)]
    recency_days: i64,
}

impl From<DetectorArgs> for DetectorConfig {
    fn from(args: DetectorArgs) -> Self {
        DetectorConfig {
            week_window: args.week_window,
            spike_threshold: args.spike_threshold,
            trend_shift_threshold: args.trend_shift_threshold,
            recency_days: args.recency_days,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Read reviews from a CSV file instead of Postgres
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Only analyze one category
    #[arg(long)]
    category: Option<String>,
}

impl SourceArgs {
    fn label(&self) -> String {
        let base = match &self.csv {
            Some(path) => path.display().to_string(),
            None => "review_sentiment.reviews".to_string(),
        };
        match &self.category {
            Some(category) => format!("{base} (category {category})"),
            None => base,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed reviews
    Seed,
    /// Import reviews from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Detect last week's sentiment spikes and trend shifts
    Detect {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        detector: DetectorArgs,
        /// Write the alerts as CSV when any are found
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write a JSON payload for the notification dispatcher
        #[arg(long)]
        notify_out: Option<PathBuf>,
        /// Store the alerts in Postgres
        #[arg(long)]
        save: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        detector: DetectorArgs,
        #[arg(long, default_value = "sentiment_report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_reviews(source: &SourceArgs) -> anyhow::Result<Vec<ReviewRecord>> {
    match &source.csv {
        Some(path) => {
            let mut records = ingest::load_reviews(path)?;
            if let Some(category) = source.category.as_deref() {
                records.retain(|record| record.category.as_deref() == Some(category));
            }
            Ok(records)
        }
        None => {
            let pool = connect().await?;
            db::fetch_reviews(&pool, source.category.as_deref()).await
        }
    }
}

async fn run_detection(source: &SourceArgs, config: &DetectorConfig) -> anyhow::Result<Detection> {
    let records = load_reviews(source).await?;
    let detection = engine::detect(&records, config)?;
    Ok(detection)
}

fn print_outcome(outcome: &RunOutcome) {
    println!("{}", outcome.message());
    if let RunOutcome::Alerts(alerts) = outcome {
        println!("Last week sentiment alerts:");
        for alert in alerts {
            println!(
                "- {} {} {} change {:+.3}",
                alert.date, alert.category, alert.alert_type, alert.change
            );
        }
    }
}

fn write_alerts(path: &Path, outcome: &RunOutcome) -> anyhow::Result<()> {
    if outcome.alerts().is_empty() {
        return Ok(());
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    report::write_alerts_csv(file, outcome.alerts())?;
    println!("Alerts written to {}.", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_sentiment_spike=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool).await?;
            println!("Seed data inserted ({inserted} reviews).");
        }
        Commands::Import { csv } => {
            let records = ingest::load_reviews(&csv)?;
            let pool = connect().await?;
            let inserted = db::import_reviews(&pool, &records).await?;
            println!("Inserted {inserted} reviews from {}.", csv.display());
        }
        Commands::Detect {
            source,
            detector,
            out,
            notify_out,
            save,
        } => {
            let config = DetectorConfig::from(detector);
            let result = run_detection(&source, &config).await;
            let outcome = RunOutcome::from_result(&result);

            if let Err(err) = &result {
                error!("sentiment pipeline failed: {err:#}");
            }
            print_outcome(&outcome);

            if let Some(path) = notify_out.as_deref() {
                let payload = report::notification_payload(&outcome, &config);
                report::write_notification(path, &payload)?;
            }

            result?;

            if let Some(path) = out.as_deref() {
                write_alerts(path, &outcome)?;
            }

            if save && !outcome.alerts().is_empty() {
                let pool = connect().await?;
                let run_id = Uuid::new_v4();
                db::save_alerts(&pool, run_id, outcome.alerts()).await?;
                println!("Alerts saved under run {run_id}.");
            }
        }
        Commands::Report {
            source,
            detector,
            out,
        } => {
            let config = DetectorConfig::from(detector);
            let result = run_detection(&source, &config).await;
            let outcome = RunOutcome::from_result(&result);

            let report = report::build_report(&source.label(), &outcome, result.as_ref().ok());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());

            result?;
        }
    }

    Ok(())
}
