//! vitrine-server binary.
//!
//! Loads `.env` (when present), then `vitrine.toml` (or the path given with
//! `--config`) layered under the environment, and either serves the JSON API
//! or runs one automation job and prints its result.

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vitrine_api::AppState;
use vitrine_automation::{Campaign, Clock, collect_campaign_offers, run_bulk_rename};
use vitrine_client::TargetClient;

use crate::settings::Settings;

#[derive(Parser)]
#[command(author, version, about = "Testing platform proxy and campaign automation")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "vitrine.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Rename the campaign's offers once and print the summary.
  Rename {
    /// Only this activity, bypassing the campaign filters.
    #[arg(long)]
    activity_id: Option<String>,
  },
  /// Print every offer served by the campaign's activities.
  CampaignOffers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let dotenv = dotenvy::dotenv();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  if let Err(e) = dotenv
    && !e.not_found()
  {
    tracing::warn!(error = %e, "failed to read .env");
  }

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config).context("failed to read configuration")?;
  let target_config = settings
    .target_config()
    .context("incomplete platform credentials")?;
  let client = TargetClient::new(target_config).context("failed to build platform client")?;
  let campaign = Campaign::new(settings.campaign_marker.clone());

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(&settings, client, campaign).await,
    Command::Rename { activity_id } => {
      let summary = run_bulk_rename(&client, &campaign, activity_id.as_deref(), Clock::system())
        .await
        .context("bulk rename failed")?;
      print_json(&summary)
    }
    Command::CampaignOffers => {
      let offers = collect_campaign_offers(&client, &campaign, Clock::system())
        .await
        .context("failed to list campaign offers")?;
      print_json(&offers)
    }
  }
}

async fn serve(settings: &Settings, client: TargetClient, campaign: Campaign) -> anyhow::Result<()> {
  let app = vitrine_api::router(AppState::new(client, campaign)).layer(TraceLayer::new_for_http());
  let address = settings.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
