// ABOUTME: Pierre Coach CLI - recommendations and workout plans from a JSON catalog
// ABOUTME: Loads a catalog fixture into in-memory stores and prints results as JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Five default-scenario recommendations for a user
//! pierre-coach recommend --catalog demos/catalog.json --user 6f1c... --limit 5
//!
//! # Replay past interactions first so the user is no longer cold
//! pierre-coach recommend --catalog demos/catalog.json --events events.json --scenario discovery
//!
//! # A four-exercise chest plan for a level-2 user
//! pierre-coach plan --catalog demos/catalog.json --query "push up" --muscle chest --level 2
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use pierre_coach::catalog::CatalogFixture;
use pierre_coach::config::CoachConfig;
use pierre_coach::logging::LoggingConfig;
use pierre_coach::models::{InteractionEvent, MuscleGroup, Scenario, UserProfile};
use pierre_coach::service::CoachService;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "pierre-coach",
    about = "Pierre Coach personalization CLI",
    long_about = "Exercise recommendations and knowledge-graph workout plans over a JSON catalog."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Catalog fixture (items, prerequisites, transitions)
    #[arg(long, global = true, default_value = "demos/catalog.json")]
    catalog: PathBuf,

    /// Seed for reproducible sampling
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Ranked recommendations for a user
    Recommend {
        /// User id (random when omitted)
        #[arg(long)]
        user: Option<Uuid>,

        /// Scenario: auto_adjust, discovery, daily_plan, default
        #[arg(long, default_value = "default")]
        scenario: String,

        /// Maximum number of recommendations
        #[arg(long)]
        limit: Option<usize>,

        /// JSON array of interaction events to replay first
        #[arg(long)]
        events: Option<PathBuf>,

        /// JSON user profile
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Ordered workout plan
    Plan {
        /// Free-text seed query
        #[arg(long)]
        query: String,

        /// Target muscle group
        #[arg(long)]
        muscle: String,

        /// User skill level
        #[arg(long, default_value = "1")]
        level: u32,

        /// Number of exercises
        #[arg(long)]
        count: Option<usize>,
    },
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env().with_stderr();
    if cli.verbose {
        logging.level = "debug".into();
    }
    logging.init()?;

    let config = CoachConfig::from_env()?;
    let fixture = CatalogFixture::from_path(&cli.catalog).await?;
    let service = CoachService::from_fixture(config, &fixture, cli.seed).await?;

    match cli.command {
        Command::Recommend {
            user,
            scenario,
            limit,
            events,
            profile,
        } => {
            let user_id = user.unwrap_or_else(Uuid::new_v4);
            if let Some(path) = profile {
                let mut profile: UserProfile = read_json(&path).await?;
                profile.user_id = user_id;
                service.upsert_profile(profile).await?;
            }
            if let Some(path) = events {
                let events: Vec<InteractionEvent> = read_json(&path).await?;
                let replayed = events.len();
                for mut event in events {
                    event.user_id = user_id;
                    service.record_interaction(event).await?;
                }
                info!(replayed, "Replayed interaction history");
            }

            let batch = service
                .get_recommendations(user_id, Scenario::parse(&scenario), limit)
                .await?;
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
        Command::Plan {
            query,
            muscle,
            level,
            count,
        } => {
            let target = MuscleGroup::parse(&muscle)
                .ok_or_else(|| anyhow!("unknown muscle group '{muscle}'"))?;
            let plan = service.build_plan(&query, level, target, count).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }

    Ok(())
}
