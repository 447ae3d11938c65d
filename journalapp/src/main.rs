// JournalApp - journal data and backup core
// Command-line entry point

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use journalapp::app::AppState;
use journalapp::database::{DataPoint, DataType};
use journalapp::dates::days_back;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "journalapp")]
#[command(about = "Daily journal store with zip backups")]
struct Args {
    /// Directory holding the database and preferences
    #[arg(long, default_value = "./journalapp-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile today's entry and print its points
    Today,
    /// Write a backup archive
    Export {
        /// Target directory, defaults to the backups folder
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the journal with a backup archive
    Import { file: PathBuf },
    /// Fill the last N days with random demo values
    SeedDemo {
        #[arg(long, default_value_t = 30)]
        days: u64,
    },
    /// List categories with their order
    Categories,
    /// Renumber category order within each group
    FixIndexes,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journalapp=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    tracing::info!("Starting journalapp");

    let state = AppState::initialize(&args.data_dir)
        .await
        .with_context(|| format!("failed to open journal in {}", args.data_dir.display()))?;

    let outcome = run(&state, args.command).await;
    state.shutdown().await;
    outcome
}

async fn run(state: &AppState, command: Command) -> Result<()> {
    let today = Local::now().date_naive();

    match command {
        Command::Today => {
            let reconciled = state.journal.get_or_create_day(today).await?;
            let names: HashMap<_, _> = state
                .categories
                .list_categories()
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect();

            println!("{}", reconciled.day.date);
            for point in &reconciled.points {
                let name = names.get(&point.category_id).map_or("?", String::as_str);
                println!("  {:<20} {}", name, describe(point));
            }
        }
        Command::Export { out } => {
            let dir = out.unwrap_or_else(|| state.backups_dir());
            let path = state.backups.export_to_dir(&dir, today).await?;
            println!("{}", path.display());
        }
        Command::Import { file } => {
            let restored = state
                .backups
                .import_from_path(&file)
                .await
                .with_context(|| format!("failed to import {}", file.display()))?;
            println!(
                "Restored {} days, {} categories, {} points",
                restored.days, restored.categories, restored.points
            );
        }
        Command::SeedDemo { days } => {
            let Some(start) = days_back(today, days).next() else {
                return Ok(());
            };
            let mut rng = StdRng::from_entropy();
            let summary = state.journal.fill_range(start, today, &mut rng).await?;
            println!(
                "Created {} days, added {} points",
                summary.days_created, summary.points_added
            );
        }
        Command::Categories => {
            for category in state.categories.list_categories().await? {
                let index = category.index.map_or("-".to_string(), |i| i.to_string());
                let group = category.group.as_deref().unwrap_or("");
                let flag = if category.is_deleted() {
                    " (deleted)"
                } else if !category.enabled {
                    " (disabled)"
                } else {
                    ""
                };
                println!("{:>3}  {:<12} {}{}", index, group, category.name, flag);
            }
        }
        Command::FixIndexes => {
            let changed = state.categories.fix_category_indexes().await?;
            println!("Renumbered {} categories", changed);
        }
    }

    Ok(())
}

fn describe(point: &DataPoint) -> String {
    let shown = match point.data_type {
        DataType::Mood => point.mood.clone(),
        DataType::Sleep => point.sleep_hours.map(|h| format!("{h}h")),
        DataType::Scale | DataType::LowToHigh | DataType::MildToSevere => {
            point.scale_index.map(|i| i.to_string())
        }
        DataType::Bool => point.bool_value.map(|b| if b { "yes" } else { "no" }.to_string()),
        DataType::Number => point.number.map(|n| n.to_string()),
        DataType::Text | DataType::Note => point.text.clone(),
        DataType::Medication => Some(match (point.bool_value, point.medication_dose) {
            (Some(true), Some(dose)) => format!("taken ({dose})"),
            (Some(true), None) => "taken".to_string(),
            _ => "not taken".to_string(),
        }),
    };
    shown.unwrap_or_else(|| "-".to_string())
}
