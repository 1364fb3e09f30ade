mod cli;

use std::{fs, path::Path, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;
use document_traits::DocumentDatabase;
use memory_store::MemoryDatabase;
use mongo_connection::{MongoDbConfig, connect_mongo_db};
use seeding::{
    CollectionOutcome, DataSeeder, SeedContext, SeedReport, SeedSpec,
    SeedingConfig,
};
use tracing::{Level, info, warn};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet { Level::WARN } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let start_time = Instant::now();

    match &cli.command {
        Commands::Run {
            spec,
            config,
            force,
            dry_run,
        } => {
            let seed_spec = load_spec(spec)?;
            let seeding_config = load_config(config.as_deref(), *force)?;
            let context =
                SeedContext::new(cli.database.clone(), serde_json::json!({}));

            let report = if *dry_run {
                info!("dry run: seeding an in-memory store");
                let db = MemoryDatabase::new();
                run_seeder(db, &cli, seed_spec, seeding_config, &context)
                    .await?
            }
            else {
                let db = connect_mongo_db(&MongoDbConfig::new(
                    cli.get_database_url(),
                    cli.database.clone(),
                ))
                .await
                .context("failed to connect to the database")?;
                run_seeder(db, &cli, seed_spec, seeding_config, &context)
                    .await?
            };

            log_report(&report);
        }
        Commands::Check { spec, config } => {
            let seed_spec = load_spec(spec)?;
            let seeding_config = load_config(config.as_deref(), false)?;
            let db = connect_mongo_db(&MongoDbConfig::new(
                cli.get_database_url(),
                cli.database.clone(),
            ))
            .await
            .context("failed to connect to the database")?;

            let seeder = DataSeeder::new(
                db,
                cli.database.clone(),
                seed_spec,
                seeding_config,
            );
            let collections: Vec<String> = seeder
                .spec()
                .iter()
                .map(|(name, _)| name.to_string())
                .collect();
            for collection in &collections {
                let check = seeder.seed_needed(collection).await?;
                info!(
                    "collection {}:{collection}: needed={} count={}",
                    cli.database, check.needed, check.count
                );
            }
        }
    }

    info!(
        "completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn run_seeder<D>(
    db: D, cli: &Cli, spec: SeedSpec, config: SeedingConfig,
    context: &SeedContext,
) -> Result<SeedReport>
where
    D: DocumentDatabase,
{
    let seeder = DataSeeder::new(db, cli.database.clone(), spec, config);
    let report = seeder.seed(context).await?;
    Ok(report)
}

fn log_report(report: &SeedReport) {
    for (collection, outcome) in report.outcomes() {
        match outcome {
            CollectionOutcome::Skipped { count } => {
                info!("{collection}: skipped ({count} document(s) present)");
            }
            CollectionOutcome::Seeded { inserted } => {
                info!("{collection}: seeded {inserted} document(s)");
            }
            CollectionOutcome::SeededWithIndexWarnings {
                inserted,
                failed_indexes,
            } => {
                warn!(
                    "{collection}: seeded {inserted} document(s), {} index(es) failed",
                    failed_indexes.len()
                );
            }
        }
    }
}

fn load_spec(path: &Path) -> Result<SeedSpec> {
    let text = fs::read_to_string(path).with_context(|| {
        format!("failed to read seed spec {}", path.display())
    })?;
    let value = serde_json::from_str(&text).with_context(|| {
        format!("seed spec {} is not valid JSON", path.display())
    })?;
    SeedSpec::from_value(value)
        .with_context(|| format!("invalid seed spec {}", path.display()))
}

fn load_config(path: Option<&Path>, force: bool) -> Result<SeedingConfig> {
    // The command-line flag wins over anything in the file.
    if force {
        return Ok(SeedingConfig::forced());
    }
    match path {
        None => Ok(SeedingConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| {
                format!("failed to read seeding config {}", path.display())
            })?;
            serde_json::from_str(&text).with_context(|| {
                format!("invalid seeding config {}", path.display())
            })
        }
    }
}
