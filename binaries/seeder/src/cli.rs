use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "seed_fixtures")]
#[command(about = "Fixture seeding tool for document databases")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short = 'u', long)]
    pub database_url: Option<String>,

    /// Logical database to seed.
    #[arg(short, long, default_value = "app")]
    pub database: String,

    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Seed every collection in the spec file.
    Run {
        /// JSON file mapping collection names to seed sources.
        #[arg(long)]
        spec: PathBuf,

        /// JSON seeding configuration (force flags).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Force reseeding of every collection.
        #[arg(long)]
        force: bool,

        /// Execute against an in-memory store instead of the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Report per-collection seeding decisions without writing anything.
    Check {
        #[arg(long)]
        spec: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn get_database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
        })
    }
}
