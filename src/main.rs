mod config;
mod db;
mod models;
mod parser;
mod recipes;
mod scraper;
mod seed;
mod server;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::scraper::{Scraper, DEFAULT_MATERIALS};

#[derive(Parser)]
#[command(name = "pantry_recipes", about = "Recipe ranking scraper and pantry stock API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the search ranking for each material
    Scrape {
        /// Search term (repeatable; default: built-in material list)
        #[arg(short, long = "term")]
        terms: Vec<String>,
        /// Output CSV (default: PANTRY_RECIPES_CSV or recipes.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Discover categories, then scrape each category's ranking
    Categories {
        /// Max categories to scrape (default: all discovered)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Seed recipes and serve the pantry API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load the recipe CSV into the database
    Seed,
    /// Show row counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Scrape { terms, output } => {
            let terms = if terms.is_empty() {
                DEFAULT_MATERIALS.iter().map(|t| t.to_string()).collect()
            } else {
                terms
            };
            let output = output.unwrap_or(settings.recipes_csv);
            let scraper = Scraper::new(&settings.base_url)?;
            println!("Scraping {} search terms...", terms.len());
            let recipes = scraper.scrape_terms(&terms).await?;
            recipes::write_csv(&output, &recipes)?;
            println!("Saved {} recipes to {}", recipes.len(), output.display());
            Ok(())
        }
        Commands::Categories { limit, output } => {
            let output = output.unwrap_or(settings.recipes_csv);
            let scraper = Scraper::new(&settings.base_url)?;
            let recipes = scraper.scrape_categories(limit).await?;
            recipes::write_csv(&output, &recipes)?;
            println!("Saved {} recipes to {}", recipes.len(), output.display());
            Ok(())
        }
        Commands::Serve { host, port } => {
            if let Some(h) = host {
                settings.host = h;
            }
            if let Some(p) = port {
                settings.port = p;
            }
            server::serve(&settings).await
        }
        Commands::Seed => {
            let db = db::Database::open(&settings.database_path)?;
            let conn = db.session()?;
            db::init_schema(&conn)?;
            let stats = seed::seed_recipes(&conn, &settings.recipes_csv)?;
            println!(
                "Inserted {} of {} recipes from {}",
                stats.inserted,
                stats.read,
                settings.recipes_csv.display()
            );
            Ok(())
        }
        Commands::Stats => {
            let db = db::Database::open(&settings.database_path)?;
            let conn = db.session()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Users:   {}", s.users);
            println!("Items:   {}", s.items);
            println!("Recipes: {}", s.recipes);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
