//! Part cache CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use partfetch_core::cache::ArtifactCache;
use partfetch_core::config::Settings;

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached parts
    List {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Remove every cached part
    Clear,
}

impl CacheCommand {
    pub fn execute(self, settings: &Settings) -> Result<()> {
        let cache = ArtifactCache::new(&settings.cache_dir);
        match self {
            CacheCommand::List { json } => execute_list(&cache, json),
            CacheCommand::Clear => execute_clear(&cache),
        }
    }
}

#[derive(Tabled)]
struct CachedPartRow {
    #[tabled(rename = "Part")]
    part_id: String,
    #[tabled(rename = "Fetched")]
    fetched_at: String,
}

fn execute_list(cache: &ArtifactCache, json_output: bool) -> Result<()> {
    let artifacts = cache.list().context("Failed to read the part cache")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }

    if artifacts.is_empty() {
        println!("No parts cached in {}", cache.dir().display());
        println!("\nRun 'partfetch fetch-parts' to populate the cache.");
        return Ok(());
    }

    let table_rows: Vec<CachedPartRow> = artifacts
        .iter()
        .map(|a| CachedPartRow {
            part_id: a.part_id.to_string(),
            fetched_at: a.fetched_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        })
        .collect();

    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
    println!("\n{} part(s) in {}", artifacts.len(), cache.dir().display());

    Ok(())
}

fn execute_clear(cache: &ArtifactCache) -> Result<()> {
    let removed = cache.clear().context("Failed to clear the part cache")?;
    println!("Removed {removed} cached part(s)");
    Ok(())
}
