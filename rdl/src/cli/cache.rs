//! Contains the logic for the `cache` command.
use clap::{Args, Subcommand};
use colored::Colorize;
use rdl_common::config::Config;
use rdl_common::dependency::Dependency;
use rdl_common::error::Result;
use rdl_core::DependencyCache;

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached dependencies with their transitive children
    Show,
    /// Delete the cache so the next load resolves everything again
    Clear,
}

impl CacheArgs {
    pub fn run(&self, config: &Config) -> Result<()> {
        let cache = DependencyCache::from_config(config);
        match self.action {
            CacheAction::Show => show(&cache),
            CacheAction::Clear => {
                if cache.clear()? {
                    println!("Removed {}", cache.path().display());
                } else {
                    println!("{}", "No dependency cache to remove".yellow());
                }
                Ok(())
            }
        }
    }
}

fn show(cache: &DependencyCache) -> Result<()> {
    let mut cached: Vec<Dependency> = cache.load_cache().into_iter().collect();
    if cached.is_empty() {
        println!("{}", "0 dependencies cached".yellow());
        return Ok(());
    }
    cached.sort_by_key(|dep| dep.to_string());

    for dependency in &cached {
        println!("{}", dependency.to_string().bold());
        for child in &dependency.transitive_dependencies {
            println!("    {child}");
        }
    }
    println!(
        "{} cached dependencies in {}",
        cached.len(),
        cache.path().display()
    );
    Ok(())
}
