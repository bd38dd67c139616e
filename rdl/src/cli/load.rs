//! Contains the logic for the `load` command.
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use rdl_common::config::Config;
use rdl_common::error::Result;
use rdl_common::manifest::FileManifest;
use rdl_core::{LoaderContext, Orchestrator};
use rdl_repo::FileRepository;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Path to the TOML manifest declaring the libraries to load
    #[arg(short, long, value_name = "FILE", default_value = "rdl.toml")]
    pub manifest: PathBuf,

    /// Session identifier used to scope resolution (overrides RDL_SESSION_ID)
    #[arg(long)]
    pub session: Option<String>,
}

impl LoadArgs {
    pub fn run(&self, mut config: Config) -> Result<()> {
        if let Some(session) = &self.session {
            config.session_id = session.clone();
        }
        tracing::debug!("Reading manifest {}", self.manifest.display());
        let manifest = FileManifest::from_path(&self.manifest)?;

        let repository = Arc::new(FileRepository::new(config.lib_dir()));
        let install_dir = config.lib_dir();
        let context = LoaderContext::start(config)?;
        let orchestrator = Orchestrator::new(
            context,
            Arc::new(manifest),
            repository.clone(),
            repository,
        );

        let report = orchestrator.load(|| tracing::debug!("All libraries are available."))?;

        for (dependency, error) in &report.resolution_failures {
            println!(
                "{} {} was loaded without its transitive dependencies: {}",
                "Warning:".yellow().bold(),
                dependency,
                error
            );
        }
        let source = if report.cache_hit { "cache" } else { "fresh resolution" };
        println!(
            "{}{}",
            "==> ".bold().blue(),
            format!(
                "Loaded {} libraries ({} artifacts) from {} in {}",
                report.declared,
                report.loaded,
                source,
                humantime::format_duration(report.elapsed_millis())
            )
            .bold()
        );
        println!("Installed under {}", install_dir.display());
        Ok(())
    }
}
