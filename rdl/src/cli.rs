// rdl/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use rdl_common::config::Config;
use rdl_common::error::Result;

pub mod cache;
pub mod load;

use crate::cli::cache::CacheArgs;
use crate::cli::load::LoadArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "rdl", bin_name = "rdl")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Override the data directory (defaults to RDL_DATA_DIR or the platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve, cache and install the libraries declared in a manifest
    Load(LoadArgs),
    /// Inspect or clear the resolved dependency cache
    Cache(CacheArgs),
}

impl Command {
    pub fn run(&self, config: Config) -> Result<()> {
        match self {
            Self::Load(command) => command.run(config),
            Self::Cache(command) => command.run(&config),
        }
    }
}
