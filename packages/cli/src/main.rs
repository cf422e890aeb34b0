#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for public water system dossiers.
//!
//! Run without a subcommand for the interactive menu. Uses
//! `indicatif-log-bridge` (via [`pws_dossier_cli_utils::init_logger`]) so
//! log lines and spinners never fight for the terminal.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pws_dossier::{BuildOptions, DossierConfig};

#[derive(Parser)]
#[command(name = "pws_dossier", about = "Public water system dossiers")]
struct Cli {
    /// Config file (default: `pws_dossier.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the federal registry by water system name
    Search {
        /// Words that must all appear in the system name
        name: String,
    },
    /// Build the full dossier for one system and print it as JSON
    Dossier {
        /// Public water system id (e.g. "TX2400001")
        pws_id: String,
        /// Skip the Drinking Water Watch documents
        #[arg(long)]
        skip_extraction: bool,
    },
    /// Print community membership and tract overlap weights
    Overlap {
        /// Public water system id
        pws_id: String,
    },
    /// Write the service area and its clipped tracts as EPSG:4326 `GeoJSON`
    Map {
        /// Public water system id
        pws_id: String,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = pws_dossier_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = DossierConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(&multi, config).await;
    };

    match command {
        Commands::Search { name } => {
            let records = commands::search(&multi, &config, &name).await?;
            commands::print_records(&records);
        }
        Commands::Dossier {
            pws_id,
            skip_extraction,
        } => {
            let service = commands::start_service(&multi, config).await?;
            commands::dossier(&multi, &service, &pws_id, BuildOptions { skip_extraction }).await?;
        }
        Commands::Overlap { pws_id } => {
            let store = commands::load_store(&multi, &config)?;
            commands::overlap(&store, &pws_id)?;
        }
        Commands::Map { pws_id, out } => {
            let store = commands::load_store(&multi, &config)?;
            commands::map(&store, &pws_id, &out)?;
        }
    }

    Ok(())
}
