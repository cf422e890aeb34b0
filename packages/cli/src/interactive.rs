//! Interactive menu: search by name, pick a system, pick what to show.
//!
//! The dataset context is loaded on first use and kept for the session;
//! it is reloaded between lookups once it passes `[context] max_age_secs`.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use pws_dossier::{BuildOptions, DossierConfig, DossierService};
use pws_dossier_cli_utils::MultiProgress;
use pws_dossier_extract_models::RegistryRecord;

use crate::commands;

enum Action {
    Dossier,
    DossierWithoutExtraction,
    Overlap,
    Map,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Dossier,
        Self::DossierWithoutExtraction,
        Self::Overlap,
        Self::Map,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Dossier => "Build dossier",
            Self::DossierWithoutExtraction => "Build dossier (skip Drinking Water Watch)",
            Self::Overlap => "Show communities and tract weights",
            Self::Map => "Export map GeoJSON",
        }
    }
}

fn record_label(record: &RegistryRecord) -> String {
    let name = record.pwsname.as_deref().unwrap_or("(unnamed)");
    match &record.county_served {
        Some(county) => format!("{}  {name} ({county})", record.pwsid),
        None => format!("{}  {name}", record.pwsid),
    }
}

/// Runs the lookup loop until the user declines another lookup.
///
/// # Errors
///
/// Returns an error if a prompt fails, the registry search fails, or the
/// selected action fails.
pub async fn run(
    multi: &MultiProgress,
    config: DossierConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Public Water System Dossiers");
    println!();

    let mut service: Option<DossierService> = None;

    loop {
        let name: String = Input::new()
            .with_prompt("Water system name")
            .interact_text()?;

        let records = commands::search(multi, &config, &name).await?;
        if records.is_empty() {
            println!("No matching water systems.");
        } else {
            let labels: Vec<String> = records.iter().map(record_label).collect();
            let idx = Select::new()
                .with_prompt("Which system?")
                .items(&labels)
                .default(0)
                .interact()?;
            let pws_id = records[idx].pwsid.clone();

            let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
            let action = Select::new()
                .with_prompt("What would you like to see?")
                .items(&labels)
                .default(0)
                .interact()?;

            match service.as_mut() {
                Some(service) => {
                    if service.refresh_if_stale().await {
                        log::info!("Dataset context refreshed");
                    }
                }
                None => service = Some(commands::start_service(multi, config.clone()).await?),
            }

            if let Some(service) = &service {
                run_action(multi, service, &Action::ALL[action], &pws_id).await?;
            }
        }

        let again = Confirm::new()
            .with_prompt("Look up another system?")
            .default(true)
            .interact()?;
        if !again {
            break;
        }
    }

    Ok(())
}

async fn run_action(
    multi: &MultiProgress,
    service: &DossierService,
    action: &Action,
    pws_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        Action::Dossier => {
            commands::dossier(multi, service, pws_id, BuildOptions::default()).await?;
        }
        Action::DossierWithoutExtraction => {
            let options = BuildOptions {
                skip_extraction: true,
            };
            commands::dossier(multi, service, pws_id, options).await?;
        }
        Action::Overlap | Action::Map => {
            let context = service.context().map_err(|e| e.to_string())?;
            if matches!(action, Action::Overlap) {
                commands::overlap(context.store(), pws_id)?;
            } else {
                let out: String = Input::new()
                    .with_prompt("Output file")
                    .default(format!("{pws_id}.geojson"))
                    .interact_text()?;
                commands::map(context.store(), pws_id, &PathBuf::from(out))?;
            }
        }
    }
    Ok(())
}
