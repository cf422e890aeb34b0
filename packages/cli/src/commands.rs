//! Command bodies shared by the subcommands and the interactive menu.

use std::path::Path;
use std::slice;

use pws_dossier::{BuildOptions, DossierConfig, DossierError, DossierService, RetryPolicy};
use pws_dossier_cli_utils::{MultiProgress, Spinner};
use pws_dossier_extract::{DocumentFetcher, registry};
use pws_dossier_extract_models::RegistryRecord;
use pws_dossier_geometry::{GeometryError, GeometryStore, render};
use pws_dossier_geometry_models::TractWeight;
use pws_dossier_spatial::membership::compute_membership;
use pws_dossier_spatial::overlap::compute_overlap;
use serde::Serialize;

/// Community membership and tract weights for one service area.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapReport {
    pub service_area_id: String,
    pub service_area_name: String,
    pub communities: Vec<String>,
    pub tracts: Vec<TractWeight>,
    pub weight_sum: f64,
}

impl OverlapReport {
    /// Runs both overlay joins for a single service area.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnknownServiceArea`] if the id is not in
    /// the store.
    pub fn build(store: &GeometryStore, pws_id: &str) -> Result<Self, GeometryError> {
        let area = store
            .service_area(pws_id)
            .ok_or_else(|| GeometryError::UnknownServiceArea {
                id: pws_id.to_string(),
            })?;
        let areas = slice::from_ref(area);

        let communities = compute_membership(store.communities(), areas)
            .into_iter()
            .next()
            .map(|record| record.community_names)
            .unwrap_or_default();
        let tracts: Vec<TractWeight> = compute_overlap(store.tracts(), areas)
            .iter()
            .map(TractWeight::from)
            .collect();

        Ok(Self {
            service_area_id: area.id.clone(),
            service_area_name: area.name.clone(),
            communities,
            weight_sum: tracts.iter().map(|weight| weight.fraction).sum(),
            tracts,
        })
    }
}

/// Registry search with the configured retry policy.
///
/// # Errors
///
/// Returns [`DossierError`] if the search fails after retries.
pub async fn search(
    multi: &MultiProgress,
    config: &DossierConfig,
    name: &str,
) -> Result<Vec<RegistryRecord>, DossierError> {
    let fetcher = DocumentFetcher::new()?;
    let policy = RetryPolicy::from_config(&config.network);
    let spinner = Spinner::start(multi, &format!("Searching for '{}'", name.trim()));

    let result = policy
        .run("registry search", || {
            registry::search(fetcher.client(), &config.registry.base_url, name)
        })
        .await;

    match &result {
        Ok(records) => spinner.finish(&format!("{} matching systems", records.len())),
        Err(_) => spinner.clear(),
    }
    Ok(result?)
}

pub fn print_records(records: &[RegistryRecord]) {
    if records.is_empty() {
        println!("No matching water systems.");
        return;
    }

    println!("{:<12} {:<50} COUNTY", "PWS ID", "NAME");
    println!("{}", "-".repeat(75));
    for record in records {
        println!(
            "{:<12} {:<50} {}",
            record.pwsid,
            record.pwsname.as_deref().unwrap_or(""),
            record.county_served.as_deref().unwrap_or("")
        );
    }
}

/// Loads the dataset context behind a spinner.
///
/// # Errors
///
/// Returns [`DossierError`] if the HTTP client cannot be built.
pub async fn start_service(
    multi: &MultiProgress,
    config: DossierConfig,
) -> Result<DossierService, DossierError> {
    let spinner = Spinner::start(multi, "Loading geometry layers and census indicators");
    let service = DossierService::start(config).await?;
    match service.context() {
        Ok(context) => spinner.finish(&format!(
            "Dataset ready: {} service areas, {} tracts",
            context.store().service_areas().len(),
            context.store().tracts().len()
        )),
        Err(_) => spinner.finish("Dataset unavailable, demographics will be skipped"),
    }
    Ok(service)
}

/// Builds a dossier and prints it as pretty JSON.
///
/// # Errors
///
/// Returns an error if the dossier cannot be serialized.
pub async fn dossier(
    multi: &MultiProgress,
    service: &DossierService,
    pws_id: &str,
    options: BuildOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let spinner = Spinner::start(multi, &format!("Building dossier for {}", pws_id.trim()));
    let dossier = service.build(pws_id, options).await;
    spinner.clear();

    println!("{}", serde_json::to_string_pretty(&dossier)?);
    Ok(())
}

/// Loads the geometry layers behind a spinner.
///
/// # Errors
///
/// Returns [`GeometryError`] if the layers cannot be loaded.
pub fn load_store(
    multi: &MultiProgress,
    config: &DossierConfig,
) -> Result<GeometryStore, GeometryError> {
    let spinner = Spinner::start(multi, "Loading geometry layers");
    let store = GeometryStore::load(&config.geometry);
    match &store {
        Ok(store) => spinner.finish(&format!("Loaded layers in {}", store.working_crs())),
        Err(_) => spinner.clear(),
    }
    store
}

/// Prints the overlap report for one service area.
///
/// # Errors
///
/// Returns an error for an unknown id or if serialization fails.
pub fn overlap(store: &GeometryStore, pws_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let report = OverlapReport::build(store, pws_id.trim())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Writes the EPSG:4326 rendering export for one service area.
///
/// # Errors
///
/// Returns an error for an unknown id or if the file cannot be written.
pub fn map(
    store: &GeometryStore,
    pws_id: &str,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = render::service_area_collection(store, pws_id.trim())?;
    std::fs::write(out, serde_json::to_string_pretty(&collection)?)?;
    log::info!(
        "Wrote {} features for {} to {}",
        collection.features.len(),
        pws_id.trim(),
        out.display()
    );
    Ok(())
}
