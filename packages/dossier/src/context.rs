//! Dataset context: the process-wide data every dossier is computed from.
//!
//! Loading reads the three geometry layers, builds the membership and
//! overlap indexes, and fetches the census indicator table once. The
//! context is never mutated in place; [`DatasetContext::reload`] swaps in
//! a freshly loaded one.

use std::time::{Duration, Instant};

use pws_dossier_demographics::acs::fetch_indicator_table;
use pws_dossier_demographics::{AggregationError, IndicatorFetchError, IndicatorTable, aggregate};
use pws_dossier_demographics_models::AggregatedIndicators;
use pws_dossier_geometry::{GeometryError, GeometryStore};
use pws_dossier_geometry_models::{ServiceArea, TractWeight};
use pws_dossier_spatial::{MembershipIndex, OverlapIndex};

use crate::DossierError;
use crate::config::DossierConfig;
use crate::retry::{NetworkError, RetryPolicy};

/// Geometry, spatial indexes and indicators loaded at one point in time.
#[derive(Debug)]
pub struct DatasetContext {
    store: GeometryStore,
    membership: MembershipIndex,
    overlap: OverlapIndex,
    indicators: Result<IndicatorTable, NetworkError<IndicatorFetchError>>,
    loaded_at: Instant,
}

impl DatasetContext {
    /// Loads the geometry layers and fetches the indicator table.
    ///
    /// An indicator fetch failure is kept inside the context rather than
    /// returned: it only disables aggregation.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the layers cannot be loaded or
    /// reconciled.
    pub async fn load(
        config: &DossierConfig,
        client: &reqwest::Client,
        policy: &RetryPolicy,
    ) -> Result<Self, GeometryError> {
        let store = GeometryStore::load(&config.geometry)?;

        let indicators = policy
            .run("census indicators", || fetch_indicator_table(client, &config.census))
            .await;
        match &indicators {
            Ok(table) => log::info!("Loaded indicators for {} tracts", table.len()),
            Err(e) => log::error!("Indicator table unavailable: {e}"),
        }

        Ok(Self::from_parts(store, indicators))
    }

    /// Builds the spatial indexes over `store`.
    #[must_use]
    pub fn from_parts(
        store: GeometryStore,
        indicators: Result<IndicatorTable, NetworkError<IndicatorFetchError>>,
    ) -> Self {
        let membership = MembershipIndex::build(store.communities(), store.service_areas());
        let overlap = OverlapIndex::build(store.tracts(), store.service_areas());
        log::debug!(
            "Indexed {} service areas with communities, {} tract overlaps",
            membership.len(),
            overlap.pair_count()
        );

        Self {
            store,
            membership,
            overlap,
            indicators,
            loaded_at: Instant::now(),
        }
    }

    /// Replaces this context with a freshly loaded one. On failure the
    /// current context is kept.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the new layers cannot be loaded.
    pub async fn reload(
        &mut self,
        config: &DossierConfig,
        client: &reqwest::Client,
        policy: &RetryPolicy,
    ) -> Result<(), GeometryError> {
        log::info!("Reloading dataset context (age {:?})", self.age());
        *self = Self::load(config, client, policy).await?;
        Ok(())
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }

    /// Whether the context is older than `max_age`.
    #[must_use]
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    #[must_use]
    pub const fn store(&self) -> &GeometryStore {
        &self.store
    }

    /// The indicator table, or why it could not be fetched.
    ///
    /// # Errors
    ///
    /// Returns the fetch error recorded at load time.
    pub const fn indicators(&self) -> Result<&IndicatorTable, &NetworkError<IndicatorFetchError>> {
        self.indicators.as_ref()
    }

    /// # Errors
    ///
    /// Returns [`AggregationError::UnknownServiceArea`] if the id is not in
    /// the service-area layer.
    pub fn service_area(&self, service_area_id: &str) -> Result<&ServiceArea, DossierError> {
        self.store.service_area(service_area_id).ok_or_else(|| {
            AggregationError::UnknownServiceArea {
                service_area_id: service_area_id.to_string(),
            }
            .into()
        })
    }

    /// Names of the communities intersecting a service area, in join order
    /// and with duplicates kept.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::UnknownServiceArea`] for an unknown id.
    pub fn communities_for(&self, service_area_id: &str) -> Result<&[String], DossierError> {
        self.service_area(service_area_id)?;
        Ok(self.membership.communities_for(service_area_id))
    }

    /// Overlap weights of the tracts intersecting a service area.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::UnknownServiceArea`] for an unknown id.
    pub fn weights_for(&self, service_area_id: &str) -> Result<&[TractWeight], DossierError> {
        self.service_area(service_area_id)?;
        Ok(self.overlap.weights_for(service_area_id))
    }

    /// Overlap-weighted indicators for one service area.
    ///
    /// # Errors
    ///
    /// Returns [`DossierError::IndicatorsUnavailable`] if the table failed
    /// to load, or [`DossierError::Aggregation`] for an unknown id, a tract
    /// without indicators, or weights summing to zero.
    pub fn aggregate(&self, service_area_id: &str) -> Result<AggregatedIndicators, DossierError> {
        let weights = self.weights_for(service_area_id)?;
        let table = self
            .indicators()
            .map_err(|e| DossierError::IndicatorsUnavailable {
                reason: e.to_string(),
            })?;
        Ok(aggregate(service_area_id, weights, table)?)
    }
}
