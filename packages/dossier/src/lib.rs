#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Water system dossiers.
//!
//! Ties the workspace together: the [`config`] file, the process-wide
//! [`context::DatasetContext`] (geometry, spatial indexes, census
//! indicators), and [`service::DossierService`], which builds a
//! [`Dossier`] per PWS id from that context plus the extracted regulatory
//! facts. Parts that cannot be produced are marked unavailable with a
//! reason; a dossier is always returned.

pub mod assemble;
pub mod config;
pub mod context;
pub mod display;
pub mod retry;
pub mod service;

use std::time::Duration;

use pws_dossier_demographics::{AggregationError, IndicatorFetchError};
use pws_dossier_extract::FetchError;
use pws_dossier_geometry::GeometryError;

pub use assemble::{Demographics, Dossier, Section, assemble};
pub use config::{ConfigError, DossierConfig};
pub use context::DatasetContext;
pub use display::DisplayIndicators;
pub use retry::{NetworkError, RetryPolicy};
pub use service::{BuildOptions, DossierService};

/// Top-level errors for dossier operations.
#[derive(Debug, thiserror::Error)]
pub enum DossierError {
    /// Loading the configuration failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Loading or projecting the geometry layers failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Fetching the indicator table failed.
    #[error("Indicator fetch error: {0}")]
    Indicators(#[from] IndicatorFetchError),

    /// The indicator table failed to load earlier.
    #[error("Indicators unavailable: {reason}")]
    IndicatorsUnavailable {
        /// Why the table is missing.
        reason: String,
    },

    /// Aggregation failed for one service area.
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Retrieving a page or registry records failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A network call did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    TimedOut {
        /// What was being attempted.
        operation: String,
        /// The per-attempt timeout.
        after: Duration,
    },
}

impl<E> From<NetworkError<E>> for DossierError
where
    Self: From<E>,
{
    fn from(e: NetworkError<E>) -> Self {
        match e {
            NetworkError::TimedOut { operation, after } => Self::TimedOut { operation, after },
            NetworkError::Failed(e) => Self::from(e),
        }
    }
}
