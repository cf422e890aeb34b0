#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census demographics for service areas.
//!
//! [`acs`] fetches the American Community Survey 5-year estimates for every
//! tract in one state and normalizes them into an [`IndicatorTable`].
//! [`aggregate`] combines that table with a service area's tract overlap
//! weights into a weighted mean per indicator.

pub mod acs;
pub mod aggregate;

pub use acs::{AcsQuery, IndicatorTable};
pub use aggregate::aggregate;

/// Errors that can occur while fetching or parsing the indicator table.
///
/// Fatal for the aggregation path only. Not retried inside this crate.
#[derive(Debug, thiserror::Error)]
pub enum IndicatorFetchError {
    /// Transport-level failure.
    #[error("Census request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Census API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body, for diagnostics.
        body: String,
    },

    /// The body is not the expected header-plus-rows table.
    #[error("Malformed census response: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },
}

/// Errors that can occur while aggregating indicators for one service area.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    /// An overlapping tract has no row in the indicator table.
    #[error("No indicators for tract {geoid} (service area {service_area_id})")]
    MissingTractIndicator {
        /// Service area being aggregated.
        service_area_id: String,
        /// The tract without indicators.
        geoid: String,
    },

    /// The overlap weights sum to zero, so a weighted mean is undefined.
    #[error("Weighted mean is undefined for service area {service_area_id}: weights sum to zero")]
    UndefinedAggregation {
        /// Service area being aggregated.
        service_area_id: String,
    },

    /// The service area has no geometry in the loaded layers.
    #[error("Unknown service area {service_area_id}")]
    UnknownServiceArea {
        /// The requested identifier.
        service_area_id: String,
    },
}
