#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vector layer loading and CRS reconciliation.
//!
//! Reads the service-area, community and census-tract layers from
//! `GeoJSON` files, verifies that each one declares a coordinate reference
//! system, and reprojects them into a single area-accurate working CRS
//! before any overlay math happens. Longitude/latitude is only ever used
//! for the rendering export in [`render`].

pub mod config;
pub mod crs;
pub mod layer;
pub mod render;
pub mod store;

use std::path::PathBuf;

use pws_dossier_geometry_models::Crs;
use thiserror::Error;

pub use config::{FieldNames, GeometryConfig, LayerSource};
pub use store::GeometryStore;

/// Errors that can occur while loading or projecting geometry layers.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A layer carries no CRS, so it cannot be reconciled with the others.
    #[error("Layer '{layer}' has no coordinate reference system")]
    MissingProjection {
        /// Layer name.
        layer: String,
    },

    /// A layer uses a CRS this crate cannot project.
    #[error("Layer '{layer}' uses unsupported CRS {crs}")]
    UnsupportedCrs {
        /// Layer name.
        layer: String,
        /// The offending CRS.
        crs: Crs,
    },

    /// Reading a layer file failed.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Path of the layer file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The layer file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The layer parsed but does not have the expected shape.
    #[error("Invalid layer '{layer}': {message}")]
    InvalidLayer {
        /// Layer name.
        layer: String,
        /// Description of what went wrong.
        message: String,
    },

    /// No service area with the requested identifier exists.
    #[error("Unknown service area '{id}'")]
    UnknownServiceArea {
        /// The requested identifier.
        id: String,
    },
}
