//! Geometry layer configuration, deserialized from the `[geometry]` table
//! of the dossier config file.

use std::path::PathBuf;

use pws_dossier_geometry_models::Crs;
use serde::{Deserialize, Serialize};

/// Where one layer lives and, optionally, which CRS to assume for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSource {
    /// Path to a `GeoJSON` `FeatureCollection`.
    pub path: PathBuf,
    /// CRS override. Takes precedence over the file's `crs` member.
    #[serde(default)]
    pub crs: Option<Crs>,
}

impl LayerSource {
    /// Creates a layer source without a CRS override.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            crs: None,
        }
    }
}

/// Attribute names read from each layer's feature properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Service area identifier property.
    pub service_area_id: String,
    /// Service area name property.
    pub service_area_name: String,
    /// Community name property.
    pub community_name: String,
    /// Tract GEOID property.
    pub tract_geoid: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            service_area_id: "PWSId".to_string(),
            service_area_name: "pwsName".to_string(),
            community_name: "NAME".to_string(),
            tract_geoid: "GEOID".to_string(),
        }
    }
}

/// The three input layers plus the projection used for area math.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Service area polygons. Their CRS is the reference CRS.
    pub service_areas: LayerSource,
    /// Community boundary polygons.
    pub communities: LayerSource,
    /// Census tract polygons.
    pub tracts: LayerSource,
    /// Property names.
    pub fields: FieldNames,
    /// Working CRS used when the reference layer is in degrees.
    pub area_crs: Crs,
}

const fn default_area_crs() -> Crs {
    Crs::TEXAS_CENTRIC_ALBERS
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            service_areas: LayerSource::new("data/service_areas.geojson"),
            communities: LayerSource::new("data/communities.geojson"),
            tracts: LayerSource::new("data/tracts.geojson"),
            fields: FieldNames::default(),
            area_crs: default_area_crs(),
        }
    }
}
