//! Raw `GeoJSON` layer reading.
//!
//! A layer is a `FeatureCollection` plus the CRS it declares. The CRS comes
//! from the legacy top-level `crs` member that GDAL and most GIS tools
//! still write:
//!
//! ```json
//! { "type": "FeatureCollection",
//!   "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::3083" } },
//!   "features": [ ... ] }
//! ```

use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson};
use pws_dossier_geometry_models::Crs;

use crate::{GeometryError, LayerSource};

/// A parsed layer before reconciliation.
#[derive(Debug, Clone)]
pub struct RawLayer {
    /// Layer name used in logs and errors.
    pub name: String,
    /// Declared (or overridden) CRS. `None` means the layer cannot be used.
    pub crs: Option<Crs>,
    /// The layer's features, in file order.
    pub features: Vec<Feature>,
}

impl RawLayer {
    /// Returns the layer CRS or a [`GeometryError::MissingProjection`].
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::MissingProjection`] if the layer has no CRS.
    pub fn require_crs(&self) -> Result<Crs, GeometryError> {
        self.crs.ok_or_else(|| GeometryError::MissingProjection {
            layer: self.name.clone(),
        })
    }
}

/// Reads and parses a layer file.
///
/// # Errors
///
/// Returns [`GeometryError`] if the file cannot be read or is not a
/// `GeoJSON` `FeatureCollection`.
pub fn read_layer(name: &str, source: &LayerSource) -> Result<RawLayer, GeometryError> {
    log::debug!("Reading {name} layer from {}", source.path.display());

    let text = std::fs::read_to_string(&source.path).map_err(|e| GeometryError::Io {
        path: source.path.clone(),
        source: e,
    })?;

    let layer = parse_layer(name, &text, source.crs)?;
    log::info!(
        "Loaded {} features from {name} layer ({})",
        layer.features.len(),
        layer
            .crs
            .map_or_else(|| "no CRS".to_string(), |crs| crs.to_string())
    );
    Ok(layer)
}

/// Parses `GeoJSON` text into a layer.
///
/// # Errors
///
/// Returns [`GeometryError`] if the text is not a `FeatureCollection` or its
/// `crs` member is malformed.
pub fn parse_layer(
    name: &str,
    text: &str,
    crs_override: Option<Crs>,
) -> Result<RawLayer, GeometryError> {
    let geojson: GeoJson = text.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(GeometryError::InvalidLayer {
            layer: name.to_string(),
            message: "expected a FeatureCollection".to_string(),
        });
    };

    let declared = declared_crs(name, &collection)?;
    let crs = match (crs_override, declared) {
        (Some(overridden), Some(declared)) if overridden != declared => {
            log::warn!(
                "{name} layer declares {declared}, using configured override {overridden}"
            );
            Some(overridden)
        }
        (Some(overridden), _) => Some(overridden),
        (None, declared) => declared,
    };

    Ok(RawLayer {
        name: name.to_string(),
        crs,
        features: collection.features,
    })
}

fn declared_crs(name: &str, collection: &FeatureCollection) -> Result<Option<Crs>, GeometryError> {
    let Some(member) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .filter(|value| !value.is_null())
    else {
        return Ok(None);
    };

    let crs_name = member
        .get("properties")
        .and_then(|props| props.get("name"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| GeometryError::InvalidLayer {
            layer: name.to_string(),
            message: format!("crs member has no properties.name: {member}"),
        })?;

    Crs::parse(crs_name)
        .map(Some)
        .ok_or_else(|| GeometryError::InvalidLayer {
            layer: name.to_string(),
            message: format!("unrecognized CRS name '{crs_name}'"),
        })
}

/// Reads a feature property as a string. Numbers are stringified; blank
/// strings count as absent.
#[must_use]
pub fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a feature's geometry to a [`MultiPolygon`].
///
/// Returns `None` for null or non-polygonal geometries.
#[must_use]
pub fn feature_multi_polygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.clone()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
