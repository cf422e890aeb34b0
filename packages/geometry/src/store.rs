//! The reconciled, read-only geometry working set.

use std::collections::BTreeSet;

use geo::{Area, MultiPolygon};
use pws_dossier_geometry_models::{CensusTract, CommunityPolygon, Crs, ServiceArea};

use crate::crs::{Projection, Reprojector};
use crate::layer::{RawLayer, feature_multi_polygon, property_string, read_layer};
use crate::{FieldNames, GeometryConfig, GeometryError};

/// Layer name for service areas.
pub const SERVICE_AREA_LAYER: &str = "service_areas";

/// Layer name for community boundaries.
pub const COMMUNITY_LAYER: &str = "communities";

/// Layer name for census tracts.
pub const TRACT_LAYER: &str = "tracts";

/// All three layers in one area-accurate working CRS.
///
/// Constructed once per aggregation run. Nothing mutates it after
/// construction.
#[derive(Debug, Clone)]
pub struct GeometryStore {
    working_crs: Crs,
    service_areas: Vec<ServiceArea>,
    communities: Vec<CommunityPolygon>,
    tracts: Vec<CensusTract>,
}

impl GeometryStore {
    /// Reads the configured layer files and reconciles them.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if a file cannot be read, a layer has no
    /// CRS, or a CRS is unsupported.
    pub fn load(config: &GeometryConfig) -> Result<Self, GeometryError> {
        let service_areas = read_layer(SERVICE_AREA_LAYER, &config.service_areas)?;
        let communities = read_layer(COMMUNITY_LAYER, &config.communities)?;
        let tracts = read_layer(TRACT_LAYER, &config.tracts)?;

        Self::from_layers(
            &service_areas,
            &communities,
            &tracts,
            &config.fields,
            config.area_crs,
        )
    }

    /// Reconciles three parsed layers into one working CRS.
    ///
    /// The service-area layer is the reference: its CRS becomes the working
    /// CRS unless it is geographic, in which case `area_crs` is used for
    /// every layer. Tract areas are measured after reprojection.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::MissingProjection`] if any layer lacks a
    /// CRS, or [`GeometryError::UnsupportedCrs`] if a CRS cannot be
    /// projected (or `area_crs` is itself geographic).
    pub fn from_layers(
        service_areas: &RawLayer,
        communities: &RawLayer,
        tracts: &RawLayer,
        fields: &FieldNames,
        area_crs: Crs,
    ) -> Result<Self, GeometryError> {
        let reference_crs = service_areas.require_crs()?;
        communities.require_crs()?;
        tracts.require_crs()?;

        let working_crs = if Projection::for_crs(reference_crs, &service_areas.name)?.is_geographic()
        {
            if Projection::for_crs(area_crs, "area_crs")?.is_geographic() {
                return Err(GeometryError::UnsupportedCrs {
                    layer: "area_crs".to_string(),
                    crs: area_crs,
                });
            }
            log::info!(
                "Reference layer {} is geographic ({reference_crs}), measuring areas in {area_crs}",
                service_areas.name
            );
            area_crs
        } else {
            reference_crs
        };

        let service_areas = build_service_areas(service_areas, working_crs, fields)?;
        let communities = build_communities(communities, working_crs, fields)?;
        let tracts = build_tracts(tracts, working_crs, fields)?;

        log::info!(
            "Geometry store ready in {working_crs}: {} service areas, {} communities, {} tracts",
            service_areas.len(),
            communities.len(),
            tracts.len()
        );

        Ok(Self {
            working_crs,
            service_areas,
            communities,
            tracts,
        })
    }

    /// Assembles a store from already-reconciled parts.
    #[must_use]
    pub const fn from_parts(
        working_crs: Crs,
        service_areas: Vec<ServiceArea>,
        communities: Vec<CommunityPolygon>,
        tracts: Vec<CensusTract>,
    ) -> Self {
        Self {
            working_crs,
            service_areas,
            communities,
            tracts,
        }
    }

    /// The area-accurate CRS every geometry is stored in.
    #[must_use]
    pub const fn working_crs(&self) -> Crs {
        self.working_crs
    }

    /// Service areas in layer order.
    #[must_use]
    pub fn service_areas(&self) -> &[ServiceArea] {
        &self.service_areas
    }

    /// Community polygons in layer order.
    #[must_use]
    pub fn communities(&self) -> &[CommunityPolygon] {
        &self.communities
    }

    /// Census tracts in layer order.
    #[must_use]
    pub fn tracts(&self) -> &[CensusTract] {
        &self.tracts
    }

    /// Looks up a service area by identifier.
    #[must_use]
    pub fn service_area(&self, id: &str) -> Option<&ServiceArea> {
        self.service_areas.iter().find(|area| area.id == id)
    }
}

fn reprojector_for(layer: &RawLayer, working_crs: Crs) -> Result<Option<Reprojector>, GeometryError> {
    let layer_crs = layer.require_crs()?;
    if layer_crs == working_crs {
        return Ok(None);
    }
    log::info!(
        "Reprojecting {} layer from {layer_crs} to {working_crs}",
        layer.name
    );
    Reprojector::new(layer_crs, working_crs, &layer.name).map(Some)
}

fn project(reprojector: Option<&Reprojector>, geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
    match reprojector {
        Some(reprojector) => reprojector.transform_multi_polygon(&geometry),
        None => geometry,
    }
}

fn build_service_areas(
    layer: &RawLayer,
    working_crs: Crs,
    fields: &FieldNames,
) -> Result<Vec<ServiceArea>, GeometryError> {
    let reprojector = reprojector_for(layer, working_crs)?;
    let mut seen = BTreeSet::new();
    let mut areas = Vec::with_capacity(layer.features.len());

    for (index, feature) in layer.features.iter().enumerate() {
        let Some(id) = property_string(feature, &fields.service_area_id) else {
            log::warn!(
                "{} feature {index} has no '{}' property, skipping",
                layer.name,
                fields.service_area_id
            );
            continue;
        };
        let Some(geometry) = feature_multi_polygon(feature) else {
            log::warn!("{} feature {id} has no polygon geometry, skipping", layer.name);
            continue;
        };
        if !seen.insert(id.clone()) {
            log::warn!("Duplicate service area id {id}, keeping the first feature");
            continue;
        }

        areas.push(ServiceArea {
            name: property_string(feature, &fields.service_area_name).unwrap_or_default(),
            geometry: project(reprojector.as_ref(), geometry),
            id,
        });
    }

    Ok(areas)
}

fn build_communities(
    layer: &RawLayer,
    working_crs: Crs,
    fields: &FieldNames,
) -> Result<Vec<CommunityPolygon>, GeometryError> {
    let reprojector = reprojector_for(layer, working_crs)?;

    Ok(layer
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let name = property_string(feature, &fields.community_name)?;
            let Some(geometry) = feature_multi_polygon(feature) else {
                log::warn!("{} feature {index} ({name}) has no polygon geometry", layer.name);
                return None;
            };
            Some(CommunityPolygon {
                name,
                geometry: project(reprojector.as_ref(), geometry),
            })
        })
        .collect())
}

fn build_tracts(
    layer: &RawLayer,
    working_crs: Crs,
    fields: &FieldNames,
) -> Result<Vec<CensusTract>, GeometryError> {
    let reprojector = reprojector_for(layer, working_crs)?;
    let mut seen = BTreeSet::new();
    let mut tracts = Vec::with_capacity(layer.features.len());

    for feature in &layer.features {
        let Some(geoid) = property_string(feature, &fields.tract_geoid) else {
            continue;
        };
        let Some(geometry) = feature_multi_polygon(feature) else {
            log::warn!("Tract {geoid} has no polygon geometry, skipping");
            continue;
        };
        let geometry = project(reprojector.as_ref(), geometry);

        let original_area = geometry.unsigned_area();
        if !(original_area > 0.0) {
            log::warn!("Tract {geoid} has non-positive area {original_area}, skipping");
            continue;
        }
        if !seen.insert(geoid.clone()) {
            log::warn!("Duplicate tract GEOID {geoid}, keeping the first feature");
            continue;
        }

        tracts.push(CensusTract {
            geoid,
            geometry,
            original_area,
        });
    }

    Ok(tracts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::parse_layer;

    fn square_feature(props: &str, x: f64, y: f64, size: f64) -> String {
        format!(
            r#"{{ "type": "Feature", "properties": {props},
                 "geometry": {{ "type": "Polygon", "coordinates": [[[{x},{y}],[{x2},{y}],[{x2},{y2}],[{x},{y2}],[{x},{y}]]] }} }}"#,
            x2 = x + size,
            y2 = y + size,
        )
    }

    fn collection(crs: Option<&str>, features: &[String]) -> String {
        let crs_member = crs.map_or_else(String::new, |name| {
            format!(r#""crs": {{ "type": "name", "properties": {{ "name": "{name}" }} }},"#)
        });
        format!(
            r#"{{ "type": "FeatureCollection", {crs_member} "features": [{}] }}"#,
            features.join(",")
        )
    }

    fn layer(name: &str, crs: Option<&str>, features: &[String]) -> RawLayer {
        parse_layer(name, &collection(crs, features), None).unwrap()
    }

    #[test]
    fn fails_when_any_layer_lacks_crs() {
        let service = layer(
            SERVICE_AREA_LAYER,
            Some("EPSG:3083"),
            &[square_feature(r#"{"PWSId":"A"}"#, 0.0, 0.0, 10.0)],
        );
        let communities = layer(COMMUNITY_LAYER, None, &[]);
        let tracts = layer(TRACT_LAYER, Some("EPSG:3083"), &[]);

        let err = GeometryStore::from_layers(
            &service,
            &communities,
            &tracts,
            &FieldNames::default(),
            Crs::TEXAS_CENTRIC_ALBERS,
        )
        .unwrap_err();

        assert!(matches!(err, GeometryError::MissingProjection { layer } if layer == COMMUNITY_LAYER));
    }

    #[test]
    fn keeps_projected_reference_crs_and_measures_tract_area() {
        let service = layer(
            SERVICE_AREA_LAYER,
            Some("EPSG:3083"),
            &[square_feature(r#"{"PWSId":"A","pwsName":"Alpha"}"#, 0.0, 0.0, 10.0)],
        );
        let communities = layer(
            COMMUNITY_LAYER,
            Some("EPSG:3083"),
            &[square_feature(r#"{"NAME":"Las Palmas"}"#, 2.0, 2.0, 1.0)],
        );
        let tracts = layer(
            TRACT_LAYER,
            Some("EPSG:3083"),
            &[square_feature(r#"{"GEOID":"48061012301"}"#, 0.0, 0.0, 4.0)],
        );

        let store = GeometryStore::from_layers(
            &service,
            &communities,
            &tracts,
            &FieldNames::default(),
            Crs::CONUS_ALBERS,
        )
        .unwrap();

        assert_eq!(store.working_crs(), Crs::TEXAS_CENTRIC_ALBERS);
        assert_eq!(store.service_area("A").map(|a| a.name.as_str()), Some("Alpha"));
        assert_eq!(store.communities()[0].name, "Las Palmas");
        assert!((store.tracts()[0].original_area - 16.0).abs() < 1e-9);
    }

    #[test]
    fn geographic_reference_switches_to_area_crs() {
        let service = layer(
            SERVICE_AREA_LAYER,
            Some("EPSG:4326"),
            &[square_feature(r#"{"PWSId":"A"}"#, -98.0, 30.0, 0.1)],
        );
        let communities = layer(COMMUNITY_LAYER, Some("EPSG:4326"), &[]);
        let tracts = layer(
            TRACT_LAYER,
            Some("EPSG:4269"),
            &[square_feature(r#"{"GEOID":"48001000100"}"#, -98.0, 30.0, 0.1)],
        );

        let store = GeometryStore::from_layers(
            &service,
            &communities,
            &tracts,
            &FieldNames::default(),
            Crs::TEXAS_CENTRIC_ALBERS,
        )
        .unwrap();

        assert_eq!(store.working_crs(), Crs::TEXAS_CENTRIC_ALBERS);
        // A 0.1 degree cell near 30N is roughly 9.6 km x 11.1 km.
        let area = store.tracts()[0].original_area;
        assert!(area > 1.0e8 && area < 1.2e8, "area = {area}");
    }

    #[test]
    fn rejects_geographic_area_crs() {
        let service = layer(SERVICE_AREA_LAYER, Some("EPSG:4326"), &[]);
        let communities = layer(COMMUNITY_LAYER, Some("EPSG:4326"), &[]);
        let tracts = layer(TRACT_LAYER, Some("EPSG:4326"), &[]);

        let err = GeometryStore::from_layers(
            &service,
            &communities,
            &tracts,
            &FieldNames::default(),
            Crs::WGS84,
        )
        .unwrap_err();

        assert!(matches!(err, GeometryError::UnsupportedCrs { .. }));
    }

    #[test]
    fn skips_duplicate_ids_and_degenerate_tracts() {
        let service = layer(
            SERVICE_AREA_LAYER,
            Some("EPSG:3083"),
            &[
                square_feature(r#"{"PWSId":"A","pwsName":"First"}"#, 0.0, 0.0, 1.0),
                square_feature(r#"{"PWSId":"A","pwsName":"Second"}"#, 5.0, 5.0, 1.0),
            ],
        );
        let communities = layer(COMMUNITY_LAYER, Some("EPSG:3083"), &[]);
        let tracts = layer(
            TRACT_LAYER,
            Some("EPSG:3083"),
            &[
                square_feature(r#"{"GEOID":"48001000100"}"#, 0.0, 0.0, 0.0),
                square_feature(r#"{"GEOID":"48001000200"}"#, 0.0, 0.0, 2.0),
            ],
        );

        let store = GeometryStore::from_layers(
            &service,
            &communities,
            &tracts,
            &FieldNames::default(),
            Crs::TEXAS_CENTRIC_ALBERS,
        )
        .unwrap();

        assert_eq!(store.service_areas().len(), 1);
        assert_eq!(store.service_areas()[0].name, "First");
        assert_eq!(store.tracts().len(), 1);
        assert_eq!(store.tracts()[0].geoid, "48001000200");
    }
}
