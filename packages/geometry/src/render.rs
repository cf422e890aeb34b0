//! Rendering projection export.
//!
//! Produces the data a map view needs for one service area: its outline
//! and the tracts clipped to it, reprojected to EPSG:4326. No areas are
//! computed here.

use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use pws_dossier_geometry_models::Crs;

use crate::crs::Reprojector;
use crate::{GeometryError, GeometryStore};

/// Builds a `FeatureCollection` in EPSG:4326 for one service area.
///
/// The first feature is the service area (`role = "serviceArea"`, with
/// `centerLon`/`centerLat` of its bounding box); it is followed by one
/// feature per intersecting tract clipped to the service area
/// (`role = "tract"`, `geoid`).
///
/// # Errors
///
/// Returns [`GeometryError::UnknownServiceArea`] if the id is not in the
/// store, or [`GeometryError::UnsupportedCrs`] if the working CRS cannot be
/// unprojected.
pub fn service_area_collection(
    store: &GeometryStore,
    service_area_id: &str,
) -> Result<FeatureCollection, GeometryError> {
    let area = store
        .service_area(service_area_id)
        .ok_or_else(|| GeometryError::UnknownServiceArea {
            id: service_area_id.to_string(),
        })?;

    let to_wgs84 = Reprojector::new(store.working_crs(), Crs::WGS84, "render")?;
    let outline = to_wgs84.transform_multi_polygon(&area.geometry);

    let mut props = JsonObject::new();
    props.insert("role".to_string(), "serviceArea".into());
    props.insert("id".to_string(), area.id.clone().into());
    props.insert("name".to_string(), area.name.clone().into());
    if let Some(rect) = outline.bounding_rect() {
        let center = rect.center();
        props.insert("centerLon".to_string(), center.x.into());
        props.insert("centerLat".to_string(), center.y.into());
    }

    let mut features = vec![polygon_feature(&outline, props)];

    for tract in store.tracts() {
        if !tract.geometry.intersects(&area.geometry) {
            continue;
        }
        let clipped = tract.geometry.intersection(&area.geometry);
        if clipped.0.is_empty() {
            continue;
        }

        let mut props = JsonObject::new();
        props.insert("role".to_string(), "tract".into());
        props.insert("geoid".to_string(), tract.geoid.clone().into());
        features.push(polygon_feature(
            &to_wgs84.transform_multi_polygon(&clipped),
            props,
        ));
    }

    log::debug!(
        "Rendering export for {service_area_id}: {} tract features",
        features.len() - 1
    );

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn polygon_feature(geometry: &MultiPolygon<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use geo::{Rect, coord};
    use pws_dossier_geometry_models::{CensusTract, ServiceArea};

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![
            Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon(),
        ])
    }

    fn store() -> GeometryStore {
        // Texas Centric Albers false origin neighborhood.
        let (x0, y0) = (1_500_000.0, 7_000_000.0);
        GeometryStore::from_parts(
            Crs::TEXAS_CENTRIC_ALBERS,
            vec![ServiceArea {
                id: "TX1".to_string(),
                name: "Test System".to_string(),
                geometry: square(x0, y0, 1_000.0),
            }],
            vec![],
            vec![
                CensusTract {
                    geoid: "48001000100".to_string(),
                    geometry: square(x0 + 500.0, y0, 1_000.0),
                    original_area: 1_000_000.0,
                },
                CensusTract {
                    geoid: "48001000200".to_string(),
                    geometry: square(x0 + 5_000.0, y0, 1_000.0),
                    original_area: 1_000_000.0,
                },
            ],
        )
    }

    #[test]
    fn exports_outline_and_clipped_tracts_in_degrees() {
        let collection = service_area_collection(&store(), "TX1").unwrap();
        assert_eq!(collection.features.len(), 2);

        let outline = &collection.features[0];
        assert_eq!(outline.property("role").and_then(|v| v.as_str()), Some("serviceArea"));
        let lon = outline.property("centerLon").and_then(serde_json::Value::as_f64).unwrap();
        let lat = outline.property("centerLat").and_then(serde_json::Value::as_f64).unwrap();
        assert!((-101.0..-99.0).contains(&lon), "lon = {lon}");
        assert!((26.0..29.0).contains(&lat), "lat = {lat}");

        let tract = &collection.features[1];
        assert_eq!(tract.property("geoid").and_then(|v| v.as_str()), Some("48001000100"));
    }

    #[test]
    fn unknown_service_area_is_an_error() {
        assert!(matches!(
            service_area_collection(&store(), "NOPE"),
            Err(GeometryError::UnknownServiceArea { .. })
        ));
    }
}
