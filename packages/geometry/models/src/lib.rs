#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry types shared by the overlay pipeline.
//!
//! Service areas, community boundaries and census tracts are loaded once
//! per aggregation run and treated as read-only reference data. The
//! derived membership and overlap records are request-scoped.

use std::fmt;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    epsg: u32,
}

impl Crs {
    /// WGS 84 longitude/latitude. Used only for the rendering projection.
    pub const WGS84: Self = Self { epsg: 4326 };

    /// NAD83 longitude/latitude (the native CRS of TIGER/Line files).
    pub const NAD83: Self = Self { epsg: 4269 };

    /// NAD83 / Texas Centric Albers Equal Area.
    pub const TEXAS_CENTRIC_ALBERS: Self = Self { epsg: 3083 };

    /// NAD83 / Conus Albers.
    pub const CONUS_ALBERS: Self = Self { epsg: 5070 };

    /// Creates a CRS from a raw EPSG code.
    #[must_use]
    pub const fn from_epsg(epsg: u32) -> Self {
        Self { epsg }
    }

    /// Returns the EPSG code.
    #[must_use]
    pub const fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Parses the CRS spellings found in `GeoJSON` `crs` members and config
    /// files: `EPSG:3083`, `urn:ogc:def:crs:EPSG::3083`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84` and a bare `3083`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84")
            || name.eq_ignore_ascii_case("CRS84")
        {
            return Some(Self::WGS84);
        }

        let upper = name.to_ascii_uppercase();
        let code = upper
            .strip_prefix("URN:OGC:DEF:CRS:EPSG:")
            .map(|rest| rest.trim_start_matches(':'))
            .map(|rest| rest.rsplit(':').next().unwrap_or(rest))
            .or_else(|| upper.strip_prefix("EPSG:"))
            .unwrap_or(&upper);

        code.trim().parse::<u32>().ok().map(Self::from_epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl TryFrom<String> for Crs {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unrecognized CRS '{value}'"))
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// A public water system's coverage polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArea {
    /// Registry identifier (e.g. "TX0310001").
    pub id: String,
    /// System name as carried by the layer.
    pub name: String,
    /// Coverage geometry in the working CRS.
    pub geometry: MultiPolygon<f64>,
}

/// A designated community boundary used for membership reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityPolygon {
    /// Community name. Not unique: a community may be split across
    /// several features.
    pub name: String,
    /// Boundary geometry in the working CRS.
    pub geometry: MultiPolygon<f64>,
}

/// A census tract polygon with its area measured before any overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusTract {
    /// 11-digit GEOID (state FIPS + county FIPS + tract code).
    pub geoid: String,
    /// Tract geometry in the working CRS.
    pub geometry: MultiPolygon<f64>,
    /// Area of the whole tract in square working-CRS units. Always > 0.
    pub original_area: f64,
}

impl CensusTract {
    /// Two-digit state FIPS prefix of the GEOID.
    #[must_use]
    pub fn state_fips(&self) -> Option<&str> {
        self.geoid.get(..2)
    }

    /// Three-digit county FIPS segment of the GEOID.
    #[must_use]
    pub fn county_fips(&self) -> Option<&str> {
        self.geoid.get(2..5)
    }

    /// Six-digit tract code segment of the GEOID.
    #[must_use]
    pub fn tract_code(&self) -> Option<&str> {
        self.geoid.get(5..11)
    }
}

/// Communities whose boundaries intersect one service area.
///
/// Names are kept in join order and are not deduplicated: a community
/// stored as several intersecting features appears once per feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    /// Service area identifier.
    pub service_area_id: String,
    /// Intersecting community names.
    pub community_names: Vec<String>,
}

/// The share of one tract's area that falls inside one service area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapRecord {
    /// Tract GEOID.
    pub geoid: String,
    /// Service area identifier.
    pub service_area_id: String,
    /// `intersection_area / tract_original_area`. Not clamped, so geometry
    /// noise can push it slightly above 1.
    pub overlap_fraction: f64,
}

/// A `(GEOID, fraction)` pair used as an aggregation weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TractWeight {
    /// Tract GEOID.
    pub geoid: String,
    /// Overlap fraction for this tract within the service area.
    pub fraction: f64,
}

impl From<&OverlapRecord> for TractWeight {
    fn from(record: &OverlapRecord) -> Self {
        Self {
            geoid: record.geoid.clone(),
            fraction: record.overlap_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_epsg_form() {
        assert_eq!(Crs::parse("EPSG:3083"), Some(Crs::TEXAS_CENTRIC_ALBERS));
        assert_eq!(Crs::parse("epsg:4269"), Some(Crs::NAD83));
    }

    #[test]
    fn parses_ogc_urn_forms() {
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::5070"),
            Some(Crs::CONUS_ALBERS)
        );
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG:6.6:4326"),
            Some(Crs::WGS84)
        );
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84"),
            Some(Crs::WGS84)
        );
    }

    #[test]
    fn parses_bare_code_and_rejects_garbage() {
        assert_eq!(Crs::parse(" 3083 "), Some(Crs::TEXAS_CENTRIC_ALBERS));
        assert_eq!(Crs::parse("not a crs"), None);
    }

    #[test]
    fn crs_round_trips_through_serde_as_string() {
        let json = serde_json::to_string(&Crs::CONUS_ALBERS).unwrap();
        assert_eq!(json, "\"EPSG:5070\"");
        let back: Crs = serde_json::from_str("\"urn:ogc:def:crs:EPSG::3083\"").unwrap();
        assert_eq!(back, Crs::TEXAS_CENTRIC_ALBERS);
    }

    #[test]
    fn splits_geoid_segments() {
        let tract = CensusTract {
            geoid: "48061012301".to_string(),
            geometry: MultiPolygon(vec![]),
            original_area: 1.0,
        };
        assert_eq!(tract.state_fips(), Some("48"));
        assert_eq!(tract.county_fips(), Some("061"));
        assert_eq!(tract.tract_code(), Some("012301"));
    }
}
