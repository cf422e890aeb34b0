//! Coordinate reference systems and the projections behind them.
//!
//! Only the handful of CRSs that service-area, community and TIGER/Line
//! layers actually ship in are supported, implemented in pure Rust:
//!
//! - geographic longitude/latitude (EPSG:4326, EPSG:4269). NAD83 and WGS 84
//!   differ by about a meter, well below tract-boundary precision, so they
//!   are treated as the same datum.
//! - Albers Equal Area Conic on the GRS 80 ellipsoid (EPSG:3083 Texas
//!   Centric, EPSG:5070 CONUS). Equal-area, so planar areas measured in it
//!   are true ground areas.
//!
//! Formulas follow Snyder, *Map Projections: A Working Manual* (1987),
//! equations 3-12, 3-16 and 14-1 through 14-21.

use geo::{Coord, MapCoords, MultiPolygon};
use pws_dossier_geometry_models::Crs;

use crate::GeometryError;

/// GRS 80 semi-major axis in meters.
const GRS80_A: f64 = 6_378_137.0;

/// GRS 80 flattening.
const GRS80_F: f64 = 1.0 / 298.257_222_101;

/// Convergence threshold (radians) for the inverse latitude iteration.
const INVERSE_TOLERANCE: f64 = 1e-12;

/// Iteration cap for the inverse latitude iteration.
const INVERSE_MAX_ITERATIONS: usize = 25;

/// Defining parameters of an Albers Equal Area Conic projection, in
/// degrees and meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbersParams {
    /// Latitude of origin.
    pub lat_origin: f64,
    /// Central meridian.
    pub lon_origin: f64,
    /// First standard parallel.
    pub lat_1: f64,
    /// Second standard parallel.
    pub lat_2: f64,
    /// False easting.
    pub false_easting: f64,
    /// False northing.
    pub false_northing: f64,
}

impl AlbersParams {
    /// EPSG:3083 NAD83 / Texas Centric Albers Equal Area.
    pub const TEXAS_CENTRIC: Self = Self {
        lat_origin: 18.0,
        lon_origin: -100.0,
        lat_1: 27.5,
        lat_2: 35.0,
        false_easting: 1_500_000.0,
        false_northing: 6_000_000.0,
    };

    /// EPSG:5070 NAD83 / Conus Albers.
    pub const CONUS: Self = Self {
        lat_origin: 23.0,
        lon_origin: -96.0,
        lat_1: 29.5,
        lat_2: 45.5,
        false_easting: 0.0,
        false_northing: 0.0,
    };
}

/// Precomputed Albers constants for one parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Albers {
    e: f64,
    e2: f64,
    n: f64,
    c: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Albers {
    /// Derives the projection constants from the defining parameters.
    #[must_use]
    pub fn new(params: AlbersParams) -> Self {
        let e2 = GRS80_F * (2.0 - GRS80_F);
        let e = e2.sqrt();

        let phi0 = params.lat_origin.to_radians();
        let phi1 = params.lat_1.to_radians();
        let phi2 = params.lat_2.to_radians();

        let m1 = m(phi1, e2);
        let m2 = m(phi2, e2);
        let q0 = q(phi0, e, e2);
        let q1 = q(phi1, e, e2);
        let q2 = q(phi2, e, e2);

        let n = if (params.lat_1 - params.lat_2).abs() < f64::EPSILON {
            phi1.sin()
        } else {
            m1.mul_add(m1, -(m2 * m2)) / (q2 - q1)
        };
        let c = n.mul_add(q1, m1 * m1);
        let rho0 = GRS80_A * n.mul_add(-q0, c).sqrt() / n;

        Self {
            e,
            e2,
            n,
            c,
            rho0,
            lon0: params.lon_origin.to_radians(),
            false_easting: params.false_easting,
            false_northing: params.false_northing,
        }
    }

    /// Projects geographic degrees to easting/northing meters.
    #[must_use]
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let q = q(phi, self.e, self.e2);
        let rho = GRS80_A * self.n.mul_add(-q, self.c).max(0.0).sqrt() / self.n;
        let theta = self.n * (lon.to_radians() - self.lon0);

        let x = rho.mul_add(theta.sin(), self.false_easting);
        let y = rho.mul_add(-theta.cos(), self.false_northing + self.rho0);
        (x, y)
    }

    /// Unprojects easting/northing meters back to geographic degrees.
    #[must_use]
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        let (rho, theta) = if self.n < 0.0 {
            (-dx.hypot(dy), (-dx).atan2(-dy))
        } else {
            (dx.hypot(dy), dx.atan2(dy))
        };

        let q = (rho * rho * self.n * self.n / (GRS80_A * GRS80_A)).mul_add(-1.0, self.c) / self.n;
        let lat = self.latitude_from_q(q);
        let lon = self.lon0 + theta / self.n;

        (lon.to_degrees(), lat.to_degrees())
    }

    fn latitude_from_q(&self, q: f64) -> f64 {
        let mut phi = (q / 2.0).clamp(-1.0, 1.0).asin();

        for _ in 0..INVERSE_MAX_ITERATIONS {
            let sin_phi = phi.sin();
            let esin = self.e * sin_phi;
            let one_minus = esin.mul_add(-esin, 1.0);

            let delta = one_minus * one_minus / (2.0 * phi.cos())
                * ((q / (1.0 - self.e2)) - sin_phi / one_minus
                    + ((1.0 - esin) / (1.0 + esin)).ln() / (2.0 * self.e));

            phi += delta;
            if delta.abs() < INVERSE_TOLERANCE {
                break;
            }
        }

        phi
    }
}

/// Snyder eq. 14-15.
fn m(phi: f64, e2: f64) -> f64 {
    let sin_phi = phi.sin();
    phi.cos() / (e2 * sin_phi).mul_add(-sin_phi, 1.0).sqrt()
}

/// Snyder eq. 3-12.
fn q(phi: f64, e: f64, e2: f64) -> f64 {
    let sin_phi = phi.sin();
    let esin = e * sin_phi;
    (1.0 - e2) * (sin_phi / esin.mul_add(-esin, 1.0) - ((1.0 - esin) / (1.0 + esin)).ln() / (2.0 * e))
}

/// How coordinates of a CRS relate to longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Coordinates already are longitude/latitude degrees.
    Geographic,
    /// Albers Equal Area Conic meters.
    AlbersEqualArea(Albers),
}

impl Projection {
    /// Resolves the projection for a supported CRS.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnsupportedCrs`] for any CRS outside the
    /// supported set.
    pub fn for_crs(crs: Crs, layer: &str) -> Result<Self, GeometryError> {
        match crs.epsg() {
            4326 | 4269 => Ok(Self::Geographic),
            3083 => Ok(Self::AlbersEqualArea(Albers::new(AlbersParams::TEXAS_CENTRIC))),
            5070 => Ok(Self::AlbersEqualArea(Albers::new(AlbersParams::CONUS))),
            _ => Err(GeometryError::UnsupportedCrs {
                layer: layer.to_string(),
                crs,
            }),
        }
    }

    /// Whether coordinates are in degrees (and therefore unusable for
    /// area measurement).
    #[must_use]
    pub const fn is_geographic(&self) -> bool {
        matches!(self, Self::Geographic)
    }

    fn to_lon_lat(&self, coord: Coord<f64>) -> (f64, f64) {
        match self {
            Self::Geographic => (coord.x, coord.y),
            Self::AlbersEqualArea(albers) => albers.inverse(coord.x, coord.y),
        }
    }

    fn from_lon_lat(&self, lon: f64, lat: f64) -> Coord<f64> {
        match self {
            Self::Geographic => Coord { x: lon, y: lat },
            Self::AlbersEqualArea(albers) => {
                let (x, y) = albers.forward(lon, lat);
                Coord { x, y }
            }
        }
    }
}

/// Converts coordinates between two supported CRSs via longitude/latitude.
#[derive(Debug, Clone, Copy)]
pub struct Reprojector {
    from: Projection,
    to: Projection,
}

impl Reprojector {
    /// Builds a reprojector between two CRSs.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnsupportedCrs`] if either CRS is not
    /// supported.
    pub fn new(from: Crs, to: Crs, layer: &str) -> Result<Self, GeometryError> {
        Ok(Self {
            from: Projection::for_crs(from, layer)?,
            to: Projection::for_crs(to, layer)?,
        })
    }

    /// Transforms a single coordinate.
    #[must_use]
    pub fn transform(&self, coord: Coord<f64>) -> Coord<f64> {
        if self.from == self.to {
            return coord;
        }
        let (lon, lat) = self.from.to_lon_lat(coord);
        self.to.from_lon_lat(lon, lat)
    }

    /// Transforms every vertex of a multipolygon.
    #[must_use]
    pub fn transform_multi_polygon(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|coord| self.transform(coord))
    }
}
