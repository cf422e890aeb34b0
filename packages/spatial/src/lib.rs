#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Polygon-on-polygon overlay for service areas.
//!
//! Two engines share one R-tree candidate search:
//!
//! - [`membership`] joins community boundaries onto service areas
//!   (intersects, boundary contact included).
//! - [`overlap`] intersects census tracts with service areas and reports
//!   the share of each tract's area inside each service area.
//!
//! All inputs must already be in the same area-accurate CRS.

pub mod membership;
pub mod overlap;

use geo::{BoundingRect, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

pub use membership::MembershipIndex;
pub use overlap::OverlapIndex;

/// A polygon's bounding box, pointing back at its position in the source
/// slice.
struct EnvelopeEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for EnvelopeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Bulk-loads an R-tree over the bounding boxes of `geometries`.
///
/// Geometries without a bounding box (empty multipolygons) are left out.
fn build_envelope_tree<'a>(
    geometries: impl Iterator<Item = &'a MultiPolygon<f64>>,
) -> RTree<EnvelopeEntry> {
    let entries = geometries
        .enumerate()
        .filter_map(|(index, geometry)| {
            compute_envelope(geometry).map(|envelope| EnvelopeEntry { index, envelope })
        })
        .collect();

    RTree::bulk_load(entries)
}

/// Indices of entries whose boxes intersect `geometry`'s box, ascending so
/// callers keep source-layer order.
fn candidates(tree: &RTree<EnvelopeEntry>, geometry: &MultiPolygon<f64>) -> Vec<usize> {
    let Some(envelope) = compute_envelope(geometry) else {
        return Vec::new();
    };

    let mut indices: Vec<usize> = tree
        .locate_in_envelope_intersecting(&envelope)
        .map(|entry| entry.index)
        .collect();
    indices.sort_unstable();
    indices
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use geo::{MultiPolygon, Rect, coord};

    /// An axis-aligned square as a one-part multipolygon.
    pub fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        rect(x, y, size, size)
    }

    /// An axis-aligned rectangle as a one-part multipolygon.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![
            Rect::new(coord! { x: x, y: y }, coord! { x: x + width, y: y + height })
                .to_polygon(),
        ])
    }
}
