//! Tract-to-service-area overlap weights.

use std::collections::BTreeMap;

use geo::{Area, BooleanOps, Intersects};
use pws_dossier_geometry_models::{CensusTract, OverlapRecord, ServiceArea, TractWeight};

use crate::{build_envelope_tree, candidates};

/// Intersects every tract with every service area.
///
/// One record per pair whose intersection has positive area; pure boundary
/// contact yields nothing. `overlap_fraction` is the intersection area over
/// the tract's original area and is never clamped, so geometry noise may
/// push it slightly above 1. Records come out service area by service area
/// (layer order), tracts in layer order within each.
#[must_use]
pub fn compute_overlap(tracts: &[CensusTract], service_areas: &[ServiceArea]) -> Vec<OverlapRecord> {
    let tree = build_envelope_tree(tracts.iter().map(|tract| &tract.geometry));
    let mut records = Vec::new();

    for area in service_areas {
        for index in candidates(&tree, &area.geometry) {
            let tract = &tracts[index];
            if !tract.geometry.intersects(&area.geometry) {
                continue;
            }

            let overlap_area = tract.geometry.intersection(&area.geometry).unsigned_area();
            if overlap_area <= 0.0 {
                continue;
            }

            records.push(OverlapRecord {
                geoid: tract.geoid.clone(),
                service_area_id: area.id.clone(),
                overlap_fraction: overlap_area / tract.original_area,
            });
        }
    }

    records
}

/// Overlap weights grouped by service area id.
#[derive(Debug, Clone, Default)]
pub struct OverlapIndex {
    weights: BTreeMap<String, Vec<TractWeight>>,
    pair_count: usize,
}

impl OverlapIndex {
    /// Computes overlap weights for every service area.
    #[must_use]
    pub fn build(tracts: &[CensusTract], service_areas: &[ServiceArea]) -> Self {
        Self::from_records(&compute_overlap(tracts, service_areas))
    }

    /// Groups precomputed records, keeping their order within each group.
    #[must_use]
    pub fn from_records(records: &[OverlapRecord]) -> Self {
        let mut weights: BTreeMap<String, Vec<TractWeight>> = BTreeMap::new();
        for record in records {
            weights
                .entry(record.service_area_id.clone())
                .or_default()
                .push(TractWeight::from(record));
        }

        log::info!(
            "Tract overlap: {} intersecting pairs across {} service areas",
            records.len(),
            weights.len()
        );

        Self {
            weights,
            pair_count: records.len(),
        }
    }

    /// `(GEOID, fraction)` pairs for one service area. Empty when no tract
    /// overlaps it.
    #[must_use]
    pub fn weights_for(&self, service_area_id: &str) -> &[TractWeight] {
        self.weights
            .get(service_area_id)
            .map_or(&[], Vec::as_slice)
    }

    /// Total number of intersecting (tract, service area) pairs.
    #[must_use]
    pub const fn pair_count(&self) -> usize {
        self.pair_count
    }
}
