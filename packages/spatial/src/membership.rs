//! Community-to-service-area membership.

use std::collections::BTreeMap;

use geo::Intersects;
use pws_dossier_geometry_models::{CommunityPolygon, MembershipRecord, ServiceArea};

use crate::{build_envelope_tree, candidates};

/// Joins every community onto every service area it intersects.
///
/// Pairs are produced community by community (layer order), and within a
/// community in service-area layer order. The result is grouped by service
/// area; names keep join order and are not deduplicated, so a community
/// split across several features is listed once per intersecting feature.
/// Service areas with no intersecting community get no record.
#[must_use]
pub fn compute_membership(
    communities: &[CommunityPolygon],
    service_areas: &[ServiceArea],
) -> Vec<MembershipRecord> {
    let tree = build_envelope_tree(service_areas.iter().map(|area| &area.geometry));
    let mut names_by_area: BTreeMap<usize, Vec<String>> = BTreeMap::new();

    for community in communities {
        for index in candidates(&tree, &community.geometry) {
            if community.geometry.intersects(&service_areas[index].geometry) {
                names_by_area
                    .entry(index)
                    .or_default()
                    .push(community.name.clone());
            }
        }
    }

    names_by_area
        .into_iter()
        .map(|(index, community_names)| MembershipRecord {
            service_area_id: service_areas[index].id.clone(),
            community_names,
        })
        .collect()
}

/// Membership records keyed by service area id.
#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    records: BTreeMap<String, MembershipRecord>,
}

impl MembershipIndex {
    /// Computes membership for every service area.
    #[must_use]
    pub fn build(communities: &[CommunityPolygon], service_areas: &[ServiceArea]) -> Self {
        let records: BTreeMap<String, MembershipRecord> =
            compute_membership(communities, service_areas)
                .into_iter()
                .map(|record| (record.service_area_id.clone(), record))
                .collect();

        log::info!(
            "Community membership: {} of {} service areas serve at least one community",
            records.len(),
            service_areas.len()
        );

        Self { records }
    }

    /// Community names for one service area. Empty when it serves none.
    #[must_use]
    pub fn communities_for(&self, service_area_id: &str) -> &[String] {
        self.records
            .get(service_area_id)
            .map_or(&[], |record| record.community_names.as_slice())
    }

    /// The full record for one service area, if any community intersects it.
    #[must_use]
    pub fn record(&self, service_area_id: &str) -> Option<&MembershipRecord> {
        self.records.get(service_area_id)
    }

    /// Number of service areas with at least one community.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no service area serves any community.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
