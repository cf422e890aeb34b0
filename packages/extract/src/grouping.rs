use pws_dossier_extract_models::{
    FacilityGroup, FacilityRecord, FacilitySummary, OTHER_FACILITY_TYPE,
};

/// Partitions facilities by type, groups in first-appearance order. An
/// empty type is grouped under "Other".
#[must_use]
pub fn group_facilities(facilities: &[FacilityRecord]) -> Vec<FacilityGroup> {
    let mut groups: Vec<FacilityGroup> = Vec::new();

    for facility in facilities {
        let facility_type = if facility.facility_type.is_empty() {
            OTHER_FACILITY_TYPE
        } else {
            facility.facility_type.as_str()
        };
        let summary = FacilitySummary {
            facility_id: facility.facility_id.clone(),
            facility_status: facility.facility_status.clone(),
        };

        match groups.iter_mut().find(|g| g.facility_type == facility_type) {
            Some(group) => {
                group.count += 1;
                group.facilities.push(summary);
            }
            None => groups.push(FacilityGroup {
                facility_type: facility_type.to_string(),
                count: 1,
                facilities: vec![summary],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use pws_dossier_extract_models::FacilityFlows;

    use super::*;

    fn facility(id: &str, facility_type: &str) -> FacilityRecord {
        FacilityRecord {
            facility_id: id.to_string(),
            facility_type: facility_type.to_string(),
            facility_status: "Active".to_string(),
            flows: FacilityFlows::default(),
        }
    }

    #[test]
    fn groups_in_first_appearance_order() {
        let groups = group_facilities(&[
            facility("W1", "Well"),
            facility("T1", "Treatment Plant"),
            facility("W2", "Well"),
            facility("X1", ""),
        ]);

        let summary: Vec<(&str, usize)> = groups
            .iter()
            .map(|g| (g.facility_type.as_str(), g.count))
            .collect();
        assert_eq!(
            summary,
            vec![("Well", 2), ("Treatment Plant", 1), ("Other", 1)]
        );
        assert_eq!(groups[0].facilities[1].facility_id, "W2");
    }

    #[test]
    fn no_facilities_no_groups() {
        assert!(group_facilities(&[]).is_empty());
    }
}
