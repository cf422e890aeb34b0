#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Records extracted from a water system's public regulatory pages.
//!
//! Everything here is request-scoped: extraction runs fresh for every
//! dossier and nothing is persisted.

use serde::{Deserialize, Serialize};

/// Value recorded for a flow or capacity figure that could not be read.
pub const NOT_AVAILABLE: &str = "Not Available";

/// Facility type used when a facility row carries no type.
pub const OTHER_FACILITY_TYPE: &str = "Other";

/// Which of the two source documents a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    /// The water system fact sheet.
    FactSheet,
    /// The flow rates and measures page.
    Flow,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FactSheet => "fact sheet",
            Self::Flow => "flow document",
        })
    }
}

/// The record groups extraction is organized into. A failure in one group
/// never affects another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordGroup {
    EntityInfo,
    ContactInfo,
    ServiceConnection,
    FacilityFlows,
    Facilities,
    GroupViolations,
    IndividualViolations,
}

/// Labeled facts about one water system. Each field is independently
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub service_area_id: String,
    pub pwsid: Option<String>,
    pub system_name: Option<String>,
    pub system_type: Option<String>,
    pub owner_type: Option<String>,
    pub county: Option<String>,
    pub population_served: Option<String>,
    pub contact_info: Option<String>,
    pub phone: Option<String>,
    pub connection_type: Option<String>,
    pub connection_count: Option<String>,
    pub meter_type: Option<String>,
    pub meter_size: Option<String>,
}

/// Flow and capacity figures. They describe the whole system, so every
/// facility of one service area carries the same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityFlows {
    pub production_mgd: String,
    pub storage_capacity: String,
    pub avg_daily_demand: String,
    pub max_daily_demand: String,
}

impl Default for FacilityFlows {
    fn default() -> Self {
        Self {
            production_mgd: NOT_AVAILABLE.to_string(),
            storage_capacity: NOT_AVAILABLE.to_string(),
            avg_daily_demand: NOT_AVAILABLE.to_string(),
            max_daily_demand: NOT_AVAILABLE.to_string(),
        }
    }
}

/// One row of the facilities table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityRecord {
    pub facility_id: String,
    pub facility_type: String,
    /// Empty when the row has no status segment.
    pub facility_status: String,
    #[serde(flatten)]
    pub flows: FacilityFlows,
}

/// One violation row. Missing columns are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub violation_number: String,
    pub date: String,
    pub violation_description: String,
    pub contaminant: String,
}

/// A facility reduced to what a grouped listing shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitySummary {
    pub facility_id: String,
    pub facility_status: String,
}

/// Facilities sharing one type, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityGroup {
    pub facility_type: String,
    pub count: usize,
    pub facilities: Vec<FacilitySummary>,
}

/// The fact-sheet and flow-document URLs for one water system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLinks {
    /// Name shown in the search results, if any.
    pub system_name: Option<String>,
    pub fact_sheet_url: Option<String>,
    pub flow_url: Option<String>,
}

/// A registry search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    #[serde(alias = "PWSId")]
    pub pwsid: String,
    #[serde(default)]
    pub pwsname: Option<String>,
    #[serde(default, alias = "countyserved")]
    pub county_served: Option<String>,
    #[serde(default, alias = "primacyagency")]
    pub primacy_agency: Option<String>,
}

/// Outcome of one extraction step: the located value, or the declared
/// default and the reason it was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<T> {
    Found(T),
    Defaulted { value: T, reason: String },
}

impl<T> Extracted<T> {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Found(value) | Self::Defaulted { value, .. } => value,
        }
    }

    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Found(value) | Self::Defaulted { value, .. } => value,
        }
    }

    /// The reason the default was used, if it was.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Found(_) => None,
            Self::Defaulted { reason, .. } => Some(reason),
        }
    }
}

/// One field or table that fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFailure {
    pub group: RecordGroup,
    pub field: String,
    pub reason: String,
}

/// Which fields were found and which defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub found: usize,
    pub failures: Vec<FieldFailure>,
}

impl ExtractionReport {
    /// Records an outcome, returning its value.
    pub fn record<T>(&mut self, group: RecordGroup, field: &str, outcome: Extracted<T>) -> T {
        match outcome {
            Extracted::Found(value) => {
                self.found += 1;
                value
            }
            Extracted::Defaulted { value, reason } => {
                self.failures.push(FieldFailure {
                    group,
                    field: field.to_string(),
                    reason,
                });
                value
            }
        }
    }

    /// Whether `field` fell back to its default.
    #[must_use]
    pub fn failed(&self, field: &str) -> bool {
        self.failures.iter().any(|failure| failure.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facility_flattens_shared_flows() {
        let record = FacilityRecord {
            facility_id: "G0010001A".to_string(),
            facility_type: "Well".to_string(),
            facility_status: "Active".to_string(),
            flows: FacilityFlows::default(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["facilityId"], "G0010001A");
        assert_eq!(json["productionMgd"], NOT_AVAILABLE);
        assert!(json.get("flows").is_none());
    }

    #[test]
    fn registry_record_reads_efservice_names() {
        let json = r#"{"pwsid":"TX2400001","pwsname":"CITY OF LAREDO","countyserved":"WEBB","statecode":"TX"}"#;

        let record: RegistryRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.pwsid, "TX2400001");
        assert_eq!(record.pwsname.as_deref(), Some("CITY OF LAREDO"));
        assert_eq!(record.county_served.as_deref(), Some("WEBB"));
    }

    #[test]
    fn report_counts_found_and_failed_fields() {
        let mut report = ExtractionReport::default();

        let name = report.record(
            RecordGroup::EntityInfo,
            "systemName",
            Extracted::Found(Some("LAREDO".to_string())),
        );
        let phone: Option<String> = report.record(
            RecordGroup::ContactInfo,
            "phone",
            Extracted::Defaulted {
                value: None,
                reason: "no BUS row".to_string(),
            },
        );

        assert_eq!(name.as_deref(), Some("LAREDO"));
        assert!(phone.is_none());
        assert_eq!(report.found, 1);
        assert!(report.failed("phone"));
        assert!(!report.failed("systemName"));
    }
}
