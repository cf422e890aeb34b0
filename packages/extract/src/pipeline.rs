//! Turns the two Drinking Water Watch documents into normalized records.

use pws_dossier_extract_models::{
    DocumentKind, EntityRecord, ExtractionReport, FacilityFlows, FacilityGroup, FacilityRecord,
    ViolationRecord,
};
use scraper::Html;
use serde::Serialize;

use crate::descriptors::{self, FieldDescriptor};
use crate::grouping::group_facilities;

/// Separator between facility type and status in the facilities table.
const TYPE_STATUS_SEPARATOR: char = '\u{2013}';

/// Everything extracted for one water system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecords {
    pub entity: EntityRecord,
    pub flows: FacilityFlows,
    pub facilities: Vec<FacilityRecord>,
    pub facility_groups: Vec<FacilityGroup>,
    pub group_violations: Vec<ViolationRecord>,
    pub individual_violations: Vec<ViolationRecord>,
    pub report: ExtractionReport,
}

/// Extracts every record group from the fact sheet and flow document.
///
/// Either document may be `None` when it could not be fetched; every
/// field reading it then takes its default. Nothing here fails: each
/// field and table is isolated and failures land in the report.
#[must_use]
pub fn extract_documents(
    service_area_id: &str,
    fact_sheet: Option<&str>,
    flow: Option<&str>,
) -> ExtractedRecords {
    let fact_sheet = fact_sheet.map(Html::parse_document);
    let flow = flow.map(Html::parse_document);
    let mut report = ExtractionReport::default();

    let mut field = |descriptor: &FieldDescriptor| {
        let document = match descriptor.document {
            DocumentKind::FactSheet => fact_sheet.as_ref(),
            DocumentKind::Flow => flow.as_ref(),
        };
        report.record(
            descriptor.group,
            descriptor.field,
            descriptor.extract(document),
        )
    };

    let entity = EntityRecord {
        service_area_id: service_area_id.to_string(),
        pwsid: field(&descriptors::PWSID),
        system_name: field(&descriptors::SYSTEM_NAME),
        system_type: field(&descriptors::SYSTEM_TYPE),
        owner_type: field(&descriptors::OWNER_TYPE),
        county: field(&descriptors::COUNTY),
        population_served: field(&descriptors::POPULATION_SERVED),
        contact_info: field(&descriptors::CONTACT_INFO),
        phone: field(&descriptors::PHONE),
        connection_type: field(&descriptors::CONNECTION_TYPE),
        connection_count: field(&descriptors::CONNECTION_COUNT),
        meter_type: field(&descriptors::METER_TYPE),
        meter_size: field(&descriptors::METER_SIZE),
    };

    let defaults = FacilityFlows::default();
    let flows = FacilityFlows {
        production_mgd: field(&descriptors::PRODUCTION_MGD).unwrap_or(defaults.production_mgd),
        storage_capacity: field(&descriptors::STORAGE_CAPACITY)
            .unwrap_or(defaults.storage_capacity),
        avg_daily_demand: field(&descriptors::AVG_DAILY_DEMAND)
            .unwrap_or(defaults.avg_daily_demand),
        max_daily_demand: field(&descriptors::MAX_DAILY_DEMAND)
            .unwrap_or(defaults.max_daily_demand),
    };

    let fact_sheet = fact_sheet.as_ref();
    let facilities = report.record(
        descriptors::FACILITIES.group,
        descriptors::FACILITIES.field,
        descriptors::FACILITIES.extract(fact_sheet, |cells| facility_row(cells, &flows)),
    );
    let group_violations = report.record(
        descriptors::GROUP_VIOLATIONS.group,
        descriptors::GROUP_VIOLATIONS.field,
        descriptors::GROUP_VIOLATIONS.extract(fact_sheet, group_violation_row),
    );
    let individual_violations = report.record(
        descriptors::INDIVIDUAL_VIOLATIONS.group,
        descriptors::INDIVIDUAL_VIOLATIONS.field,
        descriptors::INDIVIDUAL_VIOLATIONS
            .extract(fact_sheet, |cells| Some(individual_violation_row(cells))),
    );

    let facility_groups = group_facilities(&facilities);

    log::info!(
        "Extracted {service_area_id}: {} fields found, {} defaulted, {} facilities, {} violations",
        report.found,
        report.failures.len(),
        facilities.len(),
        group_violations.len() + individual_violations.len()
    );

    ExtractedRecords {
        entity,
        flows,
        facilities,
        facility_groups,
        group_violations,
        individual_violations,
        report,
    }
}

/// Facility id, then type and status split on the en dash. Rows with
/// fewer than three cells are not facilities.
fn facility_row(cells: &[String], flows: &FacilityFlows) -> Option<FacilityRecord> {
    if cells.len() < 3 {
        return None;
    }

    let mut parts = cells[2].split(TYPE_STATUS_SEPARATOR);
    let facility_type = parts.next().unwrap_or_default().trim().to_string();
    let facility_status = parts.next().unwrap_or_default().trim().to_string();

    Some(FacilityRecord {
        facility_id: cells[0].clone(),
        facility_type,
        facility_status,
        flows: flows.clone(),
    })
}

fn cell(cells: &[String], index: usize) -> String {
    cells.get(index).cloned().unwrap_or_default()
}

/// Columns 1, 2, 4 and 6; missing columns are empty.
fn individual_violation_row(cells: &[String]) -> ViolationRecord {
    ViolationRecord {
        violation_number: cell(cells, 0),
        date: cell(cells, 1),
        violation_description: cell(cells, 3),
        contaminant: cell(cells, 5),
    }
}

/// Like an individual violation, but rows with fewer than two cells are
/// skipped rather than padded.
fn group_violation_row(cells: &[String]) -> Option<ViolationRecord> {
    (cells.len() >= 2).then(|| individual_violation_row(cells))
}

#[cfg(test)]
mod tests {
    use pws_dossier_extract_models::NOT_AVAILABLE;

    use super::*;

    const FACT_SHEET: &str = r#"
    <html><body>
    <table>
      <tr><td><font>Water System No.:</font></td><td>TX2400001</td></tr>
      <tr><td><font>System Name:</font></td><td>CITY OF LAREDO</td></tr>
      <tr><td><font>Federal Type:</font></td><td>C</td></tr>
      <tr><td><font>Federal Source:</font></td><td>SW</td></tr>
      <tr><td><font>Principal County Served:</font></td><td>WEBB</td></tr>
    </table>

    <table>
      <tr><th>Water System Contacts</th></tr>
      <tr><td>Type</td><td>Contact</td><td>Phone</td></tr>
      <tr>
        <td>Administrative Contact</td>
        <td>JANE&nbsp;DOE 1110 HOUSTON ST</td>
        <td><table>
          <tr><td>FAX</td><td>956-555-0100</td></tr>
          <tr><td>BUS</td><td>956-555-0199</td></tr>
        </table></td>
      </tr>
    </table>

    <table>
      <tr><th>Annual Operating Period</th></tr>
      <tr><td>Start</td><td>End</td><td>Type</td><td>Code</td><td>Desc</td><td>Population</td></tr>
      <tr><td>1/1</td><td>12/31</td><td>R</td><td>C</td><td>Residential</td><td>255,000</td></tr>
    </table>

    <table>
      <tr><th>Service Connection</th></tr>
      <tr><td>Type</td><td>Count</td><td>Meter Type</td><td>Meter Size</td></tr>
      <tr><td>RS</td><td>72,000</td><td>MT</td><td>&nbsp;0.625</td></tr>
    </table>

    <table>
      <tr><th>Water System Facilities</th></tr>
      <tr><td>Facility</td><td>Name</td><td>Type – Status</td></tr>
      <tr><td>TP001</td><td>JEFFERSON PLANT</td><td>Treatment Plant – Active</td></tr>
      <tr><td>WL002</td><td>WELL 2</td><td>Well – Inactive</td></tr>
      <tr><td>ST003</td><td>TANK</td><td>Storage</td></tr>
      <tr><td>short</td></tr>
    </table>

    <table>
      <tr><th>Individual Violations</th></tr>
      <tr><td>No.</td><td>Date</td><td>Type</td><td>Violation</td><td>Rule</td><td>Contaminant</td></tr>
      <tr><td>2021-1</td><td>03/31/2021</td><td>MR</td><td>Monitoring, Routine</td><td>TCR</td><td>Coliform</td></tr>
      <tr><td>2021-2</td></tr>
    </table>

    <table>
      <tr><th>Group Violations</th></tr>
      <tr><td>No.</td><td>Date</td></tr>
      <tr><td>G-1</td><td>01/01/2020</td><td>PN</td><td>Public Notice</td></tr>
      <tr><td>lonely</td></tr>
    </table>
    </body></html>
    "#;

    const FLOW: &str = r"
    <html><body>
    <table>
      <tr><th>WS Flow Rates</th></tr>
      <tr><td>Type</td><td>Value</td></tr>
      <tr><td>Provided Production Capacity</td><td>120.5 MGD</td></tr>
      <tr><td>Max Daily Demand</td><td>70.1 MGD</td></tr>
      <tr><td>Average Daily Usage</td><td>45.2 MGD</td></tr>
    </table>
    <table>
      <tr><th>WS Measures</th></tr>
      <tr><td>Type</td><td>Value</td><td>Unit</td></tr>
      <tr><td>Total Storage Capacity</td><td>60</td><td>MG</td></tr>
    </table>
    </body></html>
    ";

    #[test]
    fn extracts_every_group() {
        let records = extract_documents("TX2400001", Some(FACT_SHEET), Some(FLOW));
        let entity = &records.entity;

        assert_eq!(entity.pwsid.as_deref(), Some("TX2400001"));
        assert_eq!(entity.system_name.as_deref(), Some("CITY OF LAREDO"));
        assert_eq!(entity.county.as_deref(), Some("WEBB"));
        assert_eq!(entity.population_served.as_deref(), Some("255,000"));
        assert_eq!(entity.contact_info.as_deref(), Some("JANE DOE 1110 HOUSTON ST"));
        assert_eq!(entity.phone.as_deref(), Some("956-555-0199"));
        assert_eq!(entity.connection_count.as_deref(), Some("72,000"));
        assert_eq!(entity.meter_size.as_deref(), Some("0.625"));

        assert_eq!(records.flows.production_mgd, "120.5 MGD");
        assert_eq!(records.flows.max_daily_demand, "70.1 MGD");
        assert_eq!(records.flows.avg_daily_demand, "45.2 MGD");
        assert_eq!(records.flows.storage_capacity, "60 MG");

        assert!(records.report.failures.is_empty(), "{:?}", records.report.failures);
    }

    #[test]
    fn facilities_share_identical_flows() {
        let records = extract_documents("TX2400001", Some(FACT_SHEET), Some(FLOW));

        assert_eq!(records.facilities.len(), 3);
        assert!(records.facilities.iter().all(|f| f.flows == records.flows));
        assert_eq!(records.facilities[0].facility_type, "Treatment Plant");
        assert_eq!(records.facilities[0].facility_status, "Active");
        assert_eq!(records.facilities[2].facility_type, "Storage");
        assert_eq!(records.facilities[2].facility_status, "");
    }

    #[test]
    fn violation_tables_keep_their_asymmetry() {
        let records = extract_documents("TX2400001", Some(FACT_SHEET), Some(FLOW));

        assert_eq!(records.individual_violations.len(), 2);
        assert_eq!(
            records.individual_violations[0],
            ViolationRecord {
                violation_number: "2021-1".to_string(),
                date: "03/31/2021".to_string(),
                violation_description: "Monitoring, Routine".to_string(),
                contaminant: "Coliform".to_string(),
            }
        );
        assert_eq!(records.individual_violations[1].date, "");

        assert_eq!(records.group_violations.len(), 1);
        assert_eq!(records.group_violations[0].violation_description, "Public Notice");
        assert_eq!(records.group_violations[0].contaminant, "");
    }

    #[test]
    fn malformed_field_does_not_block_siblings() {
        let broken = FACT_SHEET.replace(
            "<td>RS</td><td>72,000</td><td>MT</td><td>&nbsp;0.625</td>",
            "<td>RS</td><td>72,000</td>",
        );

        let records = extract_documents("TX2400001", Some(&broken), Some(FLOW));

        assert!(records.entity.connection_type.is_none());
        assert!(records.entity.meter_size.is_none());
        assert!(records.report.failed("connectionType"));
        assert_eq!(records.entity.system_name.as_deref(), Some("CITY OF LAREDO"));
        assert_eq!(records.entity.phone.as_deref(), Some("956-555-0199"));
        assert_eq!(records.facilities.len(), 3);
    }

    #[test]
    fn missing_flow_document_defaults_only_flow_fields() {
        let records = extract_documents("TX2400001", Some(FACT_SHEET), None);

        assert_eq!(records.flows, FacilityFlows::default());
        assert!(records.facilities.iter().all(|f| f.flows.production_mgd == NOT_AVAILABLE));
        assert_eq!(records.report.failures.len(), 4);
        assert_eq!(records.entity.system_name.as_deref(), Some("CITY OF LAREDO"));
    }

    #[test]
    fn missing_fact_sheet_yields_empty_lists() {
        let records = extract_documents("TX2400001", None, Some(FLOW));

        assert!(records.entity.pwsid.is_none());
        assert_eq!(records.entity.service_area_id, "TX2400001");
        assert!(records.facilities.is_empty());
        assert!(records.group_violations.is_empty());
        assert!(records.individual_violations.is_empty());
        assert_eq!(records.flows.production_mgd, "120.5 MGD");
        assert!(records.report.failed("facilities"));
    }
}
