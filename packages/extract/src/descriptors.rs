//! Declared extraction targets.
//!
//! Every scalar the pipeline reads is a [`FieldDescriptor`]: a field name,
//! the record group it belongs to, an ordered list of [`Locator`]s and a
//! default. Every list is a [`TableDescriptor`]. Evaluating a descriptor
//! always produces an [`Extracted`] value, so one broken field or table
//! cannot take its siblings down with it.

use pws_dossier_extract_models::{DocumentKind, Extracted, NOT_AVAILABLE, RecordGroup};
use scraper::{ElementRef, Html};

use crate::html;

/// Why a locator found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("{0} not available")]
    DocumentMissing(DocumentKind),

    #[error("no table titled '{title}'")]
    TableNotFound { title: &'static str },

    #[error("no '{label}' label")]
    LabelNotFound { label: &'static str },

    #[error("'{title}' has no cell at row {row}, column {column}")]
    CellNotFound {
        title: &'static str,
        row: usize,
        column: usize,
    },

    #[error("'{title}' has no row labeled '{label}'")]
    RowNotFound {
        title: &'static str,
        label: &'static str,
    },

    #[error("'{title}' row {row} has {found} cells, expected {expected}")]
    RowShape {
        title: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("located value is empty")]
    Empty,
}

/// How non-breaking spaces in a located value are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nbsp {
    Keep,
    Space,
    Strip,
}

impl Nbsp {
    fn clean(self, value: &str) -> String {
        match self {
            Self::Keep => value.trim().to_string(),
            Self::Space => value.replace(html::NBSP, " ").trim().to_string(),
            Self::Strip => value.replace(html::NBSP, "").trim().to_string(),
        }
    }
}

/// One way of finding a value in a document. Row and column numbers are
/// 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// The cell next to a labeled cell.
    LabeledCell { label: &'static str },
    /// A fixed cell of a titled table.
    TableCell {
        title: &'static str,
        row: usize,
        column: usize,
    },
    /// Administrative contact name and address.
    ContactInfo,
    /// Administrative contact business phone.
    BusinessPhone,
    /// One of the four cells of the service connection data row.
    ServiceConnection { position: usize },
    /// Value cells of the first labeled row in a flow or measures table.
    FlowFigure {
        title: &'static str,
        label: &'static str,
        exclude: Option<&'static str>,
        columns: &'static [usize],
    },
}

const CONTACTS_TABLE: &str = "Water System Contacts";
const ADMINISTRATIVE_CONTACT: &str = "Administrative Contact";
const BUSINESS_PHONE: &str = "BUS";
const SERVICE_CONNECTION_TABLE: &str = "Service Connection";
const SERVICE_CONNECTION_ROW: usize = 3;
const SERVICE_CONNECTION_CELLS: usize = 4;
/// Heading and column-title rows above the data in list and flow tables.
const HEADER_ROWS: usize = 2;

impl Locator {
    /// Reads the raw value text.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError`] describing what was not found.
    pub fn locate(&self, document: &Html) -> Result<String, LocateError> {
        match *self {
            Self::LabeledCell { label } => html::labeled_value_cell(document, label)
                .map(html::text)
                .ok_or(LocateError::LabelNotFound { label }),
            Self::TableCell { title, row, column } => {
                let table =
                    html::titled_table(document, title).ok_or(LocateError::TableNotFound { title })?;
                nth_cell(table, row, column)
                    .map(html::text)
                    .ok_or(LocateError::CellNotFound { title, row, column })
            }
            Self::ContactInfo => {
                let row = administrative_contact(document)?;
                html::cells(row)
                    .get(1)
                    .map(|cell| html::text(*cell))
                    .ok_or(LocateError::CellNotFound {
                        title: CONTACTS_TABLE,
                        row: 0,
                        column: 2,
                    })
            }
            Self::BusinessPhone => {
                let row = administrative_contact(document)?;
                let phones = html::cells(row).get(2).copied().ok_or(LocateError::CellNotFound {
                    title: CONTACTS_TABLE,
                    row: 0,
                    column: 3,
                })?;
                html::elements_named(phones, "tr")
                    .find(|tr| first_cell_contains(*tr, BUSINESS_PHONE))
                    .and_then(|tr| html::cells(tr).get(1).map(|cell| html::text(*cell)))
                    .ok_or(LocateError::RowNotFound {
                        title: CONTACTS_TABLE,
                        label: BUSINESS_PHONE,
                    })
            }
            Self::ServiceConnection { position } => {
                let table = html::titled_table(document, SERVICE_CONNECTION_TABLE).ok_or(
                    LocateError::TableNotFound {
                        title: SERVICE_CONNECTION_TABLE,
                    },
                )?;
                let cells = html::rows(table)
                    .get(SERVICE_CONNECTION_ROW - 1)
                    .map(|row| html::cell_texts(*row))
                    .unwrap_or_default();
                if cells.len() != SERVICE_CONNECTION_CELLS {
                    return Err(LocateError::RowShape {
                        title: SERVICE_CONNECTION_TABLE,
                        row: SERVICE_CONNECTION_ROW,
                        expected: SERVICE_CONNECTION_CELLS,
                        found: cells.len(),
                    });
                }
                cells
                    .into_iter()
                    .nth(position - 1)
                    .ok_or(LocateError::CellNotFound {
                        title: SERVICE_CONNECTION_TABLE,
                        row: SERVICE_CONNECTION_ROW,
                        column: position,
                    })
            }
            Self::FlowFigure {
                title,
                label,
                exclude,
                columns,
            } => {
                let table = html::table_around_heading(document, title)
                    .ok_or(LocateError::TableNotFound { title })?;
                html::rows(table)
                    .into_iter()
                    .skip(HEADER_ROWS)
                    .map(html::cells)
                    .filter(|cells| cells.len() >= columns.iter().copied().max().unwrap_or(1))
                    .find(|cells| {
                        let row_label = html::match_text(cells[0]);
                        row_label.contains(label)
                            && exclude.is_none_or(|excluded| !row_label.contains(excluded))
                    })
                    .map(|cells| {
                        columns
                            .iter()
                            .map(|column| html::text(cells[column - 1]))
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .ok_or(LocateError::RowNotFound { title, label })
            }
        }
    }
}

fn nth_cell(table: ElementRef<'_>, row: usize, column: usize) -> Option<ElementRef<'_>> {
    let row = *html::rows(table).get(row.checked_sub(1)?)?;
    html::cells(row).get(column.checked_sub(1)?).copied()
}

fn first_cell_contains(row: ElementRef<'_>, needle: &str) -> bool {
    html::cells(row)
        .first()
        .is_some_and(|cell| html::match_text(*cell).contains(needle))
}

fn administrative_contact(document: &Html) -> Result<ElementRef<'_>, LocateError> {
    let table = html::titled_table(document, CONTACTS_TABLE).ok_or(LocateError::TableNotFound {
        title: CONTACTS_TABLE,
    })?;
    html::rows(table)
        .into_iter()
        .find(|row| first_cell_contains(*row, ADMINISTRATIVE_CONTACT))
        .ok_or(LocateError::RowNotFound {
            title: CONTACTS_TABLE,
            label: ADMINISTRATIVE_CONTACT,
        })
}

/// A declared scalar field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Field name as reported in the extraction report.
    pub field: &'static str,
    pub group: RecordGroup,
    pub document: DocumentKind,
    /// Tried in order; the first non-empty value wins.
    pub locators: &'static [Locator],
    pub nbsp: Nbsp,
    /// Recorded when no locator yields a value.
    pub default: Option<&'static str>,
}

impl FieldDescriptor {
    /// Evaluates the locators against `document`, which is `None` when the
    /// document could not be fetched.
    #[must_use]
    pub fn extract(&self, document: Option<&Html>) -> Extracted<Option<String>> {
        let default = || self.default.map(str::to_string);

        let Some(document) = document else {
            return Extracted::Defaulted {
                value: default(),
                reason: LocateError::DocumentMissing(self.document).to_string(),
            };
        };

        let mut reasons = Vec::with_capacity(self.locators.len());
        for locator in self.locators {
            match locator.locate(document) {
                Ok(raw) => {
                    let value = self.nbsp.clean(&raw);
                    if !value.is_empty() {
                        return Extracted::Found(Some(value));
                    }
                    reasons.push(LocateError::Empty.to_string());
                }
                Err(e) => reasons.push(e.to_string()),
            }
        }

        let reason = reasons.join("; ");
        log::warn!("{}: falling back to default ({reason})", self.field);
        Extracted::Defaulted {
            value: default(),
            reason,
        }
    }
}

/// A declared list table on the fact sheet.
#[derive(Debug, Clone, Copy)]
pub struct TableDescriptor {
    pub field: &'static str,
    pub group: RecordGroup,
    pub title: &'static str,
}

impl TableDescriptor {
    /// Maps every data row (after the two header rows) through `map_row`.
    /// Rows for which it returns `None` are skipped. A missing document or
    /// table yields an empty list.
    pub fn extract<T>(
        &self,
        document: Option<&Html>,
        map_row: impl Fn(&[String]) -> Option<T>,
    ) -> Extracted<Vec<T>> {
        let table = document
            .ok_or(LocateError::DocumentMissing(DocumentKind::FactSheet))
            .and_then(|document| {
                html::titled_table(document, self.title)
                    .ok_or(LocateError::TableNotFound { title: self.title })
            });

        match table {
            Ok(table) => Extracted::Found(
                html::rows(table)
                    .into_iter()
                    .skip(HEADER_ROWS)
                    .filter_map(|row| map_row(&html::cell_texts(row)))
                    .collect(),
            ),
            Err(e) => {
                log::warn!("{}: no rows ({e})", self.field);
                Extracted::Defaulted {
                    value: Vec::new(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

const fn labeled(field: &'static str, locators: &'static [Locator]) -> FieldDescriptor {
    FieldDescriptor {
        field,
        group: RecordGroup::EntityInfo,
        document: DocumentKind::FactSheet,
        locators,
        nbsp: Nbsp::Keep,
        default: None,
    }
}

const fn service_connection(field: &'static str, locators: &'static [Locator]) -> FieldDescriptor {
    FieldDescriptor {
        field,
        group: RecordGroup::ServiceConnection,
        document: DocumentKind::FactSheet,
        locators,
        nbsp: Nbsp::Strip,
        default: None,
    }
}

const fn flow(field: &'static str, locators: &'static [Locator]) -> FieldDescriptor {
    FieldDescriptor {
        field,
        group: RecordGroup::FacilityFlows,
        document: DocumentKind::Flow,
        locators,
        nbsp: Nbsp::Keep,
        default: Some(NOT_AVAILABLE),
    }
}

pub const PWSID: FieldDescriptor =
    labeled("pwsid", &[Locator::LabeledCell { label: "Water System No." }]);
pub const SYSTEM_NAME: FieldDescriptor =
    labeled("systemName", &[Locator::LabeledCell { label: "System Name" }]);
pub const SYSTEM_TYPE: FieldDescriptor =
    labeled("systemType", &[Locator::LabeledCell { label: "Federal Type" }]);
pub const OWNER_TYPE: FieldDescriptor =
    labeled("ownerType", &[Locator::LabeledCell { label: "Federal Source" }]);
pub const COUNTY: FieldDescriptor = labeled(
    "county",
    &[Locator::LabeledCell {
        label: "Principal County Served",
    }],
);

pub const POPULATION_SERVED: FieldDescriptor = FieldDescriptor {
    nbsp: Nbsp::Strip,
    ..labeled(
        "populationServed",
        &[
            Locator::TableCell {
                title: "Annual Operating Period",
                row: 3,
                column: 6,
            },
            Locator::LabeledCell {
                label: "Population Served",
            },
        ],
    )
};

pub const CONTACT_INFO: FieldDescriptor = FieldDescriptor {
    field: "contactInfo",
    group: RecordGroup::ContactInfo,
    document: DocumentKind::FactSheet,
    locators: &[Locator::ContactInfo],
    nbsp: Nbsp::Space,
    default: None,
};

pub const PHONE: FieldDescriptor = FieldDescriptor {
    field: "phone",
    locators: &[Locator::BusinessPhone],
    ..CONTACT_INFO
};

pub const CONNECTION_TYPE: FieldDescriptor =
    service_connection("connectionType", &[Locator::ServiceConnection { position: 1 }]);
pub const CONNECTION_COUNT: FieldDescriptor =
    service_connection("connectionCount", &[Locator::ServiceConnection { position: 2 }]);
pub const METER_TYPE: FieldDescriptor =
    service_connection("meterType", &[Locator::ServiceConnection { position: 3 }]);
pub const METER_SIZE: FieldDescriptor =
    service_connection("meterSize", &[Locator::ServiceConnection { position: 4 }]);

const FLOW_RATES: &str = "WS Flow Rates";
const MEASURES: &str = "WS Measures";

pub const PRODUCTION_MGD: FieldDescriptor = flow(
    "productionMgd",
    &[Locator::FlowFigure {
        title: FLOW_RATES,
        label: "Provided Production Capacity",
        exclude: None,
        columns: &[2],
    }],
);
pub const MAX_DAILY_DEMAND: FieldDescriptor = flow(
    "maxDailyDemand",
    &[Locator::FlowFigure {
        title: FLOW_RATES,
        label: "Daily Demand",
        exclude: None,
        columns: &[2],
    }],
);
pub const AVG_DAILY_DEMAND: FieldDescriptor = flow(
    "avgDailyDemand",
    &[Locator::FlowFigure {
        title: FLOW_RATES,
        label: "Average Daily",
        exclude: None,
        columns: &[2],
    }],
);
pub const STORAGE_CAPACITY: FieldDescriptor = flow(
    "storageCapacity",
    &[Locator::FlowFigure {
        title: MEASURES,
        label: "Storage Capacity",
        exclude: Some("Elevated"),
        columns: &[2, 3],
    }],
);

pub const FACILITIES: TableDescriptor = TableDescriptor {
    field: "facilities",
    group: RecordGroup::Facilities,
    title: "Water System Facilities",
};
pub const GROUP_VIOLATIONS: TableDescriptor = TableDescriptor {
    field: "groupViolations",
    group: RecordGroup::GroupViolations,
    title: "Group Violations",
};
pub const INDIVIDUAL_VIOLATIONS: TableDescriptor = TableDescriptor {
    field: "individualViolations",
    group: RecordGroup::IndividualViolations,
    title: "Individual Violations",
};

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn falls_back_to_second_locator() {
        let doc = document(
            r"<table><tr><td><font>Population Served:</font></td><td>1,234</td></tr></table>",
        );

        assert_eq!(
            POPULATION_SERVED.extract(Some(&doc)),
            Extracted::Found(Some("1,234".to_string()))
        );
    }

    #[test]
    fn population_prefers_operating_period_table() {
        let doc = document(
            r"<table>
                <tr><th>Annual Operating Period</th></tr>
                <tr><td>a</td><td>b</td><td>c</td><td>d</td><td>e</td><td>f</td></tr>
                <tr><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td>9&nbsp;876</td></tr>
              </table>
              <table><tr><td><font>Population Served:</font></td><td>1</td></tr></table>",
        );

        assert_eq!(
            POPULATION_SERVED.extract(Some(&doc)).into_value().as_deref(),
            Some("9876")
        );
    }

    #[test]
    fn missing_everything_defaults_with_every_reason() {
        let doc = document("<p>maintenance</p>");
        let outcome = POPULATION_SERVED.extract(Some(&doc));

        assert_eq!(outcome.value(), &None);
        let reason = outcome.reason().unwrap();
        assert!(reason.contains("Annual Operating Period"));
        assert!(reason.contains("Population Served"));
    }

    #[test]
    fn flow_default_is_not_available() {
        let outcome = PRODUCTION_MGD.extract(None);

        assert_eq!(outcome.value().as_deref(), Some(NOT_AVAILABLE));
        assert_eq!(outcome.reason(), Some("flow document not available"));
    }

    #[test]
    fn service_connection_row_must_have_four_cells() {
        let doc = document(
            r"<table>
                <tr><th>Service Connection</th></tr>
                <tr><td>Type</td><td>Count</td><td>Meter</td></tr>
                <tr><td>R</td><td>1200</td><td>MT</td></tr>
              </table>",
        );

        for descriptor in [CONNECTION_TYPE, CONNECTION_COUNT, METER_TYPE, METER_SIZE] {
            let outcome = descriptor.extract(Some(&doc));
            assert!(!outcome.is_found());
            assert!(outcome.reason().unwrap().contains("expected 4"));
        }
    }

    #[test]
    fn storage_capacity_skips_elevated_row() {
        let doc = document(
            r"<table>
                <tr><th>WS Measures</th></tr>
                <tr><td>Measure</td><td>Value</td><td>Unit</td></tr>
                <tr><td>Elevated Storage Capacity</td><td>0.5</td><td>MG</td></tr>
                <tr><td>Total Storage Capacity</td><td>2.25</td><td>MG</td></tr>
              </table>",
        );

        assert_eq!(
            STORAGE_CAPACITY.extract(Some(&doc)).into_value().as_deref(),
            Some("2.25 MG")
        );
    }

    #[test]
    fn table_descriptor_defaults_to_empty_list() {
        let doc = document("<table><tr><th>Something Else</th></tr></table>");
        let outcome = GROUP_VIOLATIONS.extract(Some(&doc), |cells| Some(cells.len()));

        assert_eq!(outcome.value(), &Vec::<usize>::new());
        assert_eq!(outcome.reason(), Some("no table titled 'Group Violations'"));
    }
}
