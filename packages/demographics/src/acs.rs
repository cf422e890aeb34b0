//! American Community Survey indicator table.
//!
//! One request fetches five variables for every tract in a state:
//!
//! | Variable | Indicator |
//! |---|---|
//! | `B01003_001E` | total population |
//! | `B19013_001E` | median household income |
//! | `B23025_005E` | unemployed count |
//! | `B25010_001E` | average household size |
//! | `B17001_002E` | population below poverty (becomes a rate) |
//!
//! The API answers with a JSON array of arrays whose first row is the
//! header. Normalization runs in a fixed order: coerce to numbers
//! (anything non-numeric is missing), treat negative income as missing,
//! derive the poverty rate, then fill whatever is still missing with zero.

use std::collections::BTreeMap;

use pws_dossier_demographics_models::IndicatorRow;
use serde::{Deserialize, Serialize};

use crate::IndicatorFetchError;

const TOTAL_POPULATION: &str = "B01003_001E";
const MEDIAN_HOUSEHOLD_INCOME: &str = "B19013_001E";
const UNEMPLOYED_COUNT: &str = "B23025_005E";
const AVG_HOUSEHOLD_SIZE: &str = "B25010_001E";
const POVERTY_COUNT: &str = "B17001_002E";

/// Variables requested, in `get=` order.
pub const VARIABLES: [&str; 5] = [
    TOTAL_POPULATION,
    MEDIAN_HOUSEHOLD_INCOME,
    UNEMPLOYED_COUNT,
    AVG_HOUSEHOLD_SIZE,
    POVERTY_COUNT,
];

/// Maximum length of the response body preview kept in errors.
const BODY_PREVIEW_LEN: usize = 500;

/// Which ACS release and jurisdiction to query. Deserialized from the
/// `[census]` table of the dossier config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcsQuery {
    /// API root, without the year.
    pub base_url: String,
    /// ACS 5-year release year.
    pub year: u16,
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Census API key. Requests work without one at a lower rate limit.
    pub api_key: Option<String>,
}

impl Default for AcsQuery {
    fn default() -> Self {
        Self {
            base_url: "https://api.census.gov/data".to_string(),
            year: 2021,
            state_fips: "48".to_string(),
            api_key: None,
        }
    }
}

impl AcsQuery {
    /// The dataset endpoint, e.g. `https://api.census.gov/data/2021/acs/acs5`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/{}/acs/acs5", self.base_url.trim_end_matches('/'), self.year)
    }

    /// Query-string parameters for the batched tract request.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("get", VARIABLES.join(",")),
            ("for", "tract:*".to_string()),
            ("in", format!("state:{} county:*", self.state_fips)),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }
}

/// Fetches and normalizes the indicator table.
///
/// # Errors
///
/// Returns [`IndicatorFetchError`] on transport failure, a non-success
/// status, or a body that is not a well-formed ACS table.
pub async fn fetch_indicator_table(
    client: &reqwest::Client,
    query: &AcsQuery,
) -> Result<IndicatorTable, IndicatorFetchError> {
    let url = query.endpoint();
    log::info!("Fetching ACS {} tract indicators for state {}", query.year, query.state_fips);

    let response = client.get(&url).query(&query.params()).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(IndicatorFetchError::Status {
            status: status.as_u16(),
            body: preview(&text),
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| IndicatorFetchError::Malformed {
            message: format!("invalid JSON ({e}): {}", preview(&text)),
        })?;

    let table = IndicatorTable::from_response(&value)?;
    log::info!("Loaded indicators for {} tracts", table.len());
    Ok(table)
}

fn preview(text: &str) -> String {
    if text.len() > BODY_PREVIEW_LEN {
        let cut: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Column positions resolved from the header row.
struct Columns {
    total_population: usize,
    median_household_income: usize,
    unemployed_count: usize,
    avg_household_size: usize,
    poverty_count: usize,
    state: usize,
    county: usize,
    tract: usize,
}

impl Columns {
    fn from_header(header: &[serde_json::Value]) -> Result<Self, IndicatorFetchError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|cell| cell.as_str() == Some(name))
                .ok_or_else(|| IndicatorFetchError::Malformed {
                    message: format!("header has no '{name}' column"),
                })
        };

        Ok(Self {
            total_population: find(TOTAL_POPULATION)?,
            median_household_income: find(MEDIAN_HOUSEHOLD_INCOME)?,
            unemployed_count: find(UNEMPLOYED_COUNT)?,
            avg_household_size: find(AVG_HOUSEHOLD_SIZE)?,
            poverty_count: find(POVERTY_COUNT)?,
            state: find("state")?,
            county: find("county")?,
            tract: find("tract")?,
        })
    }
}

/// Normalized indicator rows indexed by GEOID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorTable {
    rows: BTreeMap<String, IndicatorRow>,
}

impl IndicatorTable {
    /// Builds the table from a parsed ACS response.
    ///
    /// Rows shorter than the header or without a usable GEOID are skipped
    /// with a warning. A repeated GEOID keeps its first row.
    ///
    /// # Errors
    ///
    /// Returns [`IndicatorFetchError::Malformed`] if the body is not an
    /// array of arrays or the header lacks a required column.
    pub fn from_response(value: &serde_json::Value) -> Result<Self, IndicatorFetchError> {
        let rows = value.as_array().ok_or_else(|| IndicatorFetchError::Malformed {
            message: "expected a JSON array of rows".to_string(),
        })?;
        let (header, data) = rows.split_first().ok_or_else(|| IndicatorFetchError::Malformed {
            message: "response has no header row".to_string(),
        })?;
        let header = header.as_array().ok_or_else(|| IndicatorFetchError::Malformed {
            message: "header row is not an array".to_string(),
        })?;
        let columns = Columns::from_header(header)?;

        let mut table = Self::default();
        for (index, row) in data.iter().enumerate() {
            let Some(cells) = row.as_array().filter(|cells| cells.len() >= header.len()) else {
                log::warn!("Skipping ACS row {}: expected {} cells", index + 1, header.len());
                continue;
            };
            let Some(row) = normalize_row(&columns, cells) else {
                log::warn!("Skipping ACS row {}: no state/county/tract codes", index + 1);
                continue;
            };
            if table.rows.contains_key(&row.geoid) {
                log::warn!("Duplicate ACS row for tract {}, keeping the first", row.geoid);
                continue;
            }
            table.rows.insert(row.geoid.clone(), row);
        }

        Ok(table)
    }

    /// Builds a table from already normalized rows.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = IndicatorRow>) -> Self {
        Self {
            rows: rows.into_iter().map(|row| (row.geoid.clone(), row)).collect(),
        }
    }

    /// Looks up one tract.
    #[must_use]
    pub fn get(&self, geoid: &str) -> Option<&IndicatorRow> {
        self.rows.get(geoid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in GEOID order.
    pub fn iter(&self) -> impl Iterator<Item = &IndicatorRow> {
        self.rows.values()
    }
}

fn normalize_row(columns: &Columns, cells: &[serde_json::Value]) -> Option<IndicatorRow> {
    let geoid = format!(
        "{}{}{}",
        code(&cells[columns.state])?,
        code(&cells[columns.county])?,
        code(&cells[columns.tract])?
    );

    let total_population = numeric(&cells[columns.total_population]);
    let median_household_income =
        numeric(&cells[columns.median_household_income]).filter(|income| *income >= 0.0);
    let unemployed_count = numeric(&cells[columns.unemployed_count]);
    let avg_household_size = numeric(&cells[columns.avg_household_size]);
    let poverty_count = numeric(&cells[columns.poverty_count]);

    let poverty_rate = match (poverty_count, total_population) {
        (Some(count), Some(population)) if population.abs() > 0.0 => Some(count / population),
        _ => None,
    };

    Some(IndicatorRow {
        geoid,
        total_population: total_population.unwrap_or(0.0),
        median_household_income: median_household_income.unwrap_or(0.0),
        unemployed_count: unemployed_count.unwrap_or(0.0),
        poverty_rate: poverty_rate.unwrap_or(0.0),
        avg_household_size: avg_household_size.unwrap_or(0.0),
    })
}

/// Coerces a cell to a finite number. Strings are parsed; anything else
/// that is not a number counts as missing.
fn numeric(cell: &serde_json::Value) -> Option<f64> {
    match cell {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite())
}

fn code(cell: &serde_json::Value) -> Option<String> {
    match cell {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn header() -> serde_json::Value {
        json!([
            "B01003_001E",
            "B19013_001E",
            "B23025_005E",
            "B25010_001E",
            "B17001_002E",
            "state",
            "county",
            "tract"
        ])
    }

    #[test]
    fn builds_geoid_and_derives_poverty_rate() {
        let body = json!([
            header(),
            ["4000", "52000", "120", "3.1", "1000", "48", "479", "001700"]
        ]);

        let table = IndicatorTable::from_response(&body).unwrap();
        let row = table.get("48479001700").unwrap();

        assert!((row.total_population - 4000.0).abs() < f64::EPSILON);
        assert!((row.median_household_income - 52_000.0).abs() < f64::EPSILON);
        assert!((row.poverty_rate - 0.25).abs() < 1e-12);
        assert!((row.avg_household_size - 3.1).abs() < 1e-12);
    }

    #[test]
    fn negative_income_sentinel_becomes_zero_after_fill() {
        let body = json!([
            header(),
            ["2000", "-666666666", "-1", "2.5", "500", "48", "061", "012300"]
        ]);

        let table = IndicatorTable::from_response(&body).unwrap();
        let row = table.get("48061012300").unwrap();

        assert!(row.median_household_income.abs() < f64::EPSILON);
        // Only income sentinels are treated as missing.
        assert!((row.unemployed_count + 1.0).abs() < f64::EPSILON);
        assert!((row.poverty_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn income_of_minus_one_is_missing() {
        let body = json!([header(), ["100", "-1", "0", "1", "0", "48", "001", "000100"]]);

        let table = IndicatorTable::from_response(&body).unwrap();

        assert!(table.get("48001000100").unwrap().median_household_income.abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_and_null_cells_fill_with_zero() {
        let body = json!([header(), [null, "N/A", 7, "2.0", "12", "48", "001", "000200"]]);

        let table = IndicatorTable::from_response(&body).unwrap();
        let row = table.get("48001000200").unwrap();

        assert!(row.total_population.abs() < f64::EPSILON);
        assert!(row.median_household_income.abs() < f64::EPSILON);
        assert!((row.unemployed_count - 7.0).abs() < f64::EPSILON);
        // Missing denominator: the rate is missing, then zero.
        assert!(row.poverty_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn zero_population_does_not_produce_infinite_rate() {
        let body = json!([header(), ["0", "40000", "0", "0", "15", "48", "001", "000300"]]);

        let table = IndicatorTable::from_response(&body).unwrap();

        let rate = table.get("48001000300").unwrap().poverty_rate;
        assert!(rate.is_finite());
        assert!(rate.abs() < f64::EPSILON);
    }

    #[test]
    fn short_rows_are_skipped() {
        let body = json!([
            header(),
            ["100", "1", "48", "001"],
            ["100", "30000", "1", "2", "10", "48", "001", "000400"]
        ]);

        let table = IndicatorTable::from_response(&body).unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.get("48001000400").is_some());
    }

    #[test]
    fn missing_header_column_is_malformed() {
        let body = json!([
            ["B01003_001E", "state", "county", "tract"],
            ["100", "48", "001", "000100"]
        ]);

        assert!(matches!(
            IndicatorTable::from_response(&body),
            Err(IndicatorFetchError::Malformed { message }) if message.contains("B19013_001E")
        ));
    }

    #[test]
    fn non_array_body_is_malformed() {
        let body = json!({ "error": "invalid key" });

        assert!(matches!(
            IndicatorTable::from_response(&body),
            Err(IndicatorFetchError::Malformed { .. })
        ));
        assert!(matches!(
            IndicatorTable::from_response(&json!([])),
            Err(IndicatorFetchError::Malformed { .. })
        ));
    }

    #[test]
    fn query_parameters_cover_every_variable() {
        let query = AcsQuery {
            api_key: Some("secret".to_string()),
            ..AcsQuery::default()
        };

        assert_eq!(query.endpoint(), "https://api.census.gov/data/2021/acs/acs5");
        let params = query.params();
        assert_eq!(
            params[0].1,
            "B01003_001E,B19013_001E,B23025_005E,B25010_001E,B17001_002E"
        );
        assert!(params.contains(&("in", "state:48 county:*".to_string())));
        assert!(params.contains(&("key", "secret".to_string())));
    }
}
