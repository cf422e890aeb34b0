//! Presentation values derived from aggregated indicators.

use pws_dossier_demographics_models::AggregatedIndicators;
use serde::{Deserialize, Serialize};

/// Monthly water use per person, in gallons.
pub const WATER_GALLONS_PER_PERSON: f64 = 2325.0;

/// Monthly sewer flow per person, in gallons.
pub const SEWER_GALLONS_PER_PERSON: f64 = 1279.0;

/// Aggregated indicators as shown to a reader. Negative (sentinel-tainted)
/// income and household size become `None`, and the per-household flow
/// estimates exist only when the household size does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayIndicators {
    pub median_household_income: Option<f64>,
    pub total_population: f64,
    pub unemployed_count: f64,
    pub poverty_rate: f64,
    pub avg_household_size: Option<f64>,
    pub water_flow_per_household: Option<f64>,
    pub sewer_flow_per_household: Option<f64>,
}

impl DisplayIndicators {
    #[must_use]
    pub fn from_aggregated(aggregated: &AggregatedIndicators) -> Self {
        let household_size = non_negative(aggregated.avg_household_size);

        Self {
            median_household_income: non_negative(aggregated.median_household_income),
            total_population: aggregated.total_population,
            unemployed_count: aggregated.unemployed_count,
            poverty_rate: aggregated.poverty_rate,
            avg_household_size: household_size,
            water_flow_per_household: household_size.map(|size| WATER_GALLONS_PER_PERSON * size),
            sewer_flow_per_household: household_size.map(|size| SEWER_GALLONS_PER_PERSON * size),
        }
    }
}

fn non_negative(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregated(income: f64, household_size: f64) -> AggregatedIndicators {
        AggregatedIndicators {
            service_area_id: "TX0000001".to_string(),
            total_population: 1200.0,
            median_household_income: income,
            unemployed_count: 40.0,
            poverty_rate: 0.2,
            avg_household_size: household_size,
            tract_count: 2,
            weight_sum: 1.0,
        }
    }

    #[test]
    fn derives_flows_from_household_size() {
        let display = DisplayIndicators::from_aggregated(&aggregated(50_000.0, 2.0));

        assert_eq!(display.median_household_income, Some(50_000.0));
        assert_eq!(display.water_flow_per_household, Some(4650.0));
        assert_eq!(display.sewer_flow_per_household, Some(2558.0));
    }

    #[test]
    fn negative_values_are_hidden() {
        let display = DisplayIndicators::from_aggregated(&aggregated(-12.5, -0.3));

        assert_eq!(display.median_household_income, None);
        assert_eq!(display.avg_household_size, None);
        assert_eq!(display.water_flow_per_household, None);
        assert_eq!(display.sewer_flow_per_household, None);
        assert!((display.poverty_rate - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_household_size_is_valid() {
        let display = DisplayIndicators::from_aggregated(&aggregated(0.0, 0.0));

        assert_eq!(display.median_household_income, Some(0.0));
        assert_eq!(display.water_flow_per_household, Some(0.0));
    }
}
