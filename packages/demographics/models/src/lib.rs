#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Demographic indicator types.
//!
//! [`IndicatorRow`] is one census tract's normalized ACS figures;
//! [`AggregatedIndicators`] is the overlap-weighted mean of those rows over
//! one service area.

use serde::{Deserialize, Serialize};

/// A `(GEOID, fraction)` aggregation weight.
pub use pws_dossier_geometry_models::TractWeight as OverlapWeight;

/// The five indicators carried per tract and per service area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Indicator {
    /// Total population (B01003).
    TotalPopulation,
    /// Median household income (B19013).
    MedianHouseholdIncome,
    /// Unemployed civilians in the labor force (B23025).
    UnemployedCount,
    /// Share of the population below the poverty line (B17001 / B01003).
    PovertyRate,
    /// Average household size (B25010).
    AvgHouseholdSize,
}

impl Indicator {
    /// Every indicator, in output order.
    pub const ALL: [Self; 5] = [
        Self::TotalPopulation,
        Self::MedianHouseholdIncome,
        Self::UnemployedCount,
        Self::PovertyRate,
        Self::AvgHouseholdSize,
    ];
}

/// Normalized indicators for one census tract.
///
/// Every value is finite: missing inputs were filled with zero after the
/// poverty rate was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRow {
    /// 11-digit tract GEOID (state + county + tract).
    pub geoid: String,
    pub total_population: f64,
    pub median_household_income: f64,
    pub unemployed_count: f64,
    pub poverty_rate: f64,
    pub avg_household_size: f64,
}

impl IndicatorRow {
    /// Value of one indicator.
    #[must_use]
    pub const fn get(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::TotalPopulation => self.total_population,
            Indicator::MedianHouseholdIncome => self.median_household_income,
            Indicator::UnemployedCount => self.unemployed_count,
            Indicator::PovertyRate => self.poverty_rate,
            Indicator::AvgHouseholdSize => self.avg_household_size,
        }
    }
}

/// Overlap-weighted indicators for one service area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedIndicators {
    pub service_area_id: String,
    pub total_population: f64,
    pub median_household_income: f64,
    pub unemployed_count: f64,
    pub poverty_rate: f64,
    pub avg_household_size: f64,
    /// Number of tracts that contributed.
    pub tract_count: usize,
    /// Sum of overlap fractions (the weighted-mean denominator).
    pub weight_sum: f64,
}

impl AggregatedIndicators {
    /// Value of one indicator.
    #[must_use]
    pub const fn get(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::TotalPopulation => self.total_population,
            Indicator::MedianHouseholdIncome => self.median_household_income,
            Indicator::UnemployedCount => self.unemployed_count,
            Indicator::PovertyRate => self.poverty_rate,
            Indicator::AvgHouseholdSize => self.avg_household_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let row = IndicatorRow {
            geoid: "48479001700".to_string(),
            total_population: 4_210.0,
            median_household_income: 31_250.0,
            unemployed_count: 118.0,
            poverty_rate: 0.34,
            avg_household_size: 3.6,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["medianHouseholdIncome"], 31_250.0);
        assert_eq!(json["avgHouseholdSize"], 3.6);
    }

    #[test]
    fn get_matches_fields() {
        let row = IndicatorRow {
            geoid: "48479001700".to_string(),
            total_population: 1.0,
            median_household_income: 2.0,
            unemployed_count: 3.0,
            poverty_rate: 4.0,
            avg_household_size: 5.0,
        };

        let values: Vec<f64> = Indicator::ALL.iter().map(|i| row.get(*i)).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
