//! Overlap-weighted aggregation of tract indicators.

use pws_dossier_demographics_models::{AggregatedIndicators, Indicator, IndicatorRow, OverlapWeight};

use crate::{AggregationError, IndicatorTable};

/// Weighted mean of each indicator over one service area's tracts:
/// `Σ(value × fraction) / Σ(fraction)`.
///
/// # Errors
///
/// Returns [`AggregationError::MissingTractIndicator`] for the first tract
/// with no row in `table`, checked before anything else, and
/// [`AggregationError::UndefinedAggregation`] when the fractions sum to
/// zero (including an empty weight list).
pub fn aggregate(
    service_area_id: &str,
    weights: &[OverlapWeight],
    table: &IndicatorTable,
) -> Result<AggregatedIndicators, AggregationError> {
    let rows = weights
        .iter()
        .map(|weight| {
            table
                .get(&weight.geoid)
                .map(|row| (row, weight.fraction))
                .ok_or_else(|| AggregationError::MissingTractIndicator {
                    service_area_id: service_area_id.to_string(),
                    geoid: weight.geoid.clone(),
                })
        })
        .collect::<Result<Vec<(&IndicatorRow, f64)>, _>>()?;

    let weight_sum: f64 = rows.iter().map(|(_, fraction)| fraction).sum();
    if weight_sum.abs() <= 0.0 || !weight_sum.is_finite() {
        return Err(AggregationError::UndefinedAggregation {
            service_area_id: service_area_id.to_string(),
        });
    }

    let mean = |indicator: Indicator| {
        rows.iter()
            .map(|(row, fraction)| row.get(indicator) * fraction)
            .sum::<f64>()
            / weight_sum
    };

    log::debug!(
        "Aggregated {} tracts for {service_area_id} (weight sum {weight_sum:.4})",
        rows.len()
    );

    Ok(AggregatedIndicators {
        service_area_id: service_area_id.to_string(),
        total_population: mean(Indicator::TotalPopulation),
        median_household_income: mean(Indicator::MedianHouseholdIncome),
        unemployed_count: mean(Indicator::UnemployedCount),
        poverty_rate: mean(Indicator::PovertyRate),
        avg_household_size: mean(Indicator::AvgHouseholdSize),
        tract_count: rows.len(),
        weight_sum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(geoid: &str, income: f64, household: f64) -> IndicatorRow {
        IndicatorRow {
            geoid: geoid.to_string(),
            total_population: 1_000.0,
            median_household_income: income,
            unemployed_count: 50.0,
            poverty_rate: 0.2,
            avg_household_size: household,
        }
    }

    fn weight(geoid: &str, fraction: f64) -> OverlapWeight {
        OverlapWeight {
            geoid: geoid.to_string(),
            fraction,
        }
    }

    #[test]
    fn full_containment_reproduces_the_tract() {
        let tract = IndicatorRow {
            geoid: "48479001700".to_string(),
            total_population: 4_321.0,
            median_household_income: 38_500.0,
            unemployed_count: 211.0,
            poverty_rate: 0.31,
            avg_household_size: 3.4,
        };
        let table = IndicatorTable::from_rows([tract.clone()]);

        let result = aggregate("TX2400001", &[weight("48479001700", 1.0)], &table).unwrap();

        for indicator in Indicator::ALL {
            assert!((result.get(indicator) - tract.get(indicator)).abs() < 1e-9);
        }
        assert_eq!(result.tract_count, 1);
    }

    #[test]
    fn half_weights_average_income() {
        let table = IndicatorTable::from_rows([
            row("48001000100", 40_000.0, 3.0),
            row("48001000200", 60_000.0, 3.0),
        ]);

        let result = aggregate(
            "TX0010001",
            &[weight("48001000100", 0.5), weight("48001000200", 0.5)],
            &table,
        )
        .unwrap();

        assert!((result.median_household_income - 50_000.0).abs() < 1e-9);
        assert!((result.weight_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weights_need_not_sum_to_one() {
        let table = IndicatorTable::from_rows([
            row("48001000100", 30_000.0, 2.0),
            row("48001000200", 60_000.0, 4.0),
        ]);

        let result = aggregate(
            "TX0010001",
            &[weight("48001000100", 0.2), weight("48001000200", 0.1)],
            &table,
        )
        .unwrap();

        assert!((result.median_household_income - 40_000.0).abs() < 1e-9);
        assert!((result.avg_household_size - 8.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn missing_income_pulls_the_mean_down() {
        // A normalized "missing" income is zero, and still carries weight.
        let table = IndicatorTable::from_rows([
            row("48001000100", 0.0, 3.0),
            row("48001000200", 60_000.0, 3.0),
        ]);

        let result = aggregate(
            "TX0010001",
            &[weight("48001000100", 0.5), weight("48001000200", 0.5)],
            &table,
        )
        .unwrap();

        assert!((result.median_household_income - 30_000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_weight_sum_is_undefined() {
        let table = IndicatorTable::from_rows([row("48001000100", 40_000.0, 3.0)]);

        assert_eq!(
            aggregate("TX0010001", &[weight("48001000100", 0.0)], &table),
            Err(AggregationError::UndefinedAggregation {
                service_area_id: "TX0010001".to_string(),
            })
        );
        assert!(matches!(
            aggregate("TX0010001", &[], &table),
            Err(AggregationError::UndefinedAggregation { .. })
        ));
    }

    #[test]
    fn missing_tract_is_reported_before_zero_sum() {
        let table = IndicatorTable::from_rows([row("48001000100", 40_000.0, 3.0)]);

        assert_eq!(
            aggregate(
                "TX0010001",
                &[weight("48001000100", 0.0), weight("48999999999", 0.0)],
                &table,
            ),
            Err(AggregationError::MissingTractIndicator {
                service_area_id: "TX0010001".to_string(),
                geoid: "48999999999".to_string(),
            })
        );
    }
}
