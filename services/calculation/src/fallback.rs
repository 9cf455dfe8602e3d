//! Internal fallback provider: built-in DEFRA-class factors for the three
//! supported activities (spec §4.C.2). Used whenever the remote provider
//! is unreachable, returns a 5xx, or no API key is configured. Always
//! tags its result `is_fallback = true`.

use async_trait::async_trait;
use carbonledger_core::entities::ActivityKind;
use carbonledger_core::error::{AppError, AppResult};
use chrono::Datelike;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::provider::{ActivityQuantity, CalculationProvider, CalculationResult};

/// Converts an input quantity/unit into the factor's base unit
/// (kWh for electricity, m3 for gas and diesel).
fn to_base_unit(kind: ActivityKind, quantity: Decimal, unit: &str) -> AppResult<Decimal> {
    let unit = unit.to_ascii_lowercase();
    match kind {
        ActivityKind::Electricity => match unit.as_str() {
            "kwh" => Ok(quantity),
            "mwh" => Ok(quantity * dec!(1000)),
            "gj" => Ok(quantity * dec!(277.778)),
            "wh" => Ok(quantity / dec!(1000)),
            other => Err(AppError::validation("unit", format!("unknown electricity unit '{other}'"))),
        },
        ActivityKind::NaturalGas | ActivityKind::DieselFuel => match unit.as_str() {
            "m3" => Ok(quantity),
            "l" => Ok(quantity / dec!(1000)),
            "gal" => Ok(quantity * dec!(0.00378541)),
            "bbl" => Ok(quantity * dec!(0.158987)),
            other => Err(AppError::validation("unit", format!("unknown volume unit '{other}'"))),
        },
    }
}

/// DEFRA-class default emission factor, kg CO2e per base unit.
fn default_factor(kind: ActivityKind) -> (Decimal, &'static str) {
    match kind {
        ActivityKind::Electricity => (dec!(0.475), "defra_electricity_grid_avg"),
        ActivityKind::NaturalGas => (dec!(2.03), "defra_natural_gas_m3"),
        ActivityKind::DieselFuel => (dec!(2.68), "defra_diesel_fuel_l"),
    }
}

/// Built-in factor table, always tagged as a fallback result.
pub struct InternalFallbackProvider;

impl Default for InternalFallbackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalFallbackProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CalculationProvider for InternalFallbackProvider {
    async fn calculate_for_activity(&self, activity: &ActivityQuantity) -> AppResult<CalculationResult> {
        let base_quantity = to_base_unit(activity.activity_kind, activity.quantity, &activity.unit)?;
        // Diesel's default factor is kg/L; gas and electricity factors above
        // are already per their respective base unit, but diesel's base
        // unit is liters, not cubic meters — normalise here.
        let base_quantity = if activity.activity_kind == ActivityKind::DieselFuel {
            base_quantity * dec!(1000)
        } else {
            base_quantity
        };

        let (factor_value, factor_id) = default_factor(activity.activity_kind);
        let total_co2e_kg = base_quantity * factor_value;

        Ok(CalculationResult {
            total_co2e_kg,
            scope: activity.activity_kind.derived_scope(),
            factor_id: factor_id.to_string(),
            factor_value,
            year: activity.year.unwrap_or_else(|| chrono::Utc::now().year()),
            is_fallback: true,
        })
    }

    fn get_provider_name(&self) -> &'static str {
        "internal_fallback"
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn electricity_kwh_matches_worked_example() {
        let provider = InternalFallbackProvider::new();
        let result = provider
            .calculate_for_activity(&ActivityQuantity {
                activity_kind: ActivityKind::Electricity,
                quantity: dec!(1500),
                unit: "kWh".into(),
                region: None,
                year: Some(2024),
            })
            .await
            .unwrap();

        assert_eq!(result.total_co2e_kg, dec!(712.5));
        assert!(result.is_fallback);
    }

    #[tokio::test]
    async fn unknown_unit_is_a_validation_error_not_a_panic() {
        let provider = InternalFallbackProvider::new();
        let err = provider
            .calculate_for_activity(&ActivityQuantity {
                activity_kind: ActivityKind::Electricity,
                quantity: dec!(10),
                unit: "BTU".into(),
                region: None,
                year: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn diesel_liters_convert_through_cubic_meters_correctly() {
        let provider = InternalFallbackProvider::new();
        let result = provider
            .calculate_for_activity(&ActivityQuantity {
                activity_kind: ActivityKind::DieselFuel,
                quantity: dec!(100),
                unit: "l".into(),
                region: None,
                year: Some(2024),
            })
            .await
            .unwrap();
        // 100 L * 2.68 kg/L
        assert_eq!(result.total_co2e_kg, dec!(268.0));
    }
}
