//! Rooftop solar (GES) suggestion strategy (spec §4.J).

use std::collections::HashSet;

use async_trait::async_trait;
use carbonledger_core::entities::{ActivityKind, Company, Facility, FacilityType};
use carbonledger_core::error::AppResult;
use carbonledger_storage::repositories::activity::{ActivityDataRepository, CompanyFinancialsRepository};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::params::{city_solar_factor, get_or};
use crate::strategy::{InfoSuggestion, Parameters, Suggestion, SuggestionOutcome, SuggestionStrategy};

const MIN_MONTHS_HISTORY: usize = 9;
const MIN_ANNUAL_KWH: Decimal = dec!(10_000);

pub struct SolarSuggestionStrategy {
    activity: ActivityDataRepository,
    financials: CompanyFinancialsRepository,
}

impl SolarSuggestionStrategy {
    pub fn new(activity: ActivityDataRepository, financials: CompanyFinancialsRepository) -> Self {
        Self { activity, financials }
    }
}

#[async_trait]
impl SuggestionStrategy for SolarSuggestionStrategy {
    fn name(&self) -> &'static str {
        "solar_ges"
    }

    fn is_applicable(&self, _company: &Company, facility: &Facility, _params: &Parameters) -> bool {
        matches!(facility.facility_type, FacilityType::Production | FacilityType::Warehouse)
    }

    async fn generate(
        &self,
        company: &Company,
        facility: &Facility,
        params: &Parameters,
    ) -> AppResult<Vec<SuggestionOutcome>> {
        let Some(financials) = self.financials.find(company.id).await? else {
            return Ok(Vec::new());
        };
        let Some(unit_cost) = financials.avg_electricity_cost_kwh else {
            return Ok(Vec::new());
        };

        let today = Utc::now().date_naive();
        let window_start = today - chrono::Duration::days(365);
        let history = self
            .activity
            .list_for_facility_in_range(facility.id, window_start, today)
            .await?
            .into_iter()
            .filter(|a| a.activity_kind == ActivityKind::Electricity)
            .collect::<Vec<_>>();

        let months_covered: HashSet<(i32, u32)> = history
            .iter()
            .map(|a| (a.start_date.year(), a.start_date.month()))
            .collect();

        if months_covered.len() < MIN_MONTHS_HISTORY {
            return Ok(vec![SuggestionOutcome::Info(InfoSuggestion {
                strategy: self.name(),
                facility_id: facility.id,
                reason_code: "insufficient_data",
                message: format!(
                    "{} months of electricity history found; at least {MIN_MONTHS_HISTORY} are required",
                    months_covered.len()
                ),
            })]);
        }

        let total_kwh: Decimal = history.iter().map(|a| a.quantity).sum();
        let annual_kwh = total_kwh / Decimal::from(months_covered.len()) * dec!(12);

        if annual_kwh < MIN_ANNUAL_KWH {
            return Ok(vec![SuggestionOutcome::Info(InfoSuggestion {
                strategy: self.name(),
                facility_id: facility.id,
                reason_code: "low_consumption",
                message: format!("estimated annual consumption of {annual_kwh} kWh is below the 10,000 kWh floor"),
            })]);
        }

        let savings_factor = get_or(params, "solar_savings_factor", dec!(0.8));
        let base_kwh_per_kwp = get_or(params, "solar_base_kwh_per_kwp", dec!(1450));
        let cost_per_kwp = get_or(params, "solar_cost_per_kwp", dec!(8000));
        let max_roi_years = get_or(params, "ges_max_roi_years", dec!(10));

        let city_factor = city_solar_factor(params, &facility.city);
        let required_kwp = annual_kwh * savings_factor / (base_kwh_per_kwp * city_factor);
        let investment = required_kwp * cost_per_kwp;
        let annual_saving = annual_kwh * unit_cost * savings_factor;

        if annual_saving <= Decimal::ZERO {
            return Ok(Vec::new());
        }
        let payback_years = investment / annual_saving;

        if payback_years > max_roi_years {
            return Ok(vec![SuggestionOutcome::Info(InfoSuggestion {
                strategy: self.name(),
                facility_id: facility.id,
                reason_code: "payback_too_long",
                message: format!("payback of {payback_years:.1} years exceeds the {max_roi_years}-year threshold"),
            })]);
        }

        let savings_percent = savings_factor * dec!(100);
        Ok(vec![SuggestionOutcome::Actionable(Suggestion {
            strategy: self.name(),
            facility_id: facility.id,
            description: format!(
                "Install a {required_kwp:.1} kWp rooftop solar array to offset roughly {savings_percent:.0}% of electricity consumption."
            ),
            annual_saving_try: annual_saving,
            investment_try: investment,
            payback_years,
            calculation_details: json!({
                "annual_kwh": annual_kwh,
                "months_of_history": months_covered.len(),
                "required_kwp": required_kwp,
                "city_solar_factor": city_factor,
                "base_kwh_per_kwp": base_kwh_per_kwp,
                "cost_per_kwp": cost_per_kwp,
                "savings_factor": savings_factor,
                "unit_cost_try_per_kwh": unit_cost,
            }),
        })])
    }
}
