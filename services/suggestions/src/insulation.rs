//! Building envelope insulation suggestion strategy (spec §4.J).

use std::collections::HashSet;

use async_trait::async_trait;
use carbonledger_core::entities::{ActivityKind, Company, Facility, FacilityType};
use carbonledger_core::error::AppResult;
use carbonledger_storage::repositories::activity::{ActivityDataRepository, CompanyFinancialsRepository};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::params::{city_heating_factor, get_or};
use crate::strategy::{InfoSuggestion, Parameters, Suggestion, SuggestionOutcome, SuggestionStrategy};

const MIN_MONTHS_HISTORY: usize = 6;

pub struct InsulationSuggestionStrategy {
    activity: ActivityDataRepository,
    financials: CompanyFinancialsRepository,
}

impl InsulationSuggestionStrategy {
    pub fn new(activity: ActivityDataRepository, financials: CompanyFinancialsRepository) -> Self {
        Self { activity, financials }
    }
}

#[async_trait]
impl SuggestionStrategy for InsulationSuggestionStrategy {
    fn name(&self) -> &'static str {
        "insulation"
    }

    fn is_applicable(&self, _company: &Company, facility: &Facility, _params: &Parameters) -> bool {
        facility.facility_type == FacilityType::Office
            && facility.surface_area_m2.map(|a| a > Decimal::ZERO).unwrap_or(false)
    }

    async fn generate(
        &self,
        company: &Company,
        facility: &Facility,
        params: &Parameters,
    ) -> AppResult<Vec<SuggestionOutcome>> {
        let Some(area) = facility.surface_area_m2 else {
            return Ok(Vec::new());
        };
        let Some(financials) = self.financials.find(company.id).await? else {
            return Ok(Vec::new());
        };
        let Some(unit_cost) = financials.avg_gas_cost_m3 else {
            return Ok(Vec::new());
        };

        let today = Utc::now().date_naive();
        let window_start = today - chrono::Duration::days(365);
        let history = self
            .activity
            .list_for_facility_in_range(facility.id, window_start, today)
            .await?
            .into_iter()
            .filter(|a| a.activity_kind == ActivityKind::NaturalGas)
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
                    "{} months of gas history found; at least {MIN_MONTHS_HISTORY} are required",
                    months_covered.len()
                ),
            })]);
        }

        let base_savings_per_m2 = get_or(params, "insulation_base_savings_per_m2", dec!(8.5));
        let cost_per_m2 = get_or(params, "insulation_cost_per_m2", dec!(150));
        let max_roi_years = get_or(params, "insulation_max_roi_years", dec!(12));

        let heating_factor = city_heating_factor(params, &facility.city);
        let annual_saving_m3 = area * base_savings_per_m2 * heating_factor;
        let annual_saving_try = annual_saving_m3 * unit_cost;
        let investment = area * cost_per_m2;

        if annual_saving_try <= Decimal::ZERO {
            return Ok(Vec::new());
        }
        let payback_years = investment / annual_saving_try;

        if payback_years > max_roi_years {
            return Ok(vec![SuggestionOutcome::Info(InfoSuggestion {
                strategy: self.name(),
                facility_id: facility.id,
                reason_code: "payback_too_long",
                message: format!("payback of {payback_years:.1} years exceeds the {max_roi_years}-year threshold"),
            })]);
        }

        Ok(vec![SuggestionOutcome::Actionable(Suggestion {
            strategy: self.name(),
            facility_id: facility.id,
            description: format!(
                "Upgrade building envelope insulation across {area} m² to cut heating gas consumption."
            ),
            annual_saving_try,
            investment_try: investment,
            payback_years,
            calculation_details: json!({
                "surface_area_m2": area,
                "months_of_history": months_covered.len(),
                "base_savings_per_m2": base_savings_per_m2,
                "city_heating_factor": heating_factor,
                "cost_per_m2": cost_per_m2,
                "unit_cost_try_per_m3": unit_cost,
            }),
        })])
    }
}
