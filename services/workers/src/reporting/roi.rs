//! ROI analysis (spec §4.G): for a company's last 12 months of activity,
//! project per-measure savings/investment/payback/NPV/IRR and rank the
//! top three, with a portfolio rollup.

use carbonledger_core::entities::{ActivityData, ActivityKind, CompanyFinancials};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

const DEFAULT_ELECTRICITY_TL_PER_KWH: Decimal = dec!(4.5);
const DEFAULT_GAS_TL_PER_M3: Decimal = dec!(15);
const DEFAULT_DIESEL_TL_PER_L: Decimal = dec!(35);
const DISCOUNT_RATE: Decimal = dec!(0.15);
const MAX_PAYBACK_MONTHS: Decimal = dec!(999);

#[derive(Debug, Clone, Copy)]
pub enum Measure {
    LightingUpgrade,
    HvacOptimization,
    InsulationImprovement,
    SolarPanel,
    EnergyManagement,
    ProcessOptimization,
}

impl Measure {
    pub const ALL: [Measure; 6] = [
        Measure::LightingUpgrade,
        Measure::HvacOptimization,
        Measure::InsulationImprovement,
        Measure::SolarPanel,
        Measure::EnergyManagement,
        Measure::ProcessOptimization,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Measure::LightingUpgrade => "lighting_upgrade",
            Measure::HvacOptimization => "hvac_optimization",
            Measure::InsulationImprovement => "insulation_improvement",
            Measure::SolarPanel => "solar_panel",
            Measure::EnergyManagement => "energy_management",
            Measure::ProcessOptimization => "process_optimization",
        }
    }

    /// Fraction of current consumption/cost the measure is assumed to save.
    fn potential(self) -> Decimal {
        match self {
            Measure::LightingUpgrade => dec!(0.30),
            Measure::HvacOptimization => dec!(0.25),
            Measure::InsulationImprovement => dec!(0.20),
            Measure::SolarPanel => dec!(0.40),
            Measure::EnergyManagement => dec!(0.15),
            Measure::ProcessOptimization => dec!(0.18),
        }
    }

    /// NPV horizon in years, per measure class (spec §4.G: "5- or 25-year NPV").
    fn npv_horizon_years(self) -> u32 {
        match self {
            Measure::SolarPanel | Measure::InsulationImprovement => 25,
            _ => 5,
        }
    }

    /// Investment cost. Fixed-cost measures ignore the consumption baseline;
    /// capacity-scaled measures use it.
    fn investment(self, baseline: &ConsumptionBaseline) -> Decimal {
        match self {
            Measure::LightingUpgrade => dec!(500) * baseline.peak_kw_estimate(),
            Measure::HvacOptimization => dec!(1200) * baseline.peak_kw_estimate(),
            Measure::InsulationImprovement => dec!(150) * baseline.wall_area_m2_estimate(),
            Measure::SolarPanel => dec!(8000) * baseline.solar_kwp_estimate(),
            Measure::EnergyManagement => dec!(50_000),
            Measure::ProcessOptimization => dec!(100_000),
        }
    }
}

/// The inputs derived from a facility's last 12 months of activity that
/// every measure's cost-basis estimate depends on.
pub struct ConsumptionBaseline {
    pub annual_electricity_kwh: Decimal,
    pub annual_gas_m3: Decimal,
    pub annual_diesel_l: Decimal,
    pub annual_co2e_kg: Decimal,
    pub electricity_tl_per_kwh: Decimal,
    pub gas_tl_per_m3: Decimal,
    pub diesel_tl_per_l: Decimal,
}

impl ConsumptionBaseline {
    pub fn from_activity(activity: &[ActivityData], financials: Option<&CompanyFinancials>) -> Self {
        let mut annual_electricity_kwh = Decimal::ZERO;
        let mut annual_gas_m3 = Decimal::ZERO;
        let mut annual_diesel_l = Decimal::ZERO;
        let mut annual_co2e_kg = Decimal::ZERO;

        for row in activity {
            if let Some(co2e) = row.calculated_co2e_kg {
                annual_co2e_kg += co2e;
            }
            match row.activity_kind {
                ActivityKind::Electricity => annual_electricity_kwh += row.quantity,
                ActivityKind::NaturalGas => annual_gas_m3 += row.quantity,
                ActivityKind::DieselFuel => annual_diesel_l += row.quantity,
            }
        }

        Self {
            annual_electricity_kwh,
            annual_gas_m3,
            annual_diesel_l,
            annual_co2e_kg,
            electricity_tl_per_kwh: financials
                .and_then(|f| f.avg_electricity_cost_kwh)
                .unwrap_or(DEFAULT_ELECTRICITY_TL_PER_KWH),
            gas_tl_per_m3: financials
                .and_then(|f| f.avg_gas_cost_m3)
                .unwrap_or(DEFAULT_GAS_TL_PER_M3),
            diesel_tl_per_l: DEFAULT_DIESEL_TL_PER_L,
        }
    }

    /// A rough capacity estimate for lighting/HVAC measures: annual kWh
    /// spread over a notional 2,000 operating hours per year.
    fn peak_kw_estimate(&self) -> Decimal {
        if self.annual_electricity_kwh.is_zero() {
            Decimal::ZERO
        } else {
            self.annual_electricity_kwh / dec!(2000)
        }
    }

    /// A rough wall-area proxy: one square metre of wall per 50 kWh of
    /// annual gas-equivalent heating load.
    fn wall_area_m2_estimate(&self) -> Decimal {
        self.annual_gas_m3 / dec!(50)
    }

    fn solar_kwp_estimate(&self) -> Decimal {
        if self.annual_electricity_kwh.is_zero() {
            Decimal::ZERO
        } else {
            self.annual_electricity_kwh / dec!(1400)
        }
    }

    fn annual_cost_tl(&self) -> Decimal {
        self.annual_electricity_kwh * self.electricity_tl_per_kwh
            + self.annual_gas_m3 * self.gas_tl_per_m3
            + self.annual_diesel_l * self.diesel_tl_per_l
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MeasureProjection {
    pub measure: String,
    pub annual_savings_kwh_equivalent: Decimal,
    pub annual_savings_tl: Decimal,
    pub investment_tl: Decimal,
    pub payback_months: Decimal,
    pub npv_tl: Decimal,
    pub irr_percent: Decimal,
    pub co2_reduction_tonnes: Decimal,
}

fn project_measure(measure: Measure, baseline: &ConsumptionBaseline) -> Option<MeasureProjection> {
    let potential = measure.potential();
    let annual_savings_tl = baseline.annual_cost_tl() * potential;
    let investment_tl = measure.investment(baseline);

    if investment_tl <= Decimal::ZERO || annual_savings_tl <= Decimal::ZERO {
        return None;
    }

    let payback_months = (investment_tl / annual_savings_tl) * dec!(12);
    if payback_months > MAX_PAYBACK_MONTHS {
        return None;
    }

    let npv_tl = net_present_value(annual_savings_tl, investment_tl, measure.npv_horizon_years());
    let irr_percent = simplified_irr(annual_savings_tl, investment_tl);
    let co2_reduction_tonnes = (baseline.annual_co2e_kg * potential) / dec!(1000);

    Some(MeasureProjection {
        measure: measure.key().to_string(),
        annual_savings_kwh_equivalent: baseline.annual_electricity_kwh * potential,
        annual_savings_tl,
        investment_tl,
        payback_months,
        npv_tl,
        irr_percent,
        co2_reduction_tonnes,
    })
}

/// Discounted cash flow of equal annual savings at [`DISCOUNT_RATE`] minus
/// the upfront investment.
fn net_present_value(annual_savings_tl: Decimal, investment_tl: Decimal, years: u32) -> Decimal {
    let mut present_value = Decimal::ZERO;
    let mut discount_factor = Decimal::ONE;
    let denominator = Decimal::ONE + DISCOUNT_RATE;

    for _ in 0..years {
        discount_factor = discount_factor / denominator;
        present_value += annual_savings_tl * discount_factor;
    }

    present_value - investment_tl
}

/// A simplified constant-cash-flow IRR approximation: the annual savings
/// rate minus the straight-line amortised investment, expressed as a
/// percentage of the investment. Adequate for ranking, not a finance-grade
/// Newton's-method solve.
fn simplified_irr(annual_savings_tl: Decimal, investment_tl: Decimal) -> Decimal {
    if investment_tl.is_zero() {
        return Decimal::ZERO;
    }
    (annual_savings_tl / investment_tl) * dec!(100) - dec!(100)
}

#[derive(Debug, Clone, Serialize)]
pub struct RoiReport {
    pub top_measures: Vec<MeasureProjection>,
    pub portfolio_investment_tl: Decimal,
    pub portfolio_annual_savings_tl: Decimal,
    pub average_payback_months: Decimal,
}

/// Project every measure, rank by payback (ties broken by higher annual TL
/// savings), and keep the top three with a portfolio rollup (spec §4.G).
pub fn analyze(baseline: &ConsumptionBaseline) -> RoiReport {
    let mut projections: Vec<MeasureProjection> = Measure::ALL
        .into_iter()
        .filter_map(|measure| project_measure(measure, baseline))
        .collect();

    projections.sort_by(|a, b| {
        a.payback_months
            .cmp(&b.payback_months)
            .then_with(|| b.annual_savings_tl.cmp(&a.annual_savings_tl))
    });
    projections.truncate(3);

    let portfolio_investment_tl: Decimal = projections.iter().map(|p| p.investment_tl).sum();
    let portfolio_annual_savings_tl: Decimal = projections.iter().map(|p| p.annual_savings_tl).sum();
    let average_payback_months = if projections.is_empty() {
        Decimal::ZERO
    } else {
        projections.iter().map(|p| p.payback_months).sum::<Decimal>()
            / Decimal::from(projections.len())
    };

    RoiReport {
        top_measures: projections,
        portfolio_investment_tl,
        portfolio_annual_savings_tl,
        average_payback_months,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonledger_core::entities::Scope;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn activity_row(kind: ActivityKind, quantity: Decimal, co2e_kg: Decimal) -> ActivityData {
        ActivityData {
            id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            activity_kind: kind,
            quantity,
            unit: "kWh".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            scope: match kind {
                ActivityKind::Electricity => Scope::Scope2,
                _ => Scope::Scope1,
            },
            calculated_co2e_kg: Some(co2e_kg),
            is_fallback_calculation: false,
            is_simulation: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn measures_with_no_positive_investment_are_excluded() {
        let baseline = ConsumptionBaseline::from_activity(&[], None);
        let report = analyze(&baseline);
        assert!(report.top_measures.is_empty());
    }

    #[test]
    fn ranks_top_three_by_payback_with_tie_break_on_higher_savings() {
        let activity = vec![
            activity_row(ActivityKind::Electricity, dec!(200_000), dec!(95_000)),
            activity_row(ActivityKind::NaturalGas, dec!(40_000), dec!(81_200)),
        ];
        let baseline = ConsumptionBaseline::from_activity(&activity, None);
        let report = analyze(&baseline);

        assert!(report.top_measures.len() <= 3);
        for pair in report.top_measures.windows(2) {
            assert!(pair[0].payback_months <= pair[1].payback_months);
        }
        assert_eq!(
            report.portfolio_investment_tl,
            report.top_measures.iter().map(|p| p.investment_tl).sum::<Decimal>()
        );
    }

    #[test]
    fn npv_of_a_zero_investment_equals_the_discounted_savings_stream() {
        let npv = net_present_value(dec!(10_000), dec!(0), 5);
        assert!(npv > Decimal::ZERO);
    }
}
