//! Activity data, company financials, industry templates, suggestion
//! parameters and sustainability targets.

use carbonledger_core::entities::{
    ActivityData, ActivityKind, CompanyFinancials, IndustryTemplate, Scope, SuggestionParameter,
    SustainabilityTarget, TargetMetric,
};
use carbonledger_core::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct ActivityDataRow {
    id: Uuid,
    facility_id: Uuid,
    activity_kind: String,
    quantity: Decimal,
    unit: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    scope: String,
    calculated_co2e_kg: Option<Decimal>,
    is_fallback_calculation: bool,
    is_simulation: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityDataRow> for ActivityData {
    type Error = AppError;

    fn try_from(row: ActivityDataRow) -> Result<Self, Self::Error> {
        Ok(ActivityData {
            id: row.id,
            facility_id: row.facility_id,
            activity_kind: parse_activity_kind(&row.activity_kind)?,
            quantity: row.quantity,
            unit: row.unit,
            start_date: row.start_date,
            end_date: row.end_date,
            scope: parse_scope(&row.scope)?,
            calculated_co2e_kg: row.calculated_co2e_kg,
            is_fallback_calculation: row.is_fallback_calculation,
            is_simulation: row.is_simulation,
            created_at: row.created_at,
        })
    }
}

pub fn parse_activity_kind(raw: &str) -> AppResult<ActivityKind> {
    match raw {
        "electricity" => Ok(ActivityKind::Electricity),
        "natural_gas" => Ok(ActivityKind::NaturalGas),
        "diesel_fuel" => Ok(ActivityKind::DieselFuel),
        other => Err(AppError::Internal(format!("unknown activity_kind {other}"))),
    }
}

pub fn parse_scope(raw: &str) -> AppResult<Scope> {
    match raw {
        "scope1" => Ok(Scope::Scope1),
        "scope2" => Ok(Scope::Scope2),
        "scope3" => Ok(Scope::Scope3),
        other => Err(AppError::Internal(format!("unknown scope {other}"))),
    }
}

pub fn scope_str(scope: Scope) -> &'static str {
    match scope {
        Scope::Scope1 => "scope1",
        Scope::Scope2 => "scope2",
        Scope::Scope3 => "scope3",
    }
}

#[derive(FromRow)]
struct TargetRow {
    id: Uuid,
    company_id: Uuid,
    metric: String,
    target_value: Decimal,
    target_year: i32,
    baseline_year: i32,
    baseline_value: Decimal,
}

impl TryFrom<TargetRow> for SustainabilityTarget {
    type Error = AppError;

    fn try_from(row: TargetRow) -> Result<Self, Self::Error> {
        let metric = match row.metric.as_str() {
            "total_co2e" => TargetMetric::TotalCo2e,
            "scope1_co2e" => TargetMetric::Scope1Co2e,
            "scope2_co2e" => TargetMetric::Scope2Co2e,
            "intensity" => TargetMetric::Intensity,
            other => return Err(AppError::Internal(format!("unknown target metric {other}"))),
        };
        Ok(SustainabilityTarget {
            id: row.id,
            company_id: row.company_id,
            metric,
            target_value: row.target_value,
            target_year: row.target_year,
            baseline_year: row.baseline_year,
            baseline_value: row.baseline_value,
        })
    }
}

#[derive(Clone)]
pub struct ActivityDataRepository {
    pool: PgPool,
}

impl ActivityDataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, activity: &ActivityData) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO activity_data
             (id, facility_id, activity_kind, quantity, unit, start_date, end_date, scope,
              calculated_co2e_kg, is_fallback_calculation, is_simulation, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(activity.id)
        .bind(activity.facility_id)
        .bind(activity.activity_kind.as_str())
        .bind(activity.quantity)
        .bind(&activity.unit)
        .bind(activity.start_date)
        .bind(activity.end_date)
        .bind(scope_str(activity.scope))
        .bind(activity.calculated_co2e_kg)
        .bind(activity.is_fallback_calculation)
        .bind(activity.is_simulation)
        .bind(activity.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_calculation(
        &self,
        id: Uuid,
        co2e_kg: Decimal,
        is_fallback: bool,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE activity_data SET calculated_co2e_kg = $2, is_fallback_calculation = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(co2e_kg)
        .bind(is_fallback)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overwrites a row's reported quantity/unit/dates (spec's activity
    /// correction flow) ahead of a fresh CO2e calculation. Scope follows
    /// from `activity_kind`, which is immutable once created.
    pub async fn update_fields(
        &self,
        id: Uuid,
        quantity: Decimal,
        unit: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE activity_data SET quantity = $2, unit = $3, start_date = $4, end_date = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(quantity)
        .bind(unit)
        .bind(start_date)
        .bind(end_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<ActivityData> {
        let row = sqlx::query_as::<_, ActivityDataRow>(
            "SELECT id, facility_id, activity_kind, quantity, unit, start_date, end_date, scope,
                    calculated_co2e_kg, is_fallback_calculation, is_simulation, created_at
             FROM activity_data WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    /// Real (non-simulation) records for a facility within a date window, used by
    /// reporting and benchmarking.
    pub async fn list_for_facility_in_range(
        &self,
        facility_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<ActivityData>> {
        let rows = sqlx::query_as::<_, ActivityDataRow>(
            "SELECT id, facility_id, activity_kind, quantity, unit, start_date, end_date, scope,
                    calculated_co2e_kg, is_fallback_calculation, is_simulation, created_at
             FROM activity_data
             WHERE facility_id = $1 AND is_simulation = FALSE
               AND start_date <= $3 AND end_date >= $2
             ORDER BY start_date",
        )
        .bind(facility_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ActivityData::try_from).collect()
    }

    pub async fn list_for_company_in_range(
        &self,
        company_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<ActivityData>> {
        let rows = sqlx::query_as::<_, ActivityDataRow>(
            "SELECT a.id, a.facility_id, a.activity_kind, a.quantity, a.unit, a.start_date,
                    a.end_date, a.scope, a.calculated_co2e_kg, a.is_fallback_calculation,
                    a.is_simulation, a.created_at
             FROM activity_data a
             JOIN facilities f ON f.id = a.facility_id
             WHERE f.company_id = $1 AND a.is_simulation = FALSE
               AND a.start_date <= $3 AND a.end_date >= $2",
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ActivityData::try_from).collect()
    }

    /// Per-company electricity totals for the industry since `since`, across
    /// non-simulation records. Used by the weekly industry benchmark refresh
    /// (spec §4.H): each entry is one company's summed consumption, forming
    /// the distribution the mean/20th-percentile are drawn from.
    pub async fn list_electricity_totals_by_company_for_industry(
        &self,
        industry_type: &str,
        since: NaiveDate,
    ) -> AppResult<Vec<(Uuid, Decimal)>> {
        let rows: Vec<(Uuid, Decimal)> = sqlx::query_as(
            "SELECT c.id, SUM(a.quantity)
             FROM activity_data a
             JOIN facilities f ON f.id = a.facility_id
             JOIN companies c ON c.id = f.company_id
             WHERE c.industry_type = $1 AND a.activity_kind = 'electricity'
               AND a.is_simulation = FALSE AND a.start_date >= $2
             GROUP BY c.id",
        )
        .bind(industry_type)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Last 365 days of electricity consumption for the industry, across
    /// non-fallback, non-simulation records. Used by the weekly benchmark refresh.
    pub async fn list_electricity_for_industry(
        &self,
        industry_type: &str,
        since: NaiveDate,
    ) -> AppResult<Vec<Decimal>> {
        let values: Vec<(Decimal,)> = sqlx::query_as(
            "SELECT a.quantity
             FROM activity_data a
             JOIN facilities f ON f.id = a.facility_id
             JOIN companies c ON c.id = f.company_id
             WHERE c.industry_type = $1 AND a.activity_kind = 'electricity'
               AND a.is_simulation = FALSE AND a.is_fallback_calculation = FALSE
               AND a.start_date >= $2",
        )
        .bind(industry_type)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(values.into_iter().map(|(q,)| q).collect())
    }

    /// The most recent electricity quantity reported for a company, and the
    /// 30-day mean leading up to (and including) it — the two numbers the
    /// daily anomaly detector compares (spec §4.H).
    pub async fn recent_electricity_vs_mean(
        &self,
        company_id: Uuid,
        window_start: NaiveDate,
    ) -> AppResult<Option<(Decimal, Decimal)>> {
        let rows: Vec<(Decimal, NaiveDate)> = sqlx::query_as(
            "SELECT a.quantity, a.start_date
             FROM activity_data a
             JOIN facilities f ON f.id = a.facility_id
             WHERE f.company_id = $1 AND a.activity_kind = 'electricity'
               AND a.is_simulation = FALSE AND a.start_date >= $2
             ORDER BY a.start_date DESC",
        )
        .bind(company_id)
        .bind(window_start)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        let recent = rows[0].0;
        let mean = rows.iter().map(|(q, _)| *q).sum::<Decimal>() / Decimal::from(rows.len());
        Ok(Some((recent, mean)))
    }
}

#[derive(Clone)]
pub struct CompanyFinancialsRepository {
    pool: PgPool,
}

impl CompanyFinancialsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, company_id: Uuid) -> AppResult<Option<CompanyFinancials>> {
        let row = sqlx::query_as::<_, CompanyFinancials>(
            "SELECT company_id, avg_electricity_cost_kwh, avg_gas_cost_m3, updated_at
             FROM company_financials WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn upsert(&self, financials: &CompanyFinancials) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO company_financials (company_id, avg_electricity_cost_kwh, avg_gas_cost_m3, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (company_id) DO UPDATE SET
                avg_electricity_cost_kwh = EXCLUDED.avg_electricity_cost_kwh,
                avg_gas_cost_m3 = EXCLUDED.avg_gas_cost_m3,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(financials.company_id)
        .bind(financials.avg_electricity_cost_kwh)
        .bind(financials.avg_gas_cost_m3)
        .bind(financials.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct IndustryTemplateRepository {
    pool: PgPool,
}

impl IndustryTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_industry(&self, industry_type: &str) -> AppResult<Option<IndustryTemplate>> {
        let row = sqlx::query_as::<_, IndustryTemplate>(
            "SELECT id, industry_type, typical_kwh_per_employee, typical_fuel_per_vehicle,
                    best_in_class_electricity_kwh, average_electricity_kwh, cost_ratio
             FROM industry_templates WHERE industry_type = $1",
        )
        .bind(industry_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_all(&self) -> AppResult<Vec<IndustryTemplate>> {
        let rows = sqlx::query_as::<_, IndustryTemplate>(
            "SELECT id, industry_type, typical_kwh_per_employee, typical_fuel_per_vehicle,
                    best_in_class_electricity_kwh, average_electricity_kwh, cost_ratio
             FROM industry_templates",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Overwrites the distribution-derived columns after the weekly
    /// benchmark refresh (spec §4.H).
    pub async fn update_benchmark(
        &self,
        industry_type: &str,
        average_electricity_kwh: Decimal,
        best_in_class_electricity_kwh: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE industry_templates
             SET average_electricity_kwh = $2, best_in_class_electricity_kwh = $3
             WHERE industry_type = $1",
        )
        .bind(industry_type)
        .bind(average_electricity_kwh)
        .bind(best_in_class_electricity_kwh)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SuggestionParameterRepository {
    pool: PgPool,
}

impl SuggestionParameterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, key: &str) -> AppResult<Option<SuggestionParameter>> {
        let row = sqlx::query_as::<_, SuggestionParameter>(
            "SELECT key, value, description FROM suggestion_parameters WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_all(&self) -> AppResult<Vec<SuggestionParameter>> {
        let rows = sqlx::query_as::<_, SuggestionParameter>(
            "SELECT key, value, description FROM suggestion_parameters",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
pub struct SustainabilityTargetRepository {
    pool: PgPool,
}

impl SustainabilityTargetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, target: &SustainabilityTarget) -> AppResult<()> {
        let metric = match target.metric {
            TargetMetric::TotalCo2e => "total_co2e",
            TargetMetric::Scope1Co2e => "scope1_co2e",
            TargetMetric::Scope2Co2e => "scope2_co2e",
            TargetMetric::Intensity => "intensity",
        };
        sqlx::query(
            "INSERT INTO sustainability_targets
             (id, company_id, metric, target_value, target_year, baseline_year, baseline_value)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(target.id)
        .bind(target.company_id)
        .bind(metric)
        .bind(target.target_value)
        .bind(target.target_year)
        .bind(target.baseline_year)
        .bind(target.baseline_value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_by_company(&self, company_id: Uuid) -> AppResult<Vec<SustainabilityTarget>> {
        let rows = sqlx::query_as::<_, TargetRow>(
            "SELECT id, company_id, metric, target_value, target_year, baseline_year, baseline_value
             FROM sustainability_targets WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SustainabilityTarget::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_kind_round_trips_through_its_column_encoding() {
        for kind in [ActivityKind::Electricity, ActivityKind::NaturalGas, ActivityKind::DieselFuel] {
            assert_eq!(parse_activity_kind(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn scope_round_trips_through_its_column_encoding() {
        for scope in [Scope::Scope1, Scope::Scope2, Scope::Scope3] {
            assert_eq!(parse_scope(scope_str(scope)).unwrap(), scope);
        }
    }
}
