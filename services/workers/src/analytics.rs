//! Periodic analytics refreshes (spec §4.H): the weekly industry benchmark
//! recompute, the daily per-company anomaly scan, and the supplier
//! category benchmark (cached in-process for downstream queries, the way
//! `ConnectorRegistry` caches resolved connectors behind a `RwLock`).

use std::collections::HashMap;

use carbonledger_core::entities::{IndustryTemplate, NotificationKind};
use carbonledger_core::error::AppResult;
use carbonledger_notifications::NotificationService;
use carbonledger_storage::repositories::activity::{ActivityDataRepository, IndustryTemplateRepository};
use carbonledger_storage::repositories::core::{CompanyRepository, UserRepository};
use carbonledger_storage::repositories::supply_chain::ProductFootprintRepository;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;

/// `(recent - mean) / mean` above this ratio is flagged anomalous.
const ANOMALY_DEVIATION_THRESHOLD: Decimal = rust_decimal_macros::dec!(0.20);

/// The 20th-percentile index into a sorted-ascending distribution of `n`
/// values (nearest-rank method, matching the original's `numpy.percentile`
/// default).
fn percentile(sorted_ascending: &[Decimal], pct: f64) -> Decimal {
    if sorted_ascending.is_empty() {
        return Decimal::ZERO;
    }
    let rank = ((sorted_ascending.len() as f64 - 1.0) * pct).round() as usize;
    sorted_ascending[rank.min(sorted_ascending.len() - 1)]
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        Decimal::ZERO
    } else {
        values.iter().sum::<Decimal>() / Decimal::from(values.len())
    }
}

fn median(sorted_ascending: &[Decimal]) -> Decimal {
    let n = sorted_ascending.len();
    if n == 0 {
        return Decimal::ZERO;
    }
    if n % 2 == 1 {
        sorted_ascending[n / 2]
    } else {
        (sorted_ascending[n / 2 - 1] + sorted_ascending[n / 2]) / Decimal::from(2)
    }
}

pub struct IndustryBenchmarkRefreshWorker {
    industry_templates: IndustryTemplateRepository,
    activity: ActivityDataRepository,
}

impl IndustryBenchmarkRefreshWorker {
    pub fn new(industry_templates: IndustryTemplateRepository, activity: ActivityDataRepository) -> Self {
        Self {
            industry_templates,
            activity,
        }
    }

    /// Runs weekly: for every IndustryTemplate, recompute
    /// `average_electricity_kwh` (arithmetic mean) and
    /// `best_in_class_electricity_kwh` (20th percentile) over the last 30
    /// days of per-company electricity totals.
    pub async fn run_once(&self) -> AppResult<usize> {
        let templates: Vec<IndustryTemplate> = self.industry_templates.list_all().await?;
        let since = Utc::now().date_naive() - Duration::days(30);
        let mut refreshed = 0;

        for template in templates {
            let totals = self
                .activity
                .list_electricity_totals_by_company_for_industry(&template.industry_type, since)
                .await?;
            if totals.is_empty() {
                continue;
            }

            let mut values: Vec<Decimal> = totals.into_iter().map(|(_, total)| total).collect();
            values.sort();

            let average = mean(&values);
            let best_in_class = percentile(&values, 0.20);

            self.industry_templates
                .update_benchmark(&template.industry_type, average, best_in_class)
                .await?;
            refreshed += 1;
        }

        tracing::info!(count = refreshed, "industry benchmark refresh complete");
        Ok(refreshed)
    }
}

pub struct AnomalyDetectionWorker {
    companies: CompanyRepository,
    users: UserRepository,
    activity: ActivityDataRepository,
    notifications: NotificationService,
}

impl AnomalyDetectionWorker {
    pub fn new(
        companies: CompanyRepository,
        users: UserRepository,
        activity: ActivityDataRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            companies,
            users,
            activity,
            notifications,
        }
    }

    /// Runs daily: for every company in `industry_type`, compare its most
    /// recent electricity reading against its own 30-day mean; a deviation
    /// over [`ANOMALY_DEVIATION_THRESHOLD`] notifies the company owner.
    pub async fn run_once_for_industry(&self, industry_type: &str) -> AppResult<usize> {
        let companies = self.companies.list_by_industry(industry_type).await?;
        let since = Utc::now().date_naive() - Duration::days(30);
        let mut flagged = 0;

        for company in companies {
            let Some((recent, mean)) = self
                .activity
                .recent_electricity_vs_mean(company.id, since)
                .await?
            else {
                continue;
            };
            if mean.is_zero() {
                continue;
            }

            let deviation = (recent - mean) / mean;
            if deviation > ANOMALY_DEVIATION_THRESHOLD {
                let owner = self.users.find_by_id(company.owner_user_id).await?;
                let _ = self
                    .notifications
                    .notify(
                        owner.id,
                        NotificationKind::Anomaly,
                        "Unusual electricity consumption detected",
                        &format!(
                            "Latest reading is {:.1}% above your 30-day average.",
                            deviation * Decimal::from(100)
                        ),
                        None,
                        true,
                    )
                    .await;
                flagged += 1;
            }
        }

        Ok(flagged)
    }
}

/// Mean/median/25th-percentile (lower-is-better) and sample count for one
/// `product_category` (spec §4.H).
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBenchmark {
    pub product_category: String,
    pub mean_co2e_per_unit_kg: Decimal,
    pub median_co2e_per_unit_kg: Decimal,
    pub best_in_class_co2e_per_unit_kg: Decimal,
    pub sample_count: usize,
}

pub struct SupplierCategoryBenchmarkWorker {
    footprints: ProductFootprintRepository,
    cache: RwLock<HashMap<String, CategoryBenchmark>>,
}

impl SupplierCategoryBenchmarkWorker {
    pub fn new(footprints: ProductFootprintRepository) -> Self {
        Self {
            footprints,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Recomputes every category's benchmark and replaces the cache wholesale.
    pub async fn run_once(&self) -> AppResult<usize> {
        let categories = self.footprints.list_distinct_categories().await?;
        let mut fresh = HashMap::with_capacity(categories.len());

        for category in categories {
            let mut values = self.footprints.list_by_category(&category).await?;
            if values.is_empty() {
                continue;
            }
            values.sort();

            fresh.insert(
                category.clone(),
                CategoryBenchmark {
                    product_category: category,
                    mean_co2e_per_unit_kg: mean(&values),
                    median_co2e_per_unit_kg: median(&values),
                    best_in_class_co2e_per_unit_kg: percentile(&values, 0.25),
                    sample_count: values.len(),
                },
            );
        }

        let count = fresh.len();
        *self.cache.write() = fresh;
        Ok(count)
    }

    pub fn get(&self, product_category: &str) -> Option<CategoryBenchmark> {
        self.cache.read().get(product_category).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentile_picks_nearest_rank_on_sorted_ascending_values() {
        let values: Vec<Decimal> = vec![dec!(10), dec!(20), dec!(30), dec!(40), dec!(50)];
        assert_eq!(percentile(&values, 0.20), dec!(20));
    }

    #[test]
    fn median_averages_the_middle_pair_on_even_length() {
        let values: Vec<Decimal> = vec![dec!(10), dec!(20), dec!(30), dec!(40)];
        assert_eq!(median(&values), dec!(25));
    }

    #[test]
    fn mean_of_empty_slice_is_zero() {
        assert_eq!(mean(&[]), Decimal::ZERO);
    }
}
