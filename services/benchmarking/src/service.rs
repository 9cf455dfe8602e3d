//! Peer benchmark computation (spec §4.I).
//!
//! Peer definition: same industry AND same city AND excluding the
//! subject AND limited to `ActivityData` with `start_date >= today - 365
//! days` AND `is_fallback_calculation = false` AND `surface_area_m2 > 0`.
//! Below [`crate::K_ANONYMITY_FLOOR`] distinct peer companies, the service
//! returns `data_available = false` rather than a comparison.

use std::collections::{HashMap, HashSet};

use carbonledger_core::entities::{ActivityData, Facility, Scope};
use carbonledger_core::error::AppResult;
use carbonledger_storage::repositories::activity::ActivityDataRepository;
use carbonledger_storage::repositories::core::{CompanyRepository, FacilityRepository};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::report::{BenchmarkReport, FacilityBenchmark};
use crate::K_ANONYMITY_FLOOR;

#[derive(Clone)]
pub struct BenchmarkingService {
    companies: CompanyRepository,
    facilities: FacilityRepository,
    activity: ActivityDataRepository,
}

impl BenchmarkingService {
    pub fn new(
        companies: CompanyRepository,
        facilities: FacilityRepository,
        activity: ActivityDataRepository,
    ) -> Self {
        Self {
            companies,
            facilities,
            activity,
        }
    }

    pub async fn benchmark_company(&self, company_id: Uuid) -> AppResult<BenchmarkReport> {
        let company = self.companies.find_by_id(company_id).await?;
        let today = Utc::now().date_naive();
        let window_start = today - Duration::days(365);

        let subject_facilities: Vec<Facility> = self
            .facilities
            .list_by_company(company_id)
            .await?
            .into_iter()
            .filter(|f| f.surface_area_m2.map(|a| a > Decimal::ZERO).unwrap_or(false))
            .collect();

        if subject_facilities.is_empty() {
            return Ok(BenchmarkReport::insufficient_peers(0));
        }

        // Peer facilities per city, deduped against the subject's own facilities.
        let mut peer_facilities_by_city: HashMap<String, Vec<Facility>> = HashMap::new();
        let mut distinct_peer_companies: HashSet<Uuid> = HashSet::new();

        for facility in &subject_facilities {
            let peers = self
                .facilities
                .list_peers(&company.industry_type, &facility.city, facility.id)
                .await?
                .into_iter()
                .filter(|p| p.company_id != company_id)
                .collect::<Vec<_>>();

            for peer in &peers {
                distinct_peer_companies.insert(peer.company_id);
            }
            peer_facilities_by_city.insert(facility.city.clone(), peers);
        }

        if distinct_peer_companies.len() < K_ANONYMITY_FLOOR {
            return Ok(BenchmarkReport::insufficient_peers(distinct_peer_companies.len()));
        }

        let mut facility_reports = Vec::new();
        for facility in &subject_facilities {
            let area = facility.surface_area_m2.expect("filtered above");
            let subject_activity = self
                .activity
                .list_for_facility_in_range(facility.id, window_start, today)
                .await?;
            let (subject_s1, subject_s2) = real_scope_totals(&subject_activity);

            let peers = peer_facilities_by_city
                .get(&facility.city)
                .cloned()
                .unwrap_or_default();

            let mut peer_s1_intensities = Vec::new();
            let mut peer_s2_intensities = Vec::new();
            for peer in &peers {
                let Some(peer_area) = peer.surface_area_m2 else {
                    continue;
                };
                let peer_activity = self
                    .activity
                    .list_for_facility_in_range(peer.id, window_start, today)
                    .await?;
                let (peer_s1, peer_s2) = real_scope_totals(&peer_activity);
                peer_s1_intensities.push(peer_s1 / peer_area);
                peer_s2_intensities.push(peer_s2 / peer_area);
            }

            let subject_s1_intensity = subject_s1 / area;
            let subject_s2_intensity = subject_s2 / area;
            let subject_total_intensity = subject_s1_intensity + subject_s2_intensity;

            let peer_avg_s1 = average(&peer_s1_intensities);
            let peer_avg_s2 = average(&peer_s2_intensities);
            let peer_avg_total = peer_avg_s1 + peer_avg_s2;

            facility_reports.push(FacilityBenchmark {
                facility_id: facility.id,
                facility_name: facility.name.clone(),
                scope1_intensity_kg_per_m2: subject_s1_intensity,
                scope2_intensity_kg_per_m2: subject_s2_intensity,
                total_intensity_kg_per_m2: subject_total_intensity,
                peer_avg_scope1_intensity_kg_per_m2: peer_avg_s1,
                peer_avg_scope2_intensity_kg_per_m2: peer_avg_s2,
                peer_avg_total_intensity_kg_per_m2: peer_avg_total,
                scope1_efficiency_ratio: efficiency_ratio(peer_avg_s1, subject_s1_intensity),
                scope2_efficiency_ratio: efficiency_ratio(peer_avg_s2, subject_s2_intensity),
                total_efficiency_ratio: efficiency_ratio(peer_avg_total, subject_total_intensity),
                better_than_peers: subject_total_intensity <= peer_avg_total,
            });
        }

        Ok(BenchmarkReport {
            data_available: true,
            comparable_companies_count: distinct_peer_companies.len(),
            message: None,
            facilities: facility_reports,
        })
    }
}

/// Sum of non-fallback Scope 1 and Scope 2 CO2e across a facility's activity
/// data, in kg. Fallback-calculated rows are excluded from peer comparisons
/// per spec's peer definition.
fn real_scope_totals(activity: &[ActivityData]) -> (Decimal, Decimal) {
    let mut scope1 = Decimal::ZERO;
    let mut scope2 = Decimal::ZERO;
    for row in activity {
        if row.is_fallback_calculation {
            continue;
        }
        let Some(co2e) = row.calculated_co2e_kg else {
            continue;
        };
        match row.scope {
            Scope::Scope1 => scope1 += co2e,
            Scope::Scope2 => scope2 += co2e,
            Scope::Scope3 => {}
        }
    }
    (scope1, scope2)
}

fn average(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

/// `peer / subject * 100`; guards division by zero by reporting 100 (parity).
fn efficiency_ratio(peer_avg: Decimal, subject: Decimal) -> Decimal {
    if subject == Decimal::ZERO {
        return dec!(100);
    }
    (peer_avg / subject) * dec!(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn efficiency_ratio_above_100_means_subject_is_more_efficient() {
        // peer average is double the subject's intensity -> subject emits half as much
        assert_eq!(efficiency_ratio(dec!(20), dec!(10)), dec!(200));
    }

    #[test]
    fn efficiency_ratio_handles_zero_subject_without_dividing_by_zero() {
        assert_eq!(efficiency_ratio(dec!(20), Decimal::ZERO), dec!(100));
    }

    #[test]
    fn average_of_empty_slice_is_zero() {
        assert_eq!(average(&[]), Decimal::ZERO);
    }
}
