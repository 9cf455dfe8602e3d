//! The shape returned to callers of the benchmarking service.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Three intensity metrics for one facility, compared against its peers.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityBenchmark {
    pub facility_id: Uuid,
    pub facility_name: String,
    pub scope1_intensity_kg_per_m2: Decimal,
    pub scope2_intensity_kg_per_m2: Decimal,
    pub total_intensity_kg_per_m2: Decimal,
    pub peer_avg_scope1_intensity_kg_per_m2: Decimal,
    pub peer_avg_scope2_intensity_kg_per_m2: Decimal,
    pub peer_avg_total_intensity_kg_per_m2: Decimal,
    /// `peer / subject * 100`; values above 100 mean the subject emits less
    /// per square meter than its peers on average.
    pub scope1_efficiency_ratio: Decimal,
    pub scope2_efficiency_ratio: Decimal,
    pub total_efficiency_ratio: Decimal,
    pub better_than_peers: bool,
}

/// The top-level benchmarking response for a company.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub data_available: bool,
    pub comparable_companies_count: usize,
    pub message: Option<String>,
    pub facilities: Vec<FacilityBenchmark>,
}

impl BenchmarkReport {
    pub fn insufficient_peers(comparable_companies_count: usize) -> Self {
        Self {
            data_available: false,
            comparable_companies_count,
            message: Some(format!(
                "only {comparable_companies_count} comparable companies found; at least {} are required to protect peer anonymity",
                crate::K_ANONYMITY_FLOOR
            )),
            facilities: Vec::new(),
        }
    }
}
