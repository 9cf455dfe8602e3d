//! The single interface every calculation provider implements (spec §4.C).

use async_trait::async_trait;
use carbonledger_core::entities::{ActivityKind, Scope};
use carbonledger_core::error::AppResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An energy or volume quantity with its unit, as submitted on an activity row.
#[derive(Debug, Clone)]
pub struct ActivityQuantity {
    pub activity_kind: ActivityKind,
    pub quantity: Decimal,
    pub unit: String,
    pub region: Option<String>,
    pub year: Option<i32>,
}

/// Result of a calculation, with the provenance metadata spec §4.C requires
/// on every row for legal transparency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    pub total_co2e_kg: Decimal,
    pub scope: Scope,
    pub factor_id: String,
    pub factor_value: Decimal,
    pub year: i32,
    pub is_fallback: bool,
}

/// Single interface over the primary remote provider and the internal
/// fallback. Callers never branch on [`get_provider_name`] — only on
/// [`CalculationResult::is_fallback`], which is what gets persisted.
#[async_trait]
pub trait CalculationProvider: Send + Sync {
    async fn calculate_for_activity(&self, activity: &ActivityQuantity) -> AppResult<CalculationResult>;

    fn get_provider_name(&self) -> &'static str;

    async fn health_check(&self) -> bool;
}
