//! The strategy interface every suggestion implements (spec §4.J).

use async_trait::async_trait;
use carbonledger_core::entities::{Company, Facility};
use carbonledger_core::error::AppResult;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Numeric parameters pulled once per driver run from `SuggestionParameter`
/// rows (city factors, ROI thresholds, cost assumptions).
pub type Parameters = HashMap<String, Decimal>;

/// A quantified recommendation with the inputs that produced it, so the
/// UI can render a calculation breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub strategy: &'static str,
    pub facility_id: uuid::Uuid,
    pub description: String,
    pub annual_saving_try: Decimal,
    pub investment_try: Decimal,
    pub payback_years: Decimal,
    pub calculation_details: serde_json::Value,
}

/// An explanatory placeholder emitted when a strategy is applicable in
/// principle but lacks enough data, or the numbers don't clear the bar.
#[derive(Debug, Clone, Serialize)]
pub struct InfoSuggestion {
    pub strategy: &'static str,
    pub facility_id: uuid::Uuid,
    pub reason_code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SuggestionOutcome {
    Actionable(Suggestion),
    Info(InfoSuggestion),
}

/// One pluggable ROI suggestion strategy.
#[async_trait]
pub trait SuggestionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy's preconditions (facility type, known costs)
    /// are met at all, before any data-sufficiency check.
    fn is_applicable(&self, company: &Company, facility: &Facility, params: &Parameters) -> bool;

    /// Produce suggestions (or info fallbacks) for one facility.
    async fn generate(
        &self,
        company: &Company,
        facility: &Facility,
        params: &Parameters,
    ) -> AppResult<Vec<SuggestionOutcome>>;
}
