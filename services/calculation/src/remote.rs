//! The primary remote emission-factor provider (spec §4.C.1).
//!
//! Issues a POST to an external estimation endpoint. On a 4xx it surfaces
//! the remote error verbatim — that's the vendor telling us our request is
//! wrong, and retrying it would just repeat the mistake. On a 5xx or
//! network failure it falls through to the internal provider, tagging the
//! result `is_fallback = true`. The fallthrough happens inside this type
//! so every caller still sees one [`CalculationProvider`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carbonledger_core::error::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::provider::{ActivityQuantity, CalculationProvider, CalculationResult};

/// Selector identifying which activity/region/year/data-version the vendor
/// should price, mirrored from spec §4.C.
#[derive(Debug, Serialize)]
struct Selector<'a> {
    activity_kind: &'a str,
    region: Option<&'a str>,
    year: Option<i32>,
    data_version: &'static str,
}

#[derive(Debug, Serialize)]
struct ParameterBlock<'a> {
    quantity: Decimal,
    unit: &'a str,
}

#[derive(Debug, Serialize)]
struct EstimationRequest<'a> {
    selector: Selector<'a>,
    parameters: ParameterBlock<'a>,
}

#[derive(Debug, Deserialize)]
struct EstimationResponse {
    total_co2e_kg: Decimal,
    factor_id: String,
    factor_value: Decimal,
    year: i32,
}

#[derive(Default)]
struct Counters {
    calls: AtomicU64,
    failures: AtomicU64,
}

/// Primary remote provider with automatic fallthrough to an internal
/// provider on 5xx/network failure.
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    fallback: Arc<dyn CalculationProvider>,
    counters: Counters,
}

impl RemoteProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        fallback: Arc<dyn CalculationProvider>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
            fallback,
            counters: Counters::default(),
        }
    }

    pub fn calls(&self) -> u64 {
        self.counters.calls.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CalculationProvider for RemoteProvider {
    async fn calculate_for_activity(&self, activity: &ActivityQuantity) -> AppResult<CalculationResult> {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);

        let body = EstimationRequest {
            selector: Selector {
                activity_kind: activity.activity_kind.as_str(),
                region: activity.region.as_deref(),
                year: activity.year,
                data_version: "latest",
            },
            parameters: ParameterBlock {
                quantity: activity.quantity,
                unit: &activity.unit,
            },
        };

        let response = self
            .client
            .post(format!("{}/estimate", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %err, "remote provider unreachable, falling back");
                return self.fall_through(activity).await;
            }
        };

        let status = response.status();

        if status.is_client_error() {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(message));
        }

        if status.is_server_error() {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(status = %status, "remote provider returned 5xx, falling back");
            return self.fall_through(activity).await;
        }

        let parsed: EstimationResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("malformed remote response: {e}")))?;

        Ok(CalculationResult {
            total_co2e_kg: parsed.total_co2e_kg,
            scope: activity.activity_kind.derived_scope(),
            factor_id: parsed.factor_id,
            factor_value: parsed.factor_value,
            year: parsed.year,
            is_fallback: false,
        })
    }

    fn get_provider_name(&self) -> &'static str {
        "remote_primary"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl RemoteProvider {
    async fn fall_through(&self, activity: &ActivityQuantity) -> AppResult<CalculationResult> {
        let mut result = self.fallback.calculate_for_activity(activity).await?;
        result.is_fallback = true;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::InternalFallbackProvider;
    use carbonledger_core::entities::ActivityKind;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn unreachable_host_falls_through_and_tags_is_fallback() {
        let provider = RemoteProvider::new(
            "http://127.0.0.1:1", // nothing listens here
            "test-key",
            Duration::from_millis(200),
            Arc::new(InternalFallbackProvider::new()),
        );

        let result = provider
            .calculate_for_activity(&ActivityQuantity {
                activity_kind: ActivityKind::Electricity,
                quantity: dec!(1000),
                unit: "kWh".into(),
                region: Some("TR".into()),
                year: Some(2024),
            })
            .await
            .unwrap();

        assert!(result.is_fallback);
        assert_eq!(provider.failures(), 1);
    }
}
