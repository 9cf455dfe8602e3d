//! Selects the primary provider at boot (spec §4.C): if configured with an
//! API key and its health check passes, the remote provider is used;
//! otherwise the factory falls back to the internal provider outright, and
//! the caller never has to know which.

use std::sync::Arc;

use carbonledger_core::config::Config;

use crate::fallback::InternalFallbackProvider;
use crate::provider::CalculationProvider;
use crate::remote::RemoteProvider;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the provider to use for the lifetime of the process. A
    /// missing API key skips the remote provider entirely — per spec,
    /// "also used when no API key is configured".
    pub async fn build(config: &Config) -> Arc<dyn CalculationProvider> {
        let fallback: Arc<dyn CalculationProvider> = Arc::new(InternalFallbackProvider::new());

        let Some(api_key) = config.calculation_provider.api_key.clone() else {
            tracing::info!("no calculation provider API key configured, using internal fallback");
            return fallback;
        };

        let remote = RemoteProvider::new(
            config.calculation_provider.base_url.clone(),
            api_key,
            config.calculation_provider.timeout,
            fallback.clone(),
        );

        if remote.health_check().await {
            Arc::new(remote)
        } else {
            tracing::warn!("primary calculation provider health check failed at boot, using internal fallback");
            fallback
        }
    }
}
