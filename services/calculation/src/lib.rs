//! Pluggable emission-factor calculation providers (spec §4.C).
//!
//! Every caller programs against [`CalculationProvider`] and branches only
//! on [`CalculationResult::is_fallback`], never on provider identity — the
//! remote provider and the internal fallback are interchangeable behind
//! one interface, selected once at boot by [`factory::ProviderFactory`].

pub mod factory;
pub mod fallback;
pub mod provider;
pub mod remote;

pub use factory::ProviderFactory;
pub use fallback::InternalFallbackProvider;
pub use provider::{CalculationProvider, CalculationResult};
pub use remote::RemoteProvider;
