//! Pluggable suggestion engine (spec §4.J): a strategy registry producing
//! quantified ROI recommendations, with "info" fallbacks when data is
//! insufficient or the numbers don't clear the configured bar.

pub mod engine;
pub mod insulation;
pub mod params;
pub mod solar;
pub mod strategy;

pub use engine::SuggestionEngine;
pub use insulation::InsulationSuggestionStrategy;
pub use solar::SolarSuggestionStrategy;
pub use strategy::{InfoSuggestion, Suggestion, SuggestionOutcome, SuggestionStrategy};
