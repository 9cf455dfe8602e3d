//! Background workers (spec §4.E-H): CSV ingestion parsing, the event-bus
//! ingestion consumer, OCR invoice extraction, CBAM/ROI reporting, and the
//! periodic analytics refreshes. Each worker owns the repositories and
//! collaborators it needs and is driven by a `run`/`run_once` loop spawned
//! once at process startup — no worker reaches for global state.

pub mod analytics;
pub mod csv;
pub mod ingestion;
pub mod ocr;
pub mod reporting;

pub use ingestion::IngestionWorker;
pub use ocr::OcrWorker;
