//! Reporting workers (spec §4.G): CBAM XML synthesis, ROI analysis, and
//! the periodic TTL cleanup pass.

pub mod cbam;
pub mod cleanup;
pub mod roi;
pub mod worker;

pub use cleanup::ReportCleanupWorker;
pub use worker::ReportingWorker;
