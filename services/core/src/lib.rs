//! carbonledger-core: shared domain types, configuration, and the error
//! taxonomy every other crate in the workspace builds on.
//!
//! Nothing in this crate talks to a database, a queue, or the network —
//! it exists so that storage, workers, and the API surface all agree on
//! the same entities without importing each other.

pub mod config;
pub mod entities;
pub mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
