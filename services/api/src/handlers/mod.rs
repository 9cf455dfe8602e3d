//! HTTP handlers (spec §6), one module per resource family.

pub mod activity;
pub mod benchmarking;
pub mod companies;
pub mod csv;
pub mod facilities;
pub mod invoices;
pub mod leaderboard;
pub mod reports;
pub mod suppliers;
pub mod users;
