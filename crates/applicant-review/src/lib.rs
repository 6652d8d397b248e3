//! Survey intake and multi-judge voting for applicant review panels.
//!
//! [`workflows::intake`] turns a survey export into per-applicant records and a
//! summary workbook; [`workflows::voting`] keeps the append-only vote ledger and
//! the result rollups derived from it.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
