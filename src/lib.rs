//! Buy vs rent projection engine.
//!
//! [`core`] turns a loan and market parameter set into a monthly amortization
//! ledger, yearly buy and rent series, their year-by-year comparison and a
//! summary. [`api`] exposes it as a CLI and an HTTP JSON API.

pub mod api;
pub mod core;
