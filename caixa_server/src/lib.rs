//! # Caixa server
//! This module hosts the HTTP surface for the sales reconciliation engine. It is responsible for:
//! Receiving order, ledger and register-closing requests from the back-office frontend.
//! Translating them into engine API calls.
//! Mapping engine errors onto meaningful HTTP status codes.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! All business routes live under the `/api` scope; `/health` is a bare 200 OK liveness check.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
