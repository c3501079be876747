//! Library exports for tollgate, shared between the binary and tests.

pub mod config;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod startup;
pub mod state;
pub mod store;
pub mod tokens;
pub mod utils;
