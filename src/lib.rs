//! Job Feed Import Service
//!
//! This library provides the core functionality for jobfeed-import: fetching
//! heterogeneous RSS/Atom job feeds, normalizing their items into a
//! deduplicated catalog, and keeping an auditable per-run import history.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
