//! # Gantry API Library
//!
//! Per-user GitHub App access (token lifecycle, installations, repositories)
//! and project-scoped provisioning of cloud infrastructure.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod github;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod provision;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
