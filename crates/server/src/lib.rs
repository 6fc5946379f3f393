//! Diagnostics server: HTTP surface over the diagnostics pipeline

pub mod api;
pub mod config;
