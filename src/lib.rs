//! News Pulse - A Real-Time News Aggregator
//!
//! This crate proxies a NewsAPI-compatible upstream, degrading to generated
//! placeholder articles when the upstream is unavailable, and provides a
//! polling client that keeps a filtered article list fresh.

pub mod cache;
pub mod client;
pub mod config;
pub mod fallback;
pub mod fetcher;
pub mod format;
pub mod models;
pub mod poller;
pub mod query;
pub mod routes;
