//! Order ingestion service: consumes order records from Kafka, stores them in
//! PostgreSQL and serves point lookups from an in-memory cache that never
//! holds an order the database does not.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod ingestion;
pub mod messaging;
pub mod metrics;
pub mod service;
pub mod store;
pub mod utils;
