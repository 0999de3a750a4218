//! Cricket scoresheet ingestion: parse Cricsheet YAML, resolve teams, players
//! and matches against the entity store, and publish one event per delivery.

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod resolver;
pub mod scoresheet;
pub mod store;
pub mod translate;
