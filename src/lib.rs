pub mod api;
pub mod config;
pub mod discovery;
pub mod extractor;
pub mod humanize;
pub mod observability;
pub mod orchestrator;
pub mod pacing;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod worker;
