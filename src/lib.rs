pub mod bracket;
pub mod config;
pub mod coverage_export;
pub mod http_client;
pub mod ids;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod overrides;
pub mod reconciler;
pub mod resolver;
pub mod run_cache;
pub mod sheet;
pub mod store;
