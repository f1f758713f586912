pub mod actor;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod high_score_store;
pub mod motion;
pub mod rng;
pub mod server_protocol;
pub mod types;
pub mod world;
