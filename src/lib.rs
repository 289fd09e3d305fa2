pub mod adapters;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod types;
pub mod validate;
