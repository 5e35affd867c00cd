pub mod aggregate;
pub mod config;
pub mod delay;
pub mod detector;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod gtfs;
pub mod output;
pub mod pipeline;
pub mod samples;
pub mod siri;
pub mod types;
