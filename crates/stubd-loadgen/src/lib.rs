//! Load generator for a stubd managed endpoint.
//!
//! Reads a list of request configurations, drives each one with a fixed
//! number of concurrent tasks for a fixed duration, and summarizes the run as
//! a [`Report`].

pub mod collector;
pub mod config;
pub mod generator;
pub mod report;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use config::{LoadConfig, RequestConfig};
pub use generator::LoadGenerator;
pub use report::Report;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid load configuration: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Request(#[from] reqwest::Error),
}
