// Library interface for blinkit_scraper
// This allows tests and external tools to drive the pipeline components
// without going through the CLI.

pub mod batch;
pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod geocode;
pub mod helpers;
pub mod metrics;
pub mod models;
