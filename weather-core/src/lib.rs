//! Core library for the `weather-etl` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The fetcher abstraction over the current-weather API
//! - The transform that turns one observation into a CSV row
//! - The poll controller that repeats fetch + transform on a timer
//!
//! It is used by `weather-etl`, but the pieces can be driven on their own.

pub mod config;
pub mod error;
pub mod model;
pub mod poll;
pub mod provider;
pub mod transform;

pub use config::Config;
pub use error::EtlError;
pub use model::{PollConfig, PollSchedule, PollSummary, WeatherObservation, WeatherRecord};
pub use poll::PollController;
pub use provider::{OpenWeatherFetcher, WeatherFetcher};
pub use transform::{to_fahrenheit, transform};
