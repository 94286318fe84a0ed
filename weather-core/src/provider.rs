use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::Result, model::WeatherObservation};

pub mod openweather;

pub use openweather::OpenWeatherFetcher;

/// Source of current-weather documents for a city.
///
/// Implementations hand back whatever the API returned, including error
/// documents; checking `cod` is the caller's job.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, city_name: &str) -> Result<WeatherObservation>;
}

