use async_trait::async_trait;
use reqwest::{Client, Request};
use tracing::{debug, warn};

use crate::{
    error::{EtlError, Result},
    model::{PollConfig, WeatherObservation},
};

use super::WeatherFetcher;

/// Fetcher for the OpenWeather "current weather" endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    api_key: String,
    endpoint: String,
    http: Client,
}

impl OpenWeatherFetcher {
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self {
            api_key,
            endpoint,
            http: Client::new(),
        }
    }

    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(config.api_key.clone(), config.endpoint.clone())
    }

    fn request(&self, city_name: &str) -> Result<Request> {
        self.http
            .get(&self.endpoint)
            .query(&[("q", city_name), ("appid", self.api_key.as_str())])
            .build()
            .map_err(|source| self.transport_error(source))
    }

    fn transport_error(&self, source: reqwest::Error) -> EtlError {
        EtlError::Transport {
            url: self.endpoint.clone(),
            source,
        }
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherFetcher {
    async fn fetch(&self, city_name: &str) -> Result<WeatherObservation> {
        debug!(city = city_name, endpoint = %self.endpoint, "Requesting current weather");

        let req = self.request(city_name)?;
        let res = self
            .http
            .execute(req)
            .await
            .map_err(|source| self.transport_error(source))?;

        // Error documents (e.g. 404 "city not found") still carry a `cod`,
        // so the body is decoded whatever the HTTP status.
        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|source| self.transport_error(source))?;
        debug!(%status, bytes = body.len(), "Received weather response");

        WeatherObservation::from_slice(&body).inspect_err(|e| {
            warn!(
                %status,
                error = %e,
                body = %truncate_body(&String::from_utf8_lossy(&body)),
                "Unusable weather response"
            );
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
