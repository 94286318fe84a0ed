use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::{EtlError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_CITY: &str = "Charlottesville";
pub const DEFAULT_FREQUENCY: &str = "300";
pub const DEFAULT_CALL_COUNT: &str = "1";
pub const DEFAULT_OUTPUT: &str = "weather_data.csv";

/// One decoded current-weather response.
///
/// The raw JSON object is kept as-is so the column-count diagnostic sees every
/// top-level key. Field accessors are required-field checks: a path that is
/// absent or holds the wrong JSON type yields [`EtlError::MissingField`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    doc: Map<String, Value>,
}

impl WeatherObservation {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(doc) => Ok(Self { doc }),
            _ => Err(EtlError::NotAnObject),
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(body)?)
    }

    /// `cod` as reported by the API. OpenWeather sends an integer on success
    /// and a string such as `"404"` on failure.
    pub fn status(&self) -> Result<&Value> {
        self.field("cod")
    }

    pub fn is_success(&self) -> Result<bool> {
        Ok(self.status()?.as_i64() == Some(200))
    }

    pub fn epoch_seconds(&self) -> Result<i64> {
        self.i64_at("dt")
    }

    pub fn city_name(&self) -> Result<&str> {
        self.str_at("name")
    }

    pub fn city_id(&self) -> Result<i64> {
        self.i64_at("sys.id")
    }

    pub fn country_code(&self) -> Result<&str> {
        self.str_at("sys.country")
    }

    pub fn temp_kelvin(&self) -> Result<f64> {
        self.f64_at("main.temp")
    }

    pub fn feels_like_kelvin(&self) -> Result<f64> {
        self.f64_at("main.feels_like")
    }

    pub fn min_kelvin(&self) -> Result<f64> {
        self.f64_at("main.temp_min")
    }

    pub fn max_kelvin(&self) -> Result<f64> {
        self.f64_at("main.temp_max")
    }

    /// Diagnostic count of "columns" in the document.
    ///
    /// Only direct children are inspected: a string or integer adds 1, an
    /// object adds its own field count, an array adds the field counts of its
    /// object elements. Floats, nulls and anything deeper are ignored.
    pub fn columns_read(&self) -> usize {
        self.doc
            .values()
            .map(|value| match value {
                Value::String(_) | Value::Bool(_) => 1,
                Value::Number(n) if n.is_i64() || n.is_u64() => 1,
                Value::Object(obj) => obj.len(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Map::len)
                    .sum(),
                _ => 0,
            })
            .sum()
    }

    fn field(&self, path: &'static str) -> Result<&Value> {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or(path);
        let mut current = self.doc.get(first);
        for part in parts {
            current = current.and_then(|v| v.get(part));
        }
        current.ok_or(EtlError::MissingField { path })
    }

    fn str_at(&self, path: &'static str) -> Result<&str> {
        self.field(path)?
            .as_str()
            .ok_or(EtlError::MissingField { path })
    }

    fn i64_at(&self, path: &'static str) -> Result<i64> {
        self.field(path)?
            .as_i64()
            .ok_or(EtlError::MissingField { path })
    }

    fn f64_at(&self, path: &'static str) -> Result<f64> {
        self.field(path)?
            .as_f64()
            .ok_or(EtlError::MissingField { path })
    }
}

/// The row persisted to CSV. Field order is column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    #[serde(rename = "City ID")]
    pub city_id: i64,
    #[serde(rename = "City Name")]
    pub city_name: String,
    #[serde(rename = "Country Code")]
    pub country_code: String,
    #[serde(rename = "Time")]
    pub local_time: String,
    #[serde(rename = "Current Temperature (F)")]
    pub temp_f: f64,
    #[serde(rename = "Feels Like (F)")]
    pub feels_like_f: f64,
    #[serde(rename = "Min Temp (F)")]
    pub min_f: f64,
    #[serde(rename = "Max Temp (F)")]
    pub max_f: f64,
}

impl WeatherRecord {
    pub const COLUMNS: usize = 8;
}

/// Timing and output settings parsed from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    pub frequency_seconds: u64,
    pub call_count: u64,
    pub output_path: PathBuf,
}

impl PollSchedule {
    /// Validate raw command-line values in a fixed order (frequency, call
    /// count, csv path) so the first bad argument is the one reported.
    pub fn parse(frequency: &str, call_count: &str, output_path: &str) -> Result<Self> {
        let frequency_seconds = frequency
            .trim()
            .parse::<u64>()
            .map_err(|_| EtlError::InvalidFrequency(frequency.to_string()))?;

        let call_count = call_count
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| EtlError::InvalidCallCount(call_count.to_string()))?;

        if !output_path.ends_with(".csv") {
            return Err(EtlError::InvalidCsvPath(output_path.to_string()));
        }

        Ok(Self {
            frequency_seconds,
            call_count,
            output_path: PathBuf::from(output_path),
        })
    }
}

/// Validated settings for one polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub city_name: String,
    pub api_key: String,
    pub endpoint: String,
    pub frequency_seconds: u64,
    pub call_count: u64,
    pub output_path: PathBuf,
}

impl PollConfig {
    pub fn new(
        city_name: impl Into<String>,
        schedule: PollSchedule,
        api_key: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(EtlError::MissingApiKey)?;

        Ok(Self {
            city_name: city_name.into(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            frequency_seconds: schedule.frequency_seconds,
            call_count: schedule.call_count,
            output_path: schedule.output_path,
        })
    }

    /// Validate raw command-line values; argument errors win over a missing
    /// API key.
    pub fn from_raw(
        city_name: impl Into<String>,
        frequency: &str,
        call_count: &str,
        output_path: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let schedule = PollSchedule::parse(frequency, call_count, output_path)?;
        Self::new(city_name, schedule, api_key)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Totals printed once the last call completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub records_processed: u64,
    pub columns_read: usize,
    pub columns_written: usize,
}
