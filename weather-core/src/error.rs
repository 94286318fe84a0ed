use std::path::PathBuf;
use thiserror::Error;

/// Every failure the pipeline can report. The `Display` text of each variant
/// is the single diagnostic line shown to the user.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("invalid frequency argument")]
    InvalidFrequency(String),

    #[error("invalid n argument")]
    InvalidCallCount(String),

    #[error("invalid csv argument")]
    InvalidCsvPath(String),

    #[error(
        "no OpenWeather API key configured (hint: run `weather-etl configure`, \
         set OPENWEATHER_API_KEY, or pass --api-key)"
    )]
    MissingApiKey,

    #[error("unknown city name")]
    UnknownCity { city: String, status: String },

    #[error("response is missing required field '{path}'")]
    MissingField { path: &'static str },

    #[error("observation timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode weather response JSON")]
    Decode(#[from] serde_json::Error),

    #[error("failed to append to '{}'", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to write progress output")]
    Output(#[source] std::io::Error),

    #[error("failed to write CSV row to '{}'", .0.display())]
    Csv(PathBuf, #[source] csv::Error),
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
