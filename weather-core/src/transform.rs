//! Turn one [`WeatherObservation`] into a [`WeatherRecord`] and append it to a
//! CSV file.

use chrono::{DateTime, Local, TimeZone};
use std::{fmt::Display, fs::OpenOptions, path::Path};
use tracing::{debug, info};

use crate::{
    error::{EtlError, Result},
    model::{WeatherObservation, WeatherRecord},
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kelvin to Fahrenheit, rounded to two decimals.
pub fn to_fahrenheit(kelvin: f64) -> f64 {
    let fahrenheit = (kelvin - 273.15) * (9.0 / 5.0) + 32.0;
    (fahrenheit * 100.0).round() / 100.0
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` wall-clock time in `tz`.
pub fn format_time_in<Tz>(epoch_seconds: i64, tz: &Tz) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let utc = DateTime::from_timestamp(epoch_seconds, 0)
        .ok_or(EtlError::InvalidTimestamp(epoch_seconds))?;
    Ok(utc.with_timezone(tz).format(TIME_FORMAT).to_string())
}

pub fn format_local_time(epoch_seconds: i64) -> Result<String> {
    format_time_in(epoch_seconds, &Local)
}

impl WeatherRecord {
    /// Extract and convert the eight persisted fields. Fails on the first
    /// missing field without touching any file.
    pub fn from_observation_in<Tz>(observation: &WeatherObservation, tz: &Tz) -> Result<Self>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Ok(Self {
            city_id: observation.city_id()?,
            city_name: observation.city_name()?.to_owned(),
            country_code: observation.country_code()?.to_owned(),
            local_time: format_time_in(observation.epoch_seconds()?, tz)?,
            temp_f: to_fahrenheit(observation.temp_kelvin()?),
            feels_like_f: to_fahrenheit(observation.feels_like_kelvin()?),
            min_f: to_fahrenheit(observation.min_kelvin()?),
            max_f: to_fahrenheit(observation.max_kelvin()?),
        })
    }

    pub fn from_observation(observation: &WeatherObservation) -> Result<Self> {
        Self::from_observation_in(observation, &Local)
    }
}

/// Append `record` to the CSV at `path`, writing the header row first when
/// the file is empty. The file is flushed and closed before returning.
pub fn append_record(path: &Path, record: &WeatherRecord) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| EtlError::Io(path.to_path_buf(), e))?;

    let is_empty = file
        .metadata()
        .map_err(|e| EtlError::Io(path.to_path_buf(), e))?
        .len()
        == 0;
    if is_empty {
        debug!(path = %path.display(), "Writing CSV header");
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_empty)
        .from_writer(file);

    writer
        .serialize(record)
        .map_err(|e| EtlError::Csv(path.to_path_buf(), e))?;
    writer
        .flush()
        .map_err(|e| EtlError::Io(path.to_path_buf(), e))?;

    info!(
        path = %path.display(),
        city = %record.city_name,
        time = %record.local_time,
        "Appended weather record"
    );
    Ok(())
}

/// Transform one observation and append it to `output_path`.
///
/// Returns `(columns_written, columns_read)`.
pub fn transform_in<Tz>(
    observation: &WeatherObservation,
    output_path: &Path,
    tz: &Tz,
) -> Result<(usize, usize)>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let columns_read = observation.columns_read();
    let record = WeatherRecord::from_observation_in(observation, tz)?;
    append_record(output_path, &record)?;
    Ok((WeatherRecord::COLUMNS, columns_read))
}

pub fn transform(observation: &WeatherObservation, output_path: &Path) -> Result<(usize, usize)> {
    transform_in(observation, output_path, &Local)
}
