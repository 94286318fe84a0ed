//! The polling loop: fetch, transform, sleep, repeat.

use std::{io::Write, time::Duration};
use tracing::{debug, warn};

use crate::{
    error::{EtlError, Result},
    model::{PollConfig, PollSummary, WeatherObservation},
    provider::WeatherFetcher,
    transform::transform,
};

/// Where the controller is in a run.
///
/// `call` is the 1-based index of the call in flight and `remaining` counts the
/// calls not yet completed, including the current one. A failed call ends the
/// run by returning the error, so there is no explicit failed state.
#[derive(Debug)]
enum PollState {
    Idle,
    Calling { call: u64, remaining: u64 },
    Reporting { call: u64, remaining: u64, observation: WeatherObservation },
    Sleeping { next_call: u64, remaining: u64 },
    Done(PollSummary),
}

/// Drives `call_count` fetch/transform cycles for one city, printing progress
/// lines and the final summary to `out`.
#[derive(Debug)]
pub struct PollController<'a, F, W> {
    config: &'a PollConfig,
    fetcher: F,
    out: W,
}

impl<'a, F, W> PollController<'a, F, W>
where
    F: WeatherFetcher,
    W: Write,
{
    pub fn new(config: &'a PollConfig, fetcher: F, out: W) -> Self {
        Self { config, fetcher, out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn run(&mut self) -> Result<PollSummary> {
        let mut state = PollState::Idle;
        loop {
            state = match state {
                PollState::Idle if self.config.call_count == 0 => PollState::Done(PollSummary {
                    records_processed: 0,
                    columns_read: 0,
                    columns_written: 0,
                }),
                PollState::Idle => PollState::Calling {
                    call: 1,
                    remaining: self.config.call_count,
                },

                PollState::Calling { call, remaining } => {
                    let observation = self.fetcher.fetch(&self.config.city_name).await?;
                    if !observation.is_success()? {
                        let status = observation.status()?;
                        let status = status
                            .as_str()
                            .map(str::to_owned)
                            .unwrap_or_else(|| status.to_string());
                        warn!(city = %self.config.city_name, %status, "Weather API rejected city");
                        return Err(EtlError::UnknownCity {
                            city: self.config.city_name.clone(),
                            status,
                        });
                    }

                    writeln!(self.out, "CALL {call}").map_err(EtlError::Output)?;
                    PollState::Reporting { call, remaining, observation }
                }

                PollState::Reporting { call, remaining, observation } => {
                    let (columns_written, columns_read) =
                        transform(&observation, &self.config.output_path)?;
                    debug!(call, columns_written, columns_read, "Call complete");

                    match remaining.saturating_sub(1) {
                        0 => PollState::Done(PollSummary {
                            records_processed: self.config.call_count,
                            columns_written,
                            columns_read,
                        }),
                        remaining => PollState::Sleeping {
                            next_call: call + 1,
                            remaining,
                        },
                    }
                }

                PollState::Sleeping { next_call, remaining } => {
                    if self.config.frequency_seconds > 0 {
                        debug!(seconds = self.config.frequency_seconds, next_call, "Sleeping");
                        tokio::time::sleep(Duration::from_secs(self.config.frequency_seconds))
                            .await;
                    }
                    PollState::Calling { call: next_call, remaining }
                }

                PollState::Done(summary) => {
                    self.write_summary(&summary).map_err(EtlError::Output)?;
                    return Ok(summary);
                }
            };
        }
    }

    fn write_summary(&mut self, summary: &PollSummary) -> std::io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "number of records PROCESSED: {}", summary.records_processed)?;
        writeln!(self.out, "number of columns READ: {}", summary.columns_read)?;
        writeln!(self.out, "number of columns WRITTEN: {}", summary.columns_written)?;
        self.out.flush()
    }
}
