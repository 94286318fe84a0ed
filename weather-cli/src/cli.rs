use std::ffi::OsString;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use tracing::info;
use weather_etl_core::{
    Config, OpenWeatherFetcher, PollConfig, PollController, PollSchedule,
    config::API_KEY_ENV,
    model::{DEFAULT_CALL_COUNT, DEFAULT_CITY, DEFAULT_FREQUENCY, DEFAULT_OUTPUT},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-etl",
    version,
    about = "Poll current weather for a city and append rows to a CSV file",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key in the config file.
    Configure,
}

/// Flags for a polling run. Numeric values stay as text here so that bad
/// input is reported by [`PollConfig::from_raw`] with its own message.
#[derive(Debug, Args)]
pub struct PollArgs {
    /// City name to pull weather data for.
    #[arg(short = 'c', long = "city", default_value = DEFAULT_CITY)]
    pub city: String,

    /// Seconds to wait between calls when making more than one.
    #[arg(short = 'f', long = "freq", default_value = DEFAULT_FREQUENCY, allow_hyphen_values = true)]
    pub freq: String,

    /// Number of calls to make for the city.
    #[arg(short = 'n', default_value = DEFAULT_CALL_COUNT, allow_hyphen_values = true)]
    pub n: String,

    /// CSV file to append to (also accepted as `-csv`).
    #[arg(long = "csv", default_value = DEFAULT_OUTPUT)]
    pub csv: String,

    /// OpenWeather API key; overrides the environment and config file.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Alternative current-weather endpoint.
    #[arg(long)]
    pub endpoint: Option<String>,
}

/// Rewrite the single-dash `-csv` spelling into `--csv` before clap sees it.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-csv") => OsString::from("--csv"),
            Some(s) if s.starts_with("-csv=") => OsString::from(format!("-{s}")),
            _ => arg,
        })
        .collect()
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(),
            None => self.poll.run().await,
        }
    }
}

impl PollArgs {
    /// Validate the flags, then consult the config file for the API key and
    /// endpoint. `load_file` only runs once the arguments are known to be good.
    pub fn into_config<L>(
        self,
        load_file: L,
        env_api_key: Option<String>,
    ) -> anyhow::Result<PollConfig>
    where
        L: FnOnce() -> anyhow::Result<Config>,
    {
        let schedule = PollSchedule::parse(&self.freq, &self.n, &self.csv)?;

        let file = load_file()?;
        let endpoint = file.resolve_endpoint(self.endpoint);
        let api_key = file.resolve_api_key(self.api_key, env_api_key);

        Ok(PollConfig::new(self.city, schedule, api_key)?.with_endpoint(endpoint))
    }

    async fn run(self) -> anyhow::Result<()> {
        let config = self.into_config(Config::load, std::env::var(API_KEY_ENV).ok())?;
        info!(
            city = %config.city_name,
            calls = config.call_count,
            every_secs = config.frequency_seconds,
            output = %config.output_path.display(),
            "Starting weather poll"
        );

        let fetcher = OpenWeatherFetcher::from_config(&config);
        let mut controller = PollController::new(&config, fetcher, std::io::stdout().lock());
        controller.run().await?;

        Ok(())
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    cfg.set_api_key(api_key.trim().to_string());
    let path = cfg.save()?;

    println!("Saved API key to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use weather_etl_core::EtlError;

    fn no_file() -> anyhow::Result<Config> {
        Ok(Config::default())
    }

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("weather-etl")
            .chain(args.iter().copied())
            .map(OsString::from);
        Cli::try_parse_from(normalize_args(argv)).expect("arguments should parse")
    }

    #[test]
    fn defaults_match_documented_values() {
        let cli = parse(&[]);

        assert!(cli.command.is_none());
        assert_eq!(cli.poll.city, "Charlottesville");
        assert_eq!(cli.poll.freq, "300");
        assert_eq!(cli.poll.n, "1");
        assert_eq!(cli.poll.csv, "weather_data.csv");
    }

    #[test]
    fn single_dash_csv_is_accepted() {
        assert_eq!(parse(&["-csv", "out.csv"]).poll.csv, "out.csv");
        assert_eq!(parse(&["-csv=other.csv"]).poll.csv, "other.csv");
        assert_eq!(parse(&["--csv", "x.csv"]).poll.csv, "x.csv");
    }

    #[test]
    fn short_and_long_flags() {
        let cli = parse(&["-c", "Paris", "-f", "10", "-n", "3"]);
        assert_eq!(cli.poll.city, "Paris");
        assert_eq!(cli.poll.freq, "10");
        assert_eq!(cli.poll.n, "3");

        let cli = parse(&["--city", "Lima", "--freq", "0"]);
        assert_eq!(cli.poll.city, "Lima");
        assert_eq!(cli.poll.freq, "0");
    }

    #[test]
    fn configure_subcommand() {
        assert!(matches!(parse(&["configure"]).command, Some(Command::Configure)));
    }

    #[test]
    fn invalid_n_is_reported_before_anything_else() {
        let cli = parse(&["-n", "abc"]);
        let err = cli.poll.into_config(no_file, None).unwrap_err();
        assert_eq!(err.to_string(), "invalid n argument");
    }

    #[test]
    fn negative_n_reaches_validation() {
        let cli = parse(&["-n", "-1", "--api-key", "K"]);
        let err = cli.poll.into_config(no_file, None).unwrap_err();
        assert_eq!(err.to_string(), "invalid n argument");
    }

    #[test]
    fn bad_csv_extension() {
        let cli = parse(&["-csv", "out.json", "--api-key", "K"]);
        let err = cli.poll.into_config(no_file, None).unwrap_err();
        assert_eq!(err.to_string(), "invalid csv argument");
    }

    #[test]
    fn missing_key_mentions_configure() {
        let err = parse(&[]).poll.into_config(no_file, None).unwrap_err();
        assert!(matches!(err.downcast_ref::<EtlError>(), Some(EtlError::MissingApiKey)));
        assert!(err.to_string().contains("weather-etl configure"));
    }

    #[test]
    fn config_combines_flags_env_and_file() {
        let mut file = Config::default();
        file.set_api_key("FILE".into());
        file.openweather.endpoint = Some("http://localhost:9000/weather".into());

        let cfg = parse(&["-n", "2", "-f", "0"])
            .poll
            .into_config(|| Ok(file), Some("ENV".into()))
            .unwrap();

        assert_eq!(cfg.api_key, "ENV");
        assert_eq!(cfg.endpoint, "http://localhost:9000/weather");
        assert_eq!(cfg.call_count, 2);
        assert_eq!(cfg.frequency_seconds, 0);
    }

    #[test]
    fn argument_errors_win_over_a_broken_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "openweather = 3").unwrap();

        let err = parse(&["-n", "abc"])
            .poll
            .into_config(|| Config::load_from(&path), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid n argument");

        let err = parse(&["-csv", "out.txt"])
            .poll
            .into_config(|| Config::load_from(&path), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid csv argument");

        let err = parse(&["-n", "2"])
            .poll
            .into_config(|| Config::load_from(&path), None)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn config_file_is_not_read_for_bad_arguments() {
        let err = parse(&["-f", "soon"])
            .poll
            .into_config(|| panic!("config file loaded before validation"), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid frequency argument");
    }
}
