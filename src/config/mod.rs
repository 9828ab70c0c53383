pub mod cli;
pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{ApiCommand, CliConfig, Command, DateArgs, PriceSeries};

#[cfg(feature = "cli")]
mod args {
    use super::settings::{Settings, OUTPUT_FORMATS};
    use crate::core::dataset::Dataset;
    use crate::domain::model::{Market, Period};
    use crate::domain::request::{DatePreset, DateRange};
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_one_of, validate_path, Validate};
    use chrono::{Duration, NaiveDate};
    use clap::{Args, Parser, Subcommand, ValueEnum};
    use std::path::PathBuf;

    /// Days covered when no dates are given.
    const DEFAULT_LOOKBACK_DAYS: i64 = 7;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "epias")]
    #[command(about = "EPİAŞ transparency platform client and dependency manifest checker")]
    pub struct CliConfig {
        #[arg(long, global = true, help = "Path to an epias.toml configuration file")]
        pub config: Option<PathBuf>,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit logs as JSON")]
        pub log_json: bool,

        #[arg(long, global = true, help = "Directory exports are written to")]
        pub output_path: Option<String>,

        #[arg(long, global = true, help = "Bypass the on-disk response cache")]
        pub no_cache: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Lint a requirements.txt style dependency manifest
        CheckManifest {
            path: PathBuf,
            #[arg(long, help = "Print the report as JSON")]
            json: bool,
        },
        #[command(flatten)]
        Api(ApiCommand),
    }

    /// Subcommands that talk to the transparency platform.
    #[derive(Debug, Clone, Subcommand)]
    pub enum ApiCommand {
        /// List organizations active in the date range
        Organizations {
            #[command(flatten)]
            dates: DateArgs,
        },
        /// List licensed power plants
        PowerPlants,
        /// List settlement units (UEVÇB) of an organization
        Uevcb {
            #[arg(long)]
            org: u64,
        },
        /// Fetch a dataset and export it as a zip bundle
        Fetch {
            dataset: Dataset,
            #[arg(long)]
            org: Option<u64>,
            #[arg(long)]
            power_plant: Option<u64>,
            #[arg(long)]
            province: Option<u64>,
            #[arg(long, help = "Add a table aggregated by hourly, daily, weekly or monthly")]
            period: Option<Period>,
            #[arg(long, value_delimiter = ',')]
            formats: Vec<String>,
            #[command(flatten)]
            dates: DateArgs,
        },
        /// Show the market dashboards
        Dashboard,
        /// Units, generation, plans and prices for one organization
        Overview {
            #[arg(long)]
            org: u64,
            #[command(flatten)]
            dates: DateArgs,
        },
        /// Price statistics for a market
        Stats {
            #[arg(long, value_enum, default_value_t = PriceSeries::Ptf)]
            market: PriceSeries,
            #[command(flatten)]
            dates: DateArgs,
        },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    pub enum PriceSeries {
        Ptf,
        Smf,
    }

    impl PriceSeries {
        pub fn market(&self) -> Market {
            match self {
                PriceSeries::Ptf => Market::DayAhead,
                PriceSeries::Smf => Market::Balancing,
            }
        }
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct DateArgs {
        #[arg(long, help = "First day (YYYY-MM-DD)")]
        pub start: Option<NaiveDate>,

        #[arg(long, help = "Last day (YYYY-MM-DD)")]
        pub end: Option<NaiveDate>,

        #[arg(long, conflicts_with_all = ["start", "end"], help = "today, last7, last30 or this-month")]
        pub preset: Option<DatePreset>,
    }

    impl DateArgs {
        /// Missing ends default to a trailing week ending today.
        pub fn resolve(&self, today: NaiveDate) -> Result<DateRange> {
            if let Some(preset) = self.preset {
                return Ok(DateRange::from_preset(preset, today));
            }

            match (self.start, self.end) {
                (None, None) => Ok(DateRange::trailing(DEFAULT_LOOKBACK_DAYS, today)),
                (Some(start), None) => DateRange::new(start, today.max(start)),
                (None, Some(end)) => DateRange::new(end - Duration::days(DEFAULT_LOOKBACK_DAYS), end),
                (Some(start), Some(end)) => DateRange::new(start, end),
            }
        }
    }

    impl CliConfig {
        /// Flags take precedence over file and environment settings.
        pub fn apply_to(&self, settings: &mut Settings) {
            if let Some(path) = &self.output_path {
                settings.output.path = path.clone();
            }
            if self.no_cache {
                settings.cache.enabled = false;
            }
            if self.verbose {
                settings.debug = true;
            }
            if let Command::Api(ApiCommand::Fetch { formats, .. }) = &self.command {
                if !formats.is_empty() {
                    settings.output.formats = formats.clone();
                }
            }
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if let Some(path) = &self.output_path {
                validate_path("output_path", path)?;
            }
            if let Command::Api(ApiCommand::Fetch { formats, .. }) = &self.command {
                for format in formats {
                    validate_one_of("formats", format, &OUTPUT_FORMATS)?;
                }
            }
            Ok(())
        }
    }

}
