use crate::infra::{parse_attribute, parse_date, parse_decimal};
use crate::report::{run_batch, run_compute, run_profiles};
use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tiered_rate::config::AppConfig;
use tiered_rate::error::AppError;
use tiered_rate::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "Tiered Rate Calculator",
    about = "Serve or run tiered rate calculations from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// List the available calculator profiles
    Profiles,
    /// Compute a single request against a profile
    Compute(ComputeArgs),
    /// Compute every row of a CSV file against a profile
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ComputeArgs {
    /// Calculator profile name (see `profiles`)
    #[arg(long)]
    pub(crate) profile: String,
    /// Rate table category, matched case-insensitively
    #[arg(long)]
    pub(crate) category: String,
    #[arg(long)]
    pub(crate) principal: f64,
    /// Years, tickets, or days depending on the profile
    #[arg(long)]
    pub(crate) duration: u32,
    /// Boolean flag to set, repeatable
    #[arg(long = "flag")]
    pub(crate) flags: Vec<String>,
    /// Numeric attribute as name=value, repeatable
    #[arg(long = "attribute", value_parser = parse_attribute)]
    pub(crate) attributes: Vec<(String, f64)>,
    /// Evaluation date for date-keyed rules (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) evaluated_on: Option<NaiveDate>,
    /// Print the result as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// Calculator profile name (see `profiles`)
    #[arg(long)]
    pub(crate) profile: String,
    /// CSV file with category, principal, duration columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Flat penalty added to the total when enough rows succeed
    #[arg(long, value_parser = parse_decimal, requires = "penalty_over")]
    pub(crate) penalty: Option<Decimal>,
    /// Apply the penalty when strictly more than this many rows succeed
    #[arg(long, requires = "penalty")]
    pub(crate) penalty_over: Option<usize>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match command {
        Command::Serve(args) => server::run(config, args).await,
        Command::Profiles => run_profiles(&config),
        Command::Compute(args) => run_compute(&config, args),
        Command::Batch(args) => run_batch(&config, args),
    }
}
