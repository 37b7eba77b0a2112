pub mod catalog;
pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use staffquote_core::config::{AppConfig, LoadOptions, LogFormat};
use staffquote_core::DiscountType;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "staffquote",
    about = "Staffquote pricing and discount approval CLI",
    long_about = "Price staffing quotes against a catalog file, resolve discount approvers, validate rule sets, and inspect configuration.",
    after_help = "Examples:\n  staffquote price --catalog catalog.toml --request quote.json\n  staffquote approver --catalog catalog.toml --percent 12.5\n  staffquote check-rules --catalog catalog.toml\n  staffquote config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price every line of a quote request and report required approvals")]
    Price {
        #[arg(long, help = "Catalog file (.toml or .json)")]
        catalog: PathBuf,
        #[arg(long, help = "Quote request file (.toml or .json)")]
        request: PathBuf,
        #[arg(long, help = "Evaluation date (YYYY-MM-DD); defaults to today in UTC")]
        as_of: Option<NaiveDate>,
    },
    #[command(about = "Resolve the approver role for a discount percentage")]
    Approver {
        #[arg(long, help = "Catalog file (.toml or .json)")]
        catalog: PathBuf,
        #[arg(long, help = "Discount percentage, e.g. 12.5")]
        percent: Decimal,
        #[arg(long, default_value = "line_item", help = "line_item or overall_quote")]
        discount_type: DiscountType,
    },
    #[command(about = "Validate catalog rules and the approval matrix under strict ingestion")]
    CheckRules {
        #[arg(long, help = "Catalog file (.toml or .json)")]
        catalog: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Price { catalog, request, as_of } => {
            commands::price::run(&catalog, &request, as_of)
        }
        Command::Approver { catalog, percent, discount_type } => {
            commands::approver::run(&catalog, percent, discount_type)
        }
        Command::CheckRules { catalog } => commands::check_rules::run(&catalog),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON payload.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
