mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

use commands::amortization::{PaymentArgs, ScheduleArgs};
use commands::closing_costs::{ClosingCostArgs, FeesArgs};
use commands::loan_programs::LoanProgramArgs;
use commands::rates::CompareRatesArgs;
use output::OutputFormat;

/// Mortgage payment, schedule and closing-cost calculations
#[derive(Parser)]
#[command(
    name = "mcalc",
    version,
    about = "Mortgage payment, schedule and closing-cost calculations",
    long_about = "A CLI for mortgage calculations with decimal precision. Supports level \
                  monthly payments, amortization schedules, rule-based closing-cost \
                  estimates, rate comparison and loan-program screening."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine config (JSON or YAML) overriding the fee schedule, rate table or program catalog
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log calculation detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Level monthly payment and lifetime totals
    Payment(PaymentArgs),
    /// Month-by-month amortization schedule
    Schedule(ScheduleArgs),
    /// Itemised closing costs and cash to close
    ClosingCosts(ClosingCostArgs),
    /// Print the effective fee schedule
    Fees(FeesArgs),
    /// Compare quoted rates for one principal
    CompareRates(CompareRatesArgs),
    /// Screen a borrower against the loan-program catalog
    LoanPrograms(LoanProgramArgs),
    /// Print version information
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "mortgage_calc_core=debug,mcalc=debug"
    } else {
        "mortgage_calc_core=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = match cli.config.as_deref().map(config::load_config).transpose() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Payment(args) => commands::amortization::run_payment(args),
        Commands::Schedule(args) => commands::amortization::run_schedule(args),
        Commands::ClosingCosts(args) => {
            commands::closing_costs::run_closing_costs(args, engine.as_ref())
        }
        Commands::Fees(args) => commands::closing_costs::run_fees(args, engine.as_ref()),
        Commands::CompareRates(args) => commands::rates::run_compare_rates(args, engine.as_ref()),
        Commands::LoanPrograms(args) => {
            commands::loan_programs::run_loan_programs(args, engine.as_ref())
        }
        Commands::Version => {
            println!("mcalc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
