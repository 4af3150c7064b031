mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analysis::AnalysisArgs;
use commands::flows::{IrrArgs, NpvArgs};
use commands::grading::{GradeArgs, ReportArgs};

/// Investment viability analysis with decimal precision
#[derive(Parser)]
#[command(
    name = "iva",
    version,
    about = "Investment viability analysis with decimal precision",
    long_about = "A CLI for deterministic investment viability analysis: cash-flow \
                  projection with dual amortizing loans, NPV/IRR valuation metrics, \
                  DSCR schedules, scale-aware grading, and narrative evaluation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline (projection, metrics, DSCR)
    Analyze(AnalysisArgs),
    /// Project the year-by-year cash-flow table only
    CashFlows(AnalysisArgs),
    /// Build the debt-service coverage schedule only
    Dscr(AnalysisArgs),
    /// Net present value of a flow series
    Npv(NpvArgs),
    /// Internal rate of return of a flow series (hybrid bisection/Newton)
    Irr(IrrArgs),
    /// Classify scale and grade an investment
    Grade(GradeArgs),
    /// Produce the full narrative evaluation
    Report(ReportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::CashFlows(args) => commands::analysis::run_cash_flows(args),
        Commands::Dscr(args) => commands::analysis::run_dscr(args),
        Commands::Npv(args) => commands::flows::run_npv(args),
        Commands::Irr(args) => commands::flows::run_irr(args),
        Commands::Grade(args) => commands::grading::run_grade(args),
        Commands::Report(args) => commands::grading::run_report(args),
        Commands::Version => {
            println!("iva {}", env!("CARGO_PKG_VERSION"));
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
