use clap::Parser;
use geochem_classifier::cli::{Cli, run_cli};
use geochem_classifier::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "geochem_classifier=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        OutputFormatter::error(&format!("Error: {}", e));
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
