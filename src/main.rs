mod cli;
mod error;
mod handlers;
mod outcome;
mod request;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let parsed_args = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(parsed_args.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = handlers::handle(&parsed_args.as_request(), parsed_args.tool_params());
    match outcome.to_json(parsed_args.pretty) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("couldn't encode outcome: {e}");
            return ExitCode::FAILURE;
        }
    }
    if outcome.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
