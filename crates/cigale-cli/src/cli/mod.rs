mod commands;
mod helpers;

use cigale_core::domain::{CigaleError, CigaleErrorCategory};
use cigale_core::process::DEFAULT_EXECUTABLE;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            eprintln!("FATAL EXIT CODE: {}", error.exit_code());
            error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "cigale-wrapper",
    about = "Drive pcigale savefluxes simulations and manage their model tables"
)]
struct Cli {
    /// External pcigale executable
    #[arg(long, global = true, default_value = DEFAULT_EXECUTABLE)]
    pcigale: String,

    /// Directory holding pcigale.ini and the out/ directory (default: current directory)
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run the full init/genconf/run pipeline for a plan
    Run(commands::PlanArgs),
    /// Run a plan and load the resulting model table
    Fetch(commands::PlanArgs),
    /// Load a cached model table, simulating only when it is missing
    Quick(commands::QuickArgs),
    /// Rewrite parameters of an existing pcigale.ini
    Patch(commands::PatchArgs),
    /// Print the filter names selected by a plan
    Bands(commands::BandsArgs),
    /// Print a log-spaced integer age grid
    Ages(commands::AgesArgs),
}

fn dispatch_parsed(cli: Cli) -> Result<i32, CliError> {
    let context = helpers::CliContext::new(cli.pcigale, cli.workdir)?;
    debug!(
        pcigale = %context.pcigale,
        working_dir = %context.working_dir.display(),
        "resolved command context"
    );
    match cli.command {
        CliCommand::Run(args) => commands::run_simulation_command(&context, args),
        CliCommand::Fetch(args) => commands::run_fetch_command(&context, args),
        CliCommand::Quick(args) => commands::run_quick_command(&context, args),
        CliCommand::Patch(args) => commands::run_patch_command(args),
        CliCommand::Bands(args) => commands::run_bands_command(args),
        CliCommand::Ages(args) => commands::run_ages_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(CigaleError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn placeholder(&self) -> &'static str {
        match self {
            Self::Usage(_) => "INPUT.CLI_USAGE",
            Self::Compute(error) => error.placeholder(),
            Self::Internal(_) => "IO.CLI",
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => CigaleErrorCategory::InputValidationError.exit_code(),
            Self::Compute(error) => error.exit_code(),
            Self::Internal(_) => CigaleErrorCategory::IoSystemError.exit_code(),
        }
    }

    fn diagnostic_line(&self) -> String {
        let message = match self {
            Self::Usage(message) => message.trim_end().to_string(),
            Self::Compute(error) => error.to_string(),
            Self::Internal(error) => format!("{error:#}"),
        };
        format!("ERROR: [{}] {}", self.placeholder(), message)
    }
}

impl From<CigaleError> for CliError {
    fn from(error: CigaleError) -> Self {
        Self::Compute(error)
    }
}
