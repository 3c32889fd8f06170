mod commands;
mod helpers;

use clap::Parser;
use pvsweep_core::domain::PvError;

pub fn run_from_env() -> i32 {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let pipeline_error = error.as_pv_error();
            eprintln!("{}", pipeline_error.diagnostic_line());
            eprintln!("{}", pipeline_error.fatal_exit_line());
            pipeline_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("pvsweep".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
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
    name = "pvsweep",
    version,
    about = "Solar array fault sweeps: SPICE netlists, batch simulation and CSV reports"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// List the series x parallel arrangements of each cell count
    Shapes(commands::ShapesArgs),
    /// Write netlists for every dataset, temperature, shape and fault
    Generate(commands::GenerateArgs),
    /// Run the simulator on every netlist without a result file
    Simulate(commands::SimulateArgs),
    /// Parse result files into CSV reports
    Analyze(commands::AnalyzeArgs),
    /// Generate, simulate and analyze in sequence
    Run(commands::SimulateArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Shapes(args) => commands::run_shapes_command(args),
        CliCommand::Generate(args) => commands::run_generate_command(args),
        CliCommand::Simulate(args) => commands::run_simulate_command(args),
        CliCommand::Analyze(args) => commands::run_analyze_command(args),
        CliCommand::Run(args) => commands::run_pipeline_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Pipeline(PvError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PvError> for CliError {
    fn from(error: PvError) -> Self {
        Self::Pipeline(error)
    }
}

impl CliError {
    fn as_pv_error(&self) -> PvError {
        match self {
            Self::Usage(message) => PvError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Pipeline(error) => error.clone(),
            Self::Internal(error) => PvError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
