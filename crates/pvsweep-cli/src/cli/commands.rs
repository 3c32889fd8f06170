use super::CliError;
use super::helpers::{init_logging, parse_cell_count, parse_shape_label, render_json};
use pvsweep_core::common::constants::{DEFAULT_ALLOWED_SHAPES, DEFAULT_CELL_COUNTS};
use pvsweep_core::domain::{ShadingRule, ShortCircuitModel};
use pvsweep_core::modules::dispatch::{DispatchReport, LtspiceCommand, PoolSettings};
use pvsweep_core::modules::geometry::enumerate_all_shapes;
use pvsweep_core::modules::harvest::HarvestSummary;
use pvsweep_core::modules::pipeline::{
    PipelineConfig, dispatch_all, generate_all, harvest_all, run_pipeline,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(clap::Args)]
pub(super) struct ShapesArgs {
    /// Cell counts to factor, comma separated (default: 8,9,10)
    #[arg(long, value_delimiter = ',', value_parser = parse_cell_count)]
    cell_counts: Option<Vec<u32>>,
}

#[derive(clap::Args)]
pub(super) struct SharedArgs {
    /// Dataset configuration (INI)
    #[arg(long, default_value = "data_sets.ini")]
    config: PathBuf,

    /// Output root for netlists, results and reports
    #[arg(long, default_value = "Output")]
    output: PathBuf,

    /// Cell counts to factor into shapes, comma separated
    #[arg(long, value_delimiter = ',', value_parser = parse_cell_count)]
    cell_counts: Option<Vec<u32>>,

    /// Allowed `RxC` shapes, comma separated
    #[arg(long, value_delimiter = ',', value_parser = parse_shape_label)]
    shapes: Option<Vec<String>>,

    /// Terminal short model: resistor or zero-source
    #[arg(long, default_value = "resistor")]
    short_model: ShortCircuitModel,

    /// Uniform shading rule: product ((column+1)*row <= n) or sequential (exactly n cells)
    #[arg(long, default_value = "product")]
    shading_rule: ShadingRule,

    /// Debug log file, truncated on every run
    #[arg(long, default_value = "pvsweep.log")]
    log_file: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct GenerateArgs {
    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(clap::Args)]
pub(super) struct AnalyzeArgs {
    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(clap::Args)]
pub(super) struct SimulateArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Simulator executable (default: LTspice XVII)
    #[arg(long)]
    simulator: Option<PathBuf>,

    /// Argument placed before the netlist path; repeatable (default: -Run -b)
    #[arg(long = "simulator-arg", allow_hyphen_values = true)]
    simulator_args: Vec<String>,

    /// Simulator processes allowed at once
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Minimum delay between two simulator launches
    #[arg(long)]
    spawn_interval_ms: Option<u64>,

    /// Per-job deadline before the simulator is killed
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Pause before the first launch
    #[arg(long, default_value_t = 0)]
    startup_delay_secs: u64,
}

impl SharedArgs {
    fn into_config(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            config_path: self.config,
            output_root: self.output,
            cell_counts: self.cell_counts.unwrap_or(defaults.cell_counts),
            allowed_shapes: self.shapes.unwrap_or(defaults.allowed_shapes),
            short_model: self.short_model,
            shading_rule: self.shading_rule,
            simulator: defaults.simulator,
            dispatch: defaults.dispatch,
        }
    }
}

impl SimulateArgs {
    fn into_config(self) -> (PathBuf, PipelineConfig) {
        let log_file = self.shared.log_file.clone();
        let mut config = self.shared.into_config();

        let mut simulator = LtspiceCommand::default();
        if let Some(executable) = self.simulator {
            simulator.executable = executable;
        }
        if !self.simulator_args.is_empty() {
            simulator.args = self.simulator_args;
        }
        config.simulator = simulator;

        let defaults = PoolSettings::default();
        config.dispatch.pool = PoolSettings {
            max_in_flight: self.max_in_flight.unwrap_or(defaults.max_in_flight),
            spawn_interval: self
                .spawn_interval_ms
                .map_or(defaults.spawn_interval, Duration::from_millis),
            job_timeout: self
                .timeout_secs
                .map_or(defaults.job_timeout, Duration::from_secs),
        };
        config.dispatch.startup_delay = Duration::from_secs(self.startup_delay_secs);
        (log_file, config)
    }
}

pub(super) fn run_shapes_command(args: ShapesArgs) -> Result<i32, CliError> {
    let counts = args
        .cell_counts
        .unwrap_or_else(|| DEFAULT_CELL_COUNTS.to_vec());
    for count in counts {
        let shapes = enumerate_all_shapes(&[count]);
        let labels = shapes
            .iter()
            .map(|(_, shape)| {
                let label = shape.label();
                if DEFAULT_ALLOWED_SHAPES.contains(&label.as_str()) {
                    format!("{}*", label)
                } else {
                    label
                }
            })
            .collect::<Vec<_>>();
        println!("{:>3}: {}", count, labels.join(" "));
    }
    println!("(* default allow-list)");
    Ok(0)
}

pub(super) fn run_generate_command(args: GenerateArgs) -> Result<i32, CliError> {
    init_logging(&args.shared.log_file)?;
    let config = args.shared.into_config();
    let datasets = config.datasets()?;
    let summary = generate_all(&config, &datasets)?;
    println!(
        "Netlists written: {}, already present: {}",
        summary.written, summary.skipped
    );
    Ok(0)
}

pub(super) fn run_simulate_command(args: SimulateArgs) -> Result<i32, CliError> {
    let (log_file, config) = args.into_config();
    init_logging(&log_file)?;
    let datasets = config.datasets()?;
    let report = dispatch_all(&config, &datasets)?;
    print_dispatch(&report);
    println!("JSON report: {}", config.layout().dispatch_report().display());

    if report.all_succeeded() { Ok(0) } else { Ok(1) }
}

pub(super) fn run_analyze_command(args: AnalyzeArgs) -> Result<i32, CliError> {
    init_logging(&args.shared.log_file)?;
    let config = args.shared.into_config();
    let datasets = config.datasets()?;
    let summary = harvest_all(&config, &datasets)?;
    print_harvest(&summary);

    if summary.degraded() { Ok(1) } else { Ok(0) }
}

pub(super) fn run_pipeline_command(args: SimulateArgs) -> Result<i32, CliError> {
    let (log_file, config) = args.into_config();
    init_logging(&log_file)?;
    let summary = run_pipeline(&config)?;
    println!(
        "Netlists written: {}, already present: {}",
        summary.generation.written, summary.generation.skipped
    );
    print_dispatch(&summary.dispatch);
    print_harvest(&summary.harvest);
    tracing::debug!("Pipeline summary:\n{}", render_json(&summary)?);

    if summary.succeeded() { Ok(0) } else { Ok(1) }
}

fn print_dispatch(report: &DispatchReport) {
    println!(
        "Simulations queued: {}, succeeded: {}, failed: {}, timed out: {}",
        report.queued,
        report.succeeded(),
        report.failed(),
        report.timed_out()
    );
}

fn print_harvest(summary: &HarvestSummary) {
    println!(
        "Result files parsed: {}, corrupt files removed: {}",
        summary.files_parsed,
        summary.corrupt_removed.len()
    );
    for path in &summary.corrupt_removed {
        println!("  removed {}", path.display());
    }
    match &summary.combined_report {
        Some(path) => println!("Combined report: {}", path.display()),
        None if summary.degraded() => {
            println!("Combined report withheld; re-run simulate and analyze")
        }
        None => println!("No results to report"),
    }
}
