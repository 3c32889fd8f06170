//! Simulator dispatch over every netlist that has no result yet.

mod pool;

pub use pool::{DispatchReport, JobOutcome, JobRecord, PoolSettings, SimulationPool};

use crate::common::constants::{DEFAULT_SIMULATOR, DEFAULT_SIMULATOR_ARGS, NETLIST_EXTENSION};
use crate::domain::PvResult;
use crate::modules::layout::{
    JobPaths, OutputLayout, extension_matcher, files_matching, shape_directories,
};
use crate::modules::traits::SimulatorCommand;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

/// `<executable> <args...> <netlist>`; LTspice's batch flags by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LtspiceCommand {
    pub executable: PathBuf,
    pub args: Vec<String>,
}

impl Default for LtspiceCommand {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_SIMULATOR),
            args: DEFAULT_SIMULATOR_ARGS.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

impl LtspiceCommand {
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
        }
    }
}

impl SimulatorCommand for LtspiceCommand {
    fn command(&self, netlist: &Path) -> Command {
        let mut command = Command::new(&self.executable);
        command.args(&self.args).arg(netlist);
        command
    }

    fn describe(&self) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Netlists under the selected datasets and shapes whose result file is missing.
pub fn discover_pending<S: AsRef<str>>(
    layout: &OutputLayout,
    datasets: &[S],
    allowed_shapes: &[S],
) -> PvResult<Vec<JobPaths>> {
    let matcher = extension_matcher(NETLIST_EXTENSION)?;
    let mut pending = Vec::new();

    for directory in shape_directories(layout.root(), datasets, Some(allowed_shapes))? {
        tracing::info!(
            "Sub Directory: {}/{}/{} [{}]",
            directory.dataset,
            directory.temperature_dir,
            directory.shape_dir,
            directory.dataset
        );
        for netlist in files_matching(&directory.path, &matcher)? {
            let paths = JobPaths::for_netlist(&netlist);
            let name = file_name(&paths.netlist);
            if paths.simulation_complete() {
                tracing::debug!(
                    "Skipping {} - {} already exists",
                    name,
                    file_name(&paths.result)
                );
                continue;
            }
            tracing::info!("Queueing simulator on {} [{}]", name, directory.dataset);
            pending.push(paths);
        }
    }

    pending.sort();
    Ok(pending)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    pub pool: PoolSettings,
    pub startup_delay: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            pool: PoolSettings::default(),
            startup_delay: Duration::ZERO,
        }
    }
}

/// Discovers pending jobs, runs them through a [`SimulationPool`], and stores
/// the report at `Output/Data/dispatch-report.json`.
pub fn dispatch_pending<S: AsRef<str>, C: SimulatorCommand>(
    layout: &OutputLayout,
    datasets: &[S],
    allowed_shapes: &[S],
    simulator: &C,
    options: &DispatchOptions,
) -> PvResult<DispatchReport> {
    let pending = discover_pending(layout, datasets, allowed_shapes)?;
    let estimate = options.pool.estimated_runtime(pending.len()).as_secs_f64();
    tracing::info!(
        "{} simulator runs have been queued - Expect a runtime of {:.2} seconds ({:.0} minutes, {:.2} seconds)",
        pending.len(),
        estimate,
        (estimate / 60.0).floor(),
        estimate % 60.0
    );

    if !pending.is_empty() && !options.startup_delay.is_zero() {
        tracing::info!(
            "Beginning run in {} seconds...",
            options.startup_delay.as_secs()
        );
        thread::sleep(options.startup_delay);
    }

    let report = SimulationPool::new(options.pool).run(simulator, &pending);
    tracing::info!(
        "Dispatch finished: {} succeeded, {} failed, {} timed out",
        report.succeeded(),
        report.failed(),
        report.timed_out()
    );
    report.write_json(&layout.dispatch_report())?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{LtspiceCommand, discover_pending};
    use crate::modules::layout::OutputLayout;
    use crate::modules::traits::SimulatorCommand;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn default_command_runs_ltspice_in_batch_mode() {
        let simulator = LtspiceCommand::default();
        let command = simulator.command(Path::new("Output/1000-900/Temp30/2x4/2x4_0_Shading.cir"));
        let args = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            args,
            vec!["-Run", "-b", "Output/1000-900/Temp30/2x4/2x4_0_Shading.cir"]
        );
        assert!(simulator.describe().ends_with("XVIIx64.exe -Run -b"));
    }

    #[test]
    fn discovery_skips_finished_jobs_and_unselected_shapes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let shape_dir = temp.path().join("1000-900/Temp30/2x4");
        let other_shape = temp.path().join("1000-900/Temp30/7x1");
        let other_dataset = temp.path().join("500-100/Temp30/2x4");
        for dir in [&shape_dir, &other_shape, &other_dataset] {
            fs::create_dir_all(dir).expect("shape dir should be created");
        }
        for file in [
            shape_dir.join("2x4_0_Shading.cir"),
            shape_dir.join("2x4_1_Shading.cir"),
            shape_dir.join("2x4_1_Shading.raw"),
            shape_dir.join("cell_2.lib"),
            other_shape.join("7x1_0_Shading.cir"),
            other_dataset.join("2x4_0_Shading.cir"),
        ] {
            fs::write(file, "").expect("file should be written");
        }

        let layout = OutputLayout::new(temp.path());
        let pending = discover_pending(&layout, &["1000-900"], &["2x4"])
            .expect("discovery should succeed");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].netlist, shape_dir.join("2x4_0_Shading.cir"));
        assert_eq!(pending[0].result, shape_dir.join("2x4_0_Shading.raw"));
    }
}
