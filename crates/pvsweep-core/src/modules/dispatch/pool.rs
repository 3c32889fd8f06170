use crate::common::constants::{
    DEFAULT_JOB_TIMEOUT, DEFAULT_MAX_IN_FLIGHT, DEFAULT_SPAWN_INTERVAL, POLL_INTERVAL,
};
use crate::domain::{PvError, PvResult};
use crate::modules::layout::JobPaths;
use crate::modules::traits::SimulatorCommand;
use serde::Serialize;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    /// `exit_code` is absent when the process was terminated by a signal.
    Failed { exit_code: Option<i32> },
    TimedOut,
    SpawnFailed { message: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub netlist: PathBuf,
    pub outcome: JobOutcome,
    pub elapsed_ms: u64,
    pub result_written: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub simulator: String,
    pub queued: usize,
    pub records: Vec<JobRecord>,
}

impl DispatchReport {
    fn count(&self, predicate: impl Fn(&JobOutcome) -> bool) -> usize {
        self.records
            .iter()
            .filter(|record| predicate(&record.outcome))
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobOutcome::is_success)
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                JobOutcome::Failed { .. } | JobOutcome::SpawnFailed { .. }
            )
        })
    }

    pub fn timed_out(&self) -> usize {
        self.count(|outcome| matches!(outcome, JobOutcome::TimedOut))
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.records.len()
    }

    pub fn write_json(&self, path: &Path) -> PvResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                PvError::io_system(
                    "IO.DISPATCH_REPORT_DIRECTORY",
                    format!(
                        "failed to create dispatch report directory '{}': {}",
                        parent.display(),
                        source
                    ),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            PvError::internal(
                "SYS.DISPATCH_REPORT_SERIALIZE",
                format!("failed to serialize dispatch report: {}", source),
            )
        })?;
        fs::write(path, json).map_err(|source| {
            PvError::io_system(
                "IO.DISPATCH_REPORT_WRITE",
                format!(
                    "failed to write dispatch report '{}': {}",
                    path.display(),
                    source
                ),
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_in_flight: usize,
    pub spawn_interval: Duration,
    pub job_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

impl PoolSettings {
    /// One spawn interval per job plus one timeout for the last job.
    pub fn estimated_runtime(&self, jobs: usize) -> Duration {
        let jobs = u32::try_from(jobs).unwrap_or(u32::MAX);
        self.spawn_interval.saturating_mul(jobs) + self.job_timeout
    }
}

struct RunningJob {
    paths: JobPaths,
    child: Child,
    started: Instant,
}

/// Bounded pool of simulator processes with a per-job deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationPool {
    settings: PoolSettings,
}

impl SimulationPool {
    pub fn new(settings: PoolSettings) -> Self {
        Self { settings }
    }

    /// Runs every job to an outcome. Failures are recorded, never retried.
    pub fn run<C: SimulatorCommand>(&self, simulator: &C, jobs: &[JobPaths]) -> DispatchReport {
        let max_in_flight = self.settings.max_in_flight.max(1);
        let mut queue = jobs.iter().cloned().collect::<VecDeque<_>>();
        let mut running: Vec<RunningJob> = Vec::new();
        let mut records = Vec::with_capacity(jobs.len());
        let mut last_spawn: Option<Instant> = None;

        while !queue.is_empty() || !running.is_empty() {
            self.reap(&mut running, &mut records);

            let spawn_due = last_spawn
                .is_none_or(|instant| instant.elapsed() >= self.settings.spawn_interval);
            if running.len() < max_in_flight && spawn_due {
                if let Some(paths) = queue.pop_front() {
                    last_spawn = Some(Instant::now());
                    match spawn(simulator, &paths) {
                        Ok(job) => running.push(job),
                        Err(message) => {
                            tracing::warn!(
                                "Could not start simulator for {}: {}",
                                paths.netlist.display(),
                                message
                            );
                            records.push(JobRecord {
                                result_written: paths.simulation_complete(),
                                netlist: paths.netlist,
                                outcome: JobOutcome::SpawnFailed { message },
                                elapsed_ms: 0,
                            });
                        }
                    }
                    continue;
                }
            }

            thread::sleep(POLL_INTERVAL);
        }

        DispatchReport {
            simulator: simulator.describe(),
            queued: jobs.len(),
            records,
        }
    }

    fn reap(&self, running: &mut Vec<RunningJob>, records: &mut Vec<JobRecord>) {
        let mut index = 0;
        while index < running.len() {
            let job = &mut running[index];
            let elapsed = job.started.elapsed();
            let outcome = match job.child.try_wait() {
                Ok(Some(status)) => Some(exit_outcome(status)),
                Ok(None) if elapsed >= self.settings.job_timeout => {
                    let _ = job.child.kill();
                    let _ = job.child.wait();
                    Some(JobOutcome::TimedOut)
                }
                Ok(None) => None,
                Err(source) => {
                    tracing::warn!(
                        "Lost track of simulator for {}: {}",
                        job.paths.netlist.display(),
                        source
                    );
                    let _ = job.child.kill();
                    Some(JobOutcome::Failed { exit_code: None })
                }
            };

            let Some(outcome) = outcome else {
                index += 1;
                continue;
            };
            let job = running.swap_remove(index);
            records.push(finish(job, outcome, elapsed));
        }
    }
}

fn spawn<C: SimulatorCommand>(simulator: &C, paths: &JobPaths) -> Result<RunningJob, String> {
    let child = simulator
        .command(&paths.netlist)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| source.to_string())?;
    tracing::debug!("Started simulator on {}", paths.netlist.display());
    Ok(RunningJob {
        paths: paths.clone(),
        child,
        started: Instant::now(),
    })
}

fn exit_outcome(status: ExitStatus) -> JobOutcome {
    if status.success() {
        JobOutcome::Succeeded
    } else {
        JobOutcome::Failed {
            exit_code: status.code(),
        }
    }
}

fn finish(job: RunningJob, outcome: JobOutcome, elapsed: Duration) -> JobRecord {
    let netlist = job.paths.netlist.display();
    let result_written = job.paths.simulation_complete();
    match &outcome {
        JobOutcome::Succeeded if !result_written => tracing::warn!(
            "Simulator exited cleanly on {} but left no result file",
            netlist
        ),
        JobOutcome::Succeeded => tracing::debug!("Finished {}", netlist),
        JobOutcome::Failed { exit_code } => tracing::warn!(
            "Simulator failed on {} ({})",
            netlist,
            exit_code.map_or_else(
                || "terminated by signal".to_string(),
                |code| format!("exit code {}", code)
            )
        ),
        JobOutcome::TimedOut => tracing::warn!(
            "Simulator on {} exceeded {:.1}s and was terminated",
            netlist,
            elapsed.as_secs_f64()
        ),
        JobOutcome::SpawnFailed { .. } => {}
    }

    JobRecord {
        netlist: job.paths.netlist,
        outcome,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        result_written,
    }
}

#[cfg(test)]
mod tests {
    use super::{DispatchReport, JobOutcome, JobRecord, PoolSettings};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn record(outcome: JobOutcome) -> JobRecord {
        JobRecord {
            netlist: PathBuf::from("2x4_0_Shading.cir"),
            outcome,
            elapsed_ms: 10,
            result_written: false,
        }
    }

    #[test]
    fn report_counts_each_outcome_kind() {
        let report = DispatchReport {
            simulator: "fake".to_string(),
            queued: 4,
            records: vec![
                record(JobOutcome::Succeeded),
                record(JobOutcome::Failed { exit_code: Some(2) }),
                record(JobOutcome::TimedOut),
                record(JobOutcome::SpawnFailed {
                    message: "not found".to_string(),
                }),
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.timed_out(), 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn report_serializes_tagged_outcomes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("Data/dispatch-report.json");
        let report = DispatchReport {
            simulator: "fake".to_string(),
            queued: 1,
            records: vec![record(JobOutcome::Failed { exit_code: Some(3) })],
        };
        report.write_json(&path).expect("report should be written");

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&path).expect("report should be readable"),
        )
        .expect("report should be valid JSON");
        assert_eq!(json["records"][0]["outcome"]["status"], "failed");
        assert_eq!(json["records"][0]["outcome"]["exit_code"], 3);
        assert_eq!(json["queued"], 1);
    }

    #[test]
    fn estimated_runtime_covers_spawning_and_deadline() {
        let settings = PoolSettings::default();
        assert_eq!(settings.estimated_runtime(0), Duration::from_secs(8));
        assert_eq!(settings.estimated_runtime(100), Duration::from_secs(38));
    }
}
