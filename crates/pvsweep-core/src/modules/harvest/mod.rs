//! Result harvesting: raw waveforms in, three tiers of CSV reports out.
//!
//! 1. `Output/Data/<dataset>/Temp<T>/<RxC>.csv` for every shape directory.
//! 2. `Output/Data/<dataset>/<dataset>.csv`, reused from disk when present.
//! 3. `Output/all_cell_data.csv`, withheld when any result file was corrupt.

mod records;
mod table;

pub use table::ReportTable;

use crate::common::constants::RESULT_EXTENSION;
use crate::domain::{Dataset, PvError, PvResult, parse_job_file_stem};
use crate::modules::layout::{
    OutputLayout, ShapeDirectory, extension_matcher, files_matching, shape_directories,
};
use crate::modules::waveform::{WaveformError, read_waveform};
use records::{ResultSource, file_records};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
    pub files_parsed: usize,
    pub corrupt_removed: Vec<PathBuf>,
    pub degraded_datasets: Vec<String>,
    pub reused_rollups: Vec<String>,
    pub reports_written: Vec<PathBuf>,
    pub combined_report: Option<PathBuf>,
}

impl HarvestSummary {
    pub fn degraded(&self) -> bool {
        !self.degraded_datasets.is_empty()
    }
}

#[derive(Debug, Default)]
struct DatasetHarvest {
    table: ReportTable,
    degraded: bool,
}

pub fn harvest<S: AsRef<str>>(
    layout: &OutputLayout,
    datasets: &[S],
    allowed_shapes: &[S],
) -> PvResult<HarvestSummary> {
    let mut summary = HarvestSummary::default();
    let mut combined = ReportTable::default();

    for dataset in datasets {
        let name = dataset.as_ref();
        let rollup_path = layout.dataset_report(name);
        if rollup_path.is_file() {
            tracing::info!(
                "Dataset {} already has {} - reading it from disk",
                name,
                rollup_path.display()
            );
            combined.append(&ReportTable::read_csv(&rollup_path)?);
            summary.reused_rollups.push(name.to_string());
            continue;
        }

        tracing::info!("Running Data Analysis on {}", name);
        let harvested = harvest_dataset(layout, dataset, allowed_shapes, &mut summary)?;
        if harvested.degraded {
            tracing::warn!(
                "Dataset {} contained corrupt results; its rollup was not written",
                name
            );
            summary.degraded_datasets.push(name.to_string());
        } else if !harvested.table.is_empty() {
            harvested.table.write_csv(&rollup_path)?;
            summary.reports_written.push(rollup_path);
        }
        combined.append(&harvested.table);
    }

    if summary.degraded() {
        tracing::error!(
            "Corrupt simulation results were removed from {} dataset(s); re-run the simulations and then the analysis to produce {}",
            summary.degraded_datasets.len(),
            layout.combined_report().display()
        );
        return Ok(summary);
    }

    if combined.is_empty() {
        tracing::info!("No simulation results found; combined report not written");
        return Ok(summary);
    }

    let combined_path = layout.combined_report();
    combined.write_csv(&combined_path)?;
    tracing::info!(
        "Wrote {} rows to {}",
        combined.len(),
        combined_path.display()
    );
    summary.reports_written.push(combined_path.clone());
    summary.combined_report = Some(combined_path);
    Ok(summary)
}

fn harvest_dataset<S: AsRef<str>>(
    layout: &OutputLayout,
    dataset: &S,
    allowed_shapes: &[S],
    summary: &mut HarvestSummary,
) -> PvResult<DatasetHarvest> {
    let name = dataset.as_ref();
    let (full, shade) = Dataset::parse_name(name)?;
    let matcher = extension_matcher(RESULT_EXTENSION)?;
    let mut harvested = DatasetHarvest::default();
    let mut panel_id = 1;

    for directory in shape_directories(
        layout.root(),
        std::slice::from_ref(dataset),
        Some(allowed_shapes),
    )? {
        let Some(temperature) = directory.temperature() else {
            tracing::debug!(
                "Ignoring {} - not a temperature directory",
                directory.path.display()
            );
            continue;
        };
        tracing::info!(
            "Generating for: {}/{}/{} [{}]",
            directory.dataset,
            directory.temperature_dir,
            directory.shape_dir,
            directory.dataset
        );

        let mut directory_table = ReportTable::default();
        for result in files_matching(&directory.path, &matcher)? {
            let Some(stem) = result.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let Some((shape, fault)) = parse_job_file_stem(stem) else {
                tracing::warn!("Ignoring {} - not a job result name", result.display());
                continue;
            };

            let source = ResultSource {
                file_name: stem.to_string(),
                full,
                shade,
                temperature,
                shape,
                fault,
                panel_id,
            };
            tracing::debug!("Creating Datasheet Output from {}", result.display());
            match read_waveform(&result).and_then(|waveform| file_records(&source, &waveform)) {
                Ok(records) => {
                    for row in records.rows {
                        directory_table.push_row(&records.columns, row);
                    }
                    summary.files_parsed += 1;
                    panel_id += 1;
                }
                Err(error) if error.is_structural() => {
                    remove_corrupt(&result, &error)?;
                    summary.corrupt_removed.push(result);
                    harvested.degraded = true;
                }
                Err(error) => return Err(error.into()),
            }
        }

        write_directory_report(layout, &directory, &directory_table, summary)?;
        harvested.table.append(&directory_table);
    }

    Ok(harvested)
}

fn remove_corrupt(path: &Path, error: &WaveformError) -> PvResult<()> {
    tracing::warn!("Removing corrupt result {}: {}", path.display(), error);
    fs::remove_file(path).map_err(|source| {
        PvError::io_system(
            "IO.CORRUPT_RESULT_REMOVE",
            format!(
                "failed to remove corrupt result '{}': {}",
                path.display(),
                source
            ),
        )
    })
}

fn write_directory_report(
    layout: &OutputLayout,
    directory: &ShapeDirectory,
    table: &ReportTable,
    summary: &mut HarvestSummary,
) -> PvResult<()> {
    if table.is_empty() {
        tracing::debug!("No results in {}", directory.path.display());
        return Ok(());
    }
    let path = layout.directory_report(directory);
    table.write_csv(&path)?;
    summary.reports_written.push(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ReportTable, harvest};
    use crate::modules::layout::OutputLayout;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SHAPES: [&str; 1] = ["1x1"];

    fn write_result(dir: &Path, name: &str, current: f64) {
        let text = format!(
            "Title: t\nPlotname: DC transfer characteristic\nFlags: real\nNo. Variables: 4\nNo. Points: 2\n\
             Variables:\n\t0\tvbias\tvoltage\n\t1\tV(01)\tvoltage\n\t2\tI(Vbias)\tdevice_current\n\
             \t3\tIx(cell_0001_0002:p)\tsubckt_current\nValues:\n\
             0\t0\n\t0\n\t{current}\n\t{neg}\n1\t0.5\n\t0.5\n\t{current}\n\t{neg}\n",
            current = current,
            neg = -current
        );
        fs::create_dir_all(dir).expect("result dir should be created");
        fs::write(dir.join(name), text).expect("result should be written");
    }

    #[test]
    fn valid_results_fill_every_report_tier() {
        let temp = TempDir::new().expect("tempdir should be created");
        let layout = OutputLayout::new(temp.path());
        let shape_dir = temp.path().join("1000-900/Temp30/1x1");
        write_result(&shape_dir, "1x1_0_Shading.raw", -1.0);
        write_result(&shape_dir, "1x1_1_Shading.raw", -0.9);

        let summary = harvest(&layout, &["1000-900"], &SHAPES).expect("harvest should succeed");
        assert_eq!(summary.files_parsed, 2);
        assert!(!summary.degraded());

        let directory_report = temp.path().join("Data/1000-900/Temp30/1x1.csv");
        let table = ReportTable::read_csv(&directory_report).expect("directory report");
        assert_eq!(table.len(), 4);
        assert_eq!(table.value(0, "Solar Panel ID"), Some("1"));
        assert_eq!(table.value(2, "Solar Panel ID"), Some("2"));
        assert_eq!(table.value(3, "Power (W)"), Some("-0.45"));
        assert_eq!(table.value(3, "C01R01 Power (W)"), Some("0.45"));

        assert!(temp.path().join("Data/1000-900/1000-900.csv").is_file());
        let combined = ReportTable::read_csv(&temp.path().join("all_cell_data.csv"))
            .expect("combined report");
        assert_eq!(combined.len(), 4);
        assert_eq!(summary.combined_report, Some(layout.combined_report()));
    }

    #[test]
    fn corrupt_results_are_removed_and_withhold_the_combined_report() {
        let temp = TempDir::new().expect("tempdir should be created");
        let layout = OutputLayout::new(temp.path());
        let shape_dir = temp.path().join("1000-900/Temp30/1x1");
        write_result(&shape_dir, "1x1_0_Shading.raw", -1.0);
        fs::write(shape_dir.join("1x1_1_Shading.raw"), b"\xff\xfeT\x00").expect("corrupt raw");
        write_result(&temp.path().join("800-400/Temp30/1x1"), "1x1_0_Shading.raw", -1.0);

        let summary = harvest(&layout, &["1000-900", "800-400"], &SHAPES)
            .expect("harvest should finish despite corruption");
        assert!(summary.degraded());
        assert_eq!(summary.degraded_datasets, vec!["1000-900"]);
        assert_eq!(summary.files_parsed, 2);
        assert_eq!(summary.corrupt_removed, vec![shape_dir.join("1x1_1_Shading.raw")]);
        assert!(!shape_dir.join("1x1_1_Shading.raw").exists());

        assert!(!temp.path().join("Data/1000-900/1000-900.csv").exists());
        assert!(temp.path().join("Data/800-400/800-400.csv").is_file());
        assert!(!temp.path().join("all_cell_data.csv").exists());
        assert_eq!(summary.combined_report, None);
    }

    #[test]
    fn existing_rollups_are_read_back_instead_of_recomputed() {
        let temp = TempDir::new().expect("tempdir should be created");
        let layout = OutputLayout::new(temp.path());
        let rollup = temp.path().join("Data/1000-900/1000-900.csv");
        fs::create_dir_all(rollup.parent().expect("rollup parent")).expect("data dir");
        fs::write(&rollup, "File Name,Power (W)\ncached,1\n").expect("rollup should be written");
        write_result(&temp.path().join("1000-900/Temp30/1x1"), "1x1_0_Shading.raw", -1.0);

        let summary = harvest(&layout, &["1000-900"], &SHAPES).expect("harvest should succeed");
        assert_eq!(summary.reused_rollups, vec!["1000-900"]);
        assert_eq!(summary.files_parsed, 0);

        let combined = ReportTable::read_csv(&layout.combined_report()).expect("combined report");
        assert_eq!(combined.len(), 1);
        assert_eq!(combined.value(0, "File Name"), Some("cached"));
    }
}
