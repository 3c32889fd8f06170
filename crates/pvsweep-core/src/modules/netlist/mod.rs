//! SPICE netlist generation for every (temperature, shape, fault) job.

mod model;
mod nodes;

pub use nodes::CellNodes;

use crate::common::constants::CELL_LIBRARY_NAME;
use crate::domain::{
    ArrayShape, Dataset, NetlistJob, PvError, PvResult, ShadingRule, ShortCircuitModel,
};
use crate::modules::geometry::jobs_for_dataset;
use crate::modules::layout::{OutputLayout, create_dir_all};
use crate::modules::serialization::{write_new_text_artifact, write_text_artifact};
use model::NetlistModel;
use serde::Serialize;
use std::path::Path;

pub const CELL_LIBRARY: &str = include_str!("../../../assets/cell_2.lib");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Written,
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub written: usize,
    pub skipped: usize,
}

impl GenerationSummary {
    fn record(&mut self, outcome: GenerationOutcome) {
        match outcome {
            GenerationOutcome::Written => self.written += 1,
            GenerationOutcome::Skipped => self.skipped += 1,
        }
    }
}

impl std::ops::AddAssign for GenerationSummary {
    fn add_assign(&mut self, other: Self) {
        self.written += other.written;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetlistGenerator {
    pub short_model: ShortCircuitModel,
    pub shading_rule: ShadingRule,
}

impl NetlistGenerator {
    pub fn new(short_model: ShortCircuitModel) -> Self {
        Self {
            short_model,
            shading_rule: ShadingRule::default(),
        }
    }

    pub fn with_shading_rule(mut self, shading_rule: ShadingRule) -> Self {
        self.shading_rule = shading_rule;
        self
    }

    pub fn render(&self, job: &NetlistJob) -> String {
        NetlistModel::from_job(job, self.short_model, self.shading_rule).render()
    }

    /// Writes the job's netlist unless it already exists. Existing files are
    /// never reopened for writing.
    pub fn generate_job(
        &self,
        layout: &OutputLayout,
        job: &NetlistJob,
    ) -> PvResult<GenerationOutcome> {
        let paths = layout.job_paths(&job.key());
        let file_name = paths.netlist.display();
        if paths.netlist_complete() {
            tracing::debug!("File {} already exists - Skipping", file_name);
            return Ok(GenerationOutcome::Skipped);
        }

        if let Some(parent) = paths.netlist.parent() {
            create_dir_all(parent, "IO.NETLIST_DIRECTORY")?;
        }
        tracing::debug!("Beginning creation of {}", file_name);
        let written = write_new_text_artifact(&paths.netlist, &self.render(job)).map_err(
            |source| {
                PvError::io_system(
                    "IO.NETLIST_WRITE",
                    format!("failed to write netlist '{}': {}", file_name, source),
                )
            },
        )?;

        Ok(if written {
            GenerationOutcome::Written
        } else {
            GenerationOutcome::Skipped
        })
    }

    pub fn generate_dataset(
        &self,
        layout: &OutputLayout,
        dataset: &Dataset,
        shapes: &[ArrayShape],
    ) -> PvResult<GenerationSummary> {
        tracing::info!(
            "Generating dataset {} for temperatures: {:?}",
            dataset.name,
            dataset.temperatures
        );

        let mut summary = GenerationSummary::default();
        for &temperature in &dataset.temperatures {
            for &shape in shapes {
                let shape_dir = layout.shape_dir(&dataset.name, temperature, shape);
                create_dir_all(&shape_dir, "IO.NETLIST_DIRECTORY")?;
                write_cell_library(&shape_dir)?;
            }
        }

        for job in &jobs_for_dataset(dataset, shapes) {
            summary.record(self.generate_job(layout, job)?);
        }

        tracing::info!(
            "Dataset {}: {} netlists written, {} already present",
            dataset.name,
            summary.written,
            summary.skipped
        );
        Ok(summary)
    }
}

/// Places the cell subcircuit library next to the netlists that include it.
pub fn write_cell_library(dir: &Path) -> PvResult<()> {
    let path = dir.join(CELL_LIBRARY_NAME);
    write_text_artifact(&path, CELL_LIBRARY).map_err(|source| {
        PvError::io_system(
            "IO.CELL_LIBRARY_WRITE",
            format!("failed to write cell library '{}': {}", path.display(), source),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{CELL_LIBRARY, GenerationOutcome, NetlistGenerator};
    use crate::domain::{ArrayShape, Dataset, Fault, NetlistJob, ShortCircuitModel};
    use crate::modules::layout::OutputLayout;
    use std::fs;
    use tempfile::TempDir;

    fn dataset() -> Dataset {
        Dataset {
            name: "1000-900".to_string(),
            full: 1000,
            shade: 900,
            temperatures: vec![30],
        }
    }

    #[test]
    fn cell_library_defines_the_instantiated_subcircuit() {
        assert!(CELL_LIBRARY.contains(".subckt cell_2 n p rad"));
        assert!(CELL_LIBRARY.contains(".ends cell_2"));
    }

    #[test]
    fn existing_netlists_are_left_untouched() {
        let temp = TempDir::new().expect("tempdir should be created");
        let layout = OutputLayout::new(temp.path());
        let job = NetlistJob {
            dataset: "1000-900".to_string(),
            full: 1000,
            shade: 900,
            temperature: 30,
            shape: ArrayShape::new(2, 4),
            fault: Fault::UniformShade(2),
        };
        let generator = NetlistGenerator::default();

        let first = generator
            .generate_job(&layout, &job)
            .expect("first generation should succeed");
        assert_eq!(first, GenerationOutcome::Written);

        let path = layout.job_paths(&job.key()).netlist;
        fs::write(&path, "* hand edited\n").expect("netlist should be overwritten by test");

        let second = generator
            .generate_job(&layout, &job)
            .expect("second generation should succeed");
        assert_eq!(second, GenerationOutcome::Skipped);
        assert_eq!(
            fs::read_to_string(&path).expect("netlist should be readable"),
            "* hand edited\n"
        );
    }

    #[test]
    fn dataset_generation_writes_library_and_every_fault_case() {
        let temp = TempDir::new().expect("tempdir should be created");
        let layout = OutputLayout::new(temp.path());
        let generator = NetlistGenerator::new(ShortCircuitModel::ZeroSource);

        let summary = generator
            .generate_dataset(&layout, &dataset(), &[ArrayShape::new(2, 4)])
            .expect("generation should succeed");
        // 9 shading, 3 open, 4 short
        assert_eq!(summary.written, 16);
        assert_eq!(summary.skipped, 0);

        let shape_dir = temp.path().join("1000-900/Temp30/2x4");
        assert!(shape_dir.join("cell_2.lib").is_file());
        assert!(shape_dir.join("2x4_3_Open.cir").is_file());
        assert!(!shape_dir.join("2x4_4_Open.cir").exists());
        let short = fs::read_to_string(shape_dir.join("2x4_4_Short.cir")).expect("short netlist");
        assert_eq!(short.matches("ishort_").count(), 4);

        let again = generator
            .generate_dataset(&layout, &dataset(), &[ArrayShape::new(2, 4)])
            .expect("regeneration should succeed");
        assert_eq!((again.written, again.skipped), (0, 16));
    }
}
