//! End-to-end driver: config, generate, dispatch, harvest.

use crate::common::config::{DatasetConfig, load_dataset_config};
use crate::common::constants::{
    DATASET_CONFIG, DEFAULT_ALLOWED_SHAPES, DEFAULT_CELL_COUNTS, OUTPUT_ROOT,
};
use crate::domain::{ArrayShape, PvError, PvResult, ShadingRule, ShortCircuitModel};
use crate::modules::dispatch::{DispatchOptions, DispatchReport, LtspiceCommand, dispatch_pending};
use crate::modules::geometry::enumerate_shapes;
use crate::modules::harvest::{HarvestSummary, harvest};
use crate::modules::layout::OutputLayout;
use crate::modules::netlist::{GenerationSummary, NetlistGenerator};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub config_path: PathBuf,
    pub output_root: PathBuf,
    pub cell_counts: Vec<u32>,
    pub allowed_shapes: Vec<String>,
    pub short_model: ShortCircuitModel,
    pub shading_rule: ShadingRule,
    pub simulator: LtspiceCommand,
    pub dispatch: DispatchOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DATASET_CONFIG),
            output_root: PathBuf::from(OUTPUT_ROOT),
            cell_counts: DEFAULT_CELL_COUNTS.to_vec(),
            allowed_shapes: DEFAULT_ALLOWED_SHAPES
                .iter()
                .map(|label| label.to_string())
                .collect(),
            short_model: ShortCircuitModel::default(),
            shading_rule: ShadingRule::default(),
            simulator: LtspiceCommand::default(),
            dispatch: DispatchOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.output_root)
    }

    pub fn datasets(&self) -> PvResult<DatasetConfig> {
        let datasets = load_dataset_config(&self.config_path)?;
        if datasets.datasets.is_empty() {
            return Err(PvError::input_validation(
                "INPUT.CONFIG_EMPTY",
                format!(
                    "'{}' defines no datasets",
                    self.config_path.display()
                ),
            ));
        }
        Ok(datasets)
    }

    pub fn shapes(&self) -> Vec<ArrayShape> {
        enumerate_shapes(&self.cell_counts, &self.allowed_shapes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub generation: GenerationSummary,
    pub dispatch: DispatchReport,
    pub harvest: HarvestSummary,
}

impl PipelineSummary {
    pub fn succeeded(&self) -> bool {
        self.dispatch.all_succeeded() && !self.harvest.degraded()
    }
}

pub fn generate_all(config: &PipelineConfig, datasets: &DatasetConfig) -> PvResult<GenerationSummary> {
    let layout = config.layout();
    let shapes = config.shapes();
    let generator =
        NetlistGenerator::new(config.short_model).with_shading_rule(config.shading_rule);
    let mut summary = GenerationSummary::default();
    for dataset in &datasets.datasets {
        summary += generator.generate_dataset(&layout, dataset, &shapes)?;
    }
    tracing::info!(
        "Netlist generation finished: {} written, {} already present",
        summary.written,
        summary.skipped
    );
    Ok(summary)
}

pub fn dispatch_all(config: &PipelineConfig, datasets: &DatasetConfig) -> PvResult<DispatchReport> {
    dispatch_pending(
        &config.layout(),
        &datasets.names(),
        &config.allowed_shapes,
        &config.simulator,
        &config.dispatch,
    )
}

pub fn harvest_all(config: &PipelineConfig, datasets: &DatasetConfig) -> PvResult<HarvestSummary> {
    harvest(&config.layout(), &datasets.names(), &config.allowed_shapes)
}

pub fn run_pipeline(config: &PipelineConfig) -> PvResult<PipelineSummary> {
    let datasets = config.datasets()?;
    tracing::info!(
        "Running {} dataset(s) into {}",
        datasets.datasets.len(),
        config.output_root.display()
    );

    let generation = generate_all(config, &datasets)?;
    let dispatch = dispatch_all(config, &datasets)?;
    let harvest = harvest_all(config, &datasets)?;
    Ok(PipelineSummary {
        generation,
        dispatch,
        harvest,
    })
}
