use super::nodes::CellNodes;
use crate::common::constants::{
    BIAS_SOURCE, CELL_LIBRARY_NAME, CELL_PARAMS, CELL_PARAMS_CONTINUATION, CELL_SUBCIRCUIT,
    GROUND_NODE, PROBE_NODE, SHORT_RESISTANCE, SWEEP_HEADROOM_PER_CELL, SWEEP_STEP,
};
use crate::domain::{
    ArrayShape, CellPosition, Fault, NetlistJob, ShadingRule, ShortCircuitModel,
};
use crate::modules::serialization::format_decimal;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct NetlistModel {
    shape: ArrayShape,
    fault: Fault,
    temperature: i32,
    full: u32,
    shade: u32,
    short_model: ShortCircuitModel,
    shading_rule: ShadingRule,
}

impl NetlistModel {
    pub(super) fn from_job(
        job: &NetlistJob,
        short_model: ShortCircuitModel,
        shading_rule: ShadingRule,
    ) -> Self {
        Self {
            shape: job.shape,
            fault: job.fault,
            temperature: job.temperature,
            full: job.full,
            shade: job.shade,
            short_model,
            shading_rule,
        }
    }

    pub(super) fn render(&self) -> String {
        let mut text = String::new();
        self.render_header(&mut text);
        for column in 0..self.shape.parallel {
            let _ = write!(text, "\n*** Start of Column {:02}\n\n", column + 1);
            if self.fault.column_is_open(self.shape, column) {
                text.push_str("* Column Skipped due to Open Circuit\n");
                continue;
            }
            for row in 1..=self.shape.series {
                self.render_cell(&mut text, CellPosition::new(column, row));
            }
        }
        self.render_trailer(&mut text);
        text
    }

    fn render_header(&self, text: &mut String) {
        let total = self.shape.cell_count();
        let count = self.fault.count();
        text.push_str("* Generated by pvsweep\n");
        let _ = writeln!(
            text,
            "* Circuit Simulation of {} Series x {} Parallel Solar Cell Arrangement",
            self.shape.series, self.shape.parallel
        );
        let _ = match self.fault {
            Fault::UniformShade(_) => writeln!(
                text,
                "* {} Shade {} No-Shade File",
                count,
                total - count
            ),
            Fault::ColumnOpen(_) => writeln!(
                text,
                "* {} Open {} Connected Column File",
                count,
                self.shape.parallel - count
            ),
            Fault::TerminalShort(_) => writeln!(
                text,
                "* {} Short {} No-Short Column File",
                count,
                self.shape.parallel.saturating_sub(count)
            ),
        };
        let _ = writeln!(text, ".include {}", CELL_LIBRARY_NAME);
        let _ = writeln!(text, ".option temp={}", self.temperature);
    }

    fn render_cell(&self, text: &mut String, cell: CellPosition) {
        let nodes = CellNodes::for_cell(self.shape, cell);
        let _ = writeln!(text, "** Cell {:02} [Col {:02}]", cell.row, cell.column + 1);
        let _ = writeln!(
            text,
            "{} {} {} {} {} {}",
            nodes.instance_name(),
            nodes.lower,
            nodes.upper,
            nodes.irradiance,
            CELL_SUBCIRCUIT,
            CELL_PARAMS
        );
        let _ = writeln!(text, "{}", CELL_PARAMS_CONTINUATION);

        let level = if self.fault.is_shaded(self.shape, cell, self.shading_rule) {
            self.shade
        } else {
            self.full
        };
        let _ = writeln!(
            text,
            "virrad_{}  {} {} dc {}",
            nodes.suffix(),
            nodes.irradiance,
            nodes.lower,
            level
        );

        if self.fault.is_shorted(self.shape, cell) {
            let _ = match self.short_model {
                ShortCircuitModel::Resistor => writeln!(
                    text,
                    "r_{} {} {} {}",
                    nodes.suffix(),
                    nodes.upper,
                    GROUND_NODE,
                    SHORT_RESISTANCE
                ),
                ShortCircuitModel::ZeroSource => writeln!(
                    text,
                    "ishort_{} {} {} dc 0",
                    nodes.suffix(),
                    nodes.upper,
                    GROUND_NODE
                ),
            };
        }
        text.push('\n');
    }

    fn render_trailer(&self, text: &mut String) {
        let sweep_end = SWEEP_HEADROOM_PER_CELL * f64::from(self.shape.series);
        let _ = write!(text, "\n{} {} {} dc 0\n", BIAS_SOURCE, PROBE_NODE, GROUND_NODE);
        let _ = writeln!(text, ".plot dc i({})", BIAS_SOURCE);
        let _ = writeln!(
            text,
            ".dc {} 0 {} {}",
            BIAS_SOURCE,
            format_decimal(sweep_end, 2),
            SWEEP_STEP
        );
        text.push_str(".probe\n.end\n");
    }
}
