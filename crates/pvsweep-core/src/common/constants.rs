//! Study-wide defaults shared by the enumerator, generator, dispatcher and
//! harvester.

use std::time::Duration;

pub const DEFAULT_CELL_COUNTS: [u32; 3] = [8, 9, 10];
pub const DEFAULT_ALLOWED_SHAPES: [&str; 7] = ["1x10", "2x4", "2x5", "3x3", "4x2", "5x2", "10x1"];
pub const DEFAULT_TEMPERATURES: [i32; 6] = [27, 30, 35, 40, 45, 50];

pub const OUTPUT_ROOT: &str = "Output";
pub const DATA_DIR: &str = "Data";
pub const COMBINED_REPORT: &str = "all_cell_data.csv";
pub const DISPATCH_REPORT: &str = "dispatch-report.json";
pub const DATASET_CONFIG: &str = "data_sets.ini";

pub const NETLIST_EXTENSION: &str = "cir";
pub const RESULT_EXTENSION: &str = "raw";

pub const CELL_LIBRARY_NAME: &str = "cell_2.lib";
pub const CELL_SUBCIRCUIT: &str = "cell_2";
pub const CELL_PARAMS: &str = "params:area=49  j0=16E-20 j02=1.2E-12";
pub const CELL_PARAMS_CONTINUATION: &str = "+ jsc=30.5E-3 rs=28e-3 rsh=100000";
pub const CELL_POSITIVE_PIN: &str = "p";

pub const PROBE_NODE: &str = "01";
pub const GROUND_NODE: &str = "0";
pub const BIAS_SOURCE: &str = "vbias";
pub const BIAS_CURRENT_SIGNAL: &str = "I(vbias)";
pub const SWEEP_HEADROOM_PER_CELL: f64 = 1.05;
pub const SWEEP_STEP: f64 = 0.01;
pub const SHORT_RESISTANCE: &str = "0.0001";

pub const DEFAULT_SIMULATOR: &str = r"C:\Program Files\LTC\LTspiceXVII\XVIIx64.exe";
pub const DEFAULT_SIMULATOR_ARGS: [&str; 2] = ["-Run", "-b"];
pub const DEFAULT_SPAWN_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[cfg(test)]
mod tests {
    use super::{DEFAULT_ALLOWED_SHAPES, DEFAULT_CELL_COUNTS};
    use crate::domain::ArrayShape;

    #[test]
    fn default_shapes_multiply_to_default_counts() {
        for label in DEFAULT_ALLOWED_SHAPES {
            let shape = ArrayShape::parse_label(label).expect("default shape should parse");
            assert!(
                DEFAULT_CELL_COUNTS.contains(&shape.cell_count()),
                "shape {} should tile one of the default counts",
                label
            );
        }
    }
}
