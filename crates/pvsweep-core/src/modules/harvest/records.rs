use crate::common::constants::{BIAS_CURRENT_SIGNAL, BIAS_SOURCE, GROUND_NODE};
use crate::domain::{ArrayShape, CellPosition, Fault};
use crate::modules::netlist::CellNodes;
use crate::modules::waveform::{Waveform, WaveformError};

pub(super) const METADATA_COLUMNS: [&str; 16] = [
    "Voltage (V)",
    "Current (A)",
    "Power (W)",
    "Full Voltage",
    "Shade Voltage",
    "Temperature",
    "File Name",
    "# Of Cells",
    "Series Cells",
    "Parallel Cells",
    "Fault Type",
    "Fault Count",
    "Shaded Cells",
    "Shading %",
    "Solar Panel ID",
    "IsShade",
];

/// Everything known about a result file before its contents are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ResultSource {
    pub(super) file_name: String,
    pub(super) full: u32,
    pub(super) shade: u32,
    pub(super) temperature: i32,
    pub(super) shape: ArrayShape,
    pub(super) fault: Fault,
    pub(super) panel_id: usize,
}

impl ResultSource {
    fn metadata(&self) -> [String; 13] {
        let total = self.shape.cell_count();
        let shaded = self.fault.shaded_cells();
        let shading_percent = f64::from(shaded) / f64::from(total) * 100.0;
        [
            self.full.to_string(),
            self.shade.to_string(),
            self.temperature.to_string(),
            self.file_name.clone(),
            total.to_string(),
            self.shape.series.to_string(),
            self.shape.parallel.to_string(),
            self.fault.type_name().to_string(),
            self.fault.count().to_string(),
            shaded.to_string(),
            format!("{:.2}", shading_percent),
            self.panel_id.to_string(),
            u8::from(shaded > 0).to_string(),
        ]
    }
}

/// Per-sample rows for one result file: the sweep totals, the job metadata
/// and voltage, current and power for every cell still in the circuit.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct FileRecords {
    pub(super) columns: Vec<String>,
    pub(super) rows: Vec<Vec<String>>,
}

struct CellTraces {
    voltage: Vec<f64>,
    current: Vec<f64>,
}

pub(super) fn file_records(
    source: &ResultSource,
    waveform: &Waveform,
) -> Result<FileRecords, WaveformError> {
    let voltage = waveform
        .trace(BIAS_SOURCE)
        .or_else(|| waveform.axis())
        .ok_or_else(|| WaveformError::Structural("waveform has no sweep axis".to_string()))?;
    let current = waveform.trace(BIAS_CURRENT_SIGNAL).ok_or_else(|| {
        WaveformError::Structural(format!("waveform has no '{}' trace", BIAS_CURRENT_SIGNAL))
    })?;

    let mut columns = METADATA_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .collect::<Vec<_>>();
    let mut cells = Vec::new();
    for cell in source.shape.cells() {
        if source.fault.column_is_open(source.shape, cell.column) {
            continue;
        }
        let label = cell.label();
        columns.push(format!("{} Voltage (V)", label));
        columns.push(format!("{} Current (A)", label));
        columns.push(format!("{} Power (W)", label));
        cells.push(cell_traces(source, waveform, cell));
    }

    let metadata = source.metadata();
    let rows = voltage
        .iter()
        .zip(current)
        .enumerate()
        .map(|(sample, (volts, amps))| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(volts.to_string());
            row.push(amps.to_string());
            row.push((volts * amps).to_string());
            row.extend(metadata.iter().cloned());
            for cell in &cells {
                match cell {
                    Some(traces) => {
                        let cell_voltage = traces.voltage.get(sample).copied().unwrap_or(f64::NAN);
                        let cell_current = traces.current.get(sample).copied().unwrap_or(f64::NAN);
                        row.push(cell_voltage.to_string());
                        row.push(cell_current.to_string());
                        row.push((cell_voltage * cell_current).to_string());
                    }
                    None => row.extend(std::iter::repeat_n(String::new(), 3)),
                }
            }
            row
        })
        .collect();

    Ok(FileRecords { columns, rows })
}

fn cell_traces(source: &ResultSource, waveform: &Waveform, cell: CellPosition) -> Option<CellTraces> {
    let nodes = CellNodes::for_cell(source.shape, cell);
    let upper = node_voltage(waveform, &nodes.upper);
    let lower = node_voltage(waveform, &nodes.lower);
    let current = waveform.trace(&nodes.current_signal());

    let (Some(upper), Some(lower), Some(current)) = (upper, lower, current) else {
        tracing::warn!(
            "{}: traces for cell {} ({}) are missing; its columns stay empty",
            source.file_name,
            cell.label(),
            nodes.instance_name()
        );
        return None;
    };

    let voltage = upper
        .iter()
        .zip(lower.iter())
        .map(|(high, low)| high - low)
        .collect();
    Some(CellTraces {
        voltage,
        current: current.to_vec(),
    })
}

/// Node voltage trace, with ground reading as zero.
fn node_voltage(waveform: &Waveform, node: &str) -> Option<Vec<f64>> {
    if node == GROUND_NODE {
        return Some(vec![0.0; waveform.point_count()]);
    }
    waveform
        .trace(&format!("V({})", node))
        .map(<[f64]>::to_vec)
}
