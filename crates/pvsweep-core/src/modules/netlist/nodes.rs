use crate::common::constants::{CELL_POSITIVE_PIN, GROUND_NODE, PROBE_NODE};
use crate::domain::{ArrayShape, CellPosition};

/// Node names for one cell of a series string.
///
/// `start` and `end` concatenate the zero-padded column and row indices. Row 1
/// hangs off the shared probe node and the last row returns to ground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellNodes {
    pub start: String,
    pub end: String,
    pub upper: String,
    pub lower: String,
    pub irradiance: String,
}

impl CellNodes {
    pub fn for_cell(shape: ArrayShape, cell: CellPosition) -> Self {
        let start = format!("{:02}{:02}", cell.column, cell.row);
        let end = format!("{:02}{:02}", cell.column, cell.row + 1);
        let upper = if cell.is_first_row() {
            PROBE_NODE.to_string()
        } else {
            start.clone()
        };
        let lower = if cell.is_last_row(shape) {
            GROUND_NODE.to_string()
        } else {
            end.clone()
        };
        let irradiance = format!("{}{}", end, start);

        Self {
            start,
            end,
            upper,
            lower,
            irradiance,
        }
    }

    pub fn suffix(&self) -> String {
        format!("{}_{}", self.start, self.end)
    }

    pub fn instance_name(&self) -> String {
        format!("xcell_{}", self.suffix())
    }

    /// Current into the positive pin as LTspice names it in the raw file.
    pub fn current_signal(&self) -> String {
        format!("Ix(cell_{}:{})", self.suffix(), CELL_POSITIVE_PIN)
    }
}
