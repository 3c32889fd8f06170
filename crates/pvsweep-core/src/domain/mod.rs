pub mod errors;

pub use errors::{PvError, PvErrorCategory, PvResult};

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

/// Series x parallel arrangement of identical cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayShape {
    pub series: u32,
    pub parallel: u32,
}

impl ArrayShape {
    pub const fn new(series: u32, parallel: u32) -> Self {
        Self { series, parallel }
    }

    pub const fn cell_count(self) -> u32 {
        self.series * self.parallel
    }

    pub fn label(self) -> String {
        format!("{}x{}", self.series, self.parallel)
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        let (series, parallel) = label.trim().split_once(['x', 'X'])?;
        let series = series.parse::<u32>().ok()?;
        let parallel = parallel.parse::<u32>().ok()?;
        if series == 0 || parallel == 0 {
            return None;
        }
        series.checked_mul(parallel)?;
        Some(Self::new(series, parallel))
    }

    /// Cells in column-major order: every row of column 0, then column 1, ...
    pub fn cells(self) -> impl Iterator<Item = CellPosition> {
        (0..self.parallel)
            .flat_map(move |column| (1..=self.series).map(move |row| CellPosition { column, row }))
    }
}

impl Display for ArrayShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.series, self.parallel)
    }
}

/// Column is zero-based, row is one-based, matching the netlist node scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPosition {
    pub column: u32,
    pub row: u32,
}

impl CellPosition {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    pub const fn ordinal(self, shape: ArrayShape) -> u32 {
        self.column * shape.series + self.row
    }

    pub const fn is_first_row(self) -> bool {
        self.row == 1
    }

    pub const fn is_last_row(self, shape: ArrayShape) -> bool {
        self.row == shape.series
    }

    pub fn label(self) -> String {
        format!("C{:02}R{:02}", self.column + 1, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fault {
    UniformShade(u32),
    ColumnOpen(u32),
    TerminalShort(u32),
}

impl Fault {
    pub const fn count(self) -> u32 {
        match self {
            Self::UniformShade(count) | Self::ColumnOpen(count) | Self::TerminalShort(count) => {
                count
            }
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::UniformShade(_) => "Shading",
            Self::ColumnOpen(_) => "Open",
            Self::TerminalShort(_) => "Short",
        }
    }

    pub const fn type_name(self) -> &'static str {
        match self {
            Self::UniformShade(_) => "shade",
            Self::ColumnOpen(_) => "open",
            Self::TerminalShort(_) => "short",
        }
    }

    pub fn from_suffix(suffix: &str, count: u32) -> Option<Self> {
        match suffix {
            "Shading" => Some(Self::UniformShade(count)),
            "Open" => Some(Self::ColumnOpen(count)),
            "Short" => Some(Self::TerminalShort(count)),
            _ => None,
        }
    }

    pub const fn shaded_cells(self) -> u32 {
        match self {
            Self::UniformShade(count) => count,
            _ => 0,
        }
    }

    /// Open faults remove the last `n` columns.
    pub const fn column_is_open(self, shape: ArrayShape, column: u32) -> bool {
        match self {
            Self::ColumnOpen(count) => column + count >= shape.parallel,
            _ => false,
        }
    }

    pub const fn is_shaded(
        self,
        shape: ArrayShape,
        cell: CellPosition,
        rule: ShadingRule,
    ) -> bool {
        match self {
            Self::UniformShade(count) => match rule {
                ShadingRule::Product => (cell.column + 1) * cell.row <= count,
                ShadingRule::Sequential => cell.ordinal(shape) <= count,
            },
            _ => false,
        }
    }

    /// Short faults tie the final-row cell of the last `n` columns to ground.
    pub const fn is_shorted(self, shape: ArrayShape, cell: CellPosition) -> bool {
        match self {
            Self::TerminalShort(count) => {
                cell.is_last_row(shape) && cell.column + count >= shape.parallel
            }
            _ => false,
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.type_name(), self.count())
    }
}

/// How a terminal short is expressed in the netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShortCircuitModel {
    #[default]
    Resistor,
    ZeroSource,
}

impl ShortCircuitModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resistor => "resistor",
            Self::ZeroSource => "zero-source",
        }
    }
}

impl FromStr for ShortCircuitModel {
    type Err = PvError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resistor" => Ok(Self::Resistor),
            "zero-source" | "zero_source" => Ok(Self::ZeroSource),
            other => Err(PvError::input_validation(
                "INPUT.SHORT_MODEL",
                format!("unknown short-circuit model '{}'; expected 'resistor' or 'zero-source'", other),
            )),
        }
    }
}

impl Display for ShortCircuitModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Which cells a `UniformShade(n)` job darkens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingRule {
    /// A cell is shaded when `(column + 1) * row <= n`, counting columns from
    /// one. This can shade more than `n` cells; `2x4_2_Shading` shades three.
    #[default]
    Product,
    /// Exactly `n` cells, filling each column top to bottom before the next.
    Sequential,
}

impl ShadingRule {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Sequential => "sequential",
        }
    }
}

impl FromStr for ShadingRule {
    type Err = PvError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(Self::Product),
            "sequential" => Ok(Self::Sequential),
            other => Err(PvError::input_validation(
                "INPUT.SHADING_RULE",
                format!("unknown shading rule '{}'; expected 'product' or 'sequential'", other),
            )),
        }
    }
}

impl Display for ShadingRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One `<full>-<shade>` section of the dataset configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub name: String,
    pub full: u32,
    pub shade: u32,
    pub temperatures: Vec<i32>,
}

impl Dataset {
    pub fn parse_name(name: &str) -> PvResult<(u32, u32)> {
        let invalid = || {
            PvError::input_validation(
                "INPUT.DATASET_NAME",
                format!("dataset name '{}' must look like '<full>-<shade>'", name),
            )
        };
        let (full, shade) = name.trim().split_once('-').ok_or_else(invalid)?;
        let full = full.trim().parse::<u32>().map_err(|_| invalid())?;
        let shade = shade.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok((full, shade))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetlistJob {
    pub dataset: String,
    pub full: u32,
    pub shade: u32,
    pub temperature: i32,
    pub shape: ArrayShape,
    pub fault: Fault,
}

impl NetlistJob {
    pub fn key(&self) -> JobKey {
        JobKey::new(&self.dataset, self.temperature, self.shape, self.fault)
    }
}

/// Deterministic identity of a job: `<dataset>/Temp<T>/<RxC>/<RxC>_<n>_<Suffix>`.
///
/// Netlist and result paths are both derived from this key, and their presence
/// on disk is the completion marker for generation and simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    relative_stem: PathBuf,
}

impl JobKey {
    pub fn new(dataset: &str, temperature: i32, shape: ArrayShape, fault: Fault) -> Self {
        let relative_stem = PathBuf::from(dataset)
            .join(temperature_dir_name(temperature))
            .join(shape.label())
            .join(job_file_stem(shape, fault));
        Self { relative_stem }
    }

    pub fn relative_stem(&self) -> &std::path::Path {
        &self.relative_stem
    }
}

pub fn temperature_dir_name(temperature: i32) -> String {
    format!("Temp{}", temperature)
}

pub fn parse_temperature_dir(name: &str) -> Option<i32> {
    name.strip_prefix("Temp")?.parse::<i32>().ok()
}

pub fn job_file_stem(shape: ArrayShape, fault: Fault) -> String {
    format!("{}_{}_{}", shape.label(), fault.count(), fault.suffix())
}

pub fn parse_job_file_stem(stem: &str) -> Option<(ArrayShape, Fault)> {
    let mut parts = stem.splitn(3, '_');
    let shape = ArrayShape::parse_label(parts.next()?)?;
    let count = parts.next()?.parse::<u32>().ok()?;
    let fault = Fault::from_suffix(parts.next()?, count)?;
    Some((shape, fault))
}
