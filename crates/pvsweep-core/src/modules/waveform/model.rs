/// One entry of the `Variables:` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub index: usize,
    pub name: String,
    pub kind: String,
}

/// A real-valued simulator waveform with one trace per variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub title: String,
    pub date: String,
    pub plotname: String,
    pub flags: Vec<String>,
    pub variables: Vec<Variable>,
    pub(super) traces: Vec<Vec<f64>>,
}

impl Waveform {
    pub fn point_count(&self) -> usize {
        self.traces.first().map_or(0, Vec::len)
    }

    /// The first variable, which is the sweep axis for `.dc` runs.
    pub fn axis(&self) -> Option<&[f64]> {
        self.traces.first().map(Vec::as_slice)
    }

    pub fn trace(&self, name: &str) -> Option<&[f64]> {
        self.variables
            .iter()
            .position(|variable| variable.name.eq_ignore_ascii_case(name))
            .and_then(|index| self.traces.get(index))
            .map(Vec::as_slice)
    }
}
