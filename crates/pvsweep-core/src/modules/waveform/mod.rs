//! Reader for SPICE `.raw` waveform files (LTspice UTF-16 binary and the
//! ngspice ASCII/binary variants, real data only).

mod model;
mod parser;

pub use model::{Variable, Waveform};

use crate::domain::PvError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WaveformError {
    #[error("failed to read waveform '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed waveform: {0}")]
    Structural(String),
}

impl WaveformError {
    /// Structural errors mean the file itself is corrupt, not that reading failed.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}

impl From<WaveformError> for PvError {
    fn from(error: WaveformError) -> Self {
        match error {
            WaveformError::Io { .. } => PvError::io_system("IO.WAVEFORM_READ", error.to_string()),
            WaveformError::Structural(_) => {
                PvError::computation("RUN.WAVEFORM_STRUCTURE", error.to_string())
            }
        }
    }
}

pub fn read_waveform(path: &Path) -> Result<Waveform, WaveformError> {
    let bytes = fs::read(path).map_err(|source| WaveformError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_waveform(&bytes)
}

pub fn parse_waveform(bytes: &[u8]) -> Result<Waveform, WaveformError> {
    parser::parse_waveform(bytes)
}

#[cfg(test)]
mod tests {
    use super::{WaveformError, read_waveform};
    use crate::domain::{PvError, PvErrorCategory};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_files_are_io_errors_not_corruption() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = read_waveform(&temp.path().join("absent.raw")).expect_err("missing file");
        assert!(!error.is_structural());
        let error: PvError = error.into();
        assert_eq!(error.category(), PvErrorCategory::IoSystemError);
        assert_eq!(error.placeholder(), "IO.WAVEFORM_READ");
    }

    #[test]
    fn corrupt_files_map_to_computation_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("corrupt.raw");
        fs::write(&path, b"\x00\x01\x02").expect("raw should be written");

        let error = read_waveform(&path).expect_err("corrupt file");
        assert!(matches!(error, WaveformError::Structural(_)));
        let error: PvError = error.into();
        assert_eq!(error.category(), PvErrorCategory::ComputationError);
    }
}
