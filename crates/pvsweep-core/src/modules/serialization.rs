//! Text artifact output shared by the netlist writer and the cell library.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

/// `value` with exactly `precision` decimals, as SPICE directives expect.
pub fn format_decimal(value: f64, precision: usize) -> String {
    format!("{value:.precision$}")
}

/// LF line endings with a trailing newline, whatever the source used.
pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

/// Writes `content` only if `path` does not exist yet. Returns `false` when an
/// existing file was left untouched.
pub fn write_new_text_artifact(path: &Path, content: &str) -> std::io::Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(error) => return Err(error),
    };
    file.write_all(normalize_text_artifact(content).as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{format_decimal, write_new_text_artifact, write_text_artifact};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn decimals_are_padded_and_rounded() {
        assert_eq!(format_decimal(1.05 * 2.0, 2), "2.10");
        assert_eq!(format_decimal(10.5, 2), "10.50");
        assert_eq!(format_decimal(0.125, 1), "0.1");
    }

    #[test]
    fn library_rewrites_normalize_line_endings() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("cell_2.lib");

        write_text_artifact(&path, ".subckt cell_2 n p\r\n.ends cell_2").expect("first write");
        write_text_artifact(&path, ".subckt cell_2 n p\r.ends cell_2\n").expect("second write");
        assert_eq!(
            fs::read(&path).expect("library should be readable"),
            b".subckt cell_2 n p\n.ends cell_2\n"
        );
    }

    #[test]
    fn new_text_artifact_never_overwrites() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("2x4_0_Shading.cir");

        assert!(write_new_text_artifact(&path, "* first").expect("first write"));
        assert!(!write_new_text_artifact(&path, "* second").expect("second write"));
        assert_eq!(
            fs::read_to_string(&path).expect("netlist should be readable"),
            "* first\n"
        );
    }
}
