use pvsweep_core::domain::{ArrayShape, CellPosition};
use pvsweep_core::modules::harvest::{ReportTable, harvest};
use pvsweep_core::modules::layout::OutputLayout;
use pvsweep_core::modules::netlist::CellNodes;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SHAPES: [&str; 1] = ["2x1"];

/// LTspice-style binary result for a 2x1 array: UTF-16LE header, f64 axis and
/// f32 traces. Each cell carries half the bias voltage and the full current.
fn binary_result(points: &[(f64, f32)]) -> Vec<u8> {
    let shape = ArrayShape::new(2, 1);
    let top = CellNodes::for_cell(shape, CellPosition::new(0, 1));
    let bottom = CellNodes::for_cell(shape, CellPosition::new(0, 2));
    let variables = [
        ("vbias".to_string(), "voltage"),
        ("V(01)".to_string(), "voltage"),
        (format!("V({})", top.lower), "voltage"),
        ("I(Vbias)".to_string(), "device_current"),
        (top.current_signal(), "subckt_current"),
        (bottom.current_signal(), "subckt_current"),
    ];

    let mut header = format!(
        "Title: * fake sweep\nDate: Thu Jan 01 00:00:00 2026\nPlotname: DC transfer characteristic\n\
         Flags: real forward\nNo. Variables: {}\nNo. Points: {}\nOffset:   0.0000000000000000e+000\n\
         Command: Linear Technology Corporation LTspice XVII\nVariables:\n",
        variables.len(),
        points.len()
    );
    for (index, (name, kind)) in variables.iter().enumerate() {
        header.push_str(&format!("\t{}\t{}\t{}\n", index, name, kind));
    }
    header.push_str("Binary:\n");

    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(header.encode_utf16().flat_map(u16::to_le_bytes));
    for &(volts, amps) in points {
        let volts_f32 = volts as f32;
        bytes.extend_from_slice(&volts.to_le_bytes());
        for value in [volts_f32, volts_f32 / 2.0, amps, -amps, -amps] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

fn write_result(root: &Path, dataset: &str, name: &str, bytes: &[u8]) -> PathBuf {
    let dir = root.join(dataset).join("Temp30/2x1");
    fs::create_dir_all(&dir).expect("shape dir should be created");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("result should be written");
    path
}

#[test]
fn binary_results_become_per_cell_rows() {
    let temp = TempDir::new().expect("tempdir should be created");
    let layout = OutputLayout::new(temp.path());
    let sweep = [(0.0, -2.0), (1.0, -1.5), (2.0, 0.0)];
    write_result(temp.path(), "1000-900", "2x1_0_Shading.raw", &binary_result(&sweep));
    write_result(temp.path(), "1000-900", "2x1_1_Short.raw", &binary_result(&sweep));

    let summary = harvest(&layout, &["1000-900"], &SHAPES).expect("harvest should succeed");
    assert_eq!(summary.files_parsed, 2);
    assert!(summary.corrupt_removed.is_empty());

    let table = ReportTable::read_csv(&layout.combined_report()).expect("combined report");
    assert_eq!(table.len(), 6);
    assert_eq!(table.value(1, "Voltage (V)"), Some("1"));
    assert_eq!(table.value(1, "Current (A)"), Some("-1.5"));
    assert_eq!(table.value(1, "Power (W)"), Some("-1.5"));
    assert_eq!(table.value(1, "C01R01 Voltage (V)"), Some("0.5"));
    assert_eq!(table.value(1, "C01R01 Current (A)"), Some("1.5"));
    assert_eq!(table.value(1, "C01R02 Power (W)"), Some("0.75"));
    assert_eq!(table.value(1, "Temperature"), Some("30"));
    assert_eq!(table.value(1, "Series Cells"), Some("2"));

    assert_eq!(table.value(0, "File Name"), Some("2x1_0_Shading"));
    assert_eq!(table.value(3, "File Name"), Some("2x1_1_Short"));
    assert_eq!(table.value(3, "Fault Type"), Some("short"));
    assert_eq!(table.value(3, "Shaded Cells"), Some("0"));
    assert_eq!(table.value(3, "Solar Panel ID"), Some("2"));
}

#[test]
fn truncated_results_degrade_the_run_and_keep_the_old_combined_report() {
    let temp = TempDir::new().expect("tempdir should be created");
    let layout = OutputLayout::new(temp.path());
    fs::write(layout.combined_report(), "previous run\n").expect("old report");

    let good = binary_result(&[(0.0, -2.0), (1.0, -1.0)]);
    write_result(temp.path(), "1000-900", "2x1_0_Shading.raw", &good);
    let truncated = write_result(
        temp.path(),
        "1000-900",
        "2x1_1_Shading.raw",
        &good[..good.len() - 3],
    );

    let summary = harvest(&layout, &["1000-900"], &SHAPES).expect("harvest should complete");
    assert!(summary.degraded());
    assert_eq!(summary.corrupt_removed, vec![truncated.clone()]);
    assert!(!truncated.exists());
    assert_eq!(summary.combined_report, None);
    assert_eq!(
        fs::read_to_string(layout.combined_report()).expect("old report"),
        "previous run\n"
    );
    assert!(!layout.dataset_report("1000-900").exists());

    // The surviving file still gets its directory report.
    let directory = temp.path().join("Data/1000-900/Temp30/2x1.csv");
    let table = ReportTable::read_csv(&directory).expect("directory report");
    assert_eq!(table.len(), 2);

    // Once the corrupt result is gone, the next harvest is clean.
    let rerun = harvest(&layout, &["1000-900"], &SHAPES).expect("rerun should succeed");
    assert!(!rerun.degraded());
    assert_eq!(rerun.combined_report, Some(layout.combined_report()));
}

#[test]
fn absurd_point_counts_are_removed_as_corrupt() {
    let temp = TempDir::new().expect("tempdir should be created");
    let layout = OutputLayout::new(temp.path());
    let good = write_result(
        temp.path(),
        "1000-900",
        "2x1_0_Shading.raw",
        &binary_result(&[(0.0, -2.0)]),
    );
    let bogus = write_result(
        temp.path(),
        "1000-900",
        "2x1_1_Shading.raw",
        b"Title: * fake sweep\nPlotname: DC transfer characteristic\nFlags: real forward\n\
          No. Variables: 2\nNo. Points: 18446744073709551615\nVariables:\n\
          \t0\tvbias\tvoltage\n\t1\tI(Vbias)\tdevice_current\nValues:\n 0\t0.0\n\t-1.0\n",
    );

    let summary = harvest(&layout, &["1000-900"], &SHAPES).expect("harvest should complete");
    assert!(summary.degraded());
    assert_eq!(summary.files_parsed, 1);
    assert_eq!(summary.corrupt_removed, vec![bogus.clone()]);
    assert!(!bogus.exists());
    assert!(good.exists());
    assert_eq!(summary.combined_report, None);
}

#[test]
fn unselected_shapes_and_foreign_files_are_ignored() {
    let temp = TempDir::new().expect("tempdir should be created");
    let layout = OutputLayout::new(temp.path());
    let bytes = binary_result(&[(0.0, -1.0)]);
    write_result(temp.path(), "1000-900", "2x1_0_Shading.raw", &bytes);
    write_result(temp.path(), "1000-900", "notes.raw", b"not a job");
    let other_shape = temp.path().join("1000-900/Temp30/1x2");
    fs::create_dir_all(&other_shape).expect("other shape dir");
    fs::write(other_shape.join("1x2_0_Shading.raw"), b"garbage").expect("other raw");

    let summary = harvest(&layout, &["1000-900"], &SHAPES).expect("harvest should succeed");
    assert_eq!(summary.files_parsed, 1);
    assert!(!summary.degraded());
    assert!(other_shape.join("1x2_0_Shading.raw").exists());
    assert!(temp.path().join("1000-900/Temp30/2x1/notes.raw").exists());
}
