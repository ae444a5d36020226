use std::fs;
use std::path::PathBuf;

use lamina::data::csv::{CsvDataset, DataError};
use lamina::data::dataset::Dataset;

struct TempCsv {
    path: PathBuf,
}

impl TempCsv {
    fn write(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("lamina-{name}-{}.csv", std::process::id()));
        fs::write(&path, contents).unwrap();
        Self { path }
    }
}

impl Drop for TempCsv {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[test]
fn parses_normalized_pixels_and_one_hot_labels() {
    let csv = TempCsv::write(
        "basic",
        "label,p0,p1,p2,p3\n\
         2,0,51,102,255\n\
         0,255,255,0,0\n",
    );

    let dataset = CsvDataset::from_path(&csv.path, 2, 2, 3).unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.rows(), 2);
    assert_eq!(dataset.cols(), 2);
    assert_eq!(dataset.classes(), 3);

    let first = dataset.get(0);
    assert_eq!(first.input.shape(), &[1, 2, 2]);
    assert!((first.input.get(&[0, 0, 0]).unwrap() - 0.0).abs() < 1e-12);
    assert!((first.input.get(&[0, 0, 1]).unwrap() - 0.2).abs() < 1e-12);
    assert!((first.input.get(&[0, 1, 0]).unwrap() - 0.4).abs() < 1e-12);
    assert!((first.input.get(&[0, 1, 1]).unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(first.label.data(), &[0.0, 0.0, 1.0]);

    let second = dataset.get(1);
    assert_eq!(second.label.data(), &[1.0, 0.0, 0.0]);
}

#[test]
fn skips_blank_lines() {
    let csv = TempCsv::write("blanks", "label,p0,p1,p2,p3\n\n1,1,2,3,4\n\n");
    let dataset = CsvDataset::from_path(&csv.path, 2, 2, 2).unwrap();
    assert_eq!(dataset.len(), 1);
}

#[test]
fn empty_file_is_an_error() {
    let csv = TempCsv::write("empty", "");
    assert!(matches!(
        CsvDataset::from_path(&csv.path, 2, 2, 2),
        Err(DataError::Empty)
    ));
}

#[test]
fn header_only_file_yields_no_samples() {
    let csv = TempCsv::write("header-only", "label,p0,p1,p2,p3\n");
    let dataset = CsvDataset::from_path(&csv.path, 2, 2, 2).unwrap();
    assert!(dataset.is_empty());
}

#[test]
fn short_row_reports_line_and_counts() {
    let csv = TempCsv::write("short-row", "label,p0,p1,p2,p3\n1,1,2,3\n");
    assert!(matches!(
        CsvDataset::from_path(&csv.path, 2, 2, 2),
        Err(DataError::RowLength {
            line: 2,
            expected: 5,
            actual: 4
        })
    ));
}

#[test]
fn out_of_range_label_is_an_error() {
    let csv = TempCsv::write("bad-label", "label,p0,p1,p2,p3\n5,1,2,3,4\n");
    assert!(matches!(
        CsvDataset::from_path(&csv.path, 2, 2, 2),
        Err(DataError::Label {
            line: 2,
            label: 5,
            classes: 2
        })
    ));
}

#[test]
fn unparsable_field_is_an_error() {
    let csv = TempCsv::write("bad-field", "label,p0,p1,p2,p3\n1,1,x,3,4\n");
    assert!(matches!(
        CsvDataset::from_path(&csv.path, 2, 2, 2),
        Err(DataError::Parse { line: 2, .. })
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("lamina-definitely-missing.csv");
    assert!(matches!(
        CsvDataset::from_path(&path, 2, 2, 2),
        Err(DataError::Io(_))
    ));
}
