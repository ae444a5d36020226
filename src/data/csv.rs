use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::data::dataset::{Dataset, Sample};
use crate::engine::error::TensorError;
use crate::engine::tensor::Tensor;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("io error reading dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset file is empty")]
    Empty,

    #[error("line {line}: cannot parse {field:?} as a number")]
    Parse { line: usize, field: String },

    #[error("line {line}: expected {expected} fields, found {actual}")]
    RowLength {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: label {label} outside {classes} classes")]
    Label {
        line: usize,
        label: usize,
        classes: usize,
    },

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// In-memory dataset parsed from delimited text.
///
/// Expected format, one sample per line after a header row:
/// `label,p0,p1,...,pN` with integer pixel values in 0..=255 and
/// `N + 1 == rows * cols`. Pixels are normalized by 255 into a
/// `[1, rows, cols]` tensor; labels are one-hot encoded over `classes`.
#[derive(Debug)]
pub struct CsvDataset {
    samples: Vec<Sample>,
    rows: usize,
    cols: usize,
    classes: usize,
}

impl CsvDataset {
    pub fn from_path(
        path: impl AsRef<Path>,
        rows: usize,
        cols: usize,
        classes: usize,
    ) -> Result<Self, DataError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        // First line is a header.
        match lines.next() {
            Some(header) => header?,
            None => return Err(DataError::Empty),
        };

        let mut samples = Vec::new();
        for (i, line) in lines.enumerate() {
            let line_no = i + 2;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != rows * cols + 1 {
                return Err(DataError::RowLength {
                    line: line_no,
                    expected: rows * cols + 1,
                    actual: fields.len(),
                });
            }

            let label: usize = fields[0].trim().parse().map_err(|_| DataError::Parse {
                line: line_no,
                field: fields[0].to_string(),
            })?;
            if label >= classes {
                return Err(DataError::Label {
                    line: line_no,
                    label,
                    classes,
                });
            }

            let mut pixels = Vec::with_capacity(rows * cols);
            for field in &fields[1..] {
                let raw: f64 = field.trim().parse().map_err(|_| DataError::Parse {
                    line: line_no,
                    field: field.to_string(),
                })?;
                pixels.push(raw / 255.0);
            }

            let input = Tensor::with_data(&[1, rows, cols], pixels)?;
            let mut one_hot = Tensor::new(&[classes])?;
            one_hot.set(1.0, &[label])?;
            samples.push(Sample {
                input,
                label: one_hot,
            });
        }

        Ok(Self {
            samples,
            rows,
            cols,
            classes,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn classes(&self) -> usize {
        self.classes
    }
}

impl Dataset for CsvDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> &Sample {
        &self.samples[index]
    }
}
