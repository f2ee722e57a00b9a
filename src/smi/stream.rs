//! dmon stream parser
//!
//! `nvidia-smi dmon --format csv` prints two comment-marked header lines
//! (labels, then units) followed by one data line per GPU per sample:
//!
//! ```text
//! # gpu, pwr, gtemp, mtemp, sm, mem, enc, dec, mclk, pclk
//! # Idx, W, C, C, %, %, %, %, MHz, MHz
//!     0, 45, 60, -, 3, 1, 0, 0, 5000, 585
//! ```
//!
//! The header is captured once per session. The tool repeats it
//! periodically; those repeats are recognised by the leading marker and
//! skipped, not re-parsed.

use crate::domain::metric::NOT_AVAILABLE;
use crate::domain::{MetricColumn, MetricSample};
use crate::error::{RowError, StreamError};

use std::io;

const COMMENT_MARKER: char = '#';

/// Column layout of one monitoring session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSchema {
    columns: Vec<MetricColumn>,
    gpu_position: Option<usize>,
}

/// Classification of a line read after the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Empty line
    Blank,
    /// A repeated header line, split into fields
    Announcement(Vec<String>),
    /// A data row
    Sample(MetricSample),
}

impl MetricSchema {
    /// Build a schema from columns
    pub fn new(columns: Vec<MetricColumn>) -> Self {
        let gpu_position = columns.iter().position(MetricColumn::is_gpu_index);
        Self {
            columns,
            gpu_position,
        }
    }

    /// Build a schema from the label and unit header lines
    pub fn from_header_lines(labels: &str, units: &str) -> Result<Self, StreamError> {
        let labels = split_fields(labels);
        let units = split_fields(units);

        if labels.len() != units.len() {
            return Err(StreamError::SchemaMismatch {
                labels: labels.len(),
                units: units.len(),
            });
        }

        let columns = labels
            .into_iter()
            .zip(units)
            .map(|(label, unit)| MetricColumn::new(label, unit))
            .collect();

        Ok(Self::new(columns))
    }

    /// Columns in header order
    pub fn columns(&self) -> &[MetricColumn] {
        &self.columns
    }

    /// Number of columns, including the GPU index
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the header named no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether repeated header fields still describe this schema
    pub fn matches_announcement(&self, fields: &[String]) -> bool {
        if fields.len() != self.columns.len() {
            return false;
        }
        let labels = fields.iter().zip(&self.columns).all(|(f, c)| *f == c.label);
        let units = fields.iter().zip(&self.columns).all(|(f, c)| *f == c.unit);
        labels || units
    }

    /// Parse a line read after the header
    pub fn parse_line(&self, line: &str) -> Result<ParsedLine, RowError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ParsedLine::Blank);
        }
        if line.starts_with(COMMENT_MARKER) {
            return Ok(ParsedLine::Announcement(split_fields(line)));
        }

        let fields = split_fields(line);
        if fields.len() != self.columns.len() {
            return Err(RowError::FieldCount {
                expected: self.columns.len(),
                found: fields.len(),
            });
        }

        let gpu_position = self.gpu_position.ok_or(RowError::MissingGpuColumn)?;

        let mut gpu_index = String::new();
        let mut values = Vec::with_capacity(fields.len() - 1);
        for (position, (column, field)) in self.columns.iter().zip(fields).enumerate() {
            if position == gpu_position {
                gpu_index = field;
            } else {
                let value = (field != NOT_AVAILABLE).then_some(field);
                values.push((column.key.clone(), value));
            }
        }

        Ok(ParsedLine::Sample(MetricSample::new(gpu_index, values)))
    }
}

/// Read the label and unit lines that open a session
pub fn read_schema<I>(lines: &mut I) -> Result<MetricSchema, StreamError>
where
    I: Iterator<Item = io::Result<String>> + ?Sized,
{
    let labels = lines.next().ok_or(StreamError::MissingHeader("label"))??;
    let units = lines.next().ok_or(StreamError::MissingHeader("unit"))??;

    log::debug!("Header labels: {}", labels.trim());
    log::debug!("Header units: {}", units.trim());

    MetricSchema::from_header_lines(&labels, &units)
}

fn split_fields(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches(COMMENT_MARKER)
        .split(',')
        .map(|field| field.trim().to_string())
        .collect()
}
