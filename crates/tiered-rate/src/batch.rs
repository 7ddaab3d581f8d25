//! CSV batch import of calculation requests.
//!
//! Required columns are `category`, `principal`, and `duration`. `flags`
//! (semicolon separated), `evaluated_on` (YYYY-MM-DD), and any `attr:<name>`
//! columns are optional. A malformed cell rejects only its own row; malformed
//! CSV aborts the import.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calculation::{CalculationInput, CalculationResult, TieredRateCalculator, ValidationError};

const ATTRIBUTE_PREFIX: &str = "attr:";

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid batch CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("batch CSV is missing required column '{0}'")]
    MissingColumn(&'static str),
}

/// One parsed CSV row, keyed by its line in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    pub line: u64,
    pub input: Result<CalculationInput, ValidationError>,
}

/// Outcome of one row after computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub line: u64,
    pub outcome: Result<CalculationResult, ValidationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (u64, &CalculationResult)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().ok().map(|result| (entry.line, result)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (u64, &ValidationError)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().err().map(|error| (entry.line, error)))
    }

    /// Sum of final amounts across successful rows.
    pub fn total(&self) -> Decimal {
        self.succeeded().map(|(_, result)| result.final_amount).sum()
    }

    /// Total plus `penalty` when strictly more than `rows_over` rows succeeded.
    pub fn total_with_penalty(&self, rows_over: usize, penalty: Decimal) -> Decimal {
        if self.succeeded().count() > rows_over {
            self.total() + penalty
        } else {
            self.total()
        }
    }
}

pub struct BatchImporter;

impl BatchImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<BatchRow>, BatchError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<BatchRow>, BatchError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = Columns::from_headers(csv_reader.headers()?)?;
        let mut rows = Vec::new();

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .map(|position| position.line())
                .unwrap_or(index as u64 + 2);
            rows.push(BatchRow {
                line,
                input: columns.parse(&record),
            });
        }

        Ok(rows)
    }

    /// Parse `reader` and compute every row with `calculator`.
    pub fn compute_reader<R: Read>(
        calculator: &TieredRateCalculator,
        reader: R,
    ) -> Result<BatchReport, BatchError> {
        Ok(compute_rows(calculator, Self::from_reader(reader)?))
    }
}

pub fn compute_rows(calculator: &TieredRateCalculator, rows: Vec<BatchRow>) -> BatchReport {
    let entries = rows
        .into_iter()
        .map(|row| BatchEntry {
            line: row.line,
            outcome: row.input.and_then(|input| calculator.compute(&input)),
        })
        .collect();
    BatchReport { entries }
}

struct Columns {
    category: usize,
    principal: usize,
    duration: usize,
    flags: Option<usize>,
    evaluated_on: Option<usize>,
    attributes: Vec<(String, usize)>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, BatchError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|header| header.trim().to_ascii_lowercase())
            .collect();
        let find = |name: &str| normalized.iter().position(|header| header == name);
        let require = |name: &'static str| find(name).ok_or(BatchError::MissingColumn(name));

        let attributes = normalized
            .iter()
            .enumerate()
            .filter_map(|(index, header)| {
                header
                    .strip_prefix(ATTRIBUTE_PREFIX)
                    .map(|name| (name.trim().to_string(), index))
            })
            .collect();

        Ok(Self {
            category: require("category")?,
            principal: require("principal")?,
            duration: require("duration")?,
            flags: find("flags"),
            evaluated_on: find("evaluated_on"),
            attributes,
        })
    }

    fn parse(&self, record: &csv::StringRecord) -> Result<CalculationInput, ValidationError> {
        let cell = |index: usize| record.get(index).unwrap_or("");
        let optional = |index: Option<usize>| index.map(cell).filter(|value| !value.is_empty());

        let principal_raw = cell(self.principal);
        let principal = principal_raw
            .parse::<f64>()
            .map_err(|_| ValidationError::new("principal", principal_raw, "must be a number"))?;

        let duration_raw = cell(self.duration);
        let duration = duration_raw.parse::<u32>().map_err(|_| {
            ValidationError::new("duration", duration_raw, "must be a whole number")
        })?;

        let mut input = CalculationInput::new(cell(self.category), principal, duration);

        if let Some(flags) = optional(self.flags) {
            for flag in flags.split(';').map(str::trim).filter(|flag| !flag.is_empty()) {
                input = input.with_flag(flag);
            }
        }

        if let Some(raw) = optional(self.evaluated_on) {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ValidationError::new("evaluated_on", raw, "must be a YYYY-MM-DD date")
            })?;
            input = input.evaluated_on(date);
        }

        for (name, index) in &self.attributes {
            if let Some(raw) = optional(Some(*index)) {
                let value = raw.parse::<f64>().map_err(|_| {
                    ValidationError::new(format!("attributes.{name}"), raw, "must be a number")
                })?;
                input = input.with_attribute(name.clone(), value);
            }
        }

        Ok(input)
    }
}
