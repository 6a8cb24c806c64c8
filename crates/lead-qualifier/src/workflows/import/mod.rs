//! Intake CSV export reader used to seed the in-memory lead store.

mod parser;

pub(crate) use parser::parse_date;

use std::io::Read;
use std::path::Path;

use crate::workflows::intake::domain::{LeadId, LeadRecord, LeadStatus};

#[derive(Debug)]
pub enum IntakeImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    UnknownStatus { row: usize, value: String },
}

impl std::fmt::Display for IntakeImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeImportError::Io(err) => write!(f, "failed to read intake export: {}", err),
            IntakeImportError::Csv(err) => write!(f, "invalid intake CSV data: {}", err),
            IntakeImportError::UnknownStatus { row, value } => {
                write!(f, "row {} has unknown processing status '{}'", row, value)
            }
        }
    }
}

impl std::error::Error for IntakeImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IntakeImportError::Io(err) => Some(err),
            IntakeImportError::Csv(err) => Some(err),
            IntakeImportError::UnknownStatus { .. } => None,
        }
    }
}

impl From<std::io::Error> for IntakeImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for IntakeImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct IntakeCsvImporter;

impl IntakeCsvImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        default_jurisdiction: &str,
    ) -> Result<Vec<LeadRecord>, IntakeImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, default_jurisdiction)
    }

    /// Rows without a record id get a positional `csv-NNNN` id; rows without a jurisdiction
    /// take `default_jurisdiction`.
    pub fn from_reader<R: Read>(
        reader: R,
        default_jurisdiction: &str,
    ) -> Result<Vec<LeadRecord>, IntakeImportError> {
        let mut records = Vec::new();

        for (index, row) in parser::parse_rows(reader)?.into_iter().enumerate() {
            let row_number = index + 1;
            let status = match row.status.as_deref() {
                None => LeadStatus::New,
                Some(value) => LeadStatus::from_label(value).ok_or_else(|| {
                    IntakeImportError::UnknownStatus {
                        row: row_number,
                        value: value.to_string(),
                    }
                })?,
            };

            let id = row
                .record_id
                .clone()
                .unwrap_or_else(|| format!("csv-{row_number:04}"));
            let name = if row.name.trim().is_empty() {
                "Unknown".to_string()
            } else {
                row.name.clone()
            };

            records.push(LeadRecord {
                id: LeadId(id),
                name,
                email: row.email,
                phone: row.phone,
                injury_date: row.accident_date.as_deref().and_then(parser::parse_date),
                jurisdiction: row
                    .jurisdiction
                    .unwrap_or_else(|| default_jurisdiction.to_string()),
                county: row.county,
                accident_location: row.accident_location,
                case_type: row.case_type,
                description: row.summary,
                status,
                last_error: None,
                qualification: None,
            });
        }

        Ok(records)
    }
}
