//! Tracking-sheet report accumulated over a classification run.
//!
//! Every file touched by a run produces exactly one [`FileRecord`]. Records
//! are kept in the order they were produced and written once, sorted by
//! well, datapack and file name, when the run is over.

use crate::file_organizer::{OrganizeError, OrganizeResult};
use serde::Serialize;
use std::path::Path;

/// Reason written for files moved aside as duplicates.
pub const DUPLICATE_REASON: &str = "Duplicate";

/// What happened to a file during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No rule matched; the file was left in place.
    Available,
    /// Matched an order-0 rule.
    Processed { category: String },
    /// Matched a rule of a higher order; needs review.
    Flagged { category: String },
    /// The name was already seen earlier in the same well.
    Duplicate,
}

/// One row of the tracking report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub well: String,
    pub datapack: String,
    pub file_name: String,
    pub outcome: Outcome,
}

impl FileRecord {
    pub fn new(well: &str, datapack: &str, file_name: &str, outcome: Outcome) -> Self {
        Self {
            well: well.to_string(),
            datapack: datapack.to_string(),
            file_name: file_name.to_string(),
            outcome,
        }
    }

    fn to_row(&self) -> ReportRow<'_> {
        let mut row = ReportRow {
            file_available: None,
            processed: None,
            reviewed_not_processed: None,
            reason: None,
            datapack: &self.datapack,
            well_name: &self.well,
            file_name: &self.file_name,
        };
        match &self.outcome {
            Outcome::Available => row.file_available = Some(1),
            Outcome::Processed { .. } => row.processed = Some(1),
            Outcome::Flagged { category } => {
                row.reviewed_not_processed = Some(1);
                row.reason = Some(category);
            }
            Outcome::Duplicate => {
                row.reviewed_not_processed = Some(1);
                row.reason = Some(DUPLICATE_REASON);
            }
        }
        row
    }
}

#[derive(Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "FILE AVAILABLE")]
    file_available: Option<u8>,
    #[serde(rename = "PROCESSED")]
    processed: Option<u8>,
    #[serde(rename = "REVIEWED_NOT_PROCESSED")]
    reviewed_not_processed: Option<u8>,
    #[serde(rename = "REASON")]
    reason: Option<&'a str>,
    #[serde(rename = "Datapack")]
    datapack: &'a str,
    #[serde(rename = "WellName")]
    well_name: &'a str,
    #[serde(rename = "File_Name")]
    file_name: &'a str,
}

const HEADER: [&str; 7] = [
    "FILE AVAILABLE",
    "PROCESSED",
    "REVIEWED_NOT_PROCESSED",
    "REASON",
    "Datapack",
    "WellName",
    "File_Name",
];

/// Per-outcome totals of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub available: usize,
    pub processed: usize,
    pub flagged: usize,
    pub duplicates: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.available + self.processed + self.flagged + self.duplicates
    }
}

/// Ordered buffer of report rows for a whole run.
#[derive(Debug, Clone, Default)]
pub struct ReportAccumulator {
    records: Vec<FileRecord>,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: FileRecord) {
        self.records.push(record);
    }

    /// Records in the order they were appended.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.counts_from(0)
    }

    /// Totals of the records appended at or after position `start`.
    pub fn counts_from(&self, start: usize) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for record in self.records.iter().skip(start) {
            match record.outcome {
                Outcome::Available => counts.available += 1,
                Outcome::Processed { .. } => counts.processed += 1,
                Outcome::Flagged { .. } => counts.flagged += 1,
                Outcome::Duplicate => counts.duplicates += 1,
            }
        }
        counts
    }

    /// Records sorted by (well, datapack, file name). Ties keep append order.
    pub fn sorted_records(&self) -> Vec<&FileRecord> {
        let mut sorted: Vec<&FileRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| {
            (&a.well, &a.datapack, &a.file_name).cmp(&(&b.well, &b.datapack, &b.file_name))
        });
        sorted
    }

    /// Writes the sorted report as CSV. The header is written even when
    /// there are no records.
    pub fn export_sorted_csv(&self, path: &Path) -> OrganizeResult<()> {
        let write_failed = |reason: String| OrganizeError::ReportWriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| write_failed(e.to_string()))?;

        writer
            .write_record(HEADER)
            .map_err(|e| write_failed(e.to_string()))?;
        for record in self.sorted_records() {
            writer
                .serialize(record.to_row())
                .map_err(|e| write_failed(e.to_string()))?;
        }
        writer.flush().map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }
}
