//! Rule-based classification of datapack files.
//!
//! A classified file ends up in
//! `<datapack>/PROCESSED/<CATEGORY>/` when the winning rule has order 0 and
//! in `<datapack>/REVIEWED_NOT_PROCESSED/<CATEGORY>/` otherwise. Files that no
//! rule claims are left where they are and reported as available.

use crate::config::CompiledFilters;
use crate::duplicates::{file_name_of, separate_duplicates};
use crate::file_organizer::{FileOrganizer, OrganizeResult, list_files, list_subdirs};
use crate::report::{FileRecord, Outcome, OutcomeCounts, ReportAccumulator};
use crate::rules::RuleTable;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PROCESSED_DIR: &str = "PROCESSED";
pub const REVIEWED_DIR: &str = "REVIEWED_NOT_PROCESSED";

/// Top-level folder a classified file is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFlag {
    Processed,
    ReviewedNotProcessed,
}

impl ReviewFlag {
    pub fn for_order(order: u32) -> Self {
        if order == 0 {
            ReviewFlag::Processed
        } else {
            ReviewFlag::ReviewedNotProcessed
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            ReviewFlag::Processed => PROCESSED_DIR,
            ReviewFlag::ReviewedNotProcessed => REVIEWED_DIR,
        }
    }
}

/// Everything a run needs besides the paths and the report.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub rules: &'a RuleTable,
    pub filters: &'a CompiledFilters,
    pub organizer: FileOrganizer,
}

/// Totals for one processed well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellSummary {
    pub well: String,
    pub datapacks: usize,
    pub counts: OutcomeCounts,
}

/// Classifies the files left directly inside each datapack of a well.
///
/// Files listed in `skip` (duplicates planned by a dry run) are ignored.
/// Files the filters exclude stay in place and are reported as available.
pub fn classify_well(
    well_path: &Path,
    well_name: &str,
    datapacks: &[String],
    ctx: &ClassifyContext<'_>,
    skip: &HashSet<PathBuf>,
    report: &mut ReportAccumulator,
) -> OrganizeResult<()> {
    for datapack in datapacks {
        let datapack_path = well_path.join(datapack);

        for file_path in list_files(&datapack_path)? {
            if skip.contains(&file_path) {
                continue;
            }
            let file_name = file_name_of(&file_path);

            let matched = if ctx.filters.should_include(&file_path) {
                ctx.rules.find_match(&file_name)
            } else {
                debug!(file = %file_name, "excluded by filters");
                None
            };

            let outcome = match matched {
                Some(rule) => {
                    let flag = ReviewFlag::for_order(rule.order);
                    let folder = Path::new(flag.dir_name()).join(rule.category.to_uppercase());
                    ctx.organizer.move_into_folder(&file_path, &folder)?;
                    debug!(file = %file_name, key = rule.key, folder = %folder.display(), "classified");

                    let category = rule.category.to_string();
                    match flag {
                        ReviewFlag::Processed => Outcome::Processed { category },
                        ReviewFlag::ReviewedNotProcessed => Outcome::Flagged { category },
                    }
                }
                None => Outcome::Available,
            };

            report.append(FileRecord::new(well_name, datapack, &file_name, outcome));
        }
    }

    Ok(())
}

/// Separates duplicates then classifies one well under `root`.
pub fn process_well(
    root: &Path,
    well_name: &str,
    ctx: &ClassifyContext<'_>,
    report: &mut ReportAccumulator,
) -> OrganizeResult<WellSummary> {
    let well_path = root.join(well_name);
    let datapacks = list_subdirs(&well_path)?;
    let start = report.len();

    let separation = separate_duplicates(
        &well_path,
        well_name,
        &datapacks,
        ctx.filters,
        &ctx.organizer,
        report,
    )?;
    info!(well = well_name, duplicates = separation.duplicates.len(), "duplicates moved");

    classify_well(
        &well_path,
        well_name,
        &datapacks,
        ctx,
        &separation.duplicates,
        report,
    )?;
    info!(well = well_name, "classification completed");

    Ok(WellSummary {
        well: well_name.to_string(),
        datapacks: datapacks.len(),
        counts: report.counts_from(start),
    })
}

/// Runs duplicate separation and classification over several wells.
///
/// `on_well` is called after each well is finished. The first filesystem
/// error stops the run; wells already processed stay processed.
pub fn classify_wells<F>(
    root: &Path,
    wells: &[String],
    ctx: &ClassifyContext<'_>,
    report: &mut ReportAccumulator,
    mut on_well: F,
) -> OrganizeResult<Vec<WellSummary>>
where
    F: FnMut(&WellSummary),
{
    let mut summaries = Vec::with_capacity(wells.len());
    for well in wells {
        let summary = process_well(root, well, ctx, report)?;
        on_well(&summary);
        summaries.push(summary);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExcludeRules, FilterRules};
    use crate::rules::Rule;
    use std::fs;
    use tempfile::TempDir;

    fn datapack_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let dp = dir.path().join("DP1");
        fs::create_dir(&dp).unwrap();
        for f in files {
            fs::write(dp.join(f), "data").unwrap();
        }
        dir
    }

    fn run(dir: &TempDir, rules: &RuleTable) -> ReportAccumulator {
        let filters = CompiledFilters::default();
        let ctx = ClassifyContext {
            rules,
            filters: &filters,
            organizer: FileOrganizer::new(),
        };
        let mut report = ReportAccumulator::new();
        classify_well(
            dir.path(),
            "W1",
            &["DP1".to_string()],
            &ctx,
            &HashSet::new(),
            &mut report,
        )
        .expect("classification failed");
        report
    }

    #[test]
    fn test_review_flag_for_order() {
        assert_eq!(ReviewFlag::for_order(0).dir_name(), "PROCESSED");
        assert_eq!(ReviewFlag::for_order(1).dir_name(), "REVIEWED_NOT_PROCESSED");
        assert_eq!(ReviewFlag::for_order(7).dir_name(), "REVIEWED_NOT_PROCESSED");
    }

    #[test]
    fn test_order_zero_goes_to_processed() {
        let dir = datapack_with(&["w1_gcr.xlsx"]);
        let rules = RuleTable::from_rules([Rule::new("GCR", "toc", 0)]);

        let report = run(&dir, &rules);

        assert!(dir.path().join("DP1/PROCESSED/TOC/w1_gcr.xlsx").exists());
        assert_eq!(
            report.records()[0].outcome,
            Outcome::Processed {
                category: "toc".to_string()
            }
        );
    }

    #[test]
    fn test_higher_order_goes_to_review() {
        let dir = datapack_with(&["lab_results.pdf"]);
        let rules = RuleTable::from_rules([Rule::new("LAB", "LAB_REPORT", 2)]);

        let report = run(&dir, &rules);

        assert!(
            dir.path()
                .join("DP1/REVIEWED_NOT_PROCESSED/LAB_REPORT/lab_results.pdf")
                .exists()
        );
        assert_eq!(
            report.records()[0].outcome,
            Outcome::Flagged {
                category: "LAB_REPORT".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_file_stays_available() {
        let dir = datapack_with(&["readme.txt"]);
        let rules = RuleTable::from_rules([Rule::new("GCR", "TOC", 0)]);

        let report = run(&dir, &rules);

        assert!(dir.path().join("DP1/readme.txt").exists());
        assert!(!dir.path().join("DP1/PROCESSED").exists());
        assert_eq!(report.records()[0].outcome, Outcome::Available);
    }

    #[test]
    fn test_pdf_only_match_is_left_in_place() {
        let dir = datapack_with(&["core_photos.pdf"]);
        let rules = RuleTable::from_rules([Rule::new(".PDF", "PDF", 0), Rule::new("CORE", "PDF", 1)]);

        let report = run(&dir, &rules);

        assert!(dir.path().join("DP1/core_photos.pdf").exists());
        assert_eq!(report.records()[0].outcome, Outcome::Available);
    }

    #[test]
    fn test_excluded_file_is_reported_available() {
        let dir = datapack_with(&["Thumbs.db", "w1_gcr.xlsx"]);
        let rules = RuleTable::from_rules([Rule::new("GCR", "TOC", 0), Rule::new(".DB", "CACHE", 0)]);
        let filters = FilterRules {
            skip_hidden_files: false,
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string()],
                ..Default::default()
            },
        }
        .compile()
        .unwrap();
        let ctx = ClassifyContext {
            rules: &rules,
            filters: &filters,
            organizer: FileOrganizer::new(),
        };
        let mut report = ReportAccumulator::new();

        classify_well(dir.path(), "W1", &["DP1".to_string()], &ctx, &HashSet::new(), &mut report)
            .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(
            report.records()[0],
            FileRecord::new("W1", "DP1", "Thumbs.db", Outcome::Available)
        );
        assert!(dir.path().join("DP1/Thumbs.db").exists());
        assert!(dir.path().join("DP1/PROCESSED/TOC/w1_gcr.xlsx").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_classified() {
        let dir = datapack_with(&["notes.txt"]);
        let real = dir.path().join("w1_gcr_source.xlsx");
        fs::write(&real, "data").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("DP1/w1_gcr.xlsx")).unwrap();
        let rules = RuleTable::from_rules([Rule::new("GCR", "TOC", 0)]);

        let report = run(&dir, &rules);

        assert_eq!(report.len(), 2);
        assert_eq!(report.counts().processed, 1);
        assert!(dir.path().join("DP1/PROCESSED/TOC/w1_gcr.xlsx").is_file());
        assert!(!dir.path().join("DP1/w1_gcr.xlsx").exists());
    }

    #[test]
    fn test_existing_classified_folders_are_not_rescanned() {
        let dir = datapack_with(&["w1_gcr.xlsx"]);
        let rules = RuleTable::from_rules([Rule::new("GCR", "TOC", 0)]);
        run(&dir, &rules);

        let report = run(&dir, &rules);
        assert!(report.is_empty());
    }

    #[test]
    fn test_process_well_counts_every_file_once() {
        let dir = TempDir::new().unwrap();
        let well = dir.path().join("W1");
        for (dp, f) in [("DP1", "a_gcr.xlsx"), ("DP1", "b.txt"), ("DP2", "A_GCR.XLSX"), ("DP2", "c_lab.pdf")] {
            fs::create_dir_all(well.join(dp)).unwrap();
            fs::write(well.join(dp).join(f), "x").unwrap();
        }
        let rules = RuleTable::from_rules([Rule::new("GCR", "TOC", 0), Rule::new("LAB", "LAB", 1)]);
        let filters = CompiledFilters::default();
        let ctx = ClassifyContext {
            rules: &rules,
            filters: &filters,
            organizer: FileOrganizer::new(),
        };
        let mut report = ReportAccumulator::new();

        let summary = process_well(dir.path(), "W1", &ctx, &mut report).unwrap();

        assert_eq!(summary.datapacks, 2);
        assert_eq!(summary.counts.total(), 4);
        assert_eq!(summary.counts.duplicates, 1);
        assert_eq!(summary.counts.processed, 1);
        assert_eq!(summary.counts.flagged, 1);
        assert_eq!(summary.counts.available, 1);
        assert!(well.join("DP2/DUPLICATES/A_GCR.XLSX").exists());
    }
}
