/// Reverting a classification by flattening datapacks.
///
/// Every file found at any depth below a datapack is moved back to the
/// datapack root and the emptied folders are removed. The revert does not
/// look for a previous run; it flattens whatever it finds.
use crate::file_organizer::{FileOrganizer, OrganizeError, OrganizeResult, list_subdirs};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Represents the result of a revert.
#[derive(Debug, Default)]
pub struct RevertReport {
    /// Number of datapacks flattened.
    pub datapacks: usize,
    /// Number of files moved back to their datapack root.
    pub restored_files: usize,
    /// Files that were in the way, with the backup name they were given.
    pub renamed_conflicts: Vec<(PathBuf, PathBuf)>,
    /// Number of folders removed.
    pub removed_dirs: usize,
}

impl RevertReport {
    /// Returns true if no file had to be renamed to make room.
    pub fn is_clean(&self) -> bool {
        self.renamed_conflicts.is_empty()
    }
}

/// Flattens every datapack of every well under `root`.
///
/// # Examples
///
/// ```no_run
/// use geochem_classifier::revert::revert_classification;
/// use std::path::Path;
///
/// match revert_classification(Path::new("/data/wells")) {
///     Ok(report) => println!("Restored {} files", report.restored_files),
///     Err(e) => eprintln!("Revert failed: {}", e),
/// }
/// ```
pub fn revert_classification(root: &Path) -> OrganizeResult<RevertReport> {
    let mut report = RevertReport::default();

    for well in list_subdirs(root)? {
        let well_path = root.join(&well);
        for datapack in list_subdirs(&well_path)? {
            revert_datapack(&well_path.join(&datapack), &mut report)?;
        }
    }

    Ok(report)
}

/// Moves all nested files of one datapack to its root, then removes the
/// folders left behind, deepest first.
pub fn revert_datapack(datapack_path: &Path, report: &mut RevertReport) -> OrganizeResult<()> {
    let organizer = FileOrganizer::new();

    let nested_files = walk(datapack_path, 2, false, |entry| !entry.file_type().is_dir())?;

    for file_path in nested_files {
        let Some(file_name) = file_path.file_name() else {
            continue;
        };
        let destination = datapack_path.join(file_name);

        if destination.exists() {
            let backup = generate_backup_path(&destination);
            organizer.move_to(&destination, &backup)?;
            warn!(file = %destination.display(), backup = %backup.display(), "renamed conflicting file");
            report.renamed_conflicts.push((destination.clone(), backup));
        }

        organizer.move_to(&file_path, &destination)?;
        report.restored_files += 1;
    }

    let nested_dirs = walk(datapack_path, 1, true, |entry| entry.file_type().is_dir())?;

    for dir in nested_dirs {
        fs::remove_dir(&dir).map_err(|e| OrganizeError::DirectoryRemovalFailed {
            path: dir.clone(),
            source: e,
        })?;
        debug!(dir = %dir.display(), "removed folder");
        report.removed_dirs += 1;
    }

    report.datapacks += 1;
    Ok(())
}

/// Collects the paths below `root` accepted by `keep`, in file-name order.
///
/// Any traversal error stops the collection.
fn walk<F>(root: &Path, min_depth: usize, contents_first: bool, keep: F) -> OrganizeResult<Vec<PathBuf>>
where
    F: Fn(&DirEntry) -> bool,
{
    let mut paths = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(min_depth)
        .contents_first(contents_first)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| OrganizeError::ReadDirFailed {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        if keep(&entry) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Generates a free backup path for a file by appending a timestamp.
///
/// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
fn generate_backup_path(original_path: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = original_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let parent = original_path.parent().unwrap_or_else(|| Path::new(""));

    let mut candidate = parent.join(format!("{}.bak.{}", filename, timestamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{}.bak.{}-{}", filename, timestamp, n));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_revert_flattens_classified_datapack() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        write(root, "W1/DP1/PROCESSED/TOC/a_gcr.xlsx", "a");
        write(root, "W1/DP1/REVIEWED_NOT_PROCESSED/LAB/b_lab.pdf", "b");
        write(root, "W1/DP1/DUPLICATES/c.las", "c");
        write(root, "W1/DP1/d.txt", "d");

        let report = revert_classification(root).expect("Revert failed");

        assert_eq!(report.datapacks, 1);
        assert_eq!(report.restored_files, 3);
        assert!(report.is_clean());
        for name in ["a_gcr.xlsx", "b_lab.pdf", "c.las", "d.txt"] {
            assert!(root.join("W1/DP1").join(name).is_file(), "{} missing", name);
        }
        for dir in ["PROCESSED", "REVIEWED_NOT_PROCESSED", "DUPLICATES"] {
            assert!(!root.join("W1/DP1").join(dir).exists());
        }
        assert_eq!(report.removed_dirs, 5);
    }

    #[test]
    fn test_revert_removes_empty_folders() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("W1/DP1/DUPLICATES")).unwrap();

        let report = revert_classification(root).unwrap();

        assert_eq!(report.restored_files, 0);
        assert!(!root.join("W1/DP1/DUPLICATES").exists());
        assert!(root.join("W1/DP1").is_dir());
    }

    #[test]
    fn test_revert_with_file_name_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "W1/DP1/DUPLICATES/a.las", "nested");
        write(root, "W1/DP1/a.las", "top");

        let report = revert_classification(root).unwrap();

        assert_eq!(report.renamed_conflicts.len(), 1);
        assert_eq!(fs::read_to_string(root.join("W1/DP1/a.las")).unwrap(), "nested");
        let backup = &report.renamed_conflicts[0].1;
        assert_eq!(fs::read_to_string(backup).unwrap(), "top");
        assert!(backup.file_name().unwrap().to_string_lossy().contains(".bak."));
    }

    #[test]
    fn test_revert_leaves_root_files_alone() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "TrackingSheet_report.csv", "report");
        write(root, "W1/DP1/PROCESSED/TOC/a.xlsx", "a");

        revert_classification(root).unwrap();

        assert!(root.join("TrackingSheet_report.csv").exists());
        assert!(root.join("W1/DP1/a.xlsx").exists());
    }

    #[test]
    fn test_revert_datapack_reports_traversal_errors() {
        let temp_dir = TempDir::new().unwrap();
        let mut report = RevertReport::default();

        let result = revert_datapack(&temp_dir.path().join("W1/missing"), &mut report);

        assert!(matches!(result, Err(OrganizeError::ReadDirFailed { .. })));
        assert_eq!(report.datapacks, 0);
    }

    #[test]
    fn test_revert_invalid_base_path() {
        let result = revert_classification(Path::new("/non/existent/path"));
        assert!(result.is_err());
    }
}
