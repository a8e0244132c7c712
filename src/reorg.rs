//! Regrouping a tree laid out by datapack into one laid out by well.
//!
//! `<root>/<datapack>/<well>` becomes `<root>/<well>/<datapack>`. The
//! operation is destructive and has no undo; callers are expected to ask
//! for confirmation first.

use crate::file_organizer::{FileOrganizer, OrganizeError, OrganizeResult, list_subdirs};
use std::fs;
use std::path::Path;
use tracing::info;

/// What a reorganization moved.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReorgReport {
    pub datapacks: usize,
    pub wells_moved: usize,
}

/// Moves every well folder found under a datapack folder to
/// `<root>/<well>/<datapack>` and removes the emptied datapack folder.
///
/// Datapacks are listed before anything moves. A datapack that still holds
/// loose files after its wells are moved cannot be removed and stops the
/// operation with an error.
pub fn reorganize_datapacks_to_wells(root: &Path) -> OrganizeResult<ReorgReport> {
    let organizer = FileOrganizer::new();
    let mut report = ReorgReport::default();

    for datapack in list_subdirs(root)? {
        let datapack_path = root.join(&datapack);

        for well in list_subdirs(&datapack_path)? {
            organizer.move_to(&datapack_path.join(&well), &root.join(&well).join(&datapack))?;
            report.wells_moved += 1;
        }

        fs::remove_dir(&datapack_path).map_err(|e| OrganizeError::DirectoryRemovalFailed {
            path: datapack_path.clone(),
            source: e,
        })?;
        info!(datapack = %datapack, "datapack regrouped under wells");
        report.datapacks += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reorganize_swaps_levels() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for (dp, well) in [("DP1", "W1"), ("DP1", "W2"), ("DP2", "W1")] {
            let dir = root.join(dp).join(well);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("{}_{}.las", well, dp)), "x").unwrap();
        }

        let report = reorganize_datapacks_to_wells(root).expect("Reorganize failed");

        assert_eq!(report, ReorgReport { datapacks: 2, wells_moved: 3 });
        assert!(root.join("W1/DP1/W1_DP1.las").exists());
        assert!(root.join("W2/DP1/W2_DP1.las").exists());
        assert!(root.join("W1/DP2/W1_DP2.las").exists());
        assert!(!root.join("DP1").exists());
        assert!(!root.join("DP2").exists());
    }

    #[test]
    fn test_reorganize_fails_on_loose_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("DP1/W1")).unwrap();
        fs::write(root.join("DP1/readme.txt"), "x").unwrap();

        let result = reorganize_datapacks_to_wells(root);

        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryRemovalFailed { .. })
        ));
        assert!(root.join("W1/DP1").is_dir());
    }

    #[test]
    fn test_reorganize_refuses_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("DP1/W1")).unwrap();
        fs::create_dir_all(root.join("W1/DP1")).unwrap();

        let result = reorganize_datapacks_to_wells(root);
        assert!(matches!(result, Err(OrganizeError::DestinationExists { .. })));
    }
}
