//! Moves repeated file names of a well aside before classification.
//!
//! Names are compared uppercased. The first datapack (in name order) that
//! holds a name keeps it; every later copy inside the same well is moved to
//! its own datapack's `DUPLICATES` folder.

use crate::config::CompiledFilters;
use crate::file_organizer::{FileOrganizer, OrganizeResult, list_files};
use crate::report::{FileRecord, Outcome, ReportAccumulator};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Holding folder created in every datapack.
pub const DUPLICATES_DIR: &str = "DUPLICATES";

/// What the separator saw in one well.
#[derive(Debug, Default)]
pub struct SeparationOutcome {
    /// Uppercased names of the files kept in place.
    pub seen: HashSet<String>,
    /// Original paths of the files moved aside.
    pub duplicates: HashSet<PathBuf>,
}

/// Moves files whose uppercased name already appeared in an earlier
/// datapack of the well into that datapack's `DUPLICATES` folder.
///
/// One `Duplicate` record is appended per moved file. The seen-set starts
/// empty on every call, so detection never crosses wells or runs.
pub fn separate_duplicates(
    well_path: &Path,
    well_name: &str,
    datapacks: &[String],
    filters: &CompiledFilters,
    organizer: &FileOrganizer,
    report: &mut ReportAccumulator,
) -> OrganizeResult<SeparationOutcome> {
    let mut outcome = SeparationOutcome::default();

    for datapack in datapacks {
        let datapack_path = well_path.join(datapack);
        organizer.ensure_dir(&datapack_path.join(DUPLICATES_DIR))?;

        for file_path in list_files(&datapack_path)? {
            if !filters.should_include(&file_path) {
                continue;
            }
            let file_name = file_name_of(&file_path);
            let upper = file_name.to_uppercase();

            if outcome.seen.contains(&upper) {
                organizer.move_into_folder(&file_path, Path::new(DUPLICATES_DIR))?;
                debug!(well = well_name, datapack = %datapack, file = %file_name, "duplicate");
                report.append(FileRecord::new(well_name, datapack, &file_name, Outcome::Duplicate));
                outcome.duplicates.insert(file_path);
            } else {
                outcome.seen.insert(upper);
            }
        }
    }

    Ok(outcome)
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
