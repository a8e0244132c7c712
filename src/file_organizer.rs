/// Filesystem primitives shared by every stage of a run.
///
/// This module moves files and folders into their destination folders,
/// creating those folders on demand, and lists the folder/file entries the
/// stages iterate over. Every move is described by an [`Operation`] so that
/// callers can log it or, in dry-run mode, report what would have happened.
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Represents a single move performed (or planned) by the organizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The original path of the entry before the move.
    pub original_path: PathBuf,
    /// The new path of the entry after the move.
    pub new_path: PathBuf,
    /// The destination folder, relative to the folder the entry came from.
    pub folder: PathBuf,
}

/// Errors that can occur while touching the filesystem.
#[derive(Debug)]
pub enum OrganizeError {
    /// Failed to create a destination directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move an entry to its destination.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// The destination of a move is already occupied.
    DestinationExists { path: PathBuf },
    /// The base directory path is invalid or doesn't exist.
    InvalidBasePath {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to list a directory.
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove a directory.
    DirectoryRemovalFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write the tracking report.
    ReportWriteFailed { path: PathBuf, reason: String },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::DestinationExists { path } => {
                write!(f, "Destination already exists: {}", path.display())
            }
            Self::InvalidBasePath { path, source } => {
                write!(f, "Invalid base path {}: {}", path.display(), source)
            }
            Self::ReadDirFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::DirectoryRemovalFailed { path, source } => {
                write!(
                    f,
                    "Failed to remove directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::ReportWriteFailed { path, reason } => {
                write!(f, "Failed to write report {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryCreationFailed { source, .. }
            | Self::InvalidBasePath { source, .. }
            | Self::ReadDirFailed { source, .. }
            | Self::DirectoryRemovalFailed { source, .. } => Some(source),
            Self::FileMoveFailure { source_error, .. } => Some(source_error),
            Self::DestinationExists { .. } | Self::ReportWriteFailed { .. } => None,
        }
    }
}

/// Result type for filesystem operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves files and folders into destination folders.
///
/// In dry-run mode nothing on disk is touched: folders are not created and
/// moves are only planned, but the returned [`Operation`]s are identical to
/// the ones a real run would produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOrganizer {
    dry_run: bool,
}

impl FileOrganizer {
    /// Creates an organizer that performs real moves.
    pub fn new() -> Self {
        Self { dry_run: false }
    }

    /// Creates an organizer that only plans moves.
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }

    /// Returns true if this organizer leaves the filesystem untouched.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Creates `path` (and any missing parents) unless it already exists.
    pub fn ensure_dir(&self, path: &Path) -> OrganizeResult<()> {
        if self.dry_run || path.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Moves a file into `folder`, a path relative to the file's own parent.
    ///
    /// The destination folder is created if it doesn't exist. An entry that
    /// already sits at the destination is never overwritten.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use geochem_classifier::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let op = FileOrganizer::new()
    ///     .move_into_folder(Path::new("/wells/W1/DP1/W1_GCR.xlsx"), Path::new("PROCESSED/TOC"))
    ///     .expect("move failed");
    /// println!("{} -> {}", op.original_path.display(), op.new_path.display());
    /// ```
    pub fn move_into_folder(&self, file_path: &Path, folder: &Path) -> OrganizeResult<Operation> {
        let parent = file_path.parent().unwrap_or_else(|| Path::new(""));
        let destination_dir = parent.join(folder);
        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::FileMoveFailure {
                source: file_path.to_path_buf(),
                destination: destination_dir.clone(),
                source_error: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "file has no name component",
                ),
            })?;

        self.ensure_dir(&destination_dir)?;
        let destination_path = destination_dir.join(file_name);
        self.rename(file_path, &destination_path)?;

        Ok(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination_path,
            folder: folder.to_path_buf(),
        })
    }

    /// Moves an entry (file or folder) to an exact destination path.
    ///
    /// Missing parents of the destination are created first.
    pub fn move_to(&self, source: &Path, destination: &Path) -> OrganizeResult<Operation> {
        if let Some(parent) = destination.parent() {
            self.ensure_dir(parent)?;
        }
        self.rename(source, destination)?;

        Ok(Operation {
            original_path: source.to_path_buf(),
            new_path: destination.to_path_buf(),
            folder: destination
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        })
    }

    fn rename(&self, source: &Path, destination: &Path) -> OrganizeResult<()> {
        if destination.exists() {
            return Err(OrganizeError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }

        if self.dry_run {
            debug!(from = %source.display(), to = %destination.display(), "planned move");
            return Ok(());
        }

        fs::rename(source, destination).map_err(|e| OrganizeError::FileMoveFailure {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            source_error: e,
        })?;
        debug!(from = %source.display(), to = %destination.display(), "moved");
        Ok(())
    }
}

/// Returns the names of the folders directly inside `dir`, sorted by name.
pub fn list_subdirs(dir: &Path) -> OrganizeResult<Vec<String>> {
    let mut names: Vec<String> = read_entries(dir)?
        .into_iter()
        .filter(|(_, is_dir)| *is_dir)
        .filter_map(|(path, _)| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Returns the paths of the regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> OrganizeResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = read_entries(dir)?
        .into_iter()
        .filter(|(_, is_dir)| !*is_dir)
        .map(|(path, _)| path)
        .collect();
    files.sort();
    Ok(files)
}

fn read_entries(dir: &Path) -> OrganizeResult<Vec<(PathBuf, bool)>> {
    if !dir.is_dir() {
        return Err(OrganizeError::InvalidBasePath {
            path: dir.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "directory does not exist",
            ),
        });
    }

    let entries = fs::read_dir(dir).map_err(|e| OrganizeError::ReadDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    // Symlinks are followed: a link to a file counts as a file. Dangling
    // links are neither and are left out.
    let mut result = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OrganizeError::ReadDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            result.push((path, true));
        } else if path.is_file() {
            result.push((path, false));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_move_into_folder_creates_nested_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("W1_GCR.xlsx");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let op = FileOrganizer::new()
            .move_into_folder(&file_path, Path::new("PROCESSED/TOC"))
            .expect("Failed to move file");

        let moved_file = base_path.join("PROCESSED").join("TOC").join("W1_GCR.xlsx");
        assert!(moved_file.exists());
        assert!(!file_path.exists());
        assert_eq!(op.new_path, moved_file);
        assert_eq!(op.folder, PathBuf::from("PROCESSED/TOC"));
    }

    #[test]
    fn test_move_into_folder_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let dup_dir = base_path.join("DUPLICATES");
        fs::create_dir(&dup_dir).expect("Failed to create directory");
        let file_path = base_path.join("a.las");
        fs::write(&file_path, "x").expect("Failed to write test file");

        FileOrganizer::new()
            .move_into_folder(&file_path, Path::new("DUPLICATES"))
            .expect("Failed to move file");

        assert!(dup_dir.join("a.las").exists());
    }

    #[test]
    fn test_move_refuses_to_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        fs::create_dir(base_path.join("DUPLICATES")).unwrap();
        fs::write(base_path.join("DUPLICATES").join("a.las"), "old").unwrap();
        let file_path = base_path.join("a.las");
        fs::write(&file_path, "new").unwrap();

        let result = FileOrganizer::new().move_into_folder(&file_path, Path::new("DUPLICATES"));
        assert!(matches!(
            result,
            Err(OrganizeError::DestinationExists { .. })
        ));
        assert!(file_path.exists());
        assert_eq!(
            fs::read_to_string(base_path.join("DUPLICATES").join("a.las")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file_path = base_path.join("a.las");
        fs::write(&file_path, "x").unwrap();

        let organizer = FileOrganizer::dry_run();
        assert!(organizer.is_dry_run());
        let op = organizer
            .move_into_folder(&file_path, Path::new("PROCESSED/LAS"))
            .expect("Dry run should succeed");

        assert!(file_path.exists());
        assert!(!base_path.join("PROCESSED").exists());
        assert_eq!(op.new_path, base_path.join("PROCESSED/LAS/a.las"));
    }

    #[test]
    fn test_listing_is_sorted_and_split() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("b_dir")).unwrap();
        fs::create_dir(base_path.join("a_dir")).unwrap();
        fs::write(base_path.join("z.txt"), "").unwrap();
        fs::write(base_path.join("m.txt"), "").unwrap();

        assert_eq!(list_subdirs(base_path).unwrap(), vec!["a_dir", "b_dir"]);
        assert_eq!(
            list_files(base_path).unwrap(),
            vec![base_path.join("m.txt"), base_path.join("z.txt")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_listing_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let target = temp_dir.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("real.xlsx"), "x").unwrap();

        let dp = base_path.join("DP1");
        fs::create_dir(&dp).unwrap();
        symlink(target.join("real.xlsx"), dp.join("linked.xlsx")).unwrap();
        symlink(&target, dp.join("linked_dir")).unwrap();
        symlink(base_path.join("missing"), dp.join("dangling")).unwrap();

        assert_eq!(list_files(&dp).unwrap(), vec![dp.join("linked.xlsx")]);
        assert_eq!(list_subdirs(&dp).unwrap(), vec!["linked_dir"]);
    }

    #[test]
    fn test_listing_invalid_base_path() {
        let result = list_subdirs(Path::new("/non/existent/path"));
        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }
}
