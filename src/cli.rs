//! Command-line interface module for geochem-classifier.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing (clap) and the interactive mode menu
//! - Loading configuration and the classification dictionary
//! - Orchestrating classification, revert and reorganize runs
//! - Writing the tracking report and printing summaries

use crate::classifier::{ClassifyContext, WellSummary, classify_wells};
use crate::config::{AppConfig, CompiledFilters};
use crate::file_organizer::{FileOrganizer, list_subdirs};
use crate::output::OutputFormatter;
use crate::reorg::{ReorgReport, reorganize_datapacks_to_wells};
use crate::report::ReportAccumulator;
use crate::revert::{RevertReport, revert_classification};
use crate::rules::RuleTable;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const WELCOME: &str = r#"
Geochem Classifier

Automated geochem data classification assistant.
__________________________________________________

Geochem Classifier moves duplicated file names aside and performs a
preliminary classification of geochem files. Finally it produces a report
to be used when filling the tracking sheet.

Review the classification for outliers and mistakes. PDFs are kept apart
for further review.

Prepare the folder structure as follows:
<well> /
    <datapack_1> /
    <datapack_2> /
    etc...

Classification depends on 'classification_dictionary.csv', curated by the users.
__________________________________________________
"#;

const MENU: &str = "
Select mode:
(1) Single well classification
(2) Bulk well classification
(3) Revert classification
(4) Reorganize from 'by datapack' to 'by well'
";

const REORG_WARNING: &str = "
WARNING!
Entire directory tree will be reorganized in-place. It is not easily reverted.
Only proceed when sure and possibly data backed up.

Proceed? (yes / no)
";

/// Classify geochem datapack files by file-name rules.
#[derive(Debug, Parser)]
#[command(name = "geochem-classifier", version, about)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Classification dictionary, overrides the configured path
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Without a command the interactive menu is started
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Classify a single well folder
    Well {
        path: PathBuf,
        /// Report what would happen without moving anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Classify every well folder under a root
    Bulk {
        path: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Move classified files back to their datapack roots
    Revert { path: PathBuf },
    /// Regroup <root>/<datapack>/<well> into <root>/<well>/<datapack>
    Reorganize { path: PathBuf },
}

/// The four menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SingleWell,
    Bulk,
    Revert,
    Reorganize,
}

impl Mode {
    pub fn from_choice(choice: i64) -> Option<Self> {
        match choice {
            1 => Some(Mode::SingleWell),
            2 => Some(Mode::Bulk),
            3 => Some(Mode::Revert),
            4 => Some(Mode::Reorganize),
            _ => None,
        }
    }
}

/// How a mode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOutcome {
    Completed,
    /// The user declined or input ran out; the program should end.
    Aborted,
}

/// Line-based question/answer channel.
pub trait Prompt {
    /// Shows `message` and returns the answer without its line ending, or
    /// `None` once input is exhausted.
    fn ask(&mut self, message: &str) -> Option<String>;
}

/// `Prompt` over any buffered reader and writer (stdin/stdout in the binary).
pub struct LinePrompt<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, message: &str) -> Option<String> {
        let _ = write!(self.writer, "{}", message);
        let _ = self.writer.flush();

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Loaded configuration and rules, shared by every mode of a session.
#[derive(Debug)]
pub struct Session {
    config: AppConfig,
    rules: RuleTable,
    filters: CompiledFilters,
}

impl Session {
    /// Loads configuration and the classification dictionary.
    ///
    /// Any failure here is fatal and happens before the filesystem is touched.
    pub fn start(config_path: Option<&Path>, rules_path: Option<&Path>) -> Result<Self, String> {
        let config = AppConfig::load(config_path)
            .map_err(|e| format!("Error loading configuration: {}", e))?;
        let rules_path = rules_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.rules.path.clone());
        let rules = RuleTable::load(&rules_path).map_err(|e| {
            format!(
                "{}\nCould not load the classification dictionary. Make sure '{}' exists and is valid.",
                e,
                rules_path.display()
            )
        })?;
        info!(path = %rules_path.display(), rules = rules.len(), "classification dictionary loaded");
        Self::new(config, rules)
    }

    pub fn new(config: AppConfig, rules: RuleTable) -> Result<Self, String> {
        let filters = config
            .filters
            .compile()
            .map_err(|e| format!("Error compiling filters: {}", e))?;
        Ok(Self {
            config,
            rules,
            filters,
        })
    }

    fn context(&self, dry_run: bool) -> ClassifyContext<'_> {
        ClassifyContext {
            rules: &self.rules,
            filters: &self.filters,
            organizer: if dry_run {
                FileOrganizer::dry_run()
            } else {
                FileOrganizer::new()
            },
        }
    }
}

/// Result of a classification run.
#[derive(Debug)]
pub struct ClassificationRun {
    pub report: ReportAccumulator,
    pub wells: Vec<WellSummary>,
    /// Where the report was written; `None` for dry runs.
    pub report_path: Option<PathBuf>,
}

/// Runs the application for parsed command-line arguments.
pub fn run_cli(cli: Cli) -> Result<(), String> {
    match cli.command {
        None => {
            OutputFormatter::plain(WELCOME);
            let session = Session::start(cli.config.as_deref(), cli.rules.as_deref())?;
            let stdin = std::io::stdin();
            let mut prompt = LinePrompt::new(stdin.lock(), std::io::stdout());
            run_menu(&session, &mut prompt)
        }
        Some(command) => {
            let stdin = std::io::stdin();
            let mut prompt = LinePrompt::new(stdin.lock(), std::io::stdout());
            run_command(cli.config.as_deref(), cli.rules.as_deref(), command, &mut prompt)
                .map(|_| ())
        }
    }
}

/// Runs a single non-interactive command.
///
/// Revert and reorganize don't need the classification dictionary, so it
/// is only loaded for the classification commands.
pub fn run_command(
    config_path: Option<&Path>,
    rules_path: Option<&Path>,
    command: Command,
    prompt: &mut dyn Prompt,
) -> Result<ModeOutcome, String> {
    match command {
        Command::Well { path, dry_run } => {
            let session = Session::start(config_path, rules_path)?;
            classify_single_well(&session, &path, dry_run)?;
        }
        Command::Bulk { path, dry_run } => {
            let session = Session::start(config_path, rules_path)?;
            classify_bulk(&session, &path, dry_run)?;
        }
        Command::Revert { path } => {
            revert(&path)?;
        }
        Command::Reorganize { path } => {
            if !confirm_destructive(prompt) {
                OutputFormatter::plain("\nSafely exiting");
                return Ok(ModeOutcome::Aborted);
            }
            reorganize(&path)?;
        }
    }
    Ok(ModeOutcome::Completed)
}

/// The interactive loop: ask for a mode, run it, repeat.
///
/// Ends when input runs out or a mode is aborted. A filesystem error ends
/// the loop with that error.
pub fn run_menu(session: &Session, prompt: &mut dyn Prompt) -> Result<(), String> {
    while let Some(mode) = ask_mode(prompt) {
        if run_mode(session, mode, prompt)? == ModeOutcome::Aborted {
            break;
        }
    }
    Ok(())
}

/// Asks until the answer is one of the menu numbers.
pub fn ask_mode(prompt: &mut dyn Prompt) -> Option<Mode> {
    loop {
        let answer = prompt.ask(MENU)?;
        if let Some(mode) = answer.trim().parse::<i64>().ok().and_then(Mode::from_choice) {
            return Some(mode);
        }
    }
}

/// Runs one menu mode, asking for the paths it needs.
pub fn run_mode(
    session: &Session,
    mode: Mode,
    prompt: &mut dyn Prompt,
) -> Result<ModeOutcome, String> {
    match mode {
        Mode::SingleWell => {
            let Some(path) = ask_path(prompt, "Insert well directory: ") else {
                return Ok(ModeOutcome::Aborted);
            };
            classify_single_well(session, &path, false)?;
        }
        Mode::Bulk => {
            let Some(path) = ask_path(prompt, "Insert wells directory: ") else {
                return Ok(ModeOutcome::Aborted);
            };
            classify_bulk(session, &path, false)?;
        }
        Mode::Revert => {
            let Some(path) = ask_path(prompt, "Insert classified wells directory: ") else {
                return Ok(ModeOutcome::Aborted);
            };
            revert(&path)?;
        }
        Mode::Reorganize => {
            if !confirm_destructive(prompt) {
                OutputFormatter::plain("\nSafely exiting");
                return Ok(ModeOutcome::Aborted);
            }
            let Some(path) = ask_path(prompt, "Insert datapacks directory: ") else {
                return Ok(ModeOutcome::Aborted);
            };
            reorganize(&path)?;
        }
    }
    Ok(ModeOutcome::Completed)
}

/// Shows the reorganize warning; only an explicit "yes" confirms.
pub fn confirm_destructive(prompt: &mut dyn Prompt) -> bool {
    prompt
        .ask(REORG_WARNING)
        .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("yes"))
}

fn ask_path(prompt: &mut dyn Prompt, message: &str) -> Option<PathBuf> {
    prompt.ask(message).map(|answer| clean_path_input(&answer))
}

/// Trims whitespace and one pair of surrounding quotes from a typed or
/// pasted path.
pub fn clean_path_input(input: &str) -> PathBuf {
    let trimmed = input.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    PathBuf::from(unquoted)
}

/// Classifies one well; `well_path` is the well folder itself and the report
/// is written next to it.
pub fn classify_single_well(
    session: &Session,
    well_path: &Path,
    dry_run: bool,
) -> Result<ClassificationRun, String> {
    if !well_path.is_dir() {
        return Err(format!("Not a directory: {}", well_path.display()));
    }

    let well_path = if well_path.file_name().is_some() {
        well_path.to_path_buf()
    } else {
        std::fs::canonicalize(well_path)
            .map_err(|e| format!("Error resolving {}: {}", well_path.display(), e))?
    };
    let well = well_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Not a well directory: {}", well_path.display()))?;
    let root = well_path.parent().map(Path::to_path_buf).unwrap_or_default();

    run_classification(session, &root, vec![well], dry_run)
}

/// Classifies every well folder directly under `root`.
pub fn classify_bulk(
    session: &Session,
    root: &Path,
    dry_run: bool,
) -> Result<ClassificationRun, String> {
    let wells = list_subdirs(root).map_err(|e| e.to_string())?;
    run_classification(session, root, wells, dry_run)
}

fn run_classification(
    session: &Session,
    root: &Path,
    wells: Vec<String>,
    dry_run: bool,
) -> Result<ClassificationRun, String> {
    let ctx = session.context(dry_run);
    let dry_run = ctx.organizer.is_dry_run();
    if dry_run {
        OutputFormatter::dry_run_notice("Nothing will be moved and no report will be written.");
    }
    OutputFormatter::info("\nClassification is starting...");
    info!(root = %root.display(), wells = wells.len(), dry_run, "classification run");

    let mut report = ReportAccumulator::new();
    let progress = (wells.len() > 1).then(|| OutputFormatter::create_progress_bar(wells.len() as u64));

    let result = classify_wells(root, &wells, &ctx, &mut report, |summary| {
        let line = format!(
            "# {} WELL # {} datapacks, {} duplicates moved, {} classified, {} available",
            summary.well.to_uppercase(),
            summary.datapacks,
            summary.counts.duplicates,
            summary.counts.processed + summary.counts.flagged,
            summary.counts.available
        );
        match &progress {
            Some(pb) => {
                pb.println(line);
                pb.inc(1);
            }
            None => OutputFormatter::plain(&line),
        }
    });
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let wells = result.map_err(|e| format!("Classification stopped: {}", e))?;

    OutputFormatter::summary_table(&report.counts());

    let report_path = if dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
        None
    } else {
        OutputFormatter::success("All files have been classified.");
        let path = root.join(&session.config.report.file_name);
        report.export_sorted_csv(&path).map_err(|e| e.to_string())?;
        OutputFormatter::success(&format!("Report has been saved to {}", path.display()));
        Some(path)
    };

    Ok(ClassificationRun {
        report,
        wells,
        report_path,
    })
}

/// Flattens every classified datapack under `root`.
pub fn revert(root: &Path) -> Result<RevertReport, String> {
    OutputFormatter::info(&format!("Reverting classification in: {}", root.display()));
    let report = revert_classification(root).map_err(|e| format!("Revert stopped: {}", e))?;

    OutputFormatter::success("Classification has been reverted.");
    OutputFormatter::plain(&format!(
        "  Datapacks: {}\n  Restored: {}\n  Folders removed: {}",
        report.datapacks, report.restored_files, report.removed_dirs
    ));
    if report.is_clean() {
        return Ok(report);
    }
    for (original, backup) in &report.renamed_conflicts {
        OutputFormatter::warning(&format!(
            "{} was in the way and was renamed to {}",
            original.display(),
            backup.display()
        ));
    }
    Ok(report)
}

/// Regroups a by-datapack tree into a by-well tree.
pub fn reorganize(root: &Path) -> Result<ReorgReport, String> {
    let report =
        reorganize_datapacks_to_wells(root).map_err(|e| format!("Reorganize stopped: {}", e))?;
    OutputFormatter::success(&format!(
        "Directory has been reorganized ({} datapacks, {} well folders moved).",
        report.datapacks, report.wells_moved
    ));
    Ok(report)
}
