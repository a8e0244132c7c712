//! geochem-classifier - classification assistant for geochem datapacks
//!
//! This library sorts the files of `<well>/<datapack>/` trees into review
//! folders using a curated table of file-name rules, moves repeated file
//! names aside, writes a tracking-sheet report, and can revert a
//! classification or regroup a tree laid out by datapack into one laid out
//! by well.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod file_organizer;
pub mod output;
pub mod reorg;
pub mod report;
pub mod revert;
pub mod rules;

pub use classifier::{ClassifyContext, ReviewFlag, WellSummary, classify_well, classify_wells};
pub use config::{AppConfig, CompiledFilters, ConfigError};
pub use duplicates::separate_duplicates;
pub use file_organizer::{FileOrganizer, OrganizeError};
pub use report::{FileRecord, Outcome, OutcomeCounts, ReportAccumulator};
pub use rules::{Rule, RuleTable, RulesError};

pub use cli::{Cli, run_cli};
