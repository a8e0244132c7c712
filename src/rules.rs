//! Classification rules loaded from the curated dictionary file.
//!
//! The dictionary is a comma-separated table with a header row and the
//! columns `key,category,order`:
//!
//! ```text
//! key,category,order
//! GCR,TOC,0
//! PYRO,ROCK_EVAL,0
//! _RPT,PDF,0
//! LAB,LAB_REPORT,1
//! ```
//!
//! Rules sharing an `order` form a group. Groups are tried from the lowest
//! order up and, inside a group, keys are tried in file order. The category
//! `PDF` is reserved: a file whose first match in a group is a `PDF` rule is
//! not classified by that group, and the scan moves on to the next group.

use csv::{ReaderBuilder, Trim};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Category reserved for documents that must never be auto-classified.
pub const PDF_SENTINEL: &str = "PDF";

/// Errors raised while loading the rules file.
#[derive(Debug)]
pub enum RulesError {
    /// The rules file does not exist.
    NotFound(PathBuf),
    /// The rules file exists but could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// A row could not be turned into a rule.
    Parse { line: u64, reason: String },
}

impl std::fmt::Display for RulesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulesError::NotFound(path) => {
                write!(f, "Classification dictionary not found: {}", path.display())
            }
            RulesError::Io { path, source } => {
                write!(f, "Could not read {}: {}", path.display(), source)
            }
            RulesError::Parse { line, reason } => {
                write!(f, "Invalid classification rule on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for RulesError {}

/// A single substring rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Priority group; lower groups are tried first.
    pub order: u32,
    /// Substring looked up in the uppercased file name.
    pub key: String,
    /// Category label, or [`PDF_SENTINEL`].
    pub category: String,
}

impl Rule {
    pub fn new(key: &str, category: &str, order: u32) -> Self {
        Self {
            order,
            key: key.to_string(),
            category: category.to_string(),
        }
    }
}

/// All rules sharing one priority order, in insertion order.
#[derive(Debug, Clone)]
pub struct RuleGroup {
    order: u32,
    rules: Vec<(String, String)>,
}

impl RuleGroup {
    pub fn order(&self) -> u32 {
        self.order
    }

    /// `(key, category)` pairs in the order they were first declared.
    pub fn rules(&self) -> &[(String, String)] {
        &self.rules
    }
}

/// The genuine (non-sentinel) rule that classified a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub order: u32,
    pub key: &'a str,
    pub category: &'a str,
}

/// Rules grouped by priority order.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    groups: BTreeMap<u32, RuleGroup>,
}

impl RuleTable {
    /// Loads the rules from a dictionary file.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::NotFound` if the file is missing and
    /// `RulesError::Parse` (with the 1-based line number) for a row that has
    /// the wrong number of columns, an empty key or category, or an order
    /// that is not a non-negative integer.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RulesError::NotFound(path.to_path_buf())
            } else {
                RulesError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);

        let mut table = RuleTable::default();
        for result in reader.records() {
            let record = result.map_err(|e| RulesError::Parse {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                reason: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() != 3 {
                return Err(RulesError::Parse {
                    line,
                    reason: format!("expected 3 columns (key,category,order), found {}", record.len()),
                });
            }

            let (key, category, order) = (&record[0], &record[1], &record[2]);
            if key.is_empty() {
                return Err(RulesError::Parse {
                    line,
                    reason: "empty key".to_string(),
                });
            }
            if category.is_empty() {
                return Err(RulesError::Parse {
                    line,
                    reason: "empty category".to_string(),
                });
            }
            let order: u32 = order.parse().map_err(|_| RulesError::Parse {
                line,
                reason: format!("order '{}' is not a non-negative integer", order),
            })?;

            table.insert(Rule::new(key, category, order));
        }

        debug!(path = %path.display(), rules = table.len(), "loaded classification rules");
        Ok(table)
    }

    /// Builds a table from rules given in declaration order.
    pub fn from_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        let mut table = RuleTable::default();
        for rule in rules {
            table.insert(rule);
        }
        table
    }

    /// Adds a rule. A key already present in its group keeps its position
    /// and takes the new category.
    fn insert(&mut self, rule: Rule) {
        let group = self.groups.entry(rule.order).or_insert_with(|| RuleGroup {
            order: rule.order,
            rules: Vec::new(),
        });
        let key = rule.key.to_uppercase();

        match group.rules.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = rule.category,
            None => group.rules.push((key, rule.category)),
        }
    }

    /// Groups in ascending priority order.
    pub fn groups_in_priority_order(&self) -> impl Iterator<Item = &RuleGroup> {
        self.groups.values()
    }

    /// Finds the rule that classifies `file_name`, if any.
    ///
    /// The first key of a group found in the uppercased name decides that
    /// group. A `PDF` decision voids the group and the next one is tried.
    pub fn find_match(&self, file_name: &str) -> Option<RuleMatch<'_>> {
        let upper = file_name.to_uppercase();

        for group in self.groups_in_priority_order() {
            let Some((key, category)) = group
                .rules
                .iter()
                .find(|(key, _)| upper.contains(key.as_str()))
            else {
                continue;
            };

            if category == PDF_SENTINEL {
                continue;
            }

            return Some(RuleMatch {
                order: group.order,
                key,
                category,
            });
        }

        None
    }

    /// Total number of distinct rules.
    pub fn len(&self) -> usize {
        self.groups.values().map(|g| g.rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
