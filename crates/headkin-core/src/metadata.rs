//! Impact label lookup
//!
//! Recordings are named `<team>_<id>_<suffix>[_<instance>].csv`, for example
//! `204_A3b_g12_1.csv`. Labels live in per-suffix metadata tables:
//!
//! ```text
//!   <dir>/metadata_g12.csv
//!   <dir>/metadata_g12_1.csv
//!   <dir>/metadata_g12_2.csv      scanned until the first missing number
//! ```
//!
//! Each table has at least `team_code`, `id` and `pred` columns, optionally
//! `ubric` and `location`. The `instance` counter picks the n-th row with the
//! recording's team and id. A `pred_true` or `pred_false` directory anywhere in
//! the recording's path restricts the search to rows with that label.

use crate::io::parse_records;
use crate::types::{PreprocessError, PreprocessResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Identifiers parsed from a recording's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactFileName {
    pub team_code: String,
    pub id: String,
    /// `g<digits>` or `tw<digits>`
    pub suffix: String,
    pub instance: usize,
    /// Label restriction from a `pred_true` / `pred_false` directory.
    pub pred_filter: Option<bool>,
}

impl ImpactFileName {
    pub fn parse(path: &Path) -> PreprocessResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PreprocessError::Parse(format!("{}: no file name", path.display())))?;
        let fail = || {
            PreprocessError::Parse(format!(
                "{} does not match <team>_<id>_<suffix>[_<instance>].csv",
                name
            ))
        };

        let stem = name.strip_suffix(".csv").ok_or_else(fail)?;
        let tokens: Vec<&str> = stem.split('_').collect();
        if tokens.len() < 3 || !is_digits(tokens[0]) {
            return Err(fail());
        }

        let last = tokens.len() - 1;
        // The id is greedy: prefer reading the last token as the suffix.
        let (suffix_at, instance) = if is_suffix(tokens[last]) {
            (last, 0)
        } else if tokens.len() >= 4 && is_digits(tokens[last]) && is_suffix(tokens[last - 1]) {
            let instance = tokens[last].parse().map_err(|_| fail())?;
            (last - 1, instance)
        } else {
            return Err(fail());
        };

        let id = tokens[1..suffix_at].join("_");
        if id.is_empty() || !id.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(fail());
        }

        Ok(Self {
            team_code: tokens[0].to_string(),
            id,
            suffix: tokens[suffix_at].to_string(),
            instance,
            pred_filter: pred_filter(path),
        })
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_suffix(s: &str) -> bool {
    s.strip_prefix("tw")
        .or_else(|| s.strip_prefix('g'))
        .map_or(false, is_digits)
}

fn pred_filter(path: &Path) -> Option<bool> {
    path.components().find_map(|c| match c.as_os_str().to_str() {
        Some("pred_true") => Some(true),
        Some("pred_false") => Some(false),
        _ => None,
    })
}

/// A matched metadata row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub pred: bool,
    pub ubric: Option<f64>,
    pub location: Option<String>,
    /// Table the row came from
    pub source: PathBuf,
}

/// Looks up labels in a metadata directory.
#[derive(Debug, Clone)]
pub struct MetadataLinker {
    dir: PathBuf,
}

impl MetadataLinker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Tables that may hold `suffix`, in search order.
    pub fn candidate_tables(&self, suffix: &str) -> Vec<PathBuf> {
        let mut tables = Vec::new();
        let base = self.dir.join(format!("metadata_{}.csv", suffix));
        if base.exists() {
            tables.push(base);
        }
        for i in 1.. {
            let numbered = self.dir.join(format!("metadata_{}_{}.csv", suffix, i));
            if !numbered.exists() {
                break;
            }
            tables.push(numbered);
        }
        tables
    }

    /// Metadata row for a recording path.
    pub fn lookup(&self, impact_path: &Path) -> PreprocessResult<MetadataEntry> {
        let name = ImpactFileName::parse(impact_path)?;
        self.lookup_name(&name)
    }

    /// Metadata row for already-parsed identifiers.
    pub fn lookup_name(&self, name: &ImpactFileName) -> PreprocessResult<MetadataEntry> {
        for table in self.candidate_tables(&name.suffix) {
            let text = std::fs::read_to_string(&table)
                .map_err(|e| PreprocessError::Io(format!("{}: {}", table.display(), e)))?;
            let rows = matching_rows(&text, name)
                .map_err(|e| PreprocessError::Parse(format!("{}: {}", table.display(), e)))?;
            if let Some(mut entry) = rows.into_iter().nth(name.instance) {
                tracing::debug!(table = %table.display(), id = %name.id, "metadata matched");
                entry.source = table;
                return Ok(entry);
            }
        }
        Err(PreprocessError::MetadataNotFound(format!(
            "instance {} of team {} id {} (suffix {}, pred filter {:?}) in {}",
            name.instance,
            name.team_code,
            name.id,
            name.suffix,
            name.pred_filter,
            self.dir.display()
        )))
    }
}

fn matching_rows(text: &str, name: &ImpactFileName) -> PreprocessResult<Vec<MetadataEntry>> {
    let mut records = parse_records(text)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| PreprocessError::Parse("empty metadata table".to_string()))?;
    let col = |n: &str| header.iter().position(|h| h == n);
    let missing = |n: &str| PreprocessError::Parse(format!("missing '{}' column", n));
    let team_col = col("team_code").ok_or_else(|| missing("team_code"))?;
    let id_col = col("id").ok_or_else(|| missing("id"))?;
    let pred_col = col("pred").ok_or_else(|| missing("pred"))?;
    let ubric_col = col("ubric");
    let location_col = col("location");

    let mut entries = Vec::new();
    for (row, record) in records.enumerate() {
        let field = |i: usize| record.get(i).map(String::as_str).unwrap_or("");
        if field(team_col) != name.team_code || field(id_col) != name.id {
            continue;
        }
        let pred = parse_bool(field(pred_col)).ok_or_else(|| {
            PreprocessError::Parse(format!("row {}: bad pred '{}'", row + 1, field(pred_col)))
        })?;
        if name.pred_filter.map_or(false, |want| want != pred) {
            continue;
        }
        let ubric = match ubric_col.map(field).filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<f64>().map_err(|_| {
                PreprocessError::Parse(format!("row {}: bad ubric '{}'", row + 1, s))
            })?),
            None => None,
        };
        entries.push(MetadataEntry {
            pred,
            ubric,
            location: location_col
                .map(field)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            source: PathBuf::new(),
        });
    }
    Ok(entries)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" => Some(true),
        "false" | "0" | "0.0" => Some(false),
        _ => None,
    }
}
