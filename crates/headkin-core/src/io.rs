//! Recording input and tensor output
//!
//! - [`ImpactTable`]: a numeric CSV recording with a header row. Column 0 is
//!   time in seconds; the remaining columns are sensor channels.
//! - [`TensorSink`]: destination for augmented tensors, grouped per recording.
//! - [`JsonTensorStore`]: a sink backed by one JSON document:
//!
//! ```text
//!   {
//!     "<group>": {
//!       "perm_1": { "shape": [1, C, L], "permutation": [0, 1, 2], "data": [[...], ...] },
//!       ...
//!     }
//!   }
//! ```

use crate::pipeline::AugmentedTensor;
use crate::types::{KinematicProfile, PreprocessError, PreprocessResult, TimeVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Split CSV text into records of trimmed fields.
///
/// Double-quoted fields may contain commas and `""` escapes. Blank lines are
/// skipped.
pub(crate) fn parse_records(text: &str) -> PreprocessResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match (c, quoted) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                ('"', _) => quoted = !quoted,
                (',', false) => fields.push(std::mem::take(&mut field).trim().to_string()),
                _ => field.push(c),
            }
        }
        if quoted {
            return Err(PreprocessError::Parse(format!(
                "line {}: unterminated quoted field",
                line_no + 1
            )));
        }
        fields.push(field.trim().to_string());
        records.push(fields);
    }
    Ok(records)
}

/// Numeric table loaded from a recording CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactTable {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ImpactTable {
    /// Read and parse a CSV file.
    pub fn from_path(path: &Path) -> PreprocessResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PreprocessError::Io(format!("{}: {}", path.display(), e)))?;
        Self::parse(&text)
            .map_err(|e| PreprocessError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Parse CSV text: one header row, then numeric rows of the same width.
    pub fn parse(text: &str) -> PreprocessResult<Self> {
        let mut records = parse_records(text)?.into_iter();
        let headers = records
            .next()
            .ok_or_else(|| PreprocessError::Parse("empty table".to_string()))?;
        let width = headers.len();
        let mut columns = vec![Vec::new(); width];

        for (row, record) in records.enumerate() {
            if record.len() != width {
                return Err(PreprocessError::Parse(format!(
                    "row {} has {} fields, header has {}",
                    row + 1,
                    record.len(),
                    width
                )));
            }
            for (col, field) in record.iter().enumerate() {
                let value: f64 = field.parse().map_err(|_| {
                    PreprocessError::Parse(format!(
                        "row {}, column '{}': '{}' is not a number",
                        row + 1,
                        headers[col],
                        field
                    ))
                })?;
                columns[col].push(value);
            }
        }
        Ok(Self { headers, columns })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> PreprocessResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PreprocessError::Parse(format!("no column named '{}'", name)))
    }

    pub fn column(&self, index: usize) -> PreprocessResult<&[f64]> {
        self.columns.get(index).map(Vec::as_slice).ok_or_else(|| {
            PreprocessError::InvalidShape(format!(
                "column {} out of range for {} columns",
                index,
                self.columns.len()
            ))
        })
    }

    /// Column 0 as a time axis.
    pub fn time(&self) -> PreprocessResult<TimeVector> {
        TimeVector::new(self.column(0)?.to_vec())
    }

    /// Profile built from the given column positions, in order.
    pub fn profile_by_indices(&self, indices: &[usize]) -> PreprocessResult<KinematicProfile> {
        let columns = indices
            .iter()
            .map(|&i| self.column(i))
            .collect::<PreprocessResult<Vec<_>>>()?;
        KinematicProfile::from_channels(&columns)
    }

    /// Profile built from the named columns, in order.
    pub fn profile_by_names<S: AsRef<str>>(&self, names: &[S]) -> PreprocessResult<KinematicProfile> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n.as_ref()))
            .collect::<PreprocessResult<Vec<_>>>()?;
        self.profile_by_indices(&indices)
    }
}

/// Destination for augmented tensors.
pub trait TensorSink {
    /// Store all tensors of one recording under `group`, replacing any
    /// previous group of that name.
    fn write_group(&mut self, group: &str, tensors: &[AugmentedTensor]) -> PreprocessResult<()>;
}

/// One persisted tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTensor {
    /// `[1, C, L]`
    pub shape: [usize; 3],
    pub permutation: [usize; 3],
    /// Channels-first samples, `C` rows of `L`
    pub data: Vec<Vec<f64>>,
}

impl From<&AugmentedTensor> for StoredTensor {
    fn from(t: &AugmentedTensor) -> Self {
        Self {
            shape: t.shape(),
            permutation: t.permutation,
            data: t.channels_first(),
        }
    }
}

type Groups = BTreeMap<String, BTreeMap<String, StoredTensor>>;

/// Tensor store persisted as a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonTensorStore {
    path: PathBuf,
    groups: Groups,
}

impl JsonTensorStore {
    /// Open `path`, loading existing groups if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> PreprocessResult<Self> {
        let path = path.into();
        let groups = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| PreprocessError::Io(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&text)
                .map_err(|e| PreprocessError::Parse(format!("{}: {}", path.display(), e)))?
        } else {
            Groups::new()
        };
        Ok(Self { path, groups })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Group names in sorted order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn get(&self, group: &str, dataset: &str) -> Option<&StoredTensor> {
        self.groups.get(group)?.get(dataset)
    }

    /// Write the document to disk.
    pub fn save(&self) -> PreprocessResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string(&self.groups)
            .map_err(|e| PreprocessError::Io(format!("serializing tensors: {}", e)))?;
        std::fs::write(&self.path, text)
            .map_err(|e| PreprocessError::Io(format!("{}: {}", self.path.display(), e)))
    }
}

impl TensorSink for JsonTensorStore {
    fn write_group(&mut self, group: &str, tensors: &[AugmentedTensor]) -> PreprocessResult<()> {
        let datasets = tensors
            .iter()
            .map(|t| (t.dataset.clone(), StoredTensor::from(t)))
            .collect();
        if self.groups.insert(group.to_string(), datasets).is_some() {
            tracing::warn!(group, "group already exists, overwriting");
        }
        tracing::debug!(group, datasets = tensors.len(), "stored group");
        Ok(())
    }
}
