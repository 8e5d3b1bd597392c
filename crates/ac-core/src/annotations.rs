use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::AnnotationsConfig;
use crate::error::CoreError;

/// One manifest row: a relative audio path and its class label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationRow {
    /// Audio path, relative to `dataset.folder_path`.
    pub path: String,
    /// Raw label as written in the manifest.
    pub label: String,
}

/// Rows of one CSV manifest, in file order.
#[derive(Clone, Debug)]
pub struct Manifest {
    /// File the rows came from.
    pub source: PathBuf,
    /// Rows.
    pub rows: Vec<AnnotationRow>,
}

impl Manifest {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Train and test manifests of a dataset.
#[derive(Clone, Debug)]
pub struct Annotations {
    pub train: Manifest,
    pub test: Manifest,
}

/// Read a CSV manifest with a header row.
///
/// Only the `input` and `target` columns are kept; other columns are ignored.
/// Referenced audio files are not checked here.
///
/// # Errors
/// Returns an error if the file cannot be read, a column is missing,
/// or a record is malformed.
pub fn read_manifest(path: &Path, input: &str, target: &str) -> Result<Manifest> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Opening manifest {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Reading headers of {}", path.display()))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CoreError::MissingColumn {
                path: path.display().to_string(),
                column: name.to_string(),
            })
    };
    let input_idx = column(input)?;
    let target_idx = column(target)?;

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("{} row {row_no}", path.display()))?;
        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
        rows.push(AnnotationRow {
            path: field(input_idx),
            label: field(target_idx),
        });
    }

    log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(Manifest {
        source: path.to_path_buf(),
        rows,
    })
}

/// Read the train and test manifests named by the configuration.
///
/// # Errors
/// Propagates [`read_manifest`] failures for either file.
pub fn read_annotations(config: &AnnotationsConfig) -> Result<Annotations> {
    let train = read_manifest(&config.train_csv, &config.input, &config.target)?;
    let test = read_manifest(&config.test_csv, &config.input, &config.target)?;
    Ok(Annotations { train, test })
}

/// Number of distinct labels across train ∪ test.
#[must_use]
pub fn count_classes(annotations: &Annotations) -> usize {
    LabelIndex::from_annotations(annotations).len()
}

/// Sorted set of class labels, mapping each label to a class index.
///
/// When every label parses as an integer the labels are compared as numbers
/// ("7" and "07" are the same class, "10" sorts after "9"), so a dataset
/// labelled `0..n` keeps its own numbering. Otherwise labels sort as strings.
///
/// # Example
/// ```
/// use ac_core::annotations::LabelIndex;
/// let index = LabelIndex::from_labels(["dog", "cat", "dog", "bird"]);
/// assert_eq!(index.len(), 3);
/// assert_eq!(index.index_of("cat"), Some(1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabelIndex {
    /// All labels are integers.
    Numeric(Vec<i64>),
    /// Free-form labels.
    Text(Vec<String>),
}

impl LabelIndex {
    /// Build from any sequence of labels.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        let numeric: Option<Vec<i64>> = labels.iter().map(|l| l.trim().parse().ok()).collect();
        match numeric {
            Some(mut values) => {
                values.sort_unstable();
                values.dedup();
                Self::Numeric(values)
            }
            None => {
                let mut values: Vec<String> = labels.iter().map(|l| (*l).to_string()).collect();
                values.sort_unstable();
                values.dedup();
                Self::Text(values)
            }
        }
    }

    /// Build from the union of the train and test manifests.
    #[must_use]
    pub fn from_annotations(annotations: &Annotations) -> Self {
        Self::from_labels(
            annotations
                .train
                .rows
                .iter()
                .chain(&annotations.test.rows)
                .map(|r| r.label.as_str()),
        )
    }

    /// Class index of `label`, `None` if it was never seen.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        match self {
            Self::Numeric(values) => {
                let v: i64 = label.trim().parse().ok()?;
                values.binary_search(&v).ok()
            }
            Self::Text(values) => values.binary_search_by(|p| p.as_str().cmp(label)).ok(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels in class-index order, for logging.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        match self {
            Self::Numeric(v) => v.iter().map(ToString::to_string).collect(),
            Self::Text(v) => v.clone(),
        }
    }
}
