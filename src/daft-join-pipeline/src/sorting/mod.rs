mod step;

use common_daft_config::DaftExecutionConfig;
use common_display::utils::bytes_to_human_readable;
use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
pub use step::{SortMode, SortingStep};

#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{column_name} {}", if *descending { "DESC" } else { "ASC" })]
pub struct SortColumn {
    pub column_name: String,
    pub descending: bool,
    pub nulls_first: bool,
}

impl SortColumn {
    pub fn ascending<S: Into<String>>(column_name: S) -> Self {
        Self {
            column_name: column_name.into(),
            descending: false,
            nulls_first: false,
        }
    }
}

/// Ordered list of columns a stream is (or must be) sorted by.
#[derive(Clone, Debug, Default, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{}", columns.iter().join(", "))]
pub struct SortDescription {
    columns: Vec<SortColumn>,
}

impl SortDescription {
    pub fn new(columns: Vec<SortColumn>) -> Self {
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SortColumn> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column_name.as_str()).collect()
    }

    /// Whether `prefix` matches the leading columns of this description.
    pub fn has_prefix(&self, prefix: &Self) -> bool {
        prefix.len() <= self.len()
            && self
                .columns
                .iter()
                .zip(prefix.columns.iter())
                .all(|(a, b)| a == b)
    }
}

impl FromIterator<SortColumn> for SortDescription {
    fn from_iter<T: IntoIterator<Item = SortColumn>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Resource limits handed to the sort operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortSettings {
    pub max_block_size: usize,
    pub max_bytes_before_remerge: usize,
    pub remerge_lowered_memory_bytes_ratio: f64,
    pub max_bytes_before_external_sort: usize,
    pub min_free_disk_space: usize,
}

impl SortSettings {
    pub fn external_sort_enabled(&self) -> bool {
        self.max_bytes_before_external_sort > 0
    }

    pub(crate) fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![format!("Max block size = {}", self.max_block_size)];
        res.push(format!(
            "Max bytes before remerge = {}",
            bytes_to_human_readable(self.max_bytes_before_remerge)
        ));
        if self.external_sort_enabled() {
            res.push(format!(
                "Max bytes before external sort = {}",
                bytes_to_human_readable(self.max_bytes_before_external_sort)
            ));
        }
        res
    }
}

impl From<&DaftExecutionConfig> for SortSettings {
    fn from(cfg: &DaftExecutionConfig) -> Self {
        Self {
            max_block_size: cfg.max_block_size,
            max_bytes_before_remerge: cfg.max_bytes_before_remerge_sort,
            remerge_lowered_memory_bytes_ratio: cfg.remerge_sort_lowered_memory_bytes_ratio,
            max_bytes_before_external_sort: cfg.max_bytes_before_external_sort,
            min_free_disk_space: cfg.min_free_disk_space,
        }
    }
}

impl Default for SortSettings {
    fn default() -> Self {
        Self::from(&DaftExecutionConfig::default())
    }
}
