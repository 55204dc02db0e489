use serde::{Deserialize, Serialize};

/// Configurations for Daft to use while compiling a plan into an executable pipeline.
///  Note that this should be immutable for a given end-to-end execution of a plan.
///
/// Pipeline compilation entails:
/// 1. Choosing how many parallel streams each pipeline stage runs with
/// 2. Sizing the blocks that flow between processors
/// 3. Deciding how joins and their sort preparation are laid out
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaftExecutionConfig {
    pub max_block_size: usize,
    pub max_streams: usize,
    pub join_keep_left_read_in_order: bool,
    pub max_bytes_before_remerge_sort: usize,
    pub remerge_sort_lowered_memory_bytes_ratio: f64,
    pub max_bytes_before_external_sort: usize,
    pub min_free_disk_space: usize,
}

impl Default for DaftExecutionConfig {
    fn default() -> Self {
        Self {
            max_block_size: 65409,
            max_streams: default_max_streams(),
            join_keep_left_read_in_order: false,
            max_bytes_before_remerge_sort: 1024 * 1024 * 1024, // 1GiB
            remerge_sort_lowered_memory_bytes_ratio: 2.0,
            max_bytes_before_external_sort: 0, // disabled
            min_free_disk_space: 0,
        }
    }
}

fn default_max_streams() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl DaftExecutionConfig {
    #[must_use]
    pub fn with_max_streams(mut self, max_streams: usize) -> Self {
        self.max_streams = max_streams.max(1);
        self
    }

    #[must_use]
    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    #[must_use]
    pub fn with_join_keep_left_read_in_order(mut self, keep: bool) -> Self {
        self.join_keep_left_read_in_order = keep;
        self
    }
}
