mod full_sorting_merge_join;
mod hash_join;
mod table_join;
mod totals;

use std::{fmt, sync::Arc};

use daft_schema::schema::{Schema, SchemaRef};
use derive_more::Display;
pub use full_sorting_merge_join::FullSortingMergeJoin;
pub use hash_join::HashJoin;
use serde::{Deserialize, Serialize};
pub use table_join::TableJoin;
pub use totals::{LiteralValue, TotalsRow};

use crate::sorting::{SortDescription, SortSettings};

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinTableSide {
    #[display("left")]
    Left,
    #[display("right")]
    Right,
}

/// Physical shape of the pipeline a join algorithm needs.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineShape {
    /// Both inputs are consumed incrementally, in lockstep, under a shared sort order.
    StreamingMerge,
    /// The right input is fully materialized before any left row is probed against it.
    BuildThenProbe,
}

/// Read-only view of a join algorithm, as seen by the steps that lower it into a pipeline.
///
/// Implementations are shared between every step that references the same join, so all
/// methods take `&self` and must be free of observable side effects.
pub trait JoinCapability: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn pipeline_shape(&self) -> PipelineShape;

    /// Whether the in-memory join structure is already built.
    fn is_filled(&self) -> bool;

    fn key_names(&self, side: JoinTableSide) -> Vec<String>;

    fn totals_row(&self) -> Option<Arc<TotalsRow>>;

    /// Header produced by joining rows of `left` against this join.
    fn merge_header(&self, left: &Schema) -> SchemaRef;

    /// The sort-requiring view of this join, if its input must be sorted on the join keys.
    fn as_sorting_join(self: Arc<Self>) -> Option<Arc<dyn SortingJoin>> {
        None
    }

    fn multiline_display(&self) -> Vec<String> {
        vec![
            format!("{}: Shape = {}", self.name(), self.pipeline_shape()),
            format!(
                "Left on = {}",
                self.key_names(JoinTableSide::Left).join(", ")
            ),
            format!(
                "Right on = {}",
                self.key_names(JoinTableSide::Right).join(", ")
            ),
        ]
    }
}

/// Join algorithms whose inputs must arrive sorted on the join keys.
pub trait SortingJoin: JoinCapability {
    fn sort_settings(&self) -> SortSettings;

    /// Leading part of the key order that `side` is already known to be sorted by.
    /// Empty when nothing is known.
    fn prefix_sort_description(&self, side: JoinTableSide) -> SortDescription;
}

pub type JoinRef = Arc<dyn JoinCapability>;
