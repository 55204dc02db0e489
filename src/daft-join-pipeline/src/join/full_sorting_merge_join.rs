use std::sync::Arc;

use daft_schema::schema::{Schema, SchemaRef};
use parking_lot::RwLock;

use super::{JoinCapability, JoinTableSide, PipelineShape, SortingJoin, TableJoin, TotalsRow};
use crate::{
    sorting::{SortDescription, SortSettings},
    Result,
};

/// Merge join over inputs sorted on the join keys. Both sides stream through one merging
/// transform in lockstep.
///
/// The key order and the per-side known sort prefixes may be adjusted by the optimizer while the
/// join is shared between steps, so they sit behind locks.
#[derive(Debug)]
pub struct FullSortingMergeJoin {
    table_join: RwLock<TableJoin>,
    sort_settings: SortSettings,
    left_prefix_sort_description: RwLock<SortDescription>,
    right_prefix_sort_description: RwLock<SortDescription>,
    totals: Option<Arc<TotalsRow>>,
}

impl FullSortingMergeJoin {
    pub fn new(table_join: TableJoin, sort_settings: SortSettings) -> Self {
        Self {
            table_join: RwLock::new(table_join),
            sort_settings,
            left_prefix_sort_description: RwLock::new(SortDescription::default()),
            right_prefix_sort_description: RwLock::new(SortDescription::default()),
            totals: None,
        }
    }

    #[must_use]
    pub fn with_totals(mut self, totals: TotalsRow) -> Self {
        self.totals = Some(Arc::new(totals));
        self
    }

    /// Reorders the join keys of both sides, e.g. so that they line up with an order an input is
    /// already sorted in.
    pub fn permute_keys(&self, permutation: &[usize]) -> Result<()> {
        self.table_join.write().permute_keys(permutation)
    }

    pub fn set_prefix_sort_description(&self, prefix: SortDescription, side: JoinTableSide) {
        match side {
            JoinTableSide::Left => *self.left_prefix_sort_description.write() = prefix,
            JoinTableSide::Right => *self.right_prefix_sort_description.write() = prefix,
        }
    }
}

impl JoinCapability for FullSortingMergeJoin {
    fn name(&self) -> &'static str {
        "FullSortingMergeJoin"
    }

    fn pipeline_shape(&self) -> PipelineShape {
        PipelineShape::StreamingMerge
    }

    fn is_filled(&self) -> bool {
        false
    }

    fn key_names(&self, side: JoinTableSide) -> Vec<String> {
        self.table_join.read().key_names(side).to_vec()
    }

    fn totals_row(&self) -> Option<Arc<TotalsRow>> {
        self.totals.clone()
    }

    fn merge_header(&self, left: &Schema) -> SchemaRef {
        self.table_join.read().merge_header(left)
    }

    fn as_sorting_join(self: Arc<Self>) -> Option<Arc<dyn SortingJoin>> {
        Some(self)
    }
}

impl SortingJoin for FullSortingMergeJoin {
    fn sort_settings(&self) -> SortSettings {
        self.sort_settings.clone()
    }

    fn prefix_sort_description(&self, side: JoinTableSide) -> SortDescription {
        match side {
            JoinTableSide::Left => self.left_prefix_sort_description.read().clone(),
            JoinTableSide::Right => self.right_prefix_sort_description.read().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_error::DaftResult;

    use super::FullSortingMergeJoin;
    use crate::{
        join::{JoinCapability, JoinRef, JoinTableSide, PipelineShape, SortingJoin, TableJoin},
        sorting::{SortColumn, SortDescription, SortSettings},
    };

    fn make_join() -> DaftResult<FullSortingMergeJoin> {
        Ok(FullSortingMergeJoin::new(
            TableJoin::new(
                vec!["a".to_string(), "b".to_string()],
                vec!["x".to_string(), "y".to_string()],
                vec![],
            )?,
            SortSettings::default(),
        ))
    }

    #[test]
    fn exposes_sorting_view_through_join_ref() -> DaftResult<()> {
        let join: JoinRef = Arc::new(make_join()?);
        assert_eq!(join.pipeline_shape(), PipelineShape::StreamingMerge);
        assert!(!join.is_filled());
        let sorting = join.as_sorting_join().expect("merge join sorts its inputs");
        assert_eq!(sorting.key_names(JoinTableSide::Right), vec!["x", "y"]);
        assert!(sorting.prefix_sort_description(JoinTableSide::Left).is_empty());
        Ok(())
    }

    #[test]
    fn prefix_and_permutation_are_per_side() -> DaftResult<()> {
        let join = make_join()?;
        let prefix = SortDescription::new(vec![SortColumn::ascending("b")]);
        join.set_prefix_sort_description(prefix.clone(), JoinTableSide::Left);
        join.permute_keys(&[1, 0])?;

        assert_eq!(join.key_names(JoinTableSide::Left), vec!["b", "a"]);
        assert_eq!(join.key_names(JoinTableSide::Right), vec!["y", "x"]);
        let sorting = Arc::new(join);
        assert_eq!(sorting.prefix_sort_description(JoinTableSide::Left), prefix);
        assert!(sorting
            .prefix_sort_description(JoinTableSide::Right)
            .is_empty());
        Ok(())
    }
}
