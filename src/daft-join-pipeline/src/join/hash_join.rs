use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use daft_schema::schema::{Schema, SchemaRef};

use super::{JoinCapability, JoinTableSide, PipelineShape, TableJoin, TotalsRow};

/// Build-then-probe join: the right side is materialized into a lookup table before any left
/// row is probed against it.
#[derive(Debug)]
pub struct HashJoin {
    table_join: TableJoin,
    filled: AtomicBool,
    totals: Option<Arc<TotalsRow>>,
}

impl HashJoin {
    pub fn new(table_join: TableJoin) -> Self {
        Self {
            table_join,
            filled: AtomicBool::new(false),
            totals: None,
        }
    }

    /// A join whose lookup table is populated up front, such as a storage-backed join table or a
    /// dictionary.
    pub fn new_filled(table_join: TableJoin) -> Self {
        Self {
            table_join,
            filled: AtomicBool::new(true),
            totals: None,
        }
    }

    #[must_use]
    pub fn with_totals(mut self, totals: TotalsRow) -> Self {
        self.totals = Some(Arc::new(totals));
        self
    }

    /// Records that the build side has been fully consumed. Must happen before the first probe.
    pub fn mark_filled(&self) {
        self.filled.store(true, Ordering::Release);
    }

    pub fn table_join(&self) -> &TableJoin {
        &self.table_join
    }
}

impl JoinCapability for HashJoin {
    fn name(&self) -> &'static str {
        "HashJoin"
    }

    fn pipeline_shape(&self) -> PipelineShape {
        PipelineShape::BuildThenProbe
    }

    fn is_filled(&self) -> bool {
        self.filled.load(Ordering::Acquire)
    }

    fn key_names(&self, side: JoinTableSide) -> Vec<String> {
        self.table_join.key_names(side).to_vec()
    }

    fn totals_row(&self) -> Option<Arc<TotalsRow>> {
        self.totals.clone()
    }

    fn merge_header(&self, left: &Schema) -> SchemaRef {
        self.table_join.merge_header(left)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_error::DaftResult;

    use super::HashJoin;
    use crate::join::{JoinCapability, PipelineShape, TableJoin};

    #[test]
    fn fill_transition_is_observed() -> DaftResult<()> {
        let join = Arc::new(HashJoin::new(TableJoin::new(
            vec!["id".to_string()],
            vec!["id".to_string()],
            vec![],
        )?));
        assert!(!join.is_filled());
        join.mark_filled();
        assert!(join.is_filled());
        assert_eq!(join.pipeline_shape(), PipelineShape::BuildThenProbe);
        assert!(join.as_sorting_join().is_none());
        Ok(())
    }
}
