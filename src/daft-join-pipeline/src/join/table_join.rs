use std::{collections::BTreeSet, sync::Arc};

use common_error::{DaftError, DaftResult};
use daft_schema::{
    field::Field,
    schema::{Schema, SchemaRef},
};
use serde::{Deserialize, Serialize};

use super::JoinTableSide;
use crate::{Error, Result};

/// Analysed equi-join clause: the key columns of each side and the columns the join appends to
/// rows of the left side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableJoin {
    key_names_left: Vec<String>,
    key_names_right: Vec<String>,
    columns_added_by_join: Vec<Field>,
}

impl TableJoin {
    pub fn new(
        key_names_left: Vec<String>,
        key_names_right: Vec<String>,
        columns_added_by_join: Vec<Field>,
    ) -> DaftResult<Self> {
        if key_names_left.len() != key_names_right.len() {
            return Err(DaftError::ValueError(format!(
                "Join key lists must have the same length, got {} left keys and {} right keys",
                key_names_left.len(),
                key_names_right.len()
            )));
        }
        Ok(Self {
            key_names_left,
            key_names_right,
            columns_added_by_join,
        })
    }

    pub fn key_names(&self, side: JoinTableSide) -> &[String] {
        match side {
            JoinTableSide::Left => &self.key_names_left,
            JoinTableSide::Right => &self.key_names_right,
        }
    }

    pub fn columns_added_by_join(&self) -> &[Field] {
        &self.columns_added_by_join
    }

    /// Left header followed by every added column the left side does not already carry.
    pub fn merge_header(&self, left: &Schema) -> SchemaRef {
        let added = self.columns_added_by_join.iter().cloned().collect::<Schema>();
        Arc::new(left.non_distinct_union(&added))
    }

    /// Reorders both key lists in lockstep: position `i` takes the key pair at
    /// `permutation[i]`.
    pub fn permute_keys(&mut self, permutation: &[usize]) -> Result<()> {
        if permutation.len() != self.key_names_left.len() {
            return Err(Error::InvalidPermutation {
                reason: format!(
                    "expected {} positions, got {}",
                    self.key_names_left.len(),
                    permutation.len()
                ),
            });
        }
        let unique = permutation.iter().copied().collect::<BTreeSet<_>>();
        if unique.len() != permutation.len() {
            return Err(Error::InvalidPermutation {
                reason: "permutation is not unique".to_string(),
            });
        }
        if unique.iter().any(|&i| i >= permutation.len()) {
            return Err(Error::InvalidPermutation {
                reason: "permutation is not complete".to_string(),
            });
        }

        self.key_names_left = permutation
            .iter()
            .map(|&i| self.key_names_left[i].clone())
            .collect();
        self.key_names_right = permutation
            .iter()
            .map(|&i| self.key_names_right[i].clone())
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common_error::DaftResult;
    use daft_schema::{dtype::DataType, field::Field, schema::Schema};
    use rstest::rstest;

    use super::TableJoin;
    use crate::{join::JoinTableSide, ErrorKind};

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_header_appends_added_columns() -> DaftResult<()> {
        let join = TableJoin::new(
            names(&["id"]),
            names(&["id"]),
            vec![
                Field::new("id", DataType::Int64),
                Field::new("amount", DataType::Int64),
            ],
        )?;
        let left = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ])?;
        assert_eq!(join.merge_header(&left).names(), names(&["id", "name", "amount"]));
        Ok(())
    }

    #[test]
    fn mismatched_key_lists_rejected() {
        assert!(TableJoin::new(names(&["a", "b"]), names(&["a"]), vec![]).is_err());
    }

    #[test]
    fn permute_keys_moves_pairs_together() -> DaftResult<()> {
        let mut join = TableJoin::new(names(&["a", "b", "c"]), names(&["x", "y", "z"]), vec![])?;
        join.permute_keys(&[2, 0, 1])?;
        assert_eq!(join.key_names(JoinTableSide::Left), names(&["c", "a", "b"]));
        assert_eq!(join.key_names(JoinTableSide::Right), names(&["z", "x", "y"]));
        Ok(())
    }

    #[rstest]
    #[case::too_short(vec![0, 1])]
    #[case::duplicate(vec![0, 0, 1])]
    #[case::out_of_range(vec![0, 1, 3])]
    fn invalid_permutations_rejected(#[case] permutation: Vec<usize>) -> DaftResult<()> {
        let mut join = TableJoin::new(names(&["a", "b", "c"]), names(&["x", "y", "z"]), vec![])?;
        let err = join.permute_keys(&permutation).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert_eq!(join.key_names(JoinTableSide::Left), names(&["a", "b", "c"]));
        Ok(())
    }
}
