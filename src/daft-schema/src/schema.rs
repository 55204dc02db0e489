use std::sync::Arc;

use common_error::{DaftError, DaftResult};
use derive_more::Display;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::field::Field;

pub type SchemaRef = Arc<Schema>;

/// Ordered collection of uniquely named columns. Schemas are never mutated once shared;
/// every derivation produces a new value.
#[derive(Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[display("{{{}}}", fields.values().join(", "))]
pub struct Schema {
    #[serde(with = "indexmap::map::serde_seq")]
    pub fields: IndexMap<String, Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> DaftResult<Self> {
        let mut map = IndexMap::new();

        for f in fields {
            match map.entry(f.name.clone()) {
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(f);
                }
                indexmap::map::Entry::Occupied(entry) => {
                    return Err(DaftError::ValueError(format!(
                        "Attempting to make a Schema with duplicate field names: {}",
                        entry.key()
                    )));
                }
            }
        }

        Ok(Self { fields: map })
    }

    pub fn get_field(&self, name: &str) -> DaftResult<&Field> {
        match self.fields.get(name) {
            None => Err(DaftError::FieldNotFound(format!(
                "Column \"{}\" not found in schema: {:?}",
                name,
                self.fields.keys()
            ))),
            Some(val) => Ok(val),
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks that every name in `names` is a column of this schema.
    pub fn ensure_columns<S: AsRef<str>>(&self, names: &[S]) -> DaftResult<()> {
        let missing = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| !self.has_field(n))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DaftError::SchemaMismatch(format!(
                "Columns [{}] not found in schema {}",
                missing.join(", "),
                self
            )))
        }
    }

    /// Takes the non-distinct union of two schemas. If there are overlapping keys, the field
    /// from `self` wins and keeps its position.
    pub fn non_distinct_union(&self, other: &Self) -> Self {
        let mut fields = self.fields.clone();
        for (name, field) in &other.fields {
            fields.entry(name.clone()).or_insert_with(|| field.clone());
        }
        Self { fields }
    }
}

impl FromIterator<Field> for Schema {
    /// Builds a schema from fields, keeping the first field seen for any repeated name.
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        let mut fields = IndexMap::new();
        for f in iter {
            fields.entry(f.name.clone()).or_insert(f);
        }
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use common_error::{DaftError, DaftResult};

    use super::Schema;
    use crate::{dtype::DataType, field::Field};

    #[test]
    fn duplicate_names_rejected() {
        let res = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("id", DataType::Utf8),
        ]);
        assert!(matches!(res, Err(DaftError::ValueError(_))));
    }

    #[test]
    fn non_distinct_union_keeps_left() -> DaftResult<()> {
        let left = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ])?;
        let right = Schema::new(vec![
            Field::new("id", DataType::Int32),
            Field::new("amount", DataType::Int64),
        ])?;
        let merged = left.non_distinct_union(&right);
        assert_eq!(merged.names(), vec!["id", "name", "amount"]);
        assert_eq!(merged.get_field("id")?.dtype, DataType::Int64);
        Ok(())
    }

    #[test]
    fn display_and_serde() -> DaftResult<()> {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ])?;
        assert_eq!(schema.to_string(), "{id#Int64, name#Utf8}");
        let json = serde_json::to_string(&schema)?;
        let back: Schema = serde_json::from_str(&json)?;
        assert_eq!(back, schema);
        Ok(())
    }

    #[test]
    fn ensure_columns_reports_missing() -> DaftResult<()> {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64)])?;
        schema.ensure_columns(&["id"])?;
        let err = schema.ensure_columns(&["id", "amount"]).unwrap_err();
        assert!(matches!(err, DaftError::SchemaMismatch(msg) if msg.contains("amount")));
        Ok(())
    }
}
