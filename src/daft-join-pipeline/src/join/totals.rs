use daft_schema::{dtype::DataType, schema::Schema};
use derive_more::Display;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Display, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    #[display("Null")]
    Null,
    Boolean(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    #[display("\"{_0}\"")]
    Utf8(String),
}

impl LiteralValue {
    /// The value a column of `dtype` takes in a synthesized default row.
    pub fn default_for(dtype: &DataType) -> Self {
        match dtype {
            DataType::Null | DataType::Nullable(_) => Self::Null,
            DataType::Boolean => Self::Boolean(false),
            DataType::Int32 | DataType::Int64 | DataType::Date => Self::Int64(0),
            DataType::UInt64 => Self::UInt64(0),
            DataType::Float64 => Self::Float64(0.0),
            DataType::Utf8 => Self::Utf8(String::new()),
        }
    }
}

/// A single aggregate row carried alongside the data streams of a pipeline.
#[derive(Clone, Debug, Default, Display, PartialEq, Serialize, Deserialize)]
#[display("Totals({})", values.iter().map(|(k, v)| format!("{k}={v}")).join(", "))]
pub struct TotalsRow {
    values: IndexMap<String, LiteralValue>,
}

impl TotalsRow {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, LiteralValue)>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// A structurally valid row for `schema` holding each column's default value.
    pub fn default_for(schema: &Schema) -> Self {
        Self {
            values: schema
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), LiteralValue::default_for(&field.dtype)))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&LiteralValue> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use common_error::DaftResult;
    use daft_schema::{dtype::DataType, field::Field, schema::Schema};

    use super::{LiteralValue, TotalsRow};

    #[test]
    fn default_row_follows_schema() -> DaftResult<()> {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
            Field::new("score", DataType::Float64.to_nullable()),
        ])?;
        let row = TotalsRow::default_for(&schema);
        assert_eq!(row.len(), 3);
        assert_eq!(row.get("id"), Some(&LiteralValue::Int64(0)));
        assert_eq!(row.get("score"), Some(&LiteralValue::Null));
        assert_eq!(row.to_string(), r#"Totals(id=0, name="", score=Null)"#);
        Ok(())
    }
}
