use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Column types that can flow between plan steps.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    Boolean,
    Int32,
    Int64,
    UInt64,
    Float64,
    Utf8,
    Date,
    #[display("Nullable[{_0}]")]
    Nullable(Box<DataType>),
}

impl DataType {
    /// Wrap this type so it can hold nulls. Already-nullable types are returned unchanged.
    #[must_use]
    pub fn to_nullable(&self) -> Self {
        match self {
            Self::Null | Self::Nullable(_) => self.clone(),
            other => Self::Nullable(Box::new(other.clone())),
        }
    }
}
