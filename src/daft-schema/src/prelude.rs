pub use crate::{
    dtype::DataType,
    field::Field,
    schema::{Schema, SchemaRef},
};
