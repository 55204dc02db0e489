pub mod dtype;
pub mod field;
pub mod prelude;
pub mod schema;
