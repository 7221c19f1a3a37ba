//! Database module for PostgreSQL connections, introspection and row decoding

pub mod connection;
pub mod schema;
pub mod values;

pub use connection::{with_connection, BoxFuture};
pub use schema::{ColumnRef, SchemaDescription, SchemaIntrospector};
pub use values::{row_to_map, RowMap};
