//! Data structures and schema resolution for DE result tables.

mod record;
pub mod resolve;

pub use record::{FeatureRecord, FeatureTable};
pub use resolve::{resolve_columns, table_from_reader, ColumnMap};
