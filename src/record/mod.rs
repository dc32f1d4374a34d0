mod data_type;
mod record;
mod schema;
mod value;

pub use data_type::ColumnType;
pub use record::Record;
pub use schema::{validate_identifier, ColumnDescriptor, TableDescriptor};
pub use value::Value;
