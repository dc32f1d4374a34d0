mod predicate;
mod statement;

pub use predicate::{CompareOp, Predicate};
pub use statement::{
    ColumnConstraint, ColumnDefinition, CreateTable, Delete, Describe, Insert, Outcome, Select,
    Statement,
};
