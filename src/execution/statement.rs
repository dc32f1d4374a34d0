use std::fmt;

use crate::common::{Result, SlabError};
use crate::record::{ColumnDescriptor, ColumnType, TableDescriptor};

/// Column constraints a CREATE TABLE may declare. Storage accepts them and
/// enforces none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnConstraint::PrimaryKey => f.write_str("PRIMARY KEY"),
            ColumnConstraint::NotNull => f.write_str("NOT NULL"),
        }
    }
}

/// One column of a CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// The stored part of the definition.
    pub fn descriptor(&self) -> ColumnDescriptor {
        ColumnDescriptor::new(self.name.clone(), self.column_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
}

impl CreateTable {
    /// The table descriptor this statement creates.
    pub fn descriptor(&self) -> TableDescriptor {
        TableDescriptor::new(
            self.table.clone(),
            self.columns.iter().map(ColumnDefinition::descriptor).collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    /// Requested columns; `["*"]` selects all of them
    pub columns: Vec<String>,
    /// Raw condition text following WHERE, if any
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub table: String,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Describe {
    pub table: String,
}

/// A typed statement as produced by a command tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable(CreateTable),
    Insert(Insert),
    Select(Select),
    Delete(Delete),
    Describe(Describe),
}

impl Statement {
    /// Returns the table the statement targets.
    pub fn table(&self) -> &str {
        match self {
            Statement::CreateTable(s) => &s.table,
            Statement::Insert(s) => &s.table,
            Statement::Select(s) => &s.table,
            Statement::Delete(s) => &s.table,
            Statement::Describe(s) => &s.table,
        }
    }

    /// Rejects statements no tokenizer should have produced: an empty table
    /// name, an empty column or value list, or an empty column name.
    pub fn validate(&self) -> Result<()> {
        if self.table().trim().is_empty() {
            return Err(SlabError::Syntax("missing table name".to_string()));
        }
        match self {
            Statement::CreateTable(s) => {
                if s.columns.is_empty() {
                    return Err(SlabError::Syntax(format!(
                        "CREATE TABLE {} declares no columns",
                        s.table
                    )));
                }
                if s.columns.iter().any(|col| col.name.trim().is_empty()) {
                    return Err(SlabError::Syntax(format!(
                        "CREATE TABLE {} has an unnamed column",
                        s.table
                    )));
                }
            }
            Statement::Insert(s) if s.values.is_empty() => {
                return Err(SlabError::Syntax(format!(
                    "INSERT INTO {} has no values",
                    s.table
                )));
            }
            Statement::Select(s) => {
                if s.columns.is_empty() {
                    return Err(SlabError::Syntax(format!(
                        "SELECT from {} names no columns",
                        s.table
                    )));
                }
                if s.columns.iter().any(|col| col.trim().is_empty()) {
                    return Err(SlabError::Syntax(format!(
                        "SELECT from {} has an empty column name",
                        s.table
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// What a successfully executed statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    TableCreated,
    Inserted,
    /// Projected rows in file order
    Rows(Vec<Vec<String>>),
    /// Number of rows removed
    Deleted(usize),
    Columns(Vec<ColumnDescriptor>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(table: &str, columns: Vec<ColumnDefinition>) -> Statement {
        Statement::CreateTable(CreateTable {
            table: table.to_string(),
            columns,
        })
    }

    #[test]
    fn test_create_table_descriptor_drops_constraints() {
        let stmt = CreateTable {
            table: "users".to_string(),
            columns: vec![
                ColumnDefinition::new("id", ColumnType::Int)
                    .with_constraint(ColumnConstraint::PrimaryKey),
                ColumnDefinition::new("name", ColumnType::Varchar)
                    .with_constraint(ColumnConstraint::NotNull),
            ],
        };
        assert_eq!(
            stmt.descriptor(),
            TableDescriptor::new(
                "users",
                vec![
                    ColumnDescriptor::new("id", ColumnType::Int),
                    ColumnDescriptor::new("name", ColumnType::Varchar),
                ]
            )
        );
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(create("t", vec![ColumnDefinition::new("a", ColumnType::Int)])
            .validate()
            .is_ok());
        let select = Statement::Select(Select {
            table: "t".to_string(),
            columns: vec!["*".to_string()],
            condition: None,
        });
        assert!(select.validate().is_ok());
        let delete = Statement::Delete(Delete {
            table: "t".to_string(),
            condition: None,
        });
        assert!(delete.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let cases = vec![
            create(" ", vec![ColumnDefinition::new("a", ColumnType::Int)]),
            create("t", vec![]),
            create("t", vec![ColumnDefinition::new("", ColumnType::Int)]),
            Statement::Insert(Insert {
                table: "t".to_string(),
                values: vec![],
            }),
            Statement::Select(Select {
                table: "t".to_string(),
                columns: vec![],
                condition: None,
            }),
            Statement::Describe(Describe {
                table: String::new(),
            }),
        ];
        for stmt in cases {
            assert!(
                matches!(stmt.validate(), Err(SlabError::Syntax(_))),
                "{:?} should be rejected",
                stmt
            );
        }
    }
}
