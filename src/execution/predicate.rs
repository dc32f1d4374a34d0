use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::record::{Record, TableDescriptor, Value};

/// Comparison operators a predicate clause may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    /// Exact equality of the rendered value; no wildcard expansion
    Like,
}

impl CompareOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq | CompareOp::Like => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::LtEq => "<=",
            CompareOp::GtEq => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

impl FromStr for CompareOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::NotEq),
            "<" => Ok(CompareOp::Lt),
            ">" => Ok(CompareOp::Gt),
            "<=" => Ok(CompareOp::LtEq),
            ">=" => Ok(CompareOp::GtEq),
            _ if s.eq_ignore_ascii_case("LIKE") => Ok(CompareOp::Like),
            _ => Err(()),
        }
    }
}

/// A row filter built from a raw condition string.
///
/// Building a predicate never fails. An empty condition matches every
/// record. Otherwise the first three whitespace-separated tokens are read as
/// `column operator literal` and anything after them is ignored, so
/// `age > 20 AND name = x` filters on `age > 20` alone. A condition that
/// cannot be read as a clause matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record
    All,
    /// Matches no record
    Never,
    /// One comparison
    Clause {
        column: String,
        op: CompareOp,
        literal: String,
    },
}

impl Predicate {
    /// Parses a raw condition string.
    pub fn parse(condition: &str) -> Self {
        let mut tokens = condition.split_whitespace();
        let Some(column) = tokens.next() else {
            return Predicate::All;
        };
        let (Some(op), Some(literal)) = (tokens.next(), tokens.next()) else {
            return Predicate::Never;
        };
        match op.parse() {
            Ok(op) => Predicate::Clause {
                column: column.to_string(),
                op,
                literal: literal.to_string(),
            },
            Err(()) => Predicate::Never,
        }
    }

    /// Evaluates the predicate against a decoded record of `table`.
    ///
    /// Unknown columns and literals that do not parse as the column's
    /// numeric type make the record a non-match; they are never errors.
    pub fn matches(&self, table: &TableDescriptor, record: &Record) -> bool {
        let (column, op, literal) = match self {
            Predicate::All => return true,
            Predicate::Never => return false,
            Predicate::Clause {
                column,
                op,
                literal,
            } => (column, op, literal),
        };

        let Some(index) = table.column_index(column) else {
            return false;
        };
        let Some(value) = record.value(index) else {
            return false;
        };

        if *op == CompareOp::Like {
            return value.to_string() == *literal;
        }

        let column_type = table.columns()[index].column_type();
        // Strings are never truncated here; a literal longer than the slot
        // simply compares as longer
        let Some(rhs) = Value::from_literal(literal, column_type, usize::MAX) else {
            return false;
        };
        value.compare(&rhs).is_some_and(|ordering| op.holds(ordering))
    }
}

impl FromStr for Predicate {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Predicate::parse(s))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::All => f.write_str("<all>"),
            Predicate::Never => f.write_str("<none>"),
            Predicate::Clause {
                column,
                op,
                literal,
            } => write!(f, "{} {} {}", column, op.symbol(), literal),
        }
    }
}
