use bytes::{Buf, BytesMut};

use crate::common::{Result, SlabError};

use super::{ColumnDescriptor, Value};

/// Represents a single row of a table.
///
/// ## Record Binary Format
///
/// A record is one fixed-width slot per column, in column order:
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | slot 0    | slot 1    | ... | slot n-1  |
/// | W bytes   | W bytes   |     | W bytes   |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// where `W` is the configured value slot width. Every record of a table has
/// the same size, so record `i` starts at `i * n * W` within the record
/// region.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Creates a record from values already in column order.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Converts insert literals to a record for the given columns.
    ///
    /// Fails with `SchemaMismatch` when the arity differs and with `Value`
    /// when a numeric literal does not parse. Over-long strings are truncated.
    pub fn from_literals<S: AsRef<str>>(
        columns: &[ColumnDescriptor],
        literals: &[S],
        max_string_len: usize,
    ) -> Result<Self> {
        if columns.len() != literals.len() {
            return Err(SlabError::SchemaMismatch {
                expected: columns.len(),
                actual: literals.len(),
            });
        }

        let values = columns
            .iter()
            .zip(literals)
            .map(|(col, literal)| {
                let literal = literal.as_ref();
                Value::from_literal(literal, col.column_type(), max_string_len).ok_or_else(|| {
                    SlabError::Value {
                        column: col.name().to_string(),
                        value: literal.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(values))
    }

    /// Returns the value at the given column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns all values in this record.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Renders the values at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&i| self.values.get(i))
            .map(Value::to_string)
            .collect()
    }

    /// Size in bytes of an encoded record.
    pub fn encoded_len(column_count: usize, slot_width: usize) -> usize {
        column_count * slot_width
    }

    /// Serializes the record, one slot per value.
    pub fn encode(&self, slot_width: usize) -> BytesMut {
        let mut buf = BytesMut::with_capacity(Self::encoded_len(self.values.len(), slot_width));
        for value in &self.values {
            value.encode_slot(&mut buf, slot_width);
        }
        buf
    }

    /// Deserializes a record, reading each slot as its column's type.
    pub fn decode<B: Buf>(
        buf: &mut B,
        columns: &[ColumnDescriptor],
        slot_width: usize,
    ) -> Result<Self> {
        let values = columns
            .iter()
            .map(|col| Value::decode_slot(buf, col.column_type(), slot_width))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ColumnType;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", ColumnType::Int),
            ColumnDescriptor::new("name", ColumnType::Varchar),
            ColumnDescriptor::new("score", ColumnType::Float),
        ]
    }

    #[test]
    fn test_from_literals() {
        let record = Record::from_literals(&columns(), &["1", "John", "2.5"], 16).unwrap();
        assert_eq!(
            record.values(),
            &[
                Value::Int(1),
                Value::Text("John".to_string()),
                Value::Float(2.5)
            ]
        );
    }

    #[test]
    fn test_from_literals_arity() {
        assert!(matches!(
            Record::from_literals(&columns(), &["1", "John"], 16),
            Err(SlabError::SchemaMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_from_literals_bad_number() {
        match Record::from_literals(&columns(), &["one", "John", "2.5"], 16) {
            Err(SlabError::Value { column, value }) => {
                assert_eq!(column, "id");
                assert_eq!(value, "one");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_encode_decode() {
        let record = Record::from_literals(&columns(), &["-4", "Ann", "0.5"], 8).unwrap();
        let bytes = record.encode(10);
        assert_eq!(bytes.len(), Record::encoded_len(3, 10));

        let decoded = Record::decode(&mut bytes.freeze(), &columns(), 10).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_project() {
        let record = Record::from_literals(&columns(), &["7", "Zed", "1"], 8).unwrap();
        assert_eq!(record.project(&[2, 0]), vec!["1", "7"]);
        assert_eq!(record.project(&[]), Vec::<String>::new());
    }
}
