use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{Result, SlabError};

use super::ColumnType;

/// A decoded column value.
///
/// Values carry no type tag on disk: the column's declared [`ColumnType`]
/// selects the variant when a slot is decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit signed integer
    Int(i32),

    /// 32-bit floating point
    Float(f32),

    /// String value (used for both Char and Varchar)
    Text(String),
}

impl Value {
    /// Converts a literal to a value of the given column type.
    ///
    /// Numeric literals must parse completely (surrounding whitespace aside).
    /// Strings longer than `max_string_len` bytes are cut at the last
    /// character boundary that fits. Returns None if a numeric literal does
    /// not parse.
    pub fn from_literal(
        literal: &str,
        column_type: ColumnType,
        max_string_len: usize,
    ) -> Option<Self> {
        match column_type {
            ColumnType::Int => literal.trim().parse().ok().map(Value::Int),
            ColumnType::Float => literal.trim().parse().ok().map(Value::Float),
            ColumnType::Char | ColumnType::Varchar => {
                Some(Value::Text(truncate_to_boundary(literal, max_string_len).to_string()))
            }
        }
    }

    /// Compares two values of the same kind. Strings compare byte-wise.
    /// Returns None for mismatched kinds and for NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            _ => None,
        }
    }

    /// Writes the value into a slot of exactly `slot_width` bytes.
    ///
    /// Slot layout:
    /// - INT: i32 little-endian, then zero padding
    /// - FLOAT: f32 little-endian, then zero padding
    /// - CHAR/VARCHAR: u16 little-endian length, bytes, then zero padding
    pub fn encode_slot<B: BufMut>(&self, buf: &mut B, slot_width: usize) {
        let used = match self {
            Value::Int(v) => {
                buf.put_i32_le(*v);
                4
            }
            Value::Float(v) => {
                buf.put_f32_le(*v);
                4
            }
            Value::Text(s) => {
                let bytes = &s.as_bytes()[..s.len().min(slot_width - 2)];
                buf.put_u16_le(bytes.len() as u16);
                buf.put_slice(bytes);
                2 + bytes.len()
            }
        };
        buf.put_bytes(0, slot_width - used);
    }

    /// Reads a slot of exactly `slot_width` bytes as a value of `column_type`.
    pub fn decode_slot<B: Buf>(
        buf: &mut B,
        column_type: ColumnType,
        slot_width: usize,
    ) -> Result<Self> {
        if buf.remaining() < slot_width {
            return Err(SlabError::Corrupted(format!(
                "record slot needs {} bytes, {} left",
                slot_width,
                buf.remaining()
            )));
        }

        let mut slot = buf.copy_to_bytes(slot_width);
        let value = match column_type {
            ColumnType::Int => Value::Int(slot.get_i32_le()),
            ColumnType::Float => Value::Float(slot.get_f32_le()),
            ColumnType::Char | ColumnType::Varchar => {
                let len = slot.get_u16_le() as usize;
                if len > slot.remaining() {
                    return Err(SlabError::Corrupted(format!(
                        "string of {} bytes in a {} byte slot",
                        len, slot_width
                    )));
                }
                let text = String::from_utf8(slot[..len].to_vec()).map_err(|_| {
                    SlabError::Corrupted("string slot is not valid UTF-8".to_string())
                })?;
                Value::Text(text)
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Returns the longest prefix of `s` that fits in `max` bytes without
/// splitting a character.
fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
