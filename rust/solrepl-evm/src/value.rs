//! Decoded return values and how the shell prints them.

use num_bigint::{BigInt, BigUint};
use std::fmt;

/// A value decoded from ABI-encoded return data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(BigUint),
    Int(BigInt),
    Bool(bool),
    Address([u8; 20]),
    /// `bytesN` and `bytes`.
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    /// Tuple whose components are all named.
    Struct(Vec<(String, Value)>),
    Tuple(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(n) => write!(f, "{}", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Address(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Value::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Value::String(s) => match serde_json::to_string(s) {
                Ok(quoted) => f.write_str(&quoted),
                Err(_) => write!(f, "{:?}", s),
            },
            Value::Array(items) | Value::Tuple(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Struct(fields) if fields.is_empty() => f.write_str("{}"),
            Value::Struct(fields) => {
                f.write_str("{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str(" }")
            }
        }
    }
}
