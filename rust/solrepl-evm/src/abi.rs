//! Contract ABI types and head/tail decoding of return data.

use crate::value::Value;
use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;
use solrepl_synth::AbiParam;
use thiserror::Error;

const WORD: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("unsupported ABI type '{0}'")]
    UnsupportedType(String),
    #[error("return data too short: need {needed} bytes at offset {offset}, have {available}")]
    ShortData {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("offset or length does not fit in memory: 0x{0}")]
    Overflow(String),
}

/// An ABI type, parsed from the `type` string of an ABI parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<AbiType>),
    FixedArray(Box<AbiType>, usize),
    Tuple(Vec<(String, AbiType)>),
}

impl AbiType {
    pub fn from_param(param: &AbiParam) -> Result<Self, AbiError> {
        Self::parse(&param.ty, &param.components)
    }

    /// Parse a canonical type string. `components` fill in `tuple` bases.
    pub fn parse(ty: &str, components: &[AbiParam]) -> Result<Self, AbiError> {
        let unsupported = || AbiError::UnsupportedType(ty.to_string());

        if let Some(rest) = ty.strip_suffix(']') {
            let open = rest.rfind('[').ok_or_else(unsupported)?;
            let inner = Box::new(Self::parse(&rest[..open], components)?);
            let dim = &rest[open + 1..];
            return if dim.is_empty() {
                Ok(AbiType::Array(inner))
            } else {
                let len = dim.parse().map_err(|_| unsupported())?;
                Ok(AbiType::FixedArray(inner, len))
            };
        }

        let parsed = match ty {
            "address" => AbiType::Address,
            "bool" => AbiType::Bool,
            "string" => AbiType::String,
            "bytes" => AbiType::Bytes,
            "function" => AbiType::FixedBytes(24),
            "uint" => AbiType::Uint(256),
            "int" => AbiType::Int(256),
            "tuple" => AbiType::Tuple(
                components
                    .iter()
                    .map(|c| Ok((c.name.clone(), Self::from_param(c)?)))
                    .collect::<Result<_, AbiError>>()?,
            ),
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    AbiType::Uint(int_width(bits).ok_or_else(unsupported)?)
                } else if let Some(bits) = ty.strip_prefix("int") {
                    AbiType::Int(int_width(bits).ok_or_else(unsupported)?)
                } else if let Some(len) = ty.strip_prefix("bytes") {
                    match len.parse::<usize>() {
                        Ok(n) if (1..=32).contains(&n) => AbiType::FixedBytes(n),
                        _ => return Err(unsupported()),
                    }
                } else {
                    return Err(unsupported());
                }
            }
        };
        Ok(parsed)
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::String | AbiType::Array(_) => true,
            AbiType::FixedArray(inner, _) => inner.is_dynamic(),
            AbiType::Tuple(fields) => fields.iter().any(|(_, t)| t.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing tuple.
    fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            AbiType::FixedArray(inner, len) => inner.head_size() * len,
            AbiType::Tuple(fields) => fields.iter().map(|(_, t)| t.head_size()).sum(),
            _ => WORD,
        }
    }
}

fn int_width(bits: &str) -> Option<usize> {
    let bits: usize = bits.parse().ok()?;
    (bits % 8 == 0 && (8..=256).contains(&bits)).then_some(bits)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode return data laid out as the tuple `types`.
pub fn decode(types: &[AbiType], data: &[u8]) -> Result<Vec<Value>, AbiError> {
    decode_sequence(types, data)
}

/// Decode the outputs of an ABI entry. A single output is returned bare,
/// several as a tuple, none as `None`.
pub fn decode_outputs(outputs: &[AbiParam], data: &[u8]) -> Result<Option<Value>, AbiError> {
    let types: Vec<AbiType> = outputs
        .iter()
        .map(AbiType::from_param)
        .collect::<Result<_, _>>()?;
    let mut values = decode(&types, data)?;
    Ok(match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(Value::Tuple(values)),
    })
}

fn word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    slice(data, offset, WORD)
}

fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(AbiError::ShortData {
            offset,
            needed: len,
            available: data.len(),
        })
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let w = word(data, offset)?;
    BigUint::from_bytes_be(w)
        .to_usize()
        .ok_or_else(|| AbiError::Overflow(hex::encode(w)))
}

fn decode_sequence(types: &[AbiType], data: &[u8]) -> Result<Vec<Value>, AbiError> {
    let mut values = Vec::with_capacity(types.len());
    let mut offset = 0;
    for ty in types {
        let value = if ty.is_dynamic() {
            let start = read_usize(data, offset)?;
            let tail = data.get(start..).ok_or(AbiError::ShortData {
                offset: start,
                needed: 0,
                available: data.len(),
            })?;
            decode_value(ty, tail)?
        } else {
            decode_value(ty, &data[offset.min(data.len())..])?
        };
        values.push(value);
        offset += ty.head_size();
    }
    Ok(values)
}

/// Decode one value whose encoding starts at the beginning of `data`.
fn decode_value(ty: &AbiType, data: &[u8]) -> Result<Value, AbiError> {
    match ty {
        AbiType::Uint(_) => Ok(Value::Uint(BigUint::from_bytes_be(word(data, 0)?))),
        AbiType::Int(_) => Ok(Value::Int(BigInt::from_signed_bytes_be(word(data, 0)?))),
        AbiType::Bool => Ok(Value::Bool(word(data, 0)?[WORD - 1] != 0)),
        AbiType::Address => {
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&word(data, 0)?[WORD - 20..]);
            Ok(Value::Address(addr))
        }
        AbiType::FixedBytes(len) => Ok(Value::Bytes(word(data, 0)?[..*len].to_vec())),
        AbiType::Bytes => {
            let len = read_usize(data, 0)?;
            Ok(Value::Bytes(slice(data, WORD, len)?.to_vec()))
        }
        AbiType::String => {
            let len = read_usize(data, 0)?;
            Ok(Value::String(
                String::from_utf8_lossy(slice(data, WORD, len)?).into_owned(),
            ))
        }
        AbiType::Array(inner) => {
            let len = read_usize(data, 0)?;
            // every element needs at least one word, so a bogus length fails here
            slice(data, WORD, len.saturating_mul(WORD))?;
            let types = vec![inner.as_ref().clone(); len];
            Ok(Value::Array(decode_sequence(&types, &data[WORD..])?))
        }
        AbiType::FixedArray(inner, len) => {
            let types = vec![inner.as_ref().clone(); *len];
            Ok(Value::Array(decode_sequence(&types, data)?))
        }
        AbiType::Tuple(fields) => {
            let types: Vec<AbiType> = fields.iter().map(|(_, t)| t.clone()).collect();
            let values = decode_sequence(&types, data)?;
            if !fields.is_empty() && fields.iter().all(|(name, _)| !name.is_empty()) {
                Ok(Value::Struct(
                    fields
                        .iter()
                        .map(|(name, _)| name.clone())
                        .zip(values)
                        .collect(),
                ))
            } else {
                Ok(Value::Tuple(values))
            }
        }
    }
}
