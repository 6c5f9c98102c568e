//! Component A: CANopen value codec.
//!
//! Transcodes a [`Value`] to and from the bit stream primitives in [`crate::stream`],
//! little-endian, bit-stuffed for bit-based types and byte-aligned for everything
//! else. The codec is deliberately stateless: given a type, an element count, and the
//! `complete_access` flag, the encoded size is fully predictable ahead of time via
//! [`DataType::size_of`], so callers (the object model, in particular) can
//! pre-compute buffer lengths rather than encode speculatively.

use crate::data_type::DataType;
use crate::error::{FrameError, StreamError};
use crate::stream::{BitStreamReader, BitStreamWriter};

/// A decoded subindex value in its native Rust representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer8(i8),
    Integer16(i16),
    Integer32(i32),
    Integer64(i64),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned32(u32),
    Unsigned64(u64),
    Real32(f32),
    Real64(f64),
    VisibleString(String),
    OctetString(Vec<u8>),
    UnicodeString(Vec<u16>),
    /// The low `width` bits hold a `bit1..bit8` or `boolean_native_bit1` value.
    Bits { value: u8, width: u8 },
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer8(_) => DataType::Integer8,
            Value::Integer16(_) => DataType::Integer16,
            Value::Integer32(_) => DataType::Integer32,
            Value::Integer64(_) => DataType::Integer64,
            Value::Unsigned8(_) => DataType::Unsigned8,
            Value::Unsigned16(_) => DataType::Unsigned16,
            Value::Unsigned32(_) => DataType::Unsigned32,
            Value::Unsigned64(_) => DataType::Unsigned64,
            Value::Real32(_) => DataType::Real32,
            Value::Real64(_) => DataType::Real64,
            Value::VisibleString(_) => DataType::VisibleString,
            Value::OctetString(_) => DataType::OctetString,
            Value::UnicodeString(_) => DataType::UnicodeString,
            Value::Bits { width, .. } => match width {
                1 => DataType::Bit1,
                2 => DataType::Bit2,
                3 => DataType::Bit3,
                4 => DataType::Bit4,
                5 => DataType::Bit5,
                6 => DataType::Bit6,
                7 => DataType::Bit7,
                8 => DataType::Bit8,
                _ => DataType::Null,
            },
        }
    }

    /// Number of elements this value occupies (string length in characters; 1 for
    /// everything else).
    pub fn n_elements(&self) -> usize {
        match self {
            Value::VisibleString(s) => s.chars().count(),
            Value::OctetString(b) => b.len(),
            Value::UnicodeString(u) => u.len(),
            _ => 1,
        }
    }
}

/// Encode `value` into `writer`. `max_n_elements` is the subindex's declared element
/// count (only meaningful for string types); `complete_access` selects whether
/// strings are padded to `max_n_elements` or written at their actual length.
///
/// Byte-based types are written byte-aligned: the writer must already be aligned, or
/// the caller (the object model's Complete Access loop) is responsible for aligning
/// it first.
pub fn encode(
    value: &Value,
    max_n_elements: usize,
    writer: &mut BitStreamWriter,
    complete_access: bool,
) -> Result<(), FrameError> {
    match value {
        Value::Boolean(b) => writer.write_uint8(*b as u8)?,
        Value::Integer8(v) => writer.write_uint8(*v as u8)?,
        Value::Integer16(v) => writer.write_uint16(*v as u16)?,
        Value::Integer32(v) => writer.write_uint32(*v as u32)?,
        Value::Integer64(v) => writer.write_uint64(*v as u64)?,
        Value::Unsigned8(v) => writer.write_uint8(*v)?,
        Value::Unsigned16(v) => writer.write_uint16(*v)?,
        Value::Unsigned32(v) => writer.write_uint32(*v)?,
        Value::Unsigned64(v) => writer.write_uint64(*v)?,
        Value::Real32(v) => writer.write_uint32(v.to_bits())?,
        Value::Real64(v) => writer.write_uint64(v.to_bits())?,
        Value::VisibleString(s) => encode_string_bytes(s.as_bytes(), max_n_elements, writer, complete_access)?,
        Value::OctetString(b) => encode_string_bytes(b, max_n_elements, writer, complete_access)?,
        Value::UnicodeString(units) => {
            for &u in units {
                writer.write_uint16(u)?;
            }
            if complete_access {
                for _ in units.len()..max_n_elements {
                    writer.write_uint16(0)?;
                }
            }
        }
        Value::Bits { value, width } => writer.write_bits(*value as u64, *width)?,
    }
    Ok(())
}

fn encode_string_bytes(
    bytes: &[u8],
    max_n_elements: usize,
    writer: &mut BitStreamWriter,
    complete_access: bool,
) -> Result<(), StreamError> {
    writer.write_bytes(bytes)?;
    if complete_access {
        for _ in bytes.len()..max_n_elements {
            writer.write_uint8(0)?;
        }
    }
    Ok(())
}

/// Decode a value of `data_type` from `reader`.
///
/// For scalar types `n_elements` is ignored. For string types: in Complete Access,
/// exactly `n_elements` characters are consumed (trailing NUL padding included
/// verbatim, as the caller -- the object's native storage -- owns deciding what
/// "actual length" means); outside Complete Access, the string runs to the end of
/// `reader` (single-subindex SDO transfers carry no in-band length, so the transfer
/// size itself delimits the string).
pub fn decode(
    reader: &mut BitStreamReader<'_>,
    data_type: DataType,
    n_elements: usize,
) -> Result<Value, FrameError> {
    Ok(match data_type {
        DataType::Null => Value::Bits { value: 0, width: 0 },
        DataType::Boolean => Value::Boolean(reader.read_uint8()? != 0),
        DataType::Integer8 => Value::Integer8(reader.read_uint8()? as i8),
        DataType::Integer16 => Value::Integer16(reader.read_uint16()? as i16),
        DataType::Integer32 => Value::Integer32(reader.read_uint32()? as i32),
        DataType::Integer64 => Value::Integer64(reader.read_uint64()? as i64),
        DataType::Unsigned8 => Value::Unsigned8(reader.read_uint8()?),
        DataType::Unsigned16 => Value::Unsigned16(reader.read_uint16()?),
        DataType::Unsigned32 => Value::Unsigned32(reader.read_uint32()?),
        DataType::Unsigned64 => Value::Unsigned64(reader.read_uint64()?),
        DataType::Real32 => Value::Real32(f32::from_bits(reader.read_uint32()?)),
        DataType::Real64 => Value::Real64(f64::from_bits(reader.read_uint64()?)),
        DataType::VisibleString => Value::VisibleString(
            String::from_utf8_lossy(&decode_string_bytes(reader, n_elements)?).into_owned(),
        ),
        DataType::OctetString => Value::OctetString(decode_string_bytes(reader, n_elements)?),
        DataType::UnicodeString => {
            let n = if n_elements > 0 {
                n_elements
            } else {
                reader.remaining_bits() / 16
            };
            let mut units = Vec::with_capacity(n);
            for _ in 0..n {
                units.push(reader.read_uint16()?);
            }
            Value::UnicodeString(units)
        }
        DataType::BooleanNativeBit1 => Value::Bits {
            value: reader.read_bits(1)? as u8,
            width: 1,
        },
        DataType::Bit1 => Value::Bits { value: reader.read_bits(1)? as u8, width: 1 },
        DataType::Bit2 => Value::Bits { value: reader.read_bits(2)? as u8, width: 2 },
        DataType::Bit3 => Value::Bits { value: reader.read_bits(3)? as u8, width: 3 },
        DataType::Bit4 => Value::Bits { value: reader.read_bits(4)? as u8, width: 4 },
        DataType::Bit5 => Value::Bits { value: reader.read_bits(5)? as u8, width: 5 },
        DataType::Bit6 => Value::Bits { value: reader.read_bits(6)? as u8, width: 6 },
        DataType::Bit7 => Value::Bits { value: reader.read_bits(7)? as u8, width: 7 },
        DataType::Bit8 => Value::Bits { value: reader.read_bits(8)? as u8, width: 8 },
    })
}

fn decode_string_bytes(reader: &mut BitStreamReader<'_>, n_elements: usize) -> Result<Vec<u8>, StreamError> {
    let n = if n_elements > 0 {
        n_elements
    } else {
        reader.remaining_bits() / 8
    };
    let mut buf = vec![0u8; n];
    reader.read_bytes(&mut buf)?;
    Ok(buf)
}

/// Fail if more than 7 bits remain in `reader` after decoding an expected payload
/// (see [`crate::AbortCode::DataTypeMismatchTooLong`]).
pub fn check_no_trailing_data(reader: &BitStreamReader<'_>) -> Result<(), StreamError> {
    let remaining = reader.remaining_bits();
    if remaining > 7 {
        return Err(StreamError::TrailingData { remaining });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trip() {
        let mut w = BitStreamWriter::new();
        let v = Value::Unsigned32(0xcafef00d);
        encode(&v, 1, &mut w, false).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitStreamReader::new(&bytes);
        let decoded = decode(&mut r, DataType::Unsigned32, 1).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn real32_round_trip() {
        let mut w = BitStreamWriter::new();
        let v = Value::Real32(3.5);
        encode(&v, 1, &mut w, false).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitStreamReader::new(&bytes);
        assert_eq!(decode(&mut r, DataType::Real32, 1).unwrap(), v);
    }

    #[test]
    fn string_padded_in_complete_access_not_outside_it() {
        let v = Value::VisibleString("hi".to_string());

        let mut w = BitStreamWriter::new();
        encode(&v, 8, &mut w, true).unwrap();
        assert_eq!(w.into_bytes().len(), 8);

        let mut w = BitStreamWriter::new();
        encode(&v, 8, &mut w, false).unwrap();
        assert_eq!(w.into_bytes().len(), 2);
    }

    #[test]
    fn bit_value_round_trip() {
        let mut w = BitStreamWriter::new();
        let v = Value::Bits { value: 0b101, width: 3 };
        encode(&v, 1, &mut w, false).unwrap();
        w.align_to_byte_boundary(false).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitStreamReader::new(&bytes);
        assert_eq!(decode(&mut r, DataType::Bit3, 1).unwrap(), v);
    }

    #[test]
    fn trailing_data_detected() {
        let bytes = [0u8; 2];
        let mut r = BitStreamReader::new(&bytes);
        let _ = decode(&mut r, DataType::Unsigned8, 1).unwrap();
        assert!(check_no_trailing_data(&r).is_err());
    }
}
