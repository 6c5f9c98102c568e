//! Parses a CLI string argument into a [`Value`] of a given [`DataType`].
//!
//! The teacher's CLI asks the user to pick a [`SdoDataType`] explicitly, since a raw
//! SDO client has no object dictionary to consult. This core always has the real
//! object in hand before encoding a write, so the subindex's own data type is used
//! instead of asking the caller to restate it.

use cood_common::codec::Value;
use cood_common::DataType;

pub fn parse_value(data_type: DataType, s: &str) -> Result<Value, String> {
    let bad = |e: std::fmt::Arguments| format!("{e}");
    match data_type {
        DataType::Boolean => s
            .parse::<bool>()
            .map(Value::Boolean)
            .map_err(|e| bad(format_args!("not a bool: {e}"))),
        DataType::Integer8 => s
            .parse::<i8>()
            .map(Value::Integer8)
            .map_err(|e| bad(format_args!("not an i8: {e}"))),
        DataType::Integer16 => s
            .parse::<i16>()
            .map(Value::Integer16)
            .map_err(|e| bad(format_args!("not an i16: {e}"))),
        DataType::Integer32 => s
            .parse::<i32>()
            .map(Value::Integer32)
            .map_err(|e| bad(format_args!("not an i32: {e}"))),
        DataType::Integer64 => s
            .parse::<i64>()
            .map(Value::Integer64)
            .map_err(|e| bad(format_args!("not an i64: {e}"))),
        DataType::Unsigned8 => s
            .parse::<u8>()
            .map(Value::Unsigned8)
            .map_err(|e| bad(format_args!("not a u8: {e}"))),
        DataType::Unsigned16 => s
            .parse::<u16>()
            .map(Value::Unsigned16)
            .map_err(|e| bad(format_args!("not a u16: {e}"))),
        DataType::Unsigned32 => s
            .parse::<u32>()
            .map(Value::Unsigned32)
            .map_err(|e| bad(format_args!("not a u32: {e}"))),
        DataType::Unsigned64 => s
            .parse::<u64>()
            .map(Value::Unsigned64)
            .map_err(|e| bad(format_args!("not a u64: {e}"))),
        DataType::Real32 => s
            .parse::<f32>()
            .map(Value::Real32)
            .map_err(|e| bad(format_args!("not an f32: {e}"))),
        DataType::Real64 => s
            .parse::<f64>()
            .map(Value::Real64)
            .map_err(|e| bad(format_args!("not an f64: {e}"))),
        DataType::VisibleString => Ok(Value::VisibleString(s.to_string())),
        DataType::UnicodeString => Ok(Value::UnicodeString(s.encode_utf16().collect())),
        DataType::OctetString => parse_octets(s).map(Value::OctetString),
        DataType::Bit1 | DataType::Bit2 | DataType::Bit3 | DataType::Bit4 | DataType::Bit5
        | DataType::Bit6 | DataType::Bit7 | DataType::Bit8 | DataType::BooleanNativeBit1 => {
            let width = match data_type {
                DataType::BooleanNativeBit1 | DataType::Bit1 => 1,
                DataType::Bit2 => 2,
                DataType::Bit3 => 3,
                DataType::Bit4 => 4,
                DataType::Bit5 => 5,
                DataType::Bit6 => 6,
                DataType::Bit7 => 7,
                _ => 8,
            };
            let raw = parse_int_generic(s)? as u8;
            Ok(Value::Bits { value: raw, width })
        }
        DataType::Null => Err("subindex is a gap; it cannot be written directly".into()),
    }
}

fn parse_int_generic(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("not a hex integer: {e}"))
    } else {
        s.parse::<u64>().map_err(|e| format!("not an integer: {e}"))
    }
}

/// Hex-encoded octet string, e.g. "2a00ff".
fn parse_octets(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("octet string hex must have an even number of digits".into());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| format!("invalid hex byte: {e}")))
        .collect()
}
