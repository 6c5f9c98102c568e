//! Request message family (component D).

use super::return_stack::ReturnStack;
use crate::data_type::DataType;
use crate::error::FrameError;
use crate::stream::{BitStreamReader, BitStreamWriter};

pub const FORMAT_VERSION: u8 = 1;

/// Smallest `max_response_size` that can carry a meaningful response (header plus
/// one abort code, roughly).
pub const MIN_USEFUL_MAX_RESPONSE_SIZE: u32 = 8;

/// Hard ceiling on `max_response_size`; chosen generously above any realistic
/// mailbox size so it only rejects clearly malformed requests.
pub const MAX_RESPONSE_SIZE_CEILING: u32 = 1 << 20;

fn check_max_response_size(value: u32) -> Result<(), FrameError> {
    if value < MIN_USEFUL_MAX_RESPONSE_SIZE || value > MAX_RESPONSE_SIZE_CEILING {
        return Err(FrameError::MaxResponseSizeOutOfBounds {
            value,
            min: MIN_USEFUL_MAX_RESPONSE_SIZE,
            max: MAX_RESPONSE_SIZE_CEILING,
        });
    }
    Ok(())
}

#[repr(u8)]
enum Tag {
    Ping = 0,
    Read = 1,
    Write = 2,
    ObjectEnum = 3,
    ObjectInfo = 4,
}

/// Whether an access targets a single subindex or the whole object via Complete
/// Access, and if so how SI0 is framed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Single,
    CompleteAccessSi0As8,
    CompleteAccessSi0As16,
}

impl AccessType {
    fn to_byte(self) -> u8 {
        match self {
            AccessType::Single => 0,
            AccessType::CompleteAccessSi0As8 => 1,
            AccessType::CompleteAccessSi0As16 => 2,
        }
    }

    fn from_byte(b: u8) -> Result<Self, FrameError> {
        Ok(match b {
            0 => AccessType::Single,
            1 => AccessType::CompleteAccessSi0As8,
            2 => AccessType::CompleteAccessSi0As16,
            _ => return Err(FrameError::UnknownMessageType { tag: b }),
        })
    }

    /// `Some(si0_as_u16)` if this is a Complete Access request.
    pub fn complete_access(self) -> Option<bool> {
        match self {
            AccessType::Single => None,
            AccessType::CompleteAccessSi0As8 => Some(false),
            AccessType::CompleteAccessSi0As16 => Some(true),
        }
    }
}

/// The message-specific payload of a request.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Ping,
    Read {
        access_type: AccessType,
        index: u16,
        subindex: u8,
        permissions: u16,
    },
    Write {
        access_type: AccessType,
        index: u16,
        subindex: u8,
        permissions: u16,
        data: Vec<u8>,
    },
    ObjectEnum {
        start_index: u16,
        last_index: u16,
        attr_filter: u16,
    },
    ObjectInfo {
        index: u16,
        first_si: u8,
        last_si: u8,
        incl_names: bool,
        incl_asm: bool,
    },
}

impl Request {
    /// Construct an `ObjectEnum` request, validating `start_index <= last_index`
    /// and `attr_filter != 0`.
    pub fn object_enum(start_index: u16, last_index: u16, attr_filter: u16) -> Result<Self, FrameError> {
        if start_index > last_index {
            return Err(FrameError::MalformedSubindexSequence {
                reason: "object enum start_index must be <= last_index",
            });
        }
        if attr_filter == 0 {
            return Err(FrameError::MalformedSubindexSequence {
                reason: "object enum attr_filter must be non-zero",
            });
        }
        Ok(Request::ObjectEnum {
            start_index,
            last_index,
            attr_filter,
        })
    }

    fn tag(&self) -> Tag {
        match self {
            Request::Ping => Tag::Ping,
            Request::Read { .. } => Tag::Read,
            Request::Write { .. } => Tag::Write,
            Request::ObjectEnum { .. } => Tag::ObjectEnum,
            Request::ObjectInfo { .. } => Tag::ObjectInfo,
        }
    }

    fn write_payload(&self, writer: &mut BitStreamWriter) -> Result<(), FrameError> {
        match self {
            Request::Ping => {}
            Request::Read {
                access_type,
                index,
                subindex,
                permissions,
            } => {
                writer.write_uint8(access_type.to_byte())?;
                writer.write_uint16(*index)?;
                writer.write_uint8(*subindex)?;
                writer.write_uint16(*permissions)?;
            }
            Request::Write {
                access_type,
                index,
                subindex,
                permissions,
                data,
            } => {
                writer.write_uint8(access_type.to_byte())?;
                writer.write_uint16(*index)?;
                writer.write_uint8(*subindex)?;
                writer.write_uint16(*permissions)?;
                writer.write_uint32(data.len() as u32)?;
                writer.write_bytes(data)?;
            }
            Request::ObjectEnum {
                start_index,
                last_index,
                attr_filter,
            } => {
                writer.write_uint16(*start_index)?;
                writer.write_uint16(*last_index)?;
                writer.write_uint16(*attr_filter)?;
            }
            Request::ObjectInfo {
                index,
                first_si,
                last_si,
                incl_names,
                incl_asm,
            } => {
                writer.write_uint16(*index)?;
                writer.write_uint8(*first_si)?;
                writer.write_uint8(*last_si)?;
                writer.write_uint8(*incl_names as u8)?;
                writer.write_uint8(*incl_asm as u8)?;
            }
        }
        Ok(())
    }

    fn read_payload(tag: u8, reader: &mut BitStreamReader<'_>) -> Result<Self, FrameError> {
        Ok(match tag {
            t if t == Tag::Ping as u8 => Request::Ping,
            t if t == Tag::Read as u8 => Request::Read {
                access_type: AccessType::from_byte(reader.read_uint8()?)?,
                index: reader.read_uint16()?,
                subindex: reader.read_uint8()?,
                permissions: reader.read_uint16()?,
            },
            t if t == Tag::Write as u8 => {
                let access_type = AccessType::from_byte(reader.read_uint8()?)?;
                let index = reader.read_uint16()?;
                let subindex = reader.read_uint8()?;
                let permissions = reader.read_uint16()?;
                let len = reader.read_uint32()? as usize;
                if len * 8 > reader.remaining_bits() {
                    return Err(FrameError::LengthExceedsRemaining {
                        declared: len,
                        remaining: reader.remaining_bits() / 8,
                    });
                }
                let mut data = vec![0u8; len];
                reader.read_bytes(&mut data)?;
                Request::Write {
                    access_type,
                    index,
                    subindex,
                    permissions,
                    data,
                }
            }
            t if t == Tag::ObjectEnum as u8 => {
                let start_index = reader.read_uint16()?;
                let last_index = reader.read_uint16()?;
                let attr_filter = reader.read_uint16()?;
                Request::object_enum(start_index, last_index, attr_filter)?
            }
            t if t == Tag::ObjectInfo as u8 => Request::ObjectInfo {
                index: reader.read_uint16()?,
                first_si: reader.read_uint8()?,
                last_si: reader.read_uint8()?,
                incl_names: reader.read_uint8()? != 0,
                incl_asm: reader.read_uint8()? != 0,
            },
            _ => return Err(FrameError::UnknownMessageType { tag }),
        })
    }
}

/// A complete request: common header plus message-specific payload.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestMessage {
    pub max_response_size: u32,
    pub return_stack: ReturnStack,
    pub body: Request,
}

impl RequestMessage {
    pub fn new(max_response_size: u32, body: Request) -> Result<Self, FrameError> {
        check_max_response_size(max_response_size)?;
        Ok(Self {
            max_response_size,
            return_stack: ReturnStack::new(),
            body,
        })
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, FrameError> {
        let mut writer = BitStreamWriter::new();
        writer.write_uint8(FORMAT_VERSION)?;
        writer.write_uint8(self.body.tag() as u8)?;
        writer.write_uint32(self.max_response_size)?;
        self.return_stack.to_binary(&mut writer)?;
        self.body.write_payload(&mut writer)?;
        Ok(writer.into_bytes())
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, FrameError> {
        let mut reader = BitStreamReader::new(bytes);
        let version = reader.read_uint8()?;
        if version != FORMAT_VERSION {
            return Err(FrameError::UnsupportedVersion {
                expected: FORMAT_VERSION,
                found: version,
            });
        }
        let tag = reader.read_uint8()?;
        let max_response_size = reader.read_uint32()?;
        check_max_response_size(max_response_size)?;
        let return_stack = ReturnStack::from_binary(&mut reader)?;
        let body = Request::read_payload(tag, &mut reader)?;
        Ok(Self {
            max_response_size,
            return_stack,
            body,
        })
    }
}

/// `true` if `data_type` is meaningful as the single homogeneous type of a read/write
/// payload outside Complete Access (every type except `null`).
pub fn is_transferable(data_type: DataType) -> bool {
    data_type != DataType::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_round_trips() {
        let msg = RequestMessage::new(64, Request::Ping).unwrap();
        let bytes = msg.to_binary().unwrap();
        assert_eq!(RequestMessage::from_binary(&bytes).unwrap(), msg);
    }

    #[test]
    fn write_round_trips_with_data() {
        let msg = RequestMessage::new(
            128,
            Request::Write {
                access_type: AccessType::Single,
                index: 0x2000,
                subindex: 3,
                permissions: 0xffff,
                data: vec![1, 2, 3, 4],
            },
        )
        .unwrap();
        let bytes = msg.to_binary().unwrap();
        assert_eq!(RequestMessage::from_binary(&bytes).unwrap(), msg);
    }

    #[test]
    fn object_enum_rejects_backwards_range() {
        assert!(Request::object_enum(5, 1, 0xffff).is_err());
        assert!(Request::object_enum(1, 5, 0).is_err());
    }

    #[test]
    fn rejects_budget_out_of_bounds() {
        assert!(RequestMessage::new(1, Request::Ping).is_err());
    }

    #[test]
    fn rejects_wrong_version() {
        let msg = RequestMessage::new(64, Request::Ping).unwrap();
        let mut bytes = msg.to_binary().unwrap();
        bytes[0] = 99;
        assert!(RequestMessage::from_binary(&bytes).is_err());
    }
}
