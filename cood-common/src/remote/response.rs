//! Response message family (component D), mirroring [`super::request::Request`].

use super::object_info::ObjectInfoResponse;
use super::return_stack::ReturnStack;
use crate::abort::AbortCode;
use crate::error::FrameError;
use crate::stream::{BitStreamReader, BitStreamWriter};
use int_enum::IntEnum;

pub use super::request::FORMAT_VERSION;

#[repr(u8)]
enum Tag {
    Ping = 0,
    Read = 1,
    Write = 2,
    ObjectEnum = 3,
    ObjectInfo = 4,
}

fn write_abort_code(writer: &mut BitStreamWriter, code: AbortCode) -> Result<(), FrameError> {
    writer.write_uint32(code.int_value())?;
    Ok(())
}

fn read_abort_code(reader: &mut BitStreamReader<'_>) -> Result<AbortCode, FrameError> {
    AbortCode::from_int(reader.read_uint32()?).map_err(|_| FrameError::UnknownMessageType { tag: 0xff })
}

/// The message-specific payload of a response.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Ping,
    Read { result: AbortCode, data: Vec<u8> },
    Write { result: AbortCode },
    ObjectEnum { result: AbortCode, indices: Vec<u16> },
    ObjectInfo(ObjectInfoResponse),
}

impl Response {
    fn tag(&self) -> Tag {
        match self {
            Response::Ping => Tag::Ping,
            Response::Read { .. } => Tag::Read,
            Response::Write { .. } => Tag::Write,
            Response::ObjectEnum { .. } => Tag::ObjectEnum,
            Response::ObjectInfo(_) => Tag::ObjectInfo,
        }
    }

    fn write_payload(&self, writer: &mut BitStreamWriter) -> Result<(), FrameError> {
        match self {
            Response::Ping => {}
            Response::Read { result, data } => {
                write_abort_code(writer, *result)?;
                writer.write_uint32(data.len() as u32)?;
                writer.write_bytes(data)?;
            }
            Response::Write { result } => write_abort_code(writer, *result)?,
            Response::ObjectEnum { result, indices } => {
                write_abort_code(writer, *result)?;
                writer.write_uint16(indices.len() as u16)?;
                for &idx in indices {
                    writer.write_uint16(idx)?;
                }
            }
            Response::ObjectInfo(info) => info.to_binary(writer)?,
        }
        Ok(())
    }

    fn read_payload(tag: u8, reader: &mut BitStreamReader<'_>) -> Result<Self, FrameError> {
        Ok(match tag {
            t if t == Tag::Ping as u8 => Response::Ping,
            t if t == Tag::Read as u8 => {
                let result = read_abort_code(reader)?;
                let len = reader.read_uint32()? as usize;
                if len * 8 > reader.remaining_bits() {
                    return Err(FrameError::LengthExceedsRemaining {
                        declared: len,
                        remaining: reader.remaining_bits() / 8,
                    });
                }
                let mut data = vec![0u8; len];
                reader.read_bytes(&mut data)?;
                Response::Read { result, data }
            }
            t if t == Tag::Write as u8 => Response::Write {
                result: read_abort_code(reader)?,
            },
            t if t == Tag::ObjectEnum as u8 => {
                let result = read_abort_code(reader)?;
                let count = reader.read_uint16()? as usize;
                let mut indices = Vec::with_capacity(count);
                for _ in 0..count {
                    indices.push(reader.read_uint16()?);
                }
                Response::ObjectEnum { result, indices }
            }
            t if t == Tag::ObjectInfo as u8 => {
                Response::ObjectInfo(ObjectInfoResponse::from_binary(reader)?)
            }
            _ => return Err(FrameError::UnknownMessageType { tag }),
        })
    }
}

/// A complete response: common header plus message-specific payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseMessage {
    pub return_stack: ReturnStack,
    pub body: Response,
}

impl ResponseMessage {
    pub fn new(return_stack: ReturnStack, body: Response) -> Self {
        Self { return_stack, body }
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, FrameError> {
        let mut writer = BitStreamWriter::new();
        writer.write_uint8(FORMAT_VERSION)?;
        writer.write_uint8(self.body.tag() as u8)?;
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
        let return_stack = ReturnStack::from_binary(&mut reader)?;
        let body = Response::read_payload(tag, &mut reader)?;
        Ok(Self { return_stack, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_response_round_trips() {
        let msg = ResponseMessage::new(
            ReturnStack::new(),
            Response::Write {
                result: AbortCode::Ok,
            },
        );
        let bytes = msg.to_binary().unwrap();
        assert_eq!(ResponseMessage::from_binary(&bytes).unwrap(), msg);
    }

    #[test]
    fn read_response_carries_failure_code() {
        let msg = ResponseMessage::new(
            ReturnStack::new(),
            Response::Read {
                result: AbortCode::SubindexDoesNotExist,
                data: vec![],
            },
        );
        let bytes = msg.to_binary().unwrap();
        let decoded = ResponseMessage::from_binary(&bytes).unwrap();
        match decoded.body {
            Response::Read { result, .. } => assert_eq!(result, AbortCode::SubindexDoesNotExist),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn object_enum_round_trips() {
        let msg = ResponseMessage::new(
            ReturnStack::new(),
            Response::ObjectEnum {
                result: AbortCode::Ok,
                indices: vec![0x1000, 0x2000, 0x3000],
            },
        );
        let bytes = msg.to_binary().unwrap();
        assert_eq!(ResponseMessage::from_binary(&bytes).unwrap(), msg);
    }
}
