//! `ObjectInfoResponse`: per-subindex metadata, with fragmentation and merge support
//! for objects too large to describe in a single `max_response_size` budget.

use crate::abort::AbortCode;
use crate::attributes::Attributes;
use crate::data_type::DataType;
use crate::error::FrameError;
use crate::stream::{BitStreamReader, BitStreamWriter};
use int_enum::IntEnum;

/// The three object shapes, shared between the remote-access layer and the object
/// model so fragments can be identity-checked without `cood-common` depending on
/// `cood-core`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectCode {
    Variable,
    Array,
    Record,
}

/// Object-level metadata included once per `ObjectInfoResponse`, used to verify two
/// fragments describe the same object before merging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    pub object_code: ObjectCode,
    /// For VARIABLE, the subindex's type. For ARRAY, the common element type. For
    /// RECORD, `DataType::Null` (each subindex carries its own type).
    pub data_type: DataType,
    pub max_n_subindices: u8,
}

/// Per-subindex description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubindexDescriptor {
    pub data_type: DataType,
    pub attributes: Attributes,
    pub max_size_bits: u32,
    pub name: Option<String>,
    pub app_specific_metadata: Option<Vec<u8>>,
}

/// Response to an `ObjectInfo` request: metadata for a contiguous run of
/// subindices, possibly only part of the requested range (see [`Self::is_complete`]).
///
/// Unsuccessful responses (`result != AbortCode::Ok`) carry only `result`; every
/// accessor for the rest of the payload fails with that code.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectInfoResponse {
    result: AbortCode,
    incl_names: bool,
    incl_asm: bool,
    object_meta: Option<ObjectMeta>,
    first_si: Option<u8>,
    last_si: Option<u8>,
    descriptors: Vec<SubindexDescriptor>,
}

impl ObjectInfoResponse {
    pub fn error(result: AbortCode) -> Self {
        debug_assert_ne!(result, AbortCode::Ok, "error response must carry a failing code");
        Self {
            result,
            incl_names: false,
            incl_asm: false,
            object_meta: None,
            first_si: None,
            last_si: None,
            descriptors: Vec::new(),
        }
    }

    pub fn result(&self) -> AbortCode {
        self.result
    }

    pub fn is_success(&self) -> bool {
        self.result == AbortCode::Ok
    }

    pub fn object_meta(&self) -> Result<&ObjectMeta, AbortCode> {
        self.object_meta.as_ref().ok_or(self.result)
    }

    pub fn first_si(&self) -> Result<u8, AbortCode> {
        self.first_si.ok_or(self.result)
    }

    pub fn last_si(&self) -> Result<u8, AbortCode> {
        self.last_si.ok_or(self.result)
    }

    pub fn descriptors(&self) -> Result<&[SubindexDescriptor], AbortCode> {
        if self.is_success() {
            Ok(&self.descriptors)
        } else {
            Err(self.result)
        }
    }

    /// `true` if this response (possibly already the result of merging fragments)
    /// fully answers a request for subindices `include_si0_from..=requested_last_si`.
    /// If not, `next_si` is set to the subindex a follow-up request should resume
    /// from.
    ///
    /// For ARRAY objects with `incl_asm == false`, a response covering subindex 1
    /// alone is already complete: all SI >= 1 share identical metadata, so SI1 is a
    /// representative for the rest of the array.
    pub fn is_complete(&self, requested_last_si: u8, next_si: &mut u8) -> bool {
        if !self.is_success() {
            return true;
        }
        let Some(last_si) = self.last_si else {
            *next_si = 0;
            return false;
        };
        if last_si >= requested_last_si {
            return true;
        }
        if let Some(meta) = &self.object_meta {
            if meta.object_code == ObjectCode::Array && !self.incl_asm {
                if let Some(first_si) = self.first_si {
                    if first_si <= 1 && last_si >= 1 {
                        return true;
                    }
                }
            }
        }
        *next_si = last_si + 1;
        false
    }

    /// Merge `other`, a follow-up fragment, into `self`. Requires both responses to
    /// be successful, describe the same object with the same `incl_names`/`incl_asm`
    /// flags, and `other.first_si == self.last_si + 1`.
    pub fn add_fragment(&mut self, other: &ObjectInfoResponse) -> Result<(), FrameError> {
        if !self.is_success() || !other.is_success() {
            return Err(FrameError::MalformedSubindexSequence {
                reason: "cannot merge an unsuccessful ObjectInfoResponse fragment",
            });
        }
        if self.object_meta != other.object_meta
            || self.incl_names != other.incl_names
            || self.incl_asm != other.incl_asm
        {
            return Err(FrameError::MalformedSubindexSequence {
                reason: "fragment does not describe the same object/flags",
            });
        }
        let expected_next = self.last_si.map(|si| si + 1).unwrap_or(0);
        if other.first_si != Some(expected_next) {
            return Err(FrameError::MalformedSubindexSequence {
                reason: "fragment does not continue where this response left off",
            });
        }
        self.descriptors.extend_from_slice(&other.descriptors);
        self.last_si = other.last_si;
        Ok(())
    }

    pub fn to_binary(&self, writer: &mut BitStreamWriter) -> Result<(), FrameError> {
        writer.write_uint32(self.result.int_value())?;
        if !self.is_success() {
            return Ok(());
        }
        writer.write_uint8(self.incl_names as u8)?;
        writer.write_uint8(self.incl_asm as u8)?;

        writer.write_uint8(self.object_meta.is_some() as u8)?;
        if let Some(meta) = &self.object_meta {
            let code = match meta.object_code {
                ObjectCode::Variable => 0u8,
                ObjectCode::Array => 1,
                ObjectCode::Record => 2,
            };
            writer.write_uint8(code)?;
            writer.write_uint16(meta.data_type as u16)?;
            writer.write_uint8(meta.max_n_subindices)?;
        }

        writer.write_uint8(self.first_si.is_some() as u8)?;
        if let Some(si) = self.first_si {
            writer.write_uint8(si)?;
        }
        writer.write_uint8(self.last_si.is_some() as u8)?;
        if let Some(si) = self.last_si {
            writer.write_uint8(si)?;
        }

        writer.write_uint16(self.descriptors.len() as u16)?;
        for d in &self.descriptors {
            writer.write_uint16(d.data_type as u16)?;
            writer.write_uint16(d.attributes.0)?;
            writer.write_uint32(d.max_size_bits)?;
            if self.incl_names {
                let name = d.name.as_deref().unwrap_or("");
                writer.write_uint16(name.len() as u16)?;
                writer.write_bytes(name.as_bytes())?;
            }
            if self.incl_asm {
                let asm = d.app_specific_metadata.as_deref().unwrap_or(&[]);
                writer.write_uint32(asm.len() as u32)?;
                writer.write_bytes(asm)?;
            }
        }
        Ok(())
    }

    pub fn from_binary(reader: &mut BitStreamReader<'_>) -> Result<Self, FrameError> {
        let result = AbortCode::from_int(reader.read_uint32()?)
            .map_err(|_| FrameError::UnknownMessageType { tag: 0xff })?;
        if result != AbortCode::Ok {
            return Ok(Self::error(result));
        }
        let incl_names = reader.read_uint8()? != 0;
        let incl_asm = reader.read_uint8()? != 0;

        let object_meta = if reader.read_uint8()? != 0 {
            let code = match reader.read_uint8()? {
                0 => ObjectCode::Variable,
                1 => ObjectCode::Array,
                2 => ObjectCode::Record,
                other => return Err(FrameError::UnknownMessageType { tag: other }),
            };
            let data_type = DataType::try_from(reader.read_uint16()?)
                .map_err(|_| FrameError::UnknownMessageType { tag: 0xfe })?;
            let max_n_subindices = reader.read_uint8()?;
            Some(ObjectMeta {
                object_code: code,
                data_type,
                max_n_subindices,
            })
        } else {
            None
        };

        let first_si = if reader.read_uint8()? != 0 {
            Some(reader.read_uint8()?)
        } else {
            None
        };
        let last_si = if reader.read_uint8()? != 0 {
            Some(reader.read_uint8()?)
        } else {
            None
        };

        let nb_si = reader.read_uint16()?;
        if let Some(meta) = &object_meta {
            if nb_si > meta.max_n_subindices as u16 + 1 {
                return Err(FrameError::MalformedSubindexSequence {
                    reason: "nbSI exceeds max_n_subindices",
                });
            }
        }
        let mut descriptors = Vec::with_capacity(nb_si as usize);
        for _ in 0..nb_si {
            let data_type = DataType::try_from(reader.read_uint16()?)
                .map_err(|_| FrameError::UnknownMessageType { tag: 0xfd })?;
            let attributes = Attributes::new(reader.read_uint16()?);
            let max_size_bits = reader.read_uint32()?;
            let name = if incl_names {
                let len = reader.read_uint16()? as usize;
                let mut buf = vec![0u8; len];
                reader.read_bytes(&mut buf)?;
                Some(String::from_utf8_lossy(&buf).into_owned())
            } else {
                None
            };
            let app_specific_metadata = if incl_asm {
                let len = reader.read_uint32()? as usize;
                if len * 8 > reader.remaining_bits() {
                    return Err(FrameError::LengthExceedsRemaining {
                        declared: len,
                        remaining: reader.remaining_bits() / 8,
                    });
                }
                let mut buf = vec![0u8; len];
                reader.read_bytes(&mut buf)?;
                Some(buf)
            } else {
                None
            };
            descriptors.push(SubindexDescriptor {
                data_type,
                attributes,
                max_size_bits,
                name,
                app_specific_metadata,
            });
        }

        Ok(Self {
            result,
            incl_names,
            incl_asm,
            object_meta,
            first_si,
            last_si,
            descriptors,
        })
    }
}

/// Incrementally fills an [`ObjectInfoResponse`] within a byte budget, including
/// subindices greedily in order. The minimum useful budget always admits at least
/// one descriptor.
pub struct ObjectInfoResponseBuilder {
    object_meta: ObjectMeta,
    incl_names: bool,
    incl_asm: bool,
    first_si: Option<u8>,
    last_si: Option<u8>,
    descriptors: Vec<SubindexDescriptor>,
    budget_bytes: usize,
    used_bytes: usize,
}

impl ObjectInfoResponseBuilder {
    pub fn new(object_meta: ObjectMeta, incl_names: bool, incl_asm: bool, budget_bytes: usize) -> Self {
        Self {
            object_meta,
            incl_names,
            incl_asm,
            first_si: None,
            last_si: None,
            descriptors: Vec::new(),
            budget_bytes,
            used_bytes: 0,
        }
    }

    fn descriptor_size(&self, d: &SubindexDescriptor) -> usize {
        let mut size = 2 + 2 + 4;
        if self.incl_names {
            size += 2 + d.name.as_deref().unwrap_or("").len();
        }
        if self.incl_asm {
            size += 4 + d.app_specific_metadata.as_deref().unwrap_or(&[]).len();
        }
        size
    }

    /// Try to append the descriptor for subindex `si`. Returns `false` (without
    /// mutating) if it would not fit and at least one descriptor is already present.
    pub fn try_push(&mut self, si: u8, descriptor: SubindexDescriptor) -> bool {
        let size = self.descriptor_size(&descriptor);
        if !self.descriptors.is_empty() && self.used_bytes + size > self.budget_bytes {
            return false;
        }
        if self.first_si.is_none() {
            self.first_si = Some(si);
        }
        self.last_si = Some(si);
        self.used_bytes += size;
        self.descriptors.push(descriptor);
        true
    }

    pub fn finish(self) -> ObjectInfoResponse {
        ObjectInfoResponse {
            result: AbortCode::Ok,
            incl_names: self.incl_names,
            incl_asm: self.incl_asm,
            object_meta: Some(self.object_meta),
            first_si: self.first_si,
            last_si: self.last_si,
            descriptors: self.descriptors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descr(dt: DataType) -> SubindexDescriptor {
        SubindexDescriptor {
            data_type: dt,
            attributes: Attributes::read_write(),
            max_size_bits: dt.size_of(1) as u32,
            name: None,
            app_specific_metadata: None,
        }
    }

    fn meta() -> ObjectMeta {
        ObjectMeta {
            object_code: ObjectCode::Record,
            data_type: DataType::Null,
            max_n_subindices: 12,
        }
    }

    #[test]
    fn error_response_hides_payload() {
        let r = ObjectInfoResponse::error(AbortCode::ObjectDoesNotExist);
        assert!(r.descriptors().is_err());
        assert!(r.object_meta().is_err());
    }

    #[test]
    fn fragments_merge_in_order() {
        let mut b1 = ObjectInfoResponseBuilder::new(meta(), false, false, 1024);
        assert!(b1.try_push(1, descr(DataType::Unsigned8)));
        assert!(b1.try_push(2, descr(DataType::Unsigned16)));
        let mut r1 = b1.finish();

        let mut b2 = ObjectInfoResponseBuilder::new(meta(), false, false, 1024);
        assert!(b2.try_push(3, descr(DataType::Unsigned32)));
        let r2 = b2.finish();

        r1.add_fragment(&r2).unwrap();
        assert_eq!(r1.first_si().unwrap(), 1);
        assert_eq!(r1.last_si().unwrap(), 3);
        assert_eq!(r1.descriptors().unwrap().len(), 3);
    }

    #[test]
    fn non_contiguous_fragment_is_rejected() {
        let mut b1 = ObjectInfoResponseBuilder::new(meta(), false, false, 1024);
        b1.try_push(1, descr(DataType::Unsigned8));
        let mut r1 = b1.finish();

        let mut b2 = ObjectInfoResponseBuilder::new(meta(), false, false, 1024);
        b2.try_push(5, descr(DataType::Unsigned8));
        let r2 = b2.finish();

        assert!(r1.add_fragment(&r2).is_err());
    }

    #[test]
    fn array_representative_subindex_is_complete() {
        let array_meta = ObjectMeta {
            object_code: ObjectCode::Array,
            data_type: DataType::Unsigned8,
            max_n_subindices: 100,
        };
        let mut b = ObjectInfoResponseBuilder::new(array_meta, false, false, 1024);
        b.try_push(1, descr(DataType::Unsigned8));
        let r = b.finish();

        let mut next = 0u8;
        assert!(r.is_complete(99, &mut next));
    }

    #[test]
    fn budget_always_admits_one_descriptor() {
        let mut b = ObjectInfoResponseBuilder::new(meta(), false, false, 0);
        assert!(b.try_push(1, descr(DataType::Unsigned64)));
        assert!(!b.try_push(2, descr(DataType::Unsigned64)));
    }

    #[test]
    fn binary_round_trip() {
        let mut b = ObjectInfoResponseBuilder::new(meta(), true, false, 1024);
        b.try_push(
            1,
            SubindexDescriptor {
                data_type: DataType::Unsigned8,
                attributes: Attributes::read_write(),
                max_size_bits: 8,
                name: Some("foo".to_string()),
                app_specific_metadata: None,
            },
        );
        let r = b.finish();

        let mut writer = BitStreamWriter::new();
        r.to_binary(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BitStreamReader::new(&bytes);
        let decoded = ObjectInfoResponse::from_binary(&mut reader).unwrap();
        assert_eq!(decoded, r);
    }
}
