//! Component B: the polymorphic object model.
//!
//! `Object` is a tagged union over the three CANopen object shapes. The C++ source
//! this is drawn from used inheritance (`Object` + `ObjectVAR/ARRAY/RECORD`); here
//! that becomes a sum type with per-variant data, dynamic dispatch confined to the
//! handful of entry points below.

mod array;
mod hooks;
mod record;
mod spec;
mod storage;
mod var;

pub use array::Array;
pub use hooks::{AfterWriteCtx, BeforeReadCtx, BeforeWriteCtx, Hooks};
pub use record::Record;
pub use spec::SubindexSpec;
pub use storage::{share, ConstantStorage, ObjectStorage, SharedStorage};
pub use var::Variable;

use cood_common::error::{FrameError, StreamError};
use cood_common::remote::{ObjectCode, ObjectMeta};
use cood_common::stream::{BitStreamReader, BitStreamWriter, RemainingBits};
use cood_common::{codec, AbortCode, DataType, Value};
use parking_lot::MutexGuard;

/// A CANopen object: VARIABLE, ARRAY, or RECORD.
pub enum Object {
    Variable(Variable),
    Array(Array),
    Record(Record),
}

impl Object {
    fn storage(&self) -> &SharedStorage {
        match self {
            Object::Variable(v) => &v.storage,
            Object::Array(a) => &a.storage,
            Object::Record(r) => &r.storage,
        }
    }

    fn hooks(&self) -> &Hooks {
        match self {
            Object::Variable(v) => &v.hooks,
            Object::Array(a) => &a.hooks,
            Object::Record(r) => &r.hooks,
        }
    }

    fn element_for(&self, si: u8) -> usize {
        match self {
            Object::Variable(_) => 0,
            Object::Array(_) | Object::Record(_) => si as usize,
        }
    }

    /// Static description of subindex `si`, or `None` if it does not exist.
    fn si_spec(&self, si: u8) -> Option<SubindexSpec> {
        match self {
            Object::Variable(v) => (si == 0).then(|| v.spec.clone()),
            Object::Array(a) => {
                if si == 0 {
                    Some(SubindexSpec::scalar(DataType::Unsigned8, a.si0_attributes))
                } else if si <= a.max_n_subindices {
                    Some(a.element_spec.clone())
                } else {
                    None
                }
            }
            Object::Record(r) => {
                if si == 0 {
                    Some(SubindexSpec::scalar(DataType::Unsigned8, cood_common::Attributes::read_constant()))
                } else {
                    r.subs.get(si as usize - 1).cloned()
                }
            }
        }
    }

    fn nonexistent_code(si: u8) -> AbortCode {
        if si == 0 {
            AbortCode::ObjectDoesNotExist
        } else {
            AbortCode::SubindexDoesNotExist
        }
    }

    /// Current value of SI0: the element count for ARRAY, the constant subindex
    /// count for RECORD. Meaningless (and never read) for VARIABLE.
    fn si0_value(&self, guard: &dyn ObjectStorage) -> u8 {
        match self {
            Object::Variable(_) => 0,
            Object::Array(_) => guard.element_count() as u8,
            Object::Record(r) => r.si0_value(),
        }
    }

    // ---- read accessors requiring no data mutex ----

    pub fn object_code(&self) -> ObjectCode {
        match self {
            Object::Variable(_) => ObjectCode::Variable,
            Object::Array(_) => ObjectCode::Array,
            Object::Record(_) => ObjectCode::Record,
        }
    }

    pub fn object_data_type(&self) -> DataType {
        match self {
            Object::Variable(v) => v.spec.data_type,
            Object::Array(a) => a.element_spec.data_type,
            Object::Record(_) => DataType::Null,
        }
    }

    pub fn object_name(&self) -> Option<&str> {
        match self {
            Object::Variable(v) => v.name.as_deref(),
            Object::Array(a) => a.name.as_deref(),
            Object::Record(r) => r.name.as_deref(),
        }
    }

    pub fn object_meta(&self) -> ObjectMeta {
        spec::object_meta(self.object_code(), self.object_data_type(), self.max_n_subindices())
    }

    /// Constant for the life of the object: for ARRAY/RECORD, the highest
    /// addressable subindex number (SI_max); 0 for VARIABLE.
    pub fn max_n_subindices(&self) -> u8 {
        match self {
            Object::Variable(_) => 0,
            Object::Array(a) => a.max_n_subindices,
            Object::Record(r) => r.subs.len() as u8,
        }
    }

    /// True for a RECORD subindex that is entirely absent from CANopen's
    /// view: zero Complete Access bits, never individually addressable.
    pub fn is_empty(&self, si: u8) -> bool {
        self.si_spec(si).map(|s| s.is_empty_slot()).unwrap_or(false)
    }

    /// True for a width-bearing RECORD gap: occupies its declared width in
    /// Complete Access, reads as zero, discards writes, runs no hooks.
    pub fn is_gap(&self, si: u8) -> bool {
        self.si_spec(si).map(|s| s.is_gap()).unwrap_or(false)
    }

    pub fn data_type(&self, si: u8) -> Option<DataType> {
        self.si_spec(si).map(|s| s.data_type)
    }

    pub fn attributes(&self, si: u8) -> Option<cood_common::Attributes> {
        self.si_spec(si).map(|s| s.attributes)
    }

    pub fn max_size_bits(&self, si: u8) -> Option<u32> {
        self.si_spec(si).map(|s| s.max_size_bits())
    }

    pub fn name(&self, si: u8) -> Option<String> {
        self.si_spec(si).and_then(|s| s.name)
    }

    pub fn app_specific_metadata(&self, si: u8) -> Option<Vec<u8>> {
        self.si_spec(si).and_then(|s| s.app_specific_metadata)
    }

    // ---- runtime accessors requiring the data mutex ----

    pub fn lock_data(&self) -> MutexGuard<'_, dyn ObjectStorage> {
        self.storage().lock()
    }

    pub fn n_subindices(&self) -> u8 {
        match self {
            Object::Variable(_) => 1,
            Object::Array(a) => {
                let guard = a.storage.lock();
                guard.element_count() as u8 + 1
            }
            Object::Record(r) => r.subs.len() as u8 + 1,
        }
    }

    pub fn subindex_actual_size_bits(&self, si: u8) -> Result<u32, AbortCode> {
        let spec = self.si_spec(si).ok_or_else(|| Self::nonexistent_code(si))?;
        if spec.is_empty_slot() {
            return Err(AbortCode::SubindexDoesNotExist);
        }
        if spec.is_gap() {
            return Ok(spec.max_size_bits());
        }
        let hook_result = self.hooks().run_before_read(BeforeReadCtx {
            si,
            complete_access: false,
            size_query: true,
        });
        if hook_result != AbortCode::Ok {
            return Err(hook_result);
        }
        if !spec.data_type.is_str() {
            return Ok(spec.max_size_bits());
        }
        let guard = self.storage().lock();
        let value = guard.get(self.element_for(si));
        Ok(spec.data_type.size_of(value.n_elements()) as u32)
    }

    pub fn object_stream_size(&self, si0_as_u16: bool) -> u32 {
        let mut total = if si0_as_u16 { 16 } else { 8 };
        for si in 1..=self.max_n_subindices() {
            if let Some(spec) = self.si_spec(si) {
                total += spec.max_size_bits();
            }
        }
        total
    }

    // ---- single-subindex read/write ----

    pub fn read(&self, si: u8, permissions: u16, writer: &mut BitStreamWriter) -> Result<AbortCode, FrameError> {
        let spec = match self.si_spec(si) {
            Some(s) => s,
            None => return Ok(Self::nonexistent_code(si)),
        };
        if spec.is_empty_slot() {
            return Ok(AbortCode::SubindexDoesNotExist);
        }
        let allowed = spec.attributes.intersect(permissions);
        if !allowed.is_readable() {
            return Ok(if spec.attributes.is_writable() {
                AbortCode::AttemptToReadWriteOnlyObject
            } else {
                AbortCode::UnsupportedAccess
            });
        }

        if spec.is_gap() {
            write_zeros(writer, spec.max_size_bits())?;
            return Ok(AbortCode::Ok);
        }

        let guard = self.storage().lock();
        let hook_result = self.hooks().run_before_read(BeforeReadCtx {
            si,
            complete_access: false,
            size_query: false,
        });
        if hook_result != AbortCode::Ok {
            return Ok(hook_result);
        }
        let value = guard.get(self.element_for(si));
        drop(guard);

        codec::encode(&value, 0, writer, false)?;
        Ok(AbortCode::Ok)
    }

    pub fn write(&self, si: u8, permissions: u16, reader: &mut BitStreamReader<'_>) -> Result<AbortCode, FrameError> {
        let spec = match self.si_spec(si) {
            Some(s) => s,
            None => return Ok(Self::nonexistent_code(si)),
        };

        if spec.is_empty_slot() {
            return Ok(AbortCode::SubindexDoesNotExist);
        }

        if si == 0 {
            match self {
                Object::Record(_) => return Ok(AbortCode::SubindexCannotBeWrittenSi0MustBeZero),
                Object::Array(a) if !a.si0_writable() => {
                    return Ok(AbortCode::AttemptToWriteReadOnlyObject)
                }
                _ => {}
            }
        }

        let allowed = spec.attributes.intersect(permissions);
        if !allowed.is_writable() {
            return Ok(if spec.attributes.is_readable() {
                AbortCode::AttemptToWriteReadOnlyObject
            } else {
                AbortCode::UnsupportedAccess
            });
        }

        if spec.is_gap() {
            consume_bits(reader, spec.max_size_bits())?;
            return Ok(AbortCode::Ok);
        }

        let value = match codec::decode(reader, spec.data_type, 0) {
            Ok(v) => v,
            Err(FrameError::Stream { source: StreamError::Empty { .. } }) => {
                return Ok(AbortCode::DataTypeMismatchTooSmall)
            }
            Err(e) => return Err(e),
        };
        if codec::check_no_trailing_data(reader).is_err() {
            return Ok(AbortCode::DataTypeMismatchTooLong);
        }

        let hook_result = self.hooks().run_before_write(BeforeWriteCtx {
            si,
            complete_access: false,
        });
        if hook_result != AbortCode::Ok {
            return Ok(hook_result);
        }

        let commit_result = {
            let mut guard = self.storage().lock();
            if si == 0 {
                match (&value, self) {
                    (Value::Unsigned8(n), Object::Array(_)) => guard.set_element_count(*n as usize),
                    _ => Err(AbortCode::DataTypeMismatch),
                }
            } else {
                guard.set(self.element_for(si), value)
            }
        };
        match commit_result {
            Ok(()) => {}
            Err(code) => return Ok(code),
        }

        self.hooks().run_after_write(AfterWriteCtx {
            si,
            complete_access: false,
        });
        Ok(AbortCode::Ok)
    }

    // ---- Complete Access ----

    pub fn complete_read(
        &self,
        include_si0: bool,
        si0_as_u16: bool,
        permissions: u16,
        writer: &mut BitStreamWriter,
    ) -> Result<AbortCode, FrameError> {
        if matches!(self, Object::Variable(_)) {
            return Ok(AbortCode::UnsupportedAccess);
        }

        let guard = self.storage().lock();
        let last_si = self.si0_value(&*guard);

        if include_si0 {
            if si0_as_u16 {
                writer.write_uint16(last_si as u16)?;
            } else {
                writer.write_uint8(last_si)?;
            }
        }

        let hook_si = if include_si0 { 0 } else { 1 };
        let hook_result = self.hooks().run_before_read(BeforeReadCtx {
            si: hook_si,
            complete_access: true,
            size_query: false,
        });
        if hook_result != AbortCode::Ok {
            return Ok(hook_result);
        }

        for si in 1..=last_si {
            let spec = match self.si_spec(si) {
                Some(s) => s,
                None => continue,
            };
            if spec.is_empty_slot() {
                continue;
            }
            if !spec.data_type.is_bit_based() {
                writer.align_to_byte_boundary(false)?;
            }
            if spec.is_gap() {
                write_zeros(writer, spec.max_size_bits())?;
                continue;
            }
            if spec.attributes.is_readable() {
                if !spec.attributes.intersect(permissions).is_readable() {
                    return Ok(AbortCode::AttemptToReadWriteOnlyObject);
                }
                let value = guard.get(self.element_for(si));
                codec::encode(&value, spec.max_n_elements, writer, true)?;
            } else {
                write_zeros(writer, spec.max_size_bits())?;
            }
        }
        Ok(AbortCode::Ok)
    }

    pub fn complete_write(
        &self,
        include_si0: bool,
        si0_as_u16: bool,
        permissions: u16,
        reader: &mut BitStreamReader<'_>,
        expected_remaining_bits: RemainingBits,
    ) -> Result<AbortCode, FrameError> {
        if matches!(self, Object::Variable(_)) {
            return Ok(AbortCode::UnsupportedAccess);
        }

        let new_si0 = if include_si0 {
            Some(if si0_as_u16 {
                reader.read_uint16()? as u32
            } else {
                reader.read_uint8()? as u32
            })
        } else {
            None
        };

        let mut guard = self.storage().lock();
        let current_si0 = self.si0_value(&*guard) as u32;

        let last_si = match self {
            Object::Array(a) => match new_si0 {
                Some(v) if a.si0_writable() => {
                    if v as usize > a.max_n_subindices as usize {
                        return Ok(AbortCode::ValueRangeExceeded);
                    }
                    v as u8
                }
                Some(v) if v == current_si0 => current_si0 as u8,
                Some(_) => return Ok(AbortCode::DataTypeMismatch),
                None => guard.element_count() as u8,
            },
            Object::Record(r) => {
                if let Some(v) = new_si0 {
                    if v != current_si0 {
                        return Ok(AbortCode::SubindexCannotBeWrittenSi0MustBeZero);
                    }
                }
                r.si0_value()
            }
            Object::Variable(_) => unreachable!(),
        };

        let hook_si = if include_si0 { 0 } else { 1 };
        let hook_result = self.hooks().run_before_write(BeforeWriteCtx {
            si: hook_si,
            complete_access: true,
        });
        if hook_result != AbortCode::Ok {
            return Ok(hook_result);
        }

        for si in 1..=last_si {
            let spec = match self.si_spec(si) {
                Some(s) => s,
                None => continue,
            };
            if spec.is_empty_slot() {
                continue;
            }
            if !spec.data_type.is_bit_based() {
                reader.align_to_byte_boundary()?;
            }
            if spec.is_gap() {
                consume_bits(reader, spec.max_size_bits())?;
                continue;
            }
            if spec.attributes.is_writable() {
                if !spec.attributes.intersect(permissions).is_writable() {
                    return Ok(AbortCode::AttemptToWriteReadOnlyObject);
                }
                let value = match codec::decode(reader, spec.data_type, spec.max_n_elements) {
                    Ok(v) => v,
                    Err(FrameError::Stream { source: StreamError::Empty { .. } }) => {
                        return Ok(AbortCode::DataTypeMismatchTooSmall)
                    }
                    Err(e) => return Err(e),
                };
                if let Err(code) = guard.set(self.element_for(si), value) {
                    return Ok(code);
                }
            } else {
                consume_bits(reader, spec.max_size_bits())?;
            }
        }

        if let (Object::Array(a), Some(v)) = (self, new_si0) {
            if a.si0_writable() && v != current_si0 {
                if let Err(code) = guard.set_element_count(v as usize) {
                    return Ok(code);
                }
            }
        }

        if !reader.remaining_matches(expected_remaining_bits) {
            return Ok(AbortCode::DataTypeMismatchTooLong);
        }

        drop(guard);
        self.hooks().run_after_write(AfterWriteCtx {
            si: hook_si,
            complete_access: true,
        });
        Ok(AbortCode::Ok)
    }
}

fn write_zeros(writer: &mut BitStreamWriter, mut n_bits: u32) -> Result<(), FrameError> {
    while n_bits > 0 {
        let chunk = n_bits.min(32);
        writer.write_bits(0, chunk as u8)?;
        n_bits -= chunk;
    }
    Ok(())
}

fn consume_bits(reader: &mut BitStreamReader<'_>, mut n_bits: u32) -> Result<(), FrameError> {
    while n_bits > 0 {
        let chunk = n_bits.min(32);
        reader.read_bits(chunk as u8)?;
        n_bits -= chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cood_common::stream::BitStreamReader as Reader;
    use cood_common::Attributes;

    struct Cell(Value);
    impl ObjectStorage for Cell {
        fn get(&self, _element: usize) -> Value {
            self.0.clone()
        }
        fn set(&mut self, _element: usize, value: Value) -> Result<(), AbortCode> {
            self.0 = value;
            Ok(())
        }
    }

    fn u8_var(attrs: Attributes, initial: u8) -> Object {
        Object::Variable(Variable::new(
            SubindexSpec::scalar(DataType::Unsigned8, attrs),
            share(Cell(Value::Unsigned8(initial))),
        ))
    }

    #[test]
    fn write_then_read_round_trips() {
        let obj = u8_var(Attributes::read_write(), 0);
        let mut w = BitStreamWriter::new();
        w.write_uint8(0x42).unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let result = obj.write(0, cood_common::attributes::WRITE_ANY, &mut r).unwrap();
        assert_eq!(result, AbortCode::Ok);

        let mut w = BitStreamWriter::new();
        let result = obj.read(0, cood_common::attributes::READ_ANY, &mut w).unwrap();
        assert_eq!(result, AbortCode::Ok);
        assert_eq!(w.into_bytes(), vec![0x42]);
    }

    #[test]
    fn write_to_read_only_is_rejected() {
        let obj = u8_var(Attributes::read_only(), 0);
        let mut w = BitStreamWriter::new();
        w.write_uint8(1).unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let result = obj.write(0, cood_common::attributes::WRITE_ANY, &mut r).unwrap();
        assert_eq!(result, AbortCode::AttemptToWriteReadOnlyObject);
    }

    #[test]
    fn nonexistent_subindex() {
        let obj = u8_var(Attributes::read_write(), 0);
        let mut w = BitStreamWriter::new();
        assert_eq!(
            obj.read(1, cood_common::attributes::READ_ANY, &mut w).unwrap(),
            AbortCode::SubindexDoesNotExist
        );
    }

    #[test]
    fn record_empty_slot_reads_as_subindex_does_not_exist_for_single_access() {
        let subs = vec![
            SubindexSpec::scalar(DataType::Unsigned32, Attributes::read_write()),
            SubindexSpec::empty(),
        ];
        let obj = Object::Record(Record::new(subs, share(Cell(Value::Unsigned32(0)))));
        let mut w = BitStreamWriter::new();
        assert_eq!(
            obj.read(2, cood_common::attributes::READ_ANY, &mut w).unwrap(),
            AbortCode::SubindexDoesNotExist
        );
    }

    #[test]
    fn complete_read_on_variable_is_unsupported() {
        let obj = u8_var(Attributes::read_write(), 0);
        let mut w = BitStreamWriter::new();
        assert_eq!(
            obj.complete_read(true, false, cood_common::attributes::READ_ANY, &mut w)
                .unwrap(),
            AbortCode::UnsupportedAccess
        );
    }

    fn record_with_gap() -> Object {
        let subs = vec![
            SubindexSpec::scalar(DataType::Unsigned8, Attributes::read_write()),
            SubindexSpec::gap(Attributes::read_write(), 16),
            SubindexSpec::scalar(DataType::Unsigned8, Attributes::read_write()),
        ];
        Object::Record(Record::new(
            subs,
            share(RecordCells(vec![Value::Unsigned8(1), Value::Unsigned8(0), Value::Unsigned8(3)])),
        ))
    }

    struct RecordCells(Vec<Value>);
    impl ObjectStorage for RecordCells {
        fn get(&self, element: usize) -> Value {
            self.0[element - 1].clone()
        }
        fn set(&mut self, element: usize, value: Value) -> Result<(), AbortCode> {
            self.0[element - 1] = value;
            Ok(())
        }
    }

    #[test]
    fn complete_read_pads_gap_to_its_declared_width() {
        let obj = record_with_gap();
        let mut w = BitStreamWriter::new();
        let result = obj
            .complete_read(false, false, cood_common::attributes::READ_ANY, &mut w)
            .unwrap();
        assert_eq!(result, AbortCode::Ok);
        // SI1 (1 byte) + gap (2 bytes of zero) + SI3 (1 byte) = 4 bytes.
        assert_eq!(w.into_bytes(), vec![1, 0, 0, 3]);
    }

    #[test]
    fn complete_write_consumes_the_gaps_declared_width() {
        let obj = record_with_gap();
        let mut w = BitStreamWriter::new();
        w.write_uint8(9).unwrap();
        w.write_uint16(0xffff).unwrap();
        w.write_uint8(10).unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let result = obj
            .complete_write(
                false,
                false,
                cood_common::attributes::WRITE_ANY,
                &mut r,
                cood_common::stream::RemainingBits::SevenOrLess,
            )
            .unwrap();
        assert_eq!(result, AbortCode::Ok);

        let mut w = BitStreamWriter::new();
        obj.complete_read(false, false, cood_common::attributes::READ_ANY, &mut w)
            .unwrap();
        assert_eq!(w.into_bytes(), vec![9, 0, 0, 10]);
    }

    #[test]
    fn single_access_gap_read_is_zero_and_write_is_discarded() {
        let obj = record_with_gap();
        let mut w = BitStreamWriter::new();
        let result = obj.read(2, cood_common::attributes::READ_ANY, &mut w).unwrap();
        assert_eq!(result, AbortCode::Ok);
        assert_eq!(w.into_bytes(), vec![0, 0]);

        let mut wr = BitStreamWriter::new();
        wr.write_uint16(0xabcd).unwrap();
        let bytes = wr.into_bytes();
        let mut r = Reader::new(&bytes);
        let result = obj.write(2, cood_common::attributes::WRITE_ANY, &mut r).unwrap();
        assert_eq!(result, AbortCode::Ok);
    }

    struct StringCell(Value);
    impl ObjectStorage for StringCell {
        fn get(&self, _element: usize) -> Value {
            self.0.clone()
        }
        fn set(&mut self, _element: usize, value: Value) -> Result<(), AbortCode> {
            self.0 = value;
            Ok(())
        }
    }

    #[test]
    fn single_access_string_write_uses_actual_transfer_length_not_declared_max() {
        let obj = Object::Variable(Variable::new(
            SubindexSpec::string(DataType::VisibleString, Attributes::read_write(), 8),
            share(StringCell(Value::VisibleString(String::new()))),
        ));

        let mut w = BitStreamWriter::new();
        w.write_bytes(b"hi").unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let result = obj.write(0, cood_common::attributes::WRITE_ANY, &mut r).unwrap();
        assert_eq!(result, AbortCode::Ok);

        let mut w = BitStreamWriter::new();
        let result = obj.read(0, cood_common::attributes::READ_ANY, &mut w).unwrap();
        assert_eq!(result, AbortCode::Ok);
        assert_eq!(w.into_bytes(), b"hi");
    }
}
