//! Per-subindex static metadata, shared across the three object variants.

use cood_common::remote::{ObjectCode, ObjectMeta, SubindexDescriptor};
use cood_common::{Attributes, DataType};

/// Static description of one subindex: everything that does not require the data
/// mutex to inspect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubindexSpec {
    pub data_type: DataType,
    pub attributes: Attributes,
    /// Number of elements (characters, for string types; always 1 otherwise).
    pub max_n_elements: usize,
    /// RECORD only: this subindex is a gap occupying `width_bits` of the
    /// Complete Access stream -- reads as zero, writes are discarded, neither
    /// hook runs. `None` for ordinary subindices and for "empty" subindices
    /// (see [`SubindexSpec::empty`]), which occupy zero Complete Access bits
    /// and are never individually addressable.
    pub gap_width_bits: Option<u32>,
    pub name: Option<String>,
    pub app_specific_metadata: Option<Vec<u8>>,
}

impl SubindexSpec {
    pub fn scalar(data_type: DataType, attributes: Attributes) -> Self {
        Self {
            data_type,
            attributes,
            max_n_elements: 1,
            gap_width_bits: None,
            name: None,
            app_specific_metadata: None,
        }
    }

    /// A `visible_string`/`octet_string`/`unicode_string` subindex whose
    /// Complete Access framing pads or truncates to `max_n_elements`
    /// characters. Single-subindex access ignores this and uses the
    /// transfer's own length instead (see [`cood_common::codec::decode`]).
    pub fn string(data_type: DataType, attributes: Attributes, max_n_elements: usize) -> Self {
        Self {
            max_n_elements,
            ..Self::scalar(data_type, attributes)
        }
    }

    /// A RECORD subindex with no attributes at all: it counts towards SI0 but
    /// occupies zero Complete Access bits and cannot be read or written, even
    /// individually.
    pub fn empty() -> Self {
        Self::scalar(DataType::Null, Attributes::EMPTY)
    }

    /// A RECORD subindex describing a `width_bits`-wide gap used to align
    /// Complete Access framing: reads as zero, discards writes, and invokes
    /// neither hook, whether accessed via Complete Access or individually.
    pub fn gap(attributes: Attributes, width_bits: u32) -> Self {
        Self {
            gap_width_bits: Some(width_bits),
            ..Self::scalar(DataType::Null, attributes)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_app_specific_metadata(mut self, asm: Vec<u8>) -> Self {
        self.app_specific_metadata = Some(asm);
        self
    }

    pub fn max_size_bits(&self) -> u32 {
        self.gap_width_bits
            .unwrap_or_else(|| self.data_type.size_of(self.max_n_elements) as u32)
    }

    /// True for a RECORD subindex entirely absent from CANopen/EtherCAT's
    /// view: it occupies no Complete Access bits, and single-subindex access
    /// always reports `SubindexDoesNotExist`.
    pub fn is_empty_slot(&self) -> bool {
        self.gap_width_bits.is_none() && self.attributes.is_empty()
    }

    /// True for a width-bearing gap: present in the Complete Access stream
    /// and individually addressable, but it reads as zero and discards
    /// writes without invoking either hook.
    pub fn is_gap(&self) -> bool {
        self.gap_width_bits.is_some()
    }

    pub fn to_descriptor(&self) -> SubindexDescriptor {
        SubindexDescriptor {
            data_type: self.data_type,
            attributes: self.attributes,
            max_size_bits: self.max_size_bits(),
            name: self.name.clone(),
            app_specific_metadata: self.app_specific_metadata.clone(),
        }
    }
}

pub fn object_meta(object_code: ObjectCode, data_type: DataType, max_n_subindices: u8) -> ObjectMeta {
    ObjectMeta {
        object_code,
        data_type,
        max_n_subindices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_is_not_a_gap() {
        let spec = SubindexSpec::empty();
        assert!(spec.is_empty_slot());
        assert!(!spec.is_gap());
        assert_eq!(spec.max_size_bits(), 0);
    }

    #[test]
    fn gap_carries_its_own_width_independent_of_null_type() {
        let spec = SubindexSpec::gap(Attributes::read_write(), 24);
        assert!(!spec.is_empty_slot());
        assert!(spec.is_gap());
        assert_eq!(spec.max_size_bits(), 24);
        assert_eq!(spec.data_type, DataType::Null);
    }

    #[test]
    fn string_constructor_sets_a_real_max_n_elements() {
        let spec = SubindexSpec::string(DataType::VisibleString, Attributes::read_write(), 16);
        assert_eq!(spec.max_n_elements, 16);
        assert_eq!(spec.max_size_bits(), 128);
    }
}
