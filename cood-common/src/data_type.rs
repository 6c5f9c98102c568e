//! CANopen data type catalog
//!
//! Every subindex in the object dictionary has one of these types. Each type has a
//! fixed CANopen bit width (strings are the exception; their width scales with the
//! element count) and a byte- vs bit-based classification, used to decide whether a
//! subindex is packed into a byte-aligned field or stuffed at the bit level during
//! Complete Access transfers.

/// A CANopen data type, as would appear in object 0x1000-ish Identity records or in
/// the `dataType` field of an SDO Information service response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DataType {
    /// A "gap" in a RECORD: reads as zero, writes are discarded, no hooks run.
    #[default]
    Null = 0,
    Boolean = 1,
    Integer8 = 2,
    Integer16 = 3,
    Integer32 = 4,
    Unsigned8 = 5,
    Unsigned16 = 6,
    Unsigned32 = 7,
    Real32 = 8,
    VisibleString = 9,
    OctetString = 0xa,
    UnicodeString = 0xb,
    Integer64 = 0x15,
    Unsigned64 = 0x1b,
    Real64 = 0x11,
    /// 1-bit packed boolean, distinct from [`DataType::Boolean`] which is byte-aligned.
    BooleanNativeBit1 = 0x30,
    Bit1 = 0x31,
    Bit2 = 0x32,
    Bit3 = 0x33,
    Bit4 = 0x34,
    Bit5 = 0x35,
    Bit6 = 0x36,
    Bit7 = 0x37,
    Bit8 = 0x38,
}

impl TryFrom<u16> for DataType {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use DataType::*;
        Ok(match value {
            0 => Null,
            1 => Boolean,
            2 => Integer8,
            3 => Integer16,
            4 => Integer32,
            5 => Unsigned8,
            6 => Unsigned16,
            7 => Unsigned32,
            8 => Real32,
            9 => VisibleString,
            0xa => OctetString,
            0xb => UnicodeString,
            0x11 => Real64,
            0x15 => Integer64,
            0x1b => Unsigned64,
            0x30 => BooleanNativeBit1,
            0x31 => Bit1,
            0x32 => Bit2,
            0x33 => Bit3,
            0x34 => Bit4,
            0x35 => Bit5,
            0x36 => Bit6,
            0x37 => Bit7,
            0x38 => Bit8,
            _ => return Err(()),
        })
    }
}

impl DataType {
    /// True for the three variable-length string types.
    pub fn is_str(&self) -> bool {
        matches!(
            self,
            DataType::VisibleString | DataType::OctetString | DataType::UnicodeString
        )
    }

    /// True for types which are packed at the bit level rather than byte-aligned.
    ///
    /// Everything else -- including [`DataType::Boolean`], which is logically a single
    /// bit of information but occupies a full byte on the wire -- is byte-based.
    pub fn is_bit_based(&self) -> bool {
        use DataType::*;
        matches!(
            self,
            BooleanNativeBit1 | Bit1 | Bit2 | Bit3 | Bit4 | Bit5 | Bit6 | Bit7 | Bit8
        )
    }

    /// Fixed bit width of one element of this type, or `None` for string types whose
    /// width depends on the element count (see [`DataType::size_of`]).
    fn fixed_bit_width(&self) -> Option<u32> {
        use DataType::*;
        Some(match self {
            Null => 0,
            Boolean => 8,
            Integer8 | Unsigned8 => 8,
            Integer16 | Unsigned16 => 16,
            Integer32 | Unsigned32 | Real32 => 32,
            Integer64 | Unsigned64 | Real64 => 64,
            BooleanNativeBit1 => 1,
            Bit1 => 1,
            Bit2 => 2,
            Bit3 => 3,
            Bit4 => 4,
            Bit5 => 5,
            Bit6 => 6,
            Bit7 => 7,
            Bit8 => 8,
            VisibleString | OctetString | UnicodeString => return None,
        })
    }

    /// Per-character bit width for string types.
    fn char_bit_width(&self) -> u32 {
        match self {
            DataType::UnicodeString => 16,
            _ => 8,
        }
    }

    /// Total CANopen bit size of a subindex of this type holding `n_elements`
    /// elements. For non-string types `n_elements` should be 1; it is still honored
    /// (multiplied through) so callers don't need a special case.
    pub fn size_of(&self, n_elements: usize) -> usize {
        let n_elements = n_elements.max(1);
        match self.fixed_bit_width() {
            Some(bits) => bits as usize * n_elements,
            None => self.char_bit_width() as usize * n_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_ignores_n_elements_scaling_for_scalars() {
        assert_eq!(DataType::Unsigned32.size_of(1), 32);
        assert_eq!(DataType::Boolean.size_of(1), 8);
    }

    #[test]
    fn strings_scale_with_element_count() {
        assert_eq!(DataType::VisibleString.size_of(10), 80);
        assert_eq!(DataType::UnicodeString.size_of(10), 160);
    }

    #[test]
    fn bit_based_classification() {
        assert!(DataType::Bit1.is_bit_based());
        assert!(DataType::BooleanNativeBit1.is_bit_based());
        assert!(!DataType::Boolean.is_bit_based());
        assert!(!DataType::Unsigned8.is_bit_based());
    }

    #[test]
    fn round_trips_through_u16() {
        for dt in [
            DataType::Null,
            DataType::Boolean,
            DataType::Integer64,
            DataType::Bit8,
        ] {
            let code = dt as u16;
            assert_eq!(DataType::try_from(code), Ok(dt));
        }
    }
}
