//! SDO abort code registry
//!
//! Every failure that the object model or the SDO/CoE services report to a remote
//! client is one of these. The numeric values are part of the CANopen/EtherCAT wire
//! protocol and must never change once published -- wire compatibility depends on
//! them being bit-exact.

use int_enum::IntEnum;

/// A CANopen/EtherCAT SDO abort code.
///
/// `Ok` (0) is only used as the "success" discriminant of a response's overall
/// result; it is never returned from [`crate::error`] paths, which use
/// `Result<T, AbortCode>` and so never construct the success variant as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntEnum)]
#[repr(u32)]
pub enum AbortCode {
    /// Not an error: the operation completed successfully.
    Ok = 0x0000_0000,
    /// Toggle bit not alternated (segmented transfer protocol violation).
    ToggleNotAlternated = 0x0503_0000,
    /// SDO protocol timed out.
    ProtocolTimeout = 0x0504_0000,
    /// CRC error (block transfer only).
    CrcError = 0x0504_0004,
    /// Out of memory.
    OutOfMemory = 0x0504_0005,
    /// Unsupported access to an object.
    UnsupportedAccess = 0x0601_0000,
    /// Attempt to read a write-only object.
    AttemptToReadWriteOnlyObject = 0x0601_0001,
    /// Attempt to write a read-only object.
    AttemptToWriteReadOnlyObject = 0x0601_0002,
    /// Subindex cannot be written; SI0 must be 0 for write access (RECORD SI0 is
    /// constant).
    SubindexCannotBeWrittenSi0MustBeZero = 0x0601_0003,
    /// Complete Access is not supported for objects of variable length.
    CompleteAccessNotSupportedForVariableLength = 0x0601_0004,
    /// The object length exceeds the mailbox size.
    ObjectLengthExceedsMailbox = 0x0601_0005,
    /// Object is mapped to an RxPDO; SDO download blocked.
    ObjectMappedToRxPdo = 0x0601_0006,
    /// Object does not exist in the object dictionary.
    ObjectDoesNotExist = 0x0602_0000,
    /// Object cannot be mapped to a PDO.
    CannotMapToPdo = 0x0604_0041,
    /// Number and length of objects to be mapped would exceed the PDO length.
    MappingExceedsPdoLength = 0x0604_0042,
    /// General parameter incompatibility.
    ParameterIncompatibility = 0x0604_0043,
    /// General internal incompatibility in the device.
    InternalIncompatibility = 0x0604_0047,
    /// Access failed due to a hardware error.
    HardwareError = 0x0606_0000,
    /// Data type does not match; length of service parameter does not match.
    DataTypeMismatch = 0x0607_0010,
    /// Data type does not match; length of service parameter too long.
    DataTypeMismatchTooLong = 0x0607_0012,
    /// Data type does not match; length of service parameter too short.
    DataTypeMismatchTooSmall = 0x0607_0013,
    /// Subindex does not exist.
    SubindexDoesNotExist = 0x0609_0011,
    /// Value range of parameter exceeded (download only).
    ValueRangeExceeded = 0x0609_0030,
    /// Value of parameter written is too high.
    ValueTooHigh = 0x0609_0031,
    /// Value of parameter written is too low.
    ValueTooLow = 0x0609_0032,
    /// Configured module list does not match actual hardware.
    ConfiguredModuleMismatch = 0x060a_0023,
    /// Maximum value is less than minimum value.
    MaxLessThanMin = 0x0609_0036,
    /// General error.
    GeneralError = 0x0800_0000,
    /// Data cannot be transferred or stored to the application.
    DataCannotBeTransferredToApp = 0x0800_0020,
    /// Data cannot be transferred or stored to the application because of local
    /// control.
    DataCannotBeTransferredLocalControl = 0x0800_0021,
    /// Data cannot be transferred or stored to the application because of the
    /// present device state.
    DataCannotBeTransferredDeviceState = 0x0800_0022,
    /// Object dictionary dynamic generation failed, or no object dictionary is
    /// present.
    ObjectDictionaryCreationFailed = 0x0800_0023,
}

impl AbortCode {
    /// Short, human-readable name, suitable for log lines and CLI error output.
    pub fn name(&self) -> &'static str {
        use AbortCode::*;
        match self {
            Ok => "ok",
            ToggleNotAlternated => "toggle not alternated",
            ProtocolTimeout => "SDO protocol timed out",
            CrcError => "CRC error",
            OutOfMemory => "out of memory",
            UnsupportedAccess => "unsupported access to an object",
            AttemptToReadWriteOnlyObject => "attempt to read a write-only object",
            AttemptToWriteReadOnlyObject => "attempt to write a read-only object",
            SubindexCannotBeWrittenSi0MustBeZero => {
                "subindex cannot be written, SI0 must be 0"
            }
            CompleteAccessNotSupportedForVariableLength => {
                "complete access not supported for variable length objects"
            }
            ObjectLengthExceedsMailbox => "object length exceeds mailbox size",
            ObjectMappedToRxPdo => "object is mapped to an RxPDO",
            ObjectDoesNotExist => "object does not exist in the object dictionary",
            CannotMapToPdo => "object cannot be mapped to a PDO",
            MappingExceedsPdoLength => "mapping exceeds PDO length",
            ParameterIncompatibility => "general parameter incompatibility",
            InternalIncompatibility => "general internal incompatibility",
            HardwareError => "access failed due to a hardware error",
            DataTypeMismatch => "data type mismatch",
            DataTypeMismatchTooLong => "data type mismatch, length too long",
            DataTypeMismatchTooSmall => "data type mismatch, length too short",
            SubindexDoesNotExist => "subindex does not exist",
            ValueRangeExceeded => "value range exceeded",
            ValueTooHigh => "value of parameter written too high",
            ValueTooLow => "value of parameter written too low",
            ConfiguredModuleMismatch => "configured module list does not match hardware",
            MaxLessThanMin => "maximum value is less than minimum value",
            GeneralError => "general error",
            DataCannotBeTransferredToApp => "data cannot be transferred to the application",
            DataCannotBeTransferredLocalControl => {
                "data cannot be transferred to the application because of local control"
            }
            DataCannotBeTransferredDeviceState => {
                "data cannot be transferred to the application because of the device state"
            }
            ObjectDictionaryCreationFailed => "object dictionary creation failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_bit_exact() {
        assert_eq!(AbortCode::ObjectDoesNotExist.int_value(), 0x0602_0000);
        assert_eq!(AbortCode::SubindexDoesNotExist.int_value(), 0x0609_0011);
        assert_eq!(AbortCode::Ok.int_value(), 0);
    }

    #[test]
    fn round_trips_through_u32() {
        for code in [
            AbortCode::ToggleNotAlternated,
            AbortCode::DataTypeMismatchTooLong,
            AbortCode::GeneralError,
        ] {
            let raw = code.int_value();
            assert_eq!(AbortCode::from_int(raw).unwrap(), code);
        }
    }
}
