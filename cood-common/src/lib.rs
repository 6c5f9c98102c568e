//! Shared types for the `cood` CANopen object dictionary core.
//!
//! This crate holds everything the object model (in `cood-core`) and any remote
//! client share on the wire: the CANopen data type catalog and codec, the SDO
//! abort code registry, subindex attributes, and the remote-access request/
//! response message family.

pub mod abort;
pub mod attributes;
pub mod codec;
pub mod data_type;
pub mod error;
pub mod remote;
pub mod stream;

pub use abort::AbortCode;
pub use attributes::Attributes;
pub use codec::Value;
pub use data_type::DataType;
pub use error::{FrameError, StreamError};
