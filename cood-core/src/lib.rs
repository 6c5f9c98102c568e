//! `cood-core`: the CANopen object model (component B), the object dictionary
//! container (component C), and the remote-access multiplexer (component E).
//!
//! The wire formats these operate on -- the data-type codec, the abort-code
//! registry, and the request/response message family -- live in `cood-common`
//! so they can be shared with transport-side code that never touches an
//! in-process `ObjectDictionary`.

pub mod dict;
pub mod mux;
pub mod object;

pub use dict::{ObjectDictionary, ObjectDictionaryGuard, ObjectHandle, RegistrationError};
pub use mux::{Multiplexer, MultiplexerError, PortHandle};
pub use object::Object;
