//! Component D: the remote-access request/response message family.
//!
//! A transport-agnostic wire protocol for reading and writing into a remote object
//! dictionary: tagged-union requests and responses, a shared LIFO return-stack for
//! hop-by-hop routing (used by the multiplexer in `cood-core`), and a fragmentable
//! `ObjectInfoResponse` for objects too large to describe in one message.

pub mod object_info;
pub mod request;
pub mod response;
pub mod return_stack;

pub use object_info::{ObjectCode, ObjectInfoResponse, ObjectInfoResponseBuilder, ObjectMeta, SubindexDescriptor};
pub use request::{AccessType, Request, RequestMessage};
pub use response::{Response, ResponseMessage};
pub use return_stack::{ReturnStack, ReturnStackItem};
