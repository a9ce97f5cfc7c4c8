//! Event-stream transport and decoding.
//!
//! [`transport::open`] issues the HTTP request and hands back the response
//! body as raw byte chunks; [`decode`] turns those chunks into [`Event`]s.
//!
//! [`Event`]: crate::types::Event

mod decoder;
mod frame;
mod newline;
pub mod transport;
mod utf8;

pub use decoder::{decode, EventStream};
pub use frame::{parse_payload, Frame};
pub use newline::NewlineNormalizer;
pub use transport::{ByteStream, StreamRequest, EVENT_STREAM};
pub use utf8::Utf8Decoder;

/// Event stream returned by the client's streaming operations.
pub type ResponseStream = EventStream<ByteStream>;
