//! HTTP client SDK for the Palaver conversational agent API.
//!
//! The interesting part of this crate is the streaming path: a request is
//! opened with `Accept: text/event-stream`, and the response body is decoded
//! incrementally into typed [`Event`]s as bytes arrive.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use palaver_client::{EventKind, PalaverClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = PalaverClient::builder()
//!     .base_url("http://localhost:8080")
//!     .api_key("secret")
//!     .build()?;
//!
//! let mut events = client
//!     .conversations()
//!     .stream_message("conv-123", "Summarize yesterday's tickets")
//!     .await?;
//!
//! while let Some(event) = events.next().await {
//!     let event = event?;
//!     match event.kind {
//!         EventKind::Content => print!("{}", event.text().unwrap_or_default()),
//!         EventKind::ToolStart => println!("\n[tool started]"),
//!         EventKind::Done => println!("\n[Done]"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Dropping the stream before `done` closes the connection.
//!
//! # Decoding rules
//!
//! - Frames are separated by a blank line; `event:` sets the type (last one
//!   wins) and `data:` lines are joined with `\n`.
//! - A frame with data but no `event:` line is `content`; a frame with an
//!   `event:` line but no data carries `{}`.
//! - Payloads that are not JSON objects become `{ "raw": <text> }`.
//! - `done` ends the stream; bytes after it are discarded.

pub mod api;
pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::{ClientBuilder, PalaverClient};
pub use error::{Error, Result};
pub use stream::{decode, EventStream, ResponseStream, StreamRequest};
pub use types::*;
