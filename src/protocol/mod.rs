//! Wire Protocol
//!
//! Request decoding and reply encoding for the simplified Redis framing the
//! server speaks.
//!
//! ## Modules
//!
//! - `decoder`: splits a request buffer into a typed [`Command`]
//! - `types`: the [`Reply`] enum and its serialization
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{decode, Command, Reply};
//!
//! let cmd = decode(b"*1\r\n$4\r\nPING\r\n").unwrap();
//! assert_eq!(cmd, Command::Ping);
//! assert_eq!(Reply::pong().serialize(), b"+PONG\r\n");
//! ```

pub mod decoder;
pub mod types;

pub use decoder::{decode, decode_frame, Command, DecodeError, DecodeResult};
pub use types::Reply;
