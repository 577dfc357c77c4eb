//! Reply Types
//!
//! The server only ever answers with three reply shapes:
//!
//! - `+` Simple String: `+PONG\r\n`, `+OK\r\n`, `+<value>\r\n`
//! - `-` Error: `-ERR <message>\r\n` (sent before closing on a malformed request)
//! - `$-1` Null Bulk String: `$-1\r\n` (missing or expired key)
//!
//! All replies are terminated with CRLF (`\r\n`).

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used by the wire protocol
pub const CRLF: &[u8] = b"\r\n";

/// Reply type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply written back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Format: `+<string>\r\n`
    ///
    /// Stored values are echoed back verbatim in this form. They can never
    /// contain CRLF because the decoder splits tokens on it.
    SimpleString(Bytes),

    /// Format: `-<message>\r\n`
    Error(String),

    /// The null bulk string: `$-1\r\n`
    Null,
}

impl Reply {
    /// Creates a simple string reply.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::Reply;
    /// assert_eq!(Reply::simple_string("hello").serialize(), b"+hello\r\n");
    /// ```
    pub fn simple_string(s: impl Into<Bytes>) -> Self {
        Reply::SimpleString(s.into())
    }

    /// Creates an error reply.
    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    pub fn null() -> Self {
        Reply::Null
    }

    pub fn ok() -> Self {
        Reply::SimpleString(Bytes::from_static(b"OK"))
    }

    pub fn pong() -> Self {
        Reply::SimpleString(Bytes::from_static(b"PONG"))
    }

    /// Serializes the reply to its wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s);
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::SimpleString(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s)),
            Reply::Error(s) => write!(f, "(error) {}", s),
            Reply::Null => write!(f, "(nil)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = Reply::simple_string("bar");
        assert_eq!(value.serialize(), b"+bar\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = Reply::error("ERR wrong number of arguments for 'get' command");
        assert_eq!(
            value.serialize(),
            b"-ERR wrong number of arguments for 'get' command\r\n"
        );
    }

    #[test]
    fn test_null_serialize() {
        let value = Reply::null();
        assert_eq!(value.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_ok_and_pong() {
        assert_eq!(Reply::ok().serialize(), b"+OK\r\n");
        assert_eq!(Reply::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_serialize_into_appends() {
        let mut buf = b"+OK\r\n".to_vec();
        Reply::null().serialize_into(&mut buf);
        assert_eq!(buf, b"+OK\r\n$-1\r\n");
    }

    #[test]
    fn test_display() {
        assert_eq!(Reply::simple_string("v").to_string(), "\"v\"");
        assert_eq!(Reply::null().to_string(), "(nil)");
        assert_eq!(Reply::error("ERR x").to_string(), "(error) ERR x");
    }
}
