//! Request Decoder
//!
//! Turns one request buffer into a [`Command`]. Requests use a simplified
//! array-of-bulk-strings framing:
//!
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<command>\r\n
//! $<len>\r\n<arg1>\r\n
//! ...
//! ```
//!
//! Decoding happens in two steps:
//!
//! 1. **Tokenize**: split the buffer on CRLF and walk the lines by position.
//!    Every argument is a `$` header line followed by a token line. The
//!    declared length is *not* checked against the token; position decides.
//! 2. **Build**: match the command name (case-insensitively) and check the
//!    argument count, producing a typed [`Command`].
//!
//! Only CRLF-terminated lines count. A buffer that stops mid-request is
//! incomplete ([`decode_frame`] returns `Ok(None)`), never a shorter request.
//! Anything that does not fit the shape is a [`DecodeError`] rather than an
//! out-of-bounds slice.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Errors produced for malformed requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer held no bytes at all
    #[error("empty request")]
    Empty,

    /// The first line is not `*<argc>`
    #[error("Protocol error: expected '*<count>' array header")]
    MissingArrayHeader,

    /// `*0`
    #[error("Protocol error: empty command array")]
    EmptyCommand,

    /// An argument is not preceded by a `$<len>` line
    #[error("Protocol error: expected '$<len>' header for argument {index}")]
    MissingBulkHeader { index: usize },

    /// A `$<len>` line has no token after it
    #[error("Protocol error: missing token for argument {index}")]
    MissingToken { index: usize },

    #[error("wrong number of arguments for '{command}' command")]
    WrongArity { command: &'static str, got: usize },

    #[error("value is not an integer or out of range")]
    InvalidTtl,

    #[error("syntax error: unsupported SET option '{0}'")]
    UnsupportedOption(String),

    /// Bytes left over after a complete request
    #[error("Protocol error: {extra} unexpected bytes after request")]
    TrailingData { extra: usize },

    /// The read buffer filled up before the request was complete
    #[error("Protocol error: request exceeds {max} bytes")]
    RequestTooLarge { max: usize },
}

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING`
    Ping,

    /// `ECHO <message>`
    Echo(Bytes),

    /// `SET <key> <value> [PX <millis> | EX <seconds>]`
    ///
    /// `ttl` is `None` when no option was given or the amount was zero.
    Set {
        key: Bytes,
        value: Bytes,
        ttl: Option<Duration>,
    },

    /// `GET <key>`
    Get(Bytes),

    /// Any other command name. Answered permissively.
    Unknown(String),
}

impl Command {
    /// Lowercase command name, for logging.
    pub fn name(&self) -> &str {
        match self {
            Command::Ping => "ping",
            Command::Echo(_) => "echo",
            Command::Set { .. } => "set",
            Command::Get(_) => "get",
            Command::Unknown(name) => name,
        }
    }
}

/// Decodes exactly one complete request from `buf`.
///
/// A buffer that stops mid-request, or that holds bytes past the end of the
/// request, is rejected.
///
/// # Example
///
/// ```
/// use emberkv::protocol::{decode, Command};
/// use bytes::Bytes;
///
/// let cmd = decode(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap();
/// assert_eq!(cmd, Command::Get(Bytes::from("foo")));
/// ```
pub fn decode(buf: &[u8]) -> DecodeResult<Command> {
    match scan(buf)? {
        Scan::Partial(missing) => Err(missing),
        Scan::Complete { consumed, .. } if consumed < buf.len() => Err(DecodeError::TrailingData {
            extra: buf.len() - consumed,
        }),
        Scan::Complete { args, .. } => build(&args),
    }
}

/// Decodes the first request at the start of a stream buffer.
///
/// - `Ok(Some((command, consumed)))` - a request was decoded from the first
///   `consumed` bytes; anything after it belongs to the next request
/// - `Ok(None)` - the buffer ends mid-request, read more
/// - `Err(e)` - the request is malformed
pub fn decode_frame(buf: &[u8]) -> DecodeResult<Option<(Command, usize)>> {
    match scan(buf)? {
        Scan::Partial(_) => Ok(None),
        Scan::Complete { args, consumed } => Ok(Some((build(&args)?, consumed))),
    }
}

/// Outcome of scanning a buffer for one request.
enum Scan<'a> {
    /// Argument tokens, command name first, and the bytes the request spans
    Complete { args: Vec<&'a [u8]>, consumed: usize },
    /// The buffer ends mid-request; the error names the first missing piece
    Partial(DecodeError),
}

/// Walks the CRLF-terminated lines of one request by position.
fn scan(buf: &[u8]) -> DecodeResult<Scan<'_>> {
    match buf.first() {
        None => return Ok(Scan::Partial(DecodeError::Empty)),
        Some(&prefix::ARRAY) => {}
        Some(_) => return Err(DecodeError::MissingArrayHeader),
    }

    let mut lines = Lines::new(buf);

    let header = match lines.next() {
        Some(header) => header,
        None => return Ok(Scan::Partial(DecodeError::MissingArrayHeader)),
    };
    let argc = parse_decimal(&header[1..]).ok_or(DecodeError::MissingArrayHeader)?;

    if argc == 0 {
        return Err(DecodeError::EmptyCommand);
    }

    // The count comes off the wire; don't let it size the allocation.
    let mut args = Vec::with_capacity(argc.min(8));
    for index in 0..argc {
        match lines.next() {
            Some(header) if header.first() == Some(&prefix::BULK_STRING) => {}
            Some(_) => return Err(DecodeError::MissingBulkHeader { index }),
            None => return Ok(Scan::Partial(DecodeError::MissingBulkHeader { index })),
        }
        match lines.next() {
            Some(token) => args.push(token),
            None => return Ok(Scan::Partial(DecodeError::MissingToken { index })),
        }
    }

    Ok(Scan::Complete {
        args,
        consumed: lines.consumed(),
    })
}

/// Builds a typed command out of raw argument tokens.
fn build(args: &[&[u8]]) -> DecodeResult<Command> {
    let (name, rest) = match args.split_first() {
        Some(split) => split,
        None => return Err(DecodeError::EmptyCommand),
    };

    if name.eq_ignore_ascii_case(b"ping") {
        expect_arity("ping", rest, &[0])?;
        Ok(Command::Ping)
    } else if name.eq_ignore_ascii_case(b"echo") {
        expect_arity("echo", rest, &[1])?;
        Ok(Command::Echo(Bytes::copy_from_slice(rest[0])))
    } else if name.eq_ignore_ascii_case(b"get") {
        expect_arity("get", rest, &[1])?;
        Ok(Command::Get(Bytes::copy_from_slice(rest[0])))
    } else if name.eq_ignore_ascii_case(b"set") {
        expect_arity("set", rest, &[2, 4])?;
        let ttl = match rest {
            [_, _, option, amount] => parse_expiry(option, amount)?,
            _ => None,
        };
        Ok(Command::Set {
            key: Bytes::copy_from_slice(rest[0]),
            value: Bytes::copy_from_slice(rest[1]),
            ttl,
        })
    } else {
        Ok(Command::Unknown(
            String::from_utf8_lossy(name).to_ascii_lowercase(),
        ))
    }
}

fn expect_arity(command: &'static str, rest: &[&[u8]], allowed: &[usize]) -> DecodeResult<()> {
    if allowed.contains(&rest.len()) {
        Ok(())
    } else {
        Err(DecodeError::WrongArity {
            command,
            got: rest.len(),
        })
    }
}

/// Parses the `PX <millis>` / `EX <seconds>` pair of a SET.
///
/// A zero amount means the key never expires.
fn parse_expiry(option: &[u8], amount: &[u8]) -> DecodeResult<Option<Duration>> {
    let amount = parse_decimal(amount)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or(DecodeError::InvalidTtl)?;

    let millis = if option.eq_ignore_ascii_case(b"px") {
        amount
    } else if option.eq_ignore_ascii_case(b"ex") {
        amount.checked_mul(1000).ok_or(DecodeError::InvalidTtl)?
    } else {
        return Err(DecodeError::UnsupportedOption(
            String::from_utf8_lossy(option).into_owned(),
        ));
    };

    Ok((millis > 0).then(|| Duration::from_millis(millis)))
}

/// Parses an unsigned ASCII decimal.
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Iterator over CRLF-terminated lines.
///
/// A trailing fragment without CRLF is never yielded; it is an unfinished line.
struct Lines<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes covered by the lines yielded so far, terminators included.
    fn consumed(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.buf[self.pos..];
        let end = find_crlf(rest)?;
        self.pos += end + CRLF.len();
        Some(&rest[..end])
    }
}

/// Returns the position of `\r` in the first CRLF, if any.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
