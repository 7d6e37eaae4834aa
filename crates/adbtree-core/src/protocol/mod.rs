//! Wire protocol for the device-bridge daemon.
//!
//! Two layers share this module:
//!
//! - [`host`] – the smart-socket framing spoken to the daemon itself
//!   (ASCII-hex length prefixes, `OKAY`/`FAIL` status words).
//! - [`sync`] – the binary file-service protocol tunnelled through an
//!   established device connection (little-endian `[id:4][arg:4]` headers).

pub mod host;
pub mod sync;

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol frames.
///
/// These cover the byte-level layer only; transport failures (socket errors,
/// daemon rejections) are modelled by the client crate on top of this.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// A length prefix contained bytes that are not ASCII hex digits.
    #[error("malformed hex length prefix: {0:?}")]
    BadLengthPrefix([u8; 4]),

    /// A status word was neither `OKAY` nor `FAIL`.
    #[error("unknown status word: {0:?}")]
    UnknownStatus([u8; 4]),

    /// A sync response id was not a recognized four-byte code.
    #[error("unknown sync id: {0:?}")]
    UnknownSyncId([u8; 4]),

    /// A request payload exceeds what the framing can express.
    #[error("payload too large: {len} bytes exceeds the {max}-byte frame limit")]
    PayloadTooLarge { len: usize, max: usize },

    /// Text in a frame was not valid UTF-8.
    #[error("invalid UTF-8 in frame: {0}")]
    InvalidUtf8(String),
}
