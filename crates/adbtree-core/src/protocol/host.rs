//! Smart-socket framing for requests to the bridge daemon.
//!
//! Wire format:
//! ```text
//! request:  [len:4 ASCII hex][payload:len]          e.g. "000Chost:version"
//! response: [status:4]                              "OKAY" or "FAIL"
//!           [len:4 ASCII hex][message:len]          follows FAIL always,
//!                                                   follows OKAY for queries
//! ```
//! The length prefix is the payload byte count rendered as four lowercase
//! hexadecimal digits, so a single frame carries at most 65535 bytes. Every
//! service request consumes one daemon connection: after the daemon answers
//! `OKAY` for a service such as `shell:` or `sync:`, the connection stops
//! being a smart socket and carries that service's raw stream instead.

use crate::protocol::WireError;

/// Size of the ASCII-hex length prefix, in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the `OKAY`/`FAIL` status word, in bytes.
pub const STATUS_SIZE: usize = 4;

/// Largest payload a single hex-length-prefixed frame can carry.
pub const MAX_PAYLOAD: usize = 0xFFFF;

/// Status word answered by the daemon for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The request was accepted. A reply payload may follow.
    Okay,
    /// The request was rejected. A length-prefixed message follows.
    Fail,
}

impl Status {
    /// Parses a four-byte status word.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownStatus`] for anything other than
    /// `OKAY` or `FAIL`.
    pub fn parse(word: [u8; STATUS_SIZE]) -> Result<Self, WireError> {
        match &word {
            b"OKAY" => Ok(Status::Okay),
            b"FAIL" => Ok(Status::Fail),
            _ => Err(WireError::UnknownStatus(word)),
        }
    }

    /// Returns the four-byte wire representation of this status.
    pub fn as_bytes(self) -> [u8; STATUS_SIZE] {
        match self {
            Status::Okay => *b"OKAY",
            Status::Fail => *b"FAIL",
        }
    }
}

/// Encodes a service request string into a length-prefixed frame.
///
/// # Errors
///
/// Returns [`WireError::PayloadTooLarge`] if the service string exceeds
/// [`MAX_PAYLOAD`] bytes.
///
/// # Examples
///
/// ```rust
/// use adbtree_core::protocol::host::encode_request;
///
/// let frame = encode_request("host:version").unwrap();
/// assert_eq!(&frame, b"000chost:version");
/// ```
pub fn encode_request(service: &str) -> Result<Vec<u8>, WireError> {
    let payload = service.as_bytes();
    if payload.len() > MAX_PAYLOAD {
        return Err(WireError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&encode_length(payload.len()));
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Renders a payload length as four lowercase ASCII hex digits.
///
/// Callers must have checked the length against [`MAX_PAYLOAD`].
pub fn encode_length(len: usize) -> [u8; LENGTH_PREFIX_SIZE] {
    debug_assert!(len <= MAX_PAYLOAD);
    let text = format!("{len:04x}");
    let bytes = text.as_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// Parses a four-digit ASCII hex length prefix.
///
/// The daemon emits lowercase digits but uppercase is accepted too, matching
/// the reference daemon's lenient parser.
///
/// # Errors
///
/// Returns [`WireError::BadLengthPrefix`] if any byte is not a hex digit.
pub fn decode_length(prefix: [u8; LENGTH_PREFIX_SIZE]) -> Result<usize, WireError> {
    let mut value = 0usize;
    for byte in prefix {
        let digit = (byte as char)
            .to_digit(16)
            .ok_or(WireError::BadLengthPrefix(prefix))?;
        value = (value << 4) | digit as usize;
    }
    Ok(value)
}

/// One device line from a `host:devices` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLine {
    /// The device serial used to address the device in later requests.
    pub serial: String,
    /// Connection state as reported by the daemon, e.g. `device`,
    /// `offline`, `unauthorized`.
    pub state: String,
}

/// Parses the text payload of a `host:devices` reply.
///
/// Each non-empty line is `serial<TAB>state`. Lines without a tab are
/// ignored rather than failing the whole listing; the daemon has emitted
/// trailing blank lines in the wild.
pub fn parse_devices_reply(text: &str) -> Vec<DeviceLine> {
    text.lines()
        .filter_map(|line| {
            let (serial, state) = line.split_once('\t')?;
            Some(DeviceLine {
                serial: serial.trim().to_string(),
                state: state.trim().to_string(),
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
