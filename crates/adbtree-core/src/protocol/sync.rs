//! Binary codec for the file-service (`sync:`) protocol.
//!
//! Wire format, all integers little-endian:
//! ```text
//! request/response header: [id:4 ASCII][arg:4 LE u32]
//! directory entry:         ["DENT"][mode:4][size:4][mtime:4][namelen:4][name:namelen]
//! file data:               ["DATA"][len:4][bytes:len]             len <= 64 KiB
//! ```
//! A listing is a `LIST <path>` request answered by zero or more `DENT`
//! frames and terminated by `DONE`; the terminating `DONE` is dent-sized,
//! carrying 16 all-zero field bytes, because the daemon replies to a listing
//! with a union of dent frames. A download is `RECV <path>` answered by
//! `DATA` frames and an 8-byte `DONE` (or `FAIL <message>`). An upload is
//! `SEND <path>,<mode>` followed by client `DATA` frames and a final
//! `DONE <mtime>`, answered by a single `OKAY` or `FAIL <message>`.
//!
//! This module is pure byte manipulation; the client crate drives it over a
//! socket and the test fixtures drive it over an in-process listener.

use crate::protocol::WireError;

/// Size of a four-byte frame id on its own.
pub const SYNC_ID_SIZE: usize = 4;

/// Size of the `[id:4][arg:4]` frame header, in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Size of the four trailing u32 fields of a `DENT` frame, in bytes.
pub const DENT_FIELDS_SIZE: usize = 16;

/// Largest payload a single `DATA` frame may carry.
///
/// The reference daemon rejects larger chunks, so both the upload path and
/// the test fixtures split at this boundary.
pub const DATA_CHUNK_MAX: usize = 64 * 1024;

/// Four-byte frame identifiers used by the file service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncId {
    /// Request a directory listing.
    List,
    /// One directory entry in a listing reply.
    Dent,
    /// Request a file download.
    Recv,
    /// Announce a file upload; arg is the payload length of `<path>,<mode>`.
    Send,
    /// One chunk of file bytes; arg is the chunk length.
    Data,
    /// Terminates a listing or download; as an upload trailer its arg is the
    /// file's modification time in seconds.
    Done,
    /// Upload accepted.
    Okay,
    /// Operation rejected; a message payload of `arg` bytes follows.
    Fail,
    /// Ends the file-service session.
    Quit,
}

impl SyncId {
    /// Returns the four-byte wire code of this id.
    pub fn code(self) -> [u8; 4] {
        match self {
            SyncId::List => *b"LIST",
            SyncId::Dent => *b"DENT",
            SyncId::Recv => *b"RECV",
            SyncId::Send => *b"SEND",
            SyncId::Data => *b"DATA",
            SyncId::Done => *b"DONE",
            SyncId::Okay => *b"OKAY",
            SyncId::Fail => *b"FAIL",
            SyncId::Quit => *b"QUIT",
        }
    }

    /// Parses a four-byte wire code.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownSyncId`] for unrecognized codes.
    pub fn parse(code: [u8; 4]) -> Result<Self, WireError> {
        match &code {
            b"LIST" => Ok(SyncId::List),
            b"DENT" => Ok(SyncId::Dent),
            b"RECV" => Ok(SyncId::Recv),
            b"SEND" => Ok(SyncId::Send),
            b"DATA" => Ok(SyncId::Data),
            b"DONE" => Ok(SyncId::Done),
            b"OKAY" => Ok(SyncId::Okay),
            b"FAIL" => Ok(SyncId::Fail),
            b"QUIT" => Ok(SyncId::Quit),
            _ => Err(WireError::UnknownSyncId(code)),
        }
    }
}

/// A decoded `[id:4][arg:4]` frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: SyncId,
    /// Meaning depends on `id`: payload length for `DATA`/`FAIL`/text
    /// requests, modification time for a `DONE` upload trailer, zero
    /// otherwise.
    pub arg: u32,
}

impl FrameHeader {
    /// Parses a header from its eight wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownSyncId`] if the id code is unrecognized.
    pub fn parse(bytes: [u8; FRAME_HEADER_SIZE]) -> Result<Self, WireError> {
        let id = SyncId::parse([bytes[0], bytes[1], bytes[2], bytes[3]])?;
        let arg = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(Self { id, arg })
    }

    /// Returns the eight wire bytes of this header.
    pub fn encode(self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.id.code());
        bytes[4..].copy_from_slice(&self.arg.to_le_bytes());
        bytes
    }
}

/// Encodes a header immediately followed by a text payload, the shape used
/// by `LIST`, `RECV`, and `SEND` requests.
///
/// # Errors
///
/// Returns [`WireError::PayloadTooLarge`] if the payload does not fit in the
/// 32-bit length field.
pub fn encode_text_frame(id: SyncId, payload: &str) -> Result<Vec<u8>, WireError> {
    let bytes = payload.as_bytes();
    if bytes.len() > u32::MAX as usize {
        return Err(WireError::PayloadTooLarge {
            len: bytes.len(),
            max: u32::MAX as usize,
        });
    }
    let header = FrameHeader {
        id,
        arg: bytes.len() as u32,
    };
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + bytes.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(bytes);
    Ok(frame)
}

/// Builds the `<path>,<mode>` payload of a `SEND` request.
///
/// The mode is rendered in decimal with only the permission and file-type
/// bits the daemon understands.
pub fn encode_send_payload(path: &str, mode: u32) -> String {
    format!("{path},{mode}")
}

/// The four trailing u32 fields of a `DENT` frame, preceding the name bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DentFields {
    /// Raw stat mode bits; see [`crate::entry::EntryKind::from_mode`].
    pub mode: u32,
    /// File size in bytes, truncated to 32 bits by the wire format.
    pub size: u32,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u32,
    /// Length of the name bytes that follow.
    pub name_len: u32,
}

impl DentFields {
    /// Parses the sixteen field bytes that follow a `DENT` id.
    pub fn parse(bytes: [u8; DENT_FIELDS_SIZE]) -> Self {
        Self {
            mode: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            mtime: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            name_len: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }

    /// Returns the sixteen wire bytes of these fields.
    pub fn encode(self) -> [u8; DENT_FIELDS_SIZE] {
        let mut bytes = [0u8; DENT_FIELDS_SIZE];
        bytes[..4].copy_from_slice(&self.mode.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.size.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.mtime.to_le_bytes());
        bytes[12..].copy_from_slice(&self.name_len.to_le_bytes());
        bytes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
