//! Typed directory entries and stat-mode classification.

use serde::{Deserialize, Serialize};

// Unix file-type bits as carried in the `DENT` mode field.
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;
const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;
const S_IFSOCK: u32 = 0o140000;

/// The kind of a remote filesystem node, derived from its stat mode bits.
///
/// Classification happens once at listing time and is not re-validated, so a
/// kind can be stale if the remote filesystem changes underneath a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
}

impl EntryKind {
    /// Classifies raw stat mode bits.
    ///
    /// The type field (`mode & S_IFMT`) is compared for equality, never by
    /// subset: the socket and symlink codes arithmetically contain the
    /// directory and regular-file bits, so a bitwise-AND test would
    /// misclassify them. Modes with an unrecognized type field fall back to
    /// [`EntryKind::File`].
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFLNK => EntryKind::Symlink,
            S_IFDIR => EntryKind::Directory,
            S_IFBLK => EntryKind::BlockDevice,
            S_IFCHR => EntryKind::CharDevice,
            S_IFIFO => EntryKind::Fifo,
            S_IFSOCK => EntryKind::Socket,
            S_IFREG => EntryKind::File,
            // Unrecognized type fields degrade to the file policy.
            _ => EntryKind::File,
        }
    }

    /// True for block devices, character devices, FIFOs, and sockets.
    ///
    /// These collapse to a single traversal policy: they carry no copyable
    /// byte stream, so recursive transfers skip them.
    pub fn is_special(self) -> bool {
        matches!(
            self,
            EntryKind::BlockDevice | EntryKind::CharDevice | EntryKind::Fifo | EntryKind::Socket
        )
    }

    pub fn is_directory(self) -> bool {
        self == EntryKind::Directory
    }

    pub fn is_file(self) -> bool {
        self == EntryKind::File
    }
}

/// One filesystem node as reported by a device directory listing.
///
/// The listing order is whatever the device returned; callers that need a
/// deterministic order sort themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Node name without any path separators.
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes. The wire format truncates this to 32 bits.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mtime_secs: u64,
}

impl RemoteEntry {
    /// Builds an entry from the raw fields of a `DENT` frame.
    pub fn from_wire(name: String, mode: u32, size: u32, mtime: u32) -> Self {
        Self {
            name,
            kind: EntryKind::from_mode(mode),
            size: u64::from(size),
            mtime_secs: u64::from(mtime),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
