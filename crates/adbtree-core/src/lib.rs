//! # adbtree-core
//!
//! Shared library for adbtree containing the bridge wire protocol and the
//! filesystem domain types. The bridge daemon (the local debug-bridge
//! server) exposes every connected device's filesystem through two layers:
//!
//! - **`protocol::host`** – the smart-socket request framing spoken to the
//!   daemon itself (`host:devices`, `host:transport:<serial>`, `shell:`,
//!   `sync:`).
//! - **`protocol::sync`** – the binary file service tunnelled through a
//!   device-bound connection: directory listings, downloads, and uploads.
//!
//! On top of the wire layer sit the pure domain types:
//!
//! - **`entry`** – typed directory entries; classifies raw stat mode bits
//!   into file/directory/symlink/special kinds.
//! - **`path`** – `/`-separated remote path helpers and shell-argument
//!   quoting.
//!
//! This crate has no dependency on sockets, the OS filesystem, or an async
//! runtime; everything here is unit-testable byte and string manipulation.
//! The asynchronous client lives in `adbtree-bridge`.

pub mod entry;
pub mod path;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `adbtree_core::RemoteEntry` instead of the full module path.
pub use entry::{EntryKind, RemoteEntry};
pub use protocol::WireError;
