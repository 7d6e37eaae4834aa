//! # adbtree-bridge
//!
//! Asynchronous client for the local device-bridge daemon: lists connected
//! devices, lists device directories with typed entries, streams files in
//! both directions, runs shell-based filesystem mutations, and replicates
//! whole directory trees recursively.
//!
//! This crate is the boundary surface a tree UI consumes; it renders no UI
//! of its own and holds no selection or dialog state. A typical consumer:
//!
//! ```ignore
//! let client = BridgeClient::new(BridgeConfig::default());
//! let serials = client.list_device_ids().await?;
//! let session = client.session(&serials[0]);
//!
//! let mut entries = session.list("/sdcard/").await?;
//! entries.sort_by(|a, b| a.name.cmp(&b.name));
//!
//! session.pull("/sdcard/a.txt", "/tmp/a.txt").await?;
//! let report = session.pull_tree("/sdcard/", "/tmp/out").await?;
//! if !report.is_complete() {
//!     // per-entry failures; siblings were still attempted
//! }
//! ```
//!
//! Concurrency model: every operation is a single attempt with no retry, no
//! timeout, and no cancellation once started. The crate takes no locks of
//! its own — a caller that allows two mutating operations to overlap on the
//! same paths gets whatever the device makes of that, so hosts serialize
//! mutations (the surrounding UI's "operation pending" gate).

pub mod config;
pub mod fs;
pub mod transport;

pub use config::{ConfigError, Settings};
pub use fs::{
    CommandError, EntryFailure, ListError, ShellOutput, TransferError, TreeEntryError, TreeEvent,
    TreeReport, TreeTransfer,
};
pub use transport::{BridgeClient, BridgeConfig, DeviceSession, TransportError};

// The domain types travel with the operations that return them.
pub use adbtree_core::{path, EntryKind, RemoteEntry};
