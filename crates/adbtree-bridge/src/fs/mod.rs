//! Device filesystem operations.
//!
//! Each submodule attaches one group of operations to
//! [`DeviceSession`](crate::transport::DeviceSession):
//!
//! - [`list`] – typed directory listings over the file service.
//! - [`transfer`] – single-file pull and push.
//! - [`shell`] – shell-based mutations (mkdir, rm, mv, cp, rename).
//! - [`tree`] – recursive directory transfer in both directions.

pub mod list;
pub mod shell;
pub mod transfer;
pub mod tree;

pub use list::ListError;
pub use shell::{CommandError, ShellOutput};
pub use transfer::TransferError;
pub use tree::{EntryFailure, TreeEntryError, TreeEvent, TreeReport, TreeTransfer};
