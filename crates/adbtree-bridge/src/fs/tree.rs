//! Recursive directory transfer in both directions.
//!
//! [`TreeTransfer`] walks a remote or local directory tree and drives the
//! lister, the single-file transfer engine, and the shell executor to
//! replicate the tree on the other side. Traversal is strictly sequential
//! and awaited to completion: when `pull_directory` or `push_directory`
//! returns, the whole tree has been attempted — there is no fire-and-forget
//! recursion whose "done" arrives before the subtree does.
//!
//! Failure policy is best effort: one entry failing is recorded in the
//! [`TreeReport`] (and announced on the event channel) without aborting its
//! siblings. Only a failure that makes the whole operation meaningless —
//! the root listing, the local root creation, the remote root `mkdir` —
//! aborts the call.
//!
//! Entries that are neither regular files nor directories (symlinks, block
//! and character devices, FIFOs, sockets) carry no copyable byte stream and
//! are skipped by explicit policy: counted in the report and announced as
//! [`TreeEvent::EntrySkipped`], never silently dropped.
//!
//! Per-entry progress streams over an `mpsc` channel obtained from
//! [`TreeTransfer::new`]; a caller that only wants the aggregate outcome can
//! drop the receiver and read the returned report.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use adbtree_core::{path, EntryKind};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::fs::list::ListError;
use crate::fs::shell::CommandError;
use crate::fs::transfer::TransferError;
use crate::transport::DeviceSession;

/// Capacity of the per-entry event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One per-entry outcome announced during a tree transfer.
///
/// Paths are given on the entry's *source* side: remote paths during a pull,
/// local paths during a push (remote paths for directories created on the
/// device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// A directory was created on the destination side.
    DirectoryCreated { path: String },
    /// A file finished transferring.
    FileTransferred { path: String },
    /// An entry was skipped because its kind carries no byte stream.
    /// `kind` is `None` when the local filesystem reports a kind this crate
    /// does not classify.
    EntrySkipped {
        path: String,
        kind: Option<EntryKind>,
    },
    /// An entry failed; its siblings continue.
    EntryFailed { path: String, message: String },
}

/// An error attributable to a single entry inside a tree transfer.
#[derive(Debug, Error)]
pub enum TreeEntryError {
    #[error(transparent)]
    List(#[from] ListError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// A shell mutation ran but the device reported a diagnostic, e.g.
    /// `mkdir` on an existing path. See the shell module for why this is
    /// not a [`CommandError`].
    #[error("device shell reported for {command_line:?}: {diagnostic}")]
    ShellDiagnostic {
        command_line: String,
        diagnostic: String,
    },

    #[error("local filesystem error at {path}: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source {path} is neither a regular file nor a directory")]
    UnsupportedSource { path: PathBuf },
}

/// One recorded per-entry failure.
#[derive(Debug)]
pub struct EntryFailure {
    /// The source-side path of the failing entry.
    pub path: String,
    pub error: TreeEntryError,
}

/// Aggregate outcome of one tree transfer.
#[derive(Debug, Default)]
pub struct TreeReport {
    pub files_transferred: usize,
    pub directories_created: usize,
    pub entries_skipped: usize,
    pub failures: Vec<EntryFailure>,
}

impl TreeReport {
    /// True when every entry in the tree was replicated or skipped by
    /// policy, with no failures.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrates recursive directory transfers for one device session.
pub struct TreeTransfer {
    session: DeviceSession,
    events: mpsc::Sender<TreeEvent>,
}

impl TreeTransfer {
    /// Creates an orchestrator and the receiver for its per-entry events.
    ///
    /// The receiver may be dropped; events are then discarded and only the
    /// returned [`TreeReport`] reflects the outcome. A caller that keeps the
    /// receiver must drain it concurrently with the transfer — the channel
    /// is bounded and a full channel suspends traversal until it is read.
    pub fn new(session: DeviceSession) -> (Self, mpsc::Receiver<TreeEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                session,
                events: tx,
            },
            rx,
        )
    }

    /// Pulls a device directory tree under a local parent directory.
    ///
    /// The local root is `local_parent/basename(remote_dir)` and is created
    /// together with any missing ancestors. Files are pulled under their own
    /// names, subdirectories are created and recursed into, and entries of
    /// any other kind are skipped by policy.
    ///
    /// # Errors
    ///
    /// Returns an error only when the operation cannot start at all: the
    /// local root cannot be created or the root listing fails. Everything
    /// below that is per-entry and lands in the report.
    pub async fn pull_directory(
        &self,
        remote_dir: &str,
        local_parent: impl AsRef<Path>,
    ) -> Result<TreeReport, TreeEntryError> {
        let local_root = local_parent.as_ref().join(path::basename(remote_dir));
        tokio::fs::create_dir_all(&local_root)
            .await
            .map_err(|source| TreeEntryError::Local {
                path: local_root.clone(),
                source,
            })?;

        let mut report = TreeReport::default();
        self.pull_into(remote_dir, &local_root, &mut report).await?;
        debug!(
            remote_dir,
            files = report.files_transferred,
            failures = report.failures.len(),
            "directory pull finished"
        );
        Ok(report)
    }

    /// Recursively pulls the contents of `remote_dir` into `local_dir`.
    ///
    /// The returned error is a failure to *list* `remote_dir` itself; the
    /// caller decides whether that aborts the operation (root) or is
    /// recorded as one entry's failure (subdirectory).
    fn pull_into<'a>(
        &'a self,
        remote_dir: &'a str,
        local_dir: &'a Path,
        report: &'a mut TreeReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), ListError>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self.session.list(remote_dir).await?;

            for entry in entries {
                let remote_child = path::join(remote_dir, &entry.name);
                let local_child = local_dir.join(&entry.name);

                match entry.kind {
                    EntryKind::File => {
                        match self.session.pull(&remote_child, &local_child).await {
                            Ok(()) => {
                                report.files_transferred += 1;
                                self.emit(TreeEvent::FileTransferred {
                                    path: remote_child,
                                })
                                .await;
                            }
                            Err(e) => self.record_failure(report, remote_child, e.into()).await,
                        }
                    }
                    EntryKind::Directory => {
                        if let Err(source) = tokio::fs::create_dir_all(&local_child).await {
                            self.record_failure(
                                report,
                                remote_child,
                                TreeEntryError::Local {
                                    path: local_child,
                                    source,
                                },
                            )
                            .await;
                            continue;
                        }
                        report.directories_created += 1;
                        self.emit(TreeEvent::DirectoryCreated {
                            path: remote_child.clone(),
                        })
                        .await;

                        if let Err(e) =
                            self.pull_into(&remote_child, &local_child, report).await
                        {
                            self.record_failure(report, remote_child, e.into()).await;
                        }
                    }
                    other => {
                        report.entries_skipped += 1;
                        self.emit(TreeEvent::EntrySkipped {
                            path: remote_child,
                            kind: Some(other),
                        })
                        .await;
                    }
                }
            }
            Ok(())
        })
    }

    /// Pushes a local directory tree under a remote parent directory.
    ///
    /// The remote root is `remote_parent/basename(local_dir)` and is created
    /// with the shell executor *before* any recursion, so a created-but-empty
    /// remote directory exists even if the recursion fails partway. Each
    /// subdirectory is likewise created remotely before being recursed into.
    ///
    /// # Errors
    ///
    /// Returns an error when the operation cannot start: the local root is
    /// not named by a usable path, the remote root `mkdir` fails in transit,
    /// or the device reports a diagnostic creating it.
    pub async fn push_directory(
        &self,
        local_dir: impl AsRef<Path>,
        remote_parent: &str,
    ) -> Result<TreeReport, TreeEntryError> {
        let local_dir = local_dir.as_ref();
        let name = local_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TreeEntryError::UnsupportedSource {
                path: local_dir.to_path_buf(),
            })?;
        let remote_root = path::join(remote_parent, name);

        let output = self.session.mkdir(&remote_root).await?;
        if let Some(diagnostic) = output.diagnostics() {
            return Err(TreeEntryError::ShellDiagnostic {
                command_line: output.command_line().to_string(),
                diagnostic: diagnostic.to_string(),
            });
        }

        let mut report = TreeReport::default();
        report.directories_created += 1;
        self.emit(TreeEvent::DirectoryCreated {
            path: remote_root.clone(),
        })
        .await;

        self.push_into(local_dir, &remote_root, &mut report)
            .await
            .map_err(|source| TreeEntryError::Local {
                path: local_dir.to_path_buf(),
                source,
            })?;
        debug!(
            remote_root,
            files = report.files_transferred,
            failures = report.failures.len(),
            "directory push finished"
        );
        Ok(report)
    }

    /// Recursively pushes the contents of `local_dir` into `remote_dir`.
    ///
    /// The returned error is a failure to enumerate `local_dir` itself. The
    /// directory stream is owned by this frame, so it is closed on every
    /// exit path, including an early error.
    fn push_into<'a>(
        &'a self,
        local_dir: &'a Path,
        remote_dir: &'a str,
        report: &'a mut TreeReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), std::io::Error>> + Send + 'a>> {
        Box::pin(async move {
            let mut dir = tokio::fs::read_dir(local_dir).await?;

            while let Some(dir_entry) = dir.next_entry().await? {
                let local_child = dir_entry.path();
                let Ok(name) = dir_entry.file_name().into_string() else {
                    self.record_failure(
                        report,
                        local_child.display().to_string(),
                        TreeEntryError::Local {
                            path: local_child.clone(),
                            source: std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                "entry name is not valid UTF-8",
                            ),
                        },
                    )
                    .await;
                    continue;
                };
                let remote_child = path::join(remote_dir, &name);

                let file_type = match dir_entry.file_type().await {
                    Ok(t) => t,
                    Err(source) => {
                        self.record_failure(
                            report,
                            local_child.display().to_string(),
                            TreeEntryError::Local {
                                path: local_child.clone(),
                                source,
                            },
                        )
                        .await;
                        continue;
                    }
                };

                if file_type.is_file() {
                    match self.session.push_file(&local_child, &remote_child).await {
                        Ok(()) => {
                            report.files_transferred += 1;
                            self.emit(TreeEvent::FileTransferred {
                                path: local_child.display().to_string(),
                            })
                            .await;
                        }
                        Err(e) => {
                            self.record_failure(
                                report,
                                local_child.display().to_string(),
                                e.into(),
                            )
                            .await;
                        }
                    }
                } else if file_type.is_dir() {
                    // Create the remote directory before recursing, so it
                    // exists even if the recursion below fails partway.
                    match self.session.mkdir(&remote_child).await {
                        Ok(output) => {
                            if let Some(diagnostic) = output.diagnostics() {
                                self.record_failure(
                                    report,
                                    remote_child.clone(),
                                    TreeEntryError::ShellDiagnostic {
                                        command_line: output.command_line().to_string(),
                                        diagnostic: diagnostic.to_string(),
                                    },
                                )
                                .await;
                                continue;
                            }
                            report.directories_created += 1;
                            self.emit(TreeEvent::DirectoryCreated {
                                path: remote_child.clone(),
                            })
                            .await;
                        }
                        Err(e) => {
                            self.record_failure(report, remote_child.clone(), e.into())
                                .await;
                            continue;
                        }
                    }

                    if let Err(source) =
                        self.push_into(&local_child, &remote_child, report).await
                    {
                        self.record_failure(
                            report,
                            local_child.display().to_string(),
                            TreeEntryError::Local {
                                path: local_child.clone(),
                                source,
                            },
                        )
                        .await;
                    }
                } else {
                    let kind = file_type.is_symlink().then_some(EntryKind::Symlink);
                    report.entries_skipped += 1;
                    self.emit(TreeEvent::EntrySkipped {
                        path: local_child.display().to_string(),
                        kind,
                    })
                    .await;
                }
            }
            Ok(())
        })
    }

    async fn emit(&self, event: TreeEvent) {
        // A dropped receiver means the caller only wants the report.
        let _ = self.events.send(event).await;
    }

    async fn record_failure(&self, report: &mut TreeReport, path: String, error: TreeEntryError) {
        warn!(%path, %error, "tree entry failed; continuing with siblings");
        self.emit(TreeEvent::EntryFailed {
            path: path.clone(),
            message: error.to_string(),
        })
        .await;
        report.failures.push(EntryFailure { path, error });
    }
}

impl DeviceSession {
    /// Pushes a local path into a remote directory, dispatching on the local
    /// path's kind: regular files are pushed under their own name,
    /// directories are replicated recursively, anything else is rejected.
    ///
    /// Convenience wrapper over [`DeviceSession::push_file`] and
    /// [`TreeTransfer::push_directory`] for callers that do not need the
    /// per-entry event stream.
    pub async fn push(
        &self,
        local_path: impl AsRef<Path>,
        remote_dir: &str,
    ) -> Result<TreeReport, TreeEntryError> {
        let local_path = local_path.as_ref();
        let metadata =
            tokio::fs::metadata(local_path)
                .await
                .map_err(|source| TreeEntryError::Local {
                    path: local_path.to_path_buf(),
                    source,
                })?;

        if metadata.is_file() {
            let name = local_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| TreeEntryError::UnsupportedSource {
                    path: local_path.to_path_buf(),
                })?;
            self.push_file(local_path, &path::join(remote_dir, name))
                .await?;
            Ok(TreeReport {
                files_transferred: 1,
                ..TreeReport::default()
            })
        } else if metadata.is_dir() {
            let (tree, rx) = TreeTransfer::new(self.clone());
            drop(rx);
            tree.push_directory(local_path, remote_dir).await
        } else {
            Err(TreeEntryError::UnsupportedSource {
                path: local_path.to_path_buf(),
            })
        }
    }

    /// Pulls a device directory tree under a local parent directory without
    /// the per-entry event stream. See [`TreeTransfer::pull_directory`].
    pub async fn pull_tree(
        &self,
        remote_dir: &str,
        local_parent: impl AsRef<Path>,
    ) -> Result<TreeReport, TreeEntryError> {
        let (tree, rx) = TreeTransfer::new(self.clone());
        drop(rx);
        tree.pull_directory(remote_dir, local_parent).await
    }
}
