//! Shell command execution and the filesystem mutations built on it.
//!
//! A command runs as one `shell:<command>` service request; the connection
//! then carries the command's merged stdout+stderr until end-of-stream. The
//! shell channel has **no structured exit status**: a command that fails on
//! the device (say, `mkdir` on an existing directory) still completes the
//! stream normally, with its diagnostic in the output text. Success at this
//! layer therefore means only that the command ran and its output was
//! captured; callers detect logical failure by inspecting
//! [`ShellOutput::diagnostics`]. This is a property of the channel, kept
//! explicit in the API rather than guessed into a boolean.
//!
//! Every path argument is quoted through
//! [`adbtree_core::path::quote_argument`], so paths containing quotes,
//! spaces, or `$` cannot break out of the command string.

use adbtree_core::path::{quote_argument, replace_basename};
use thiserror::Error;
use tracing::debug;

use crate::transport::{DeviceSession, TransportError};

/// A shell command failed in transit — the transport broke or the daemon
/// rejected the request. Distinct from a *logical* failure on the device,
/// which arrives as diagnostic text in a successful [`ShellOutput`].
#[derive(Debug, Error)]
#[error("shell command {command_line:?} failed in transit: {source}")]
pub struct CommandError {
    /// The full command line that was being executed.
    pub command_line: String,
    #[source]
    pub source: TransportError,
}

/// The captured output of one shell command.
///
/// Carries the raw trimmed text so the caller can decide what it means. For
/// the fixed mutation commands used here, empty output is the success case
/// and any text is a diagnostic; that heuristic lives in [`diagnostics`],
/// not hidden inside a boolean.
///
/// [`diagnostics`]: ShellOutput::diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    command_line: String,
    text: String,
}

impl ShellOutput {
    /// The command line that produced this output.
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// The merged stdout+stderr text, trimmed of surrounding whitespace.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the output text when it is non-empty.
    ///
    /// For the mutation commands in this module, non-empty output is the
    /// device's way of reporting a logical failure (`mkdir: File exists`,
    /// `rm: Permission denied`, …).
    pub fn diagnostics(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    /// True when the command produced no output at all.
    pub fn is_silent(&self) -> bool {
        self.text.is_empty()
    }
}

impl DeviceSession {
    /// Runs one shell command on the device and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] only for transport-level failures; see the
    /// module documentation for how on-device failures are reported.
    pub async fn run_shell(&self, command_line: &str) -> Result<ShellOutput, CommandError> {
        let result = async {
            let mut conn = self.open_service(&format!("shell:{command_line}")).await?;
            conn.read_drain_text().await
        }
        .await;

        match result {
            Ok(raw) => {
                let text = raw.trim().to_string();
                debug!(command_line, output_len = text.len(), "shell command completed");
                Ok(ShellOutput {
                    command_line: command_line.to_string(),
                    text,
                })
            }
            Err(source) => Err(CommandError {
                command_line: command_line.to_string(),
                source,
            }),
        }
    }

    /// Creates a directory on the device (`mkdir`).
    pub async fn mkdir(&self, path: &str) -> Result<ShellOutput, CommandError> {
        self.run_shell(&format!("mkdir {}", quote_argument(path))).await
    }

    /// Removes an empty directory on the device (`rmdir`).
    pub async fn rmdir(&self, path: &str) -> Result<ShellOutput, CommandError> {
        self.run_shell(&format!("rmdir {}", quote_argument(path))).await
    }

    /// Removes a file on the device (`rm -f`).
    pub async fn rm_file(&self, path: &str) -> Result<ShellOutput, CommandError> {
        self.run_shell(&format!("rm -f {}", quote_argument(path))).await
    }

    /// Removes a directory tree on the device (`rm -rf`).
    pub async fn rm_tree(&self, path: &str) -> Result<ShellOutput, CommandError> {
        self.run_shell(&format!("rm -rf {}", quote_argument(path))).await
    }

    /// Moves an entry on the device (`mv`).
    pub async fn move_entry(
        &self,
        source_path: &str,
        destination_path: &str,
    ) -> Result<ShellOutput, CommandError> {
        self.run_shell(&format!(
            "mv {} {}",
            quote_argument(source_path),
            quote_argument(destination_path)
        ))
        .await
    }

    /// Copies an entry on the device, recursively for directories (`cp -r`).
    pub async fn copy_entry(
        &self,
        source_path: &str,
        destination_path: &str,
    ) -> Result<ShellOutput, CommandError> {
        self.run_shell(&format!(
            "cp -r {} {}",
            quote_argument(source_path),
            quote_argument(destination_path)
        ))
        .await
    }

    /// Renames an entry in place: the target keeps the source's parent
    /// directory and takes `new_name` as its basename.
    pub async fn rename(
        &self,
        source_path: &str,
        new_name: &str,
    ) -> Result<ShellOutput, CommandError> {
        let destination = replace_basename(source_path, new_name);
        self.move_entry(source_path, &destination).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
