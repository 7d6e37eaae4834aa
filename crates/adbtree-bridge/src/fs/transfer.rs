//! Single-file transfer between the device and the local filesystem.
//!
//! A pull is one `RECV <path>` request answered by `DATA` frames and a
//! terminating `DONE`; a push is one `SEND <path>,<mode>` request followed by
//! client `DATA` frames, a `DONE <mtime>` trailer, and a single `OKAY` or
//! `FAIL` verdict. Each transfer is a single attempt with no retry: any
//! stream error surfaces immediately as a [`TransferError`].
//!
//! The pull destination is created (truncating an existing file) *before*
//! streaming begins, so a failed pull can leave a partial file on disk.
//! There is no atomic temp-file swap; callers that need one build it on top.

use std::path::{Path, PathBuf};

use adbtree_core::protocol::sync::{
    encode_send_payload, encode_text_frame, FrameHeader, SyncId, DATA_CHUNK_MAX,
    FRAME_HEADER_SIZE,
};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::fs::list::read_fail_message;
use crate::transport::{DeviceSession, TransportError};

/// Mode bits sent for a pushed file when the source permissions cannot be
/// read (non-Unix hosts): a regular file, `rw-r--r--`.
#[cfg(not(unix))]
const DEFAULT_PUSH_MODE: u32 = 0o100644;

/// A file transfer failed. Each variant names the side that failed so the
/// caller can build a meaningful message.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The device link failed or the daemon rejected the transfer.
    #[error("transfer of {path:?} failed on the device link: {source}")]
    Device {
        path: String,
        #[source]
        source: TransportError,
    },

    /// The local file could not be created, read, or written.
    #[error("transfer of {path} failed on the local filesystem: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeviceSession {
    /// Pulls one device file to a local destination path.
    ///
    /// The destination is created or truncated up front; see the module
    /// documentation for the partial-file caveat this implies.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] on any stream error on either side,
    /// including the daemon rejecting the path (missing file, permission).
    pub async fn pull(
        &self,
        remote_path: &str,
        local_dest: impl AsRef<Path>,
    ) -> Result<(), TransferError> {
        let local_dest = local_dest.as_ref();
        let device_err = |source| TransferError::Device {
            path: remote_path.to_string(),
            source,
        };
        let local_err = |source| TransferError::Local {
            path: local_dest.to_path_buf(),
            source,
        };

        let mut conn = self.open_service("sync:").await.map_err(device_err)?;
        let stream = conn.stream_mut();
        stream
            .write_all(
                &encode_text_frame(SyncId::Recv, remote_path)
                    .map_err(|e| device_err(e.into()))?,
            )
            .await
            .map_err(|e| device_err(e.into()))?;

        let mut file = File::create(local_dest).await.map_err(local_err)?;
        let mut total = 0u64;

        loop {
            let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
            stream
                .read_exact(&mut header_bytes)
                .await
                .map_err(|e| device_err(e.into()))?;
            let header = FrameHeader::parse(header_bytes).map_err(|e| device_err(e.into()))?;

            match header.id {
                SyncId::Data => {
                    let mut chunk = vec![0u8; header.arg as usize];
                    stream
                        .read_exact(&mut chunk)
                        .await
                        .map_err(|e| device_err(e.into()))?;
                    file.write_all(&chunk).await.map_err(local_err)?;
                    total += u64::from(header.arg);
                }
                SyncId::Done => break,
                SyncId::Fail => {
                    let message = read_fail_message(stream, header.arg)
                        .await
                        .map_err(device_err)?;
                    return Err(device_err(TransportError::Rejected(message)));
                }
                other => {
                    return Err(device_err(TransportError::Protocol(format!(
                        "unexpected {other:?} frame in download reply"
                    ))));
                }
            }
        }

        file.flush().await.map_err(local_err)?;

        let quit = FrameHeader {
            id: SyncId::Quit,
            arg: 0,
        };
        let _ = stream.write_all(&quit.encode()).await;

        debug!(remote_path, bytes = total, "file pulled");
        Ok(())
    }

    /// Pushes one local regular file to a device path.
    ///
    /// The caller is responsible for ensuring the source is a regular file;
    /// the dispatching `push` in the tree module performs that check. File
    /// permissions and modification time are propagated where the host can
    /// report them.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if the source cannot be opened or the
    /// device rejects the write.
    pub async fn push_file(
        &self,
        local_src: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<(), TransferError> {
        let local_src = local_src.as_ref();
        let device_err = |source| TransferError::Device {
            path: remote_path.to_string(),
            source,
        };
        let local_err = |source| TransferError::Local {
            path: local_src.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(local_src).await.map_err(local_err)?;
        let mut file = File::open(local_src).await.map_err(local_err)?;
        let mode = push_mode(&metadata);
        let mtime_secs = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let mut conn = self.open_service("sync:").await.map_err(device_err)?;
        let stream = conn.stream_mut();
        let payload = encode_send_payload(remote_path, mode);
        stream
            .write_all(&encode_text_frame(SyncId::Send, &payload).map_err(|e| device_err(e.into()))?)
            .await
            .map_err(|e| device_err(e.into()))?;

        let mut chunk = vec![0u8; DATA_CHUNK_MAX];
        let mut total = 0u64;
        loop {
            let n = file.read(&mut chunk).await.map_err(local_err)?;
            if n == 0 {
                break;
            }
            let header = FrameHeader {
                id: SyncId::Data,
                arg: n as u32,
            };
            stream
                .write_all(&header.encode())
                .await
                .map_err(|e| device_err(e.into()))?;
            stream
                .write_all(&chunk[..n])
                .await
                .map_err(|e| device_err(e.into()))?;
            total += n as u64;
        }

        let done = FrameHeader {
            id: SyncId::Done,
            arg: mtime_secs,
        };
        stream
            .write_all(&done.encode())
            .await
            .map_err(|e| device_err(e.into()))?;

        let mut verdict_bytes = [0u8; FRAME_HEADER_SIZE];
        stream
            .read_exact(&mut verdict_bytes)
            .await
            .map_err(|e| device_err(e.into()))?;
        let verdict = FrameHeader::parse(verdict_bytes).map_err(|e| device_err(e.into()))?;
        match verdict.id {
            SyncId::Okay => {}
            SyncId::Fail => {
                let message = read_fail_message(stream, verdict.arg)
                    .await
                    .map_err(device_err)?;
                return Err(device_err(TransportError::Rejected(message)));
            }
            other => {
                return Err(device_err(TransportError::Protocol(format!(
                    "unexpected {other:?} frame as upload verdict"
                ))));
            }
        }

        let quit = FrameHeader {
            id: SyncId::Quit,
            arg: 0,
        };
        let _ = stream.write_all(&quit.encode()).await;

        debug!(remote_path, bytes = total, "file pushed");
        Ok(())
    }
}

/// Derives the mode bits to announce for a pushed file.
#[cfg(unix)]
fn push_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    0o100000 | (metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn push_mode(_metadata: &std::fs::Metadata) -> u32 {
    DEFAULT_PUSH_MODE
}
