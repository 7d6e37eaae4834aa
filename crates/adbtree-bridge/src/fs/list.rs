//! Directory listing over the file service.
//!
//! A listing is one `LIST <path>` request on a device-bound `sync:`
//! connection, answered by zero or more `DENT` frames and a terminating
//! `DONE`. The daemon gives no ordering guarantee; callers that need a
//! deterministic order (the tree UI sorts by full path) sort the result
//! themselves.

use adbtree_core::protocol::sync::{
    encode_text_frame, DentFields, FrameHeader, SyncId, DENT_FIELDS_SIZE, SYNC_ID_SIZE,
};
use adbtree_core::{RemoteEntry, WireError};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::transport::{DeviceSession, TransportError};

/// A directory listing failed.
#[derive(Debug, Error)]
#[error("failed to list device directory {path:?}: {source}")]
pub struct ListError {
    /// The remote directory that was being listed.
    pub path: String,
    #[source]
    pub source: TransportError,
}

impl DeviceSession {
    /// Lists the entries of a device directory.
    ///
    /// Entry kinds are classified from the stat mode bits reported in each
    /// `DENT` frame at listing time and are not re-validated afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ListError`] if the transport fails or the daemon rejects
    /// the listing. Note that some daemon versions answer a missing path
    /// with an empty listing instead of a rejection.
    pub async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, ListError> {
        self.list_inner(path).await.map_err(|source| ListError {
            path: path.to_string(),
            source,
        })
    }

    async fn list_inner(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let mut conn = self.open_service("sync:").await?;
        let stream = conn.stream_mut();
        stream
            .write_all(&encode_text_frame(SyncId::List, path)?)
            .await?;

        // Listing replies use dent-sized frames: every id is followed by the
        // 16 field bytes, including the terminating DONE (whose fields are
        // all zero). Only FAIL falls back to the 8-byte header shape.
        let mut entries = Vec::new();
        loop {
            let mut id_bytes = [0u8; SYNC_ID_SIZE];
            stream.read_exact(&mut id_bytes).await?;

            match SyncId::parse(id_bytes)? {
                SyncId::Dent => {
                    let mut field_bytes = [0u8; DENT_FIELDS_SIZE];
                    stream.read_exact(&mut field_bytes).await?;
                    let fields = DentFields::parse(field_bytes);

                    let mut name_bytes = vec![0u8; fields.name_len as usize];
                    stream.read_exact(&mut name_bytes).await?;
                    let name = String::from_utf8(name_bytes)
                        .map_err(|e| WireError::InvalidUtf8(e.to_string()))?;

                    entries.push(RemoteEntry::from_wire(
                        name,
                        fields.mode,
                        fields.size,
                        fields.mtime,
                    ));
                }
                SyncId::Done => {
                    let mut trailer = [0u8; DENT_FIELDS_SIZE];
                    stream.read_exact(&mut trailer).await?;
                    break;
                }
                SyncId::Fail => {
                    let mut len_bytes = [0u8; 4];
                    stream.read_exact(&mut len_bytes).await?;
                    let message =
                        read_fail_message(stream, u32::from_le_bytes(len_bytes)).await?;
                    return Err(TransportError::Rejected(message));
                }
                other => {
                    return Err(TransportError::Protocol(format!(
                        "unexpected {other:?} frame in listing reply"
                    )));
                }
            }
        }

        // End the file-service session politely; the connection is dropped
        // either way.
        let quit = FrameHeader {
            id: SyncId::Quit,
            arg: 0,
        };
        let _ = stream.write_all(&quit.encode()).await;

        debug!(path, entries = entries.len(), "directory listed");
        Ok(entries)
    }
}

/// Reads the message payload of a `FAIL` frame.
pub(crate) async fn read_fail_message(
    stream: &mut tokio::net::TcpStream,
    len: u32,
) -> Result<String, TransportError> {
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await?;
    Ok(String::from_utf8_lossy(&payload).into_owned())
}
