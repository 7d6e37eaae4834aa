//! Diagnostic binary for the bridge client.
//!
//! The real consumer of `adbtree-bridge` is a tree UI; this binary exists to
//! exercise the same surface from a terminal:
//!
//! ```text
//! adbtree                     # list connected device serials
//! adbtree <serial>            # list / on the device
//! adbtree <serial> <path>     # list <path> on the device
//! ```
//!
//! Settings are read from the file named by `ADBTREE_CONFIG` when set,
//! otherwise built-in defaults apply (local daemon on port 5037).

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adbtree_bridge::{BridgeClient, EntryKind, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = match std::env::var_os("ADBTREE_CONFIG") {
        Some(path) => Settings::load_from(path)?,
        None => Settings::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let client = BridgeClient::new(settings.bridge_config()?);
    info!(addr = %client.server_addr(), "querying bridge daemon");

    let mut args = std::env::args().skip(1);
    let serial = args.next();
    let path = args.next().unwrap_or_else(|| "/".to_string());

    let serials = client
        .list_device_ids()
        .await
        .context("could not list devices; is the bridge daemon running?")?;

    match serial {
        None => {
            if serials.is_empty() {
                println!("no devices connected");
            }
            for serial in serials {
                println!("{serial}");
            }
        }
        Some(serial) => {
            let session = client.session(serial);
            let mut entries = session
                .list(&path)
                .await
                .with_context(|| format!("could not list {path}"))?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                let marker = match entry.kind {
                    EntryKind::Directory => "/",
                    EntryKind::Symlink => "@",
                    kind if kind.is_special() => "%",
                    _ => "",
                };
                println!("{:>10}  {}{marker}", entry.size, entry.name);
            }
        }
    }

    Ok(())
}
