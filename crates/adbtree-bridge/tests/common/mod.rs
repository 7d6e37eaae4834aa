//! In-process fake bridge daemon for integration tests.
//!
//! The real daemon requires a running service and a physically connected
//! device, neither of which exists on a test machine. This fixture binds a
//! loopback listener and speaks the actual wire protocol — smart-socket
//! framing, the `sync:` file service, and `shell:` command streams — against
//! an in-memory filesystem, so the client under test runs its production
//! code paths byte for byte.
//!
//! Failure injection: set `fail_pull_containing` / `fail_push_containing`
//! on a device and any transfer whose remote path contains the substring is
//! answered with a `FAIL` frame, which is how per-entry failure isolation
//! is exercised.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use adbtree_core::protocol::host::{self, Status};
use adbtree_core::protocol::sync::{
    DentFields, FrameHeader, SyncId, DATA_CHUNK_MAX, FRAME_HEADER_SIZE,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use adbtree_bridge::{BridgeClient, BridgeConfig};

/// Default mtime stamped on fixture nodes.
pub const FIXTURE_MTIME: u32 = 1_600_000_000;

/// One node of the fake device filesystem.
#[derive(Debug, Clone)]
pub enum FakeNode {
    File {
        bytes: Vec<u8>,
        mode: u32,
        mtime: u32,
    },
    Dir {
        children: BTreeMap<String, FakeNode>,
    },
    /// Any non-file non-directory node; `mode` carries the type bits.
    Other { mode: u32 },
}

impl FakeNode {
    pub fn dir() -> Self {
        FakeNode::Dir {
            children: BTreeMap::new(),
        }
    }

    pub fn file(bytes: &[u8]) -> Self {
        FakeNode::File {
            bytes: bytes.to_vec(),
            mode: 0o100644,
            mtime: FIXTURE_MTIME,
        }
    }

    pub fn symlink() -> Self {
        FakeNode::Other { mode: 0o120777 }
    }

    pub fn socket() -> Self {
        FakeNode::Other { mode: 0o140777 }
    }

    /// (mode, size, mtime) as a `DENT` frame would report them.
    fn stat(&self) -> (u32, u32, u32) {
        match self {
            FakeNode::File { bytes, mode, mtime } => (*mode, bytes.len() as u32, *mtime),
            FakeNode::Dir { .. } => (0o040755, 4096, FIXTURE_MTIME),
            FakeNode::Other { mode } => (*mode, 0, FIXTURE_MTIME),
        }
    }
}

/// The in-memory filesystem of one fake device.
#[derive(Debug)]
pub struct FakeFs {
    root: FakeNode,
}

impl Default for FakeFs {
    fn default() -> Self {
        Self {
            root: FakeNode::dir(),
        }
    }
}

fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

impl FakeFs {
    pub fn node(&self, path: &str) -> Option<&FakeNode> {
        let mut current = &self.root;
        for comp in components(path) {
            match current {
                FakeNode::Dir { children } => current = children.get(comp)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Resolves the parent directory's child map and the final component.
    fn parent_mut(&mut self, path: &str) -> Option<(&mut BTreeMap<String, FakeNode>, String)> {
        let comps = components(path);
        let (last, init) = comps.split_last()?;
        let mut current = &mut self.root;
        for comp in init {
            match current {
                FakeNode::Dir { children } => current = children.get_mut(*comp)?,
                _ => return None,
            }
        }
        match current {
            FakeNode::Dir { children } => Some((children, last.to_string())),
            _ => None,
        }
    }

    /// Inserts a node, requiring the parent directory to exist.
    pub fn insert(&mut self, path: &str, node: FakeNode) -> Result<(), String> {
        let display = path.to_string();
        let (children, name) = self
            .parent_mut(path)
            .ok_or(format!("'{display}': No such file or directory"))?;
        children.insert(name, node);
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Option<FakeNode> {
        let (children, name) = self.parent_mut(path)?;
        children.remove(&name)
    }
}

/// One fake device served by the bridge.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub serial: String,
    pub state: String,
    pub fs: Arc<Mutex<FakeFs>>,
    /// Every `shell:` command line received, in order.
    pub shell_log: Arc<Mutex<Vec<String>>>,
    pub fail_pull_containing: Option<String>,
    pub fail_push_containing: Option<String>,
}

impl FakeDevice {
    pub fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            state: "device".to_string(),
            fs: Arc::new(Mutex::new(FakeFs::default())),
            shell_log: Arc::new(Mutex::new(Vec::new())),
            fail_pull_containing: None,
            fail_push_containing: None,
        }
    }

    // ── Fixture builders and assertion helpers ──────────────────────────────

    pub fn add_dir(&self, path: &str) {
        self.fs.lock().unwrap().insert(path, FakeNode::dir()).unwrap();
    }

    pub fn add_file(&self, path: &str, bytes: &[u8]) {
        self.fs
            .lock()
            .unwrap()
            .insert(path, FakeNode::file(bytes))
            .unwrap();
    }

    pub fn add_node(&self, path: &str, node: FakeNode) {
        self.fs.lock().unwrap().insert(path, node).unwrap();
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.fs.lock().unwrap().node(path).is_some()
    }

    pub fn file_bytes(&self, path: &str) -> Option<Vec<u8>> {
        match self.fs.lock().unwrap().node(path) {
            Some(FakeNode::File { bytes, .. }) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn child_names(&self, path: &str) -> Vec<String> {
        match self.fs.lock().unwrap().node(path) {
            Some(FakeNode::Dir { children }) => children.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn logged_commands(&self) -> Vec<String> {
        self.shell_log.lock().unwrap().clone()
    }
}

/// The fake daemon: a loopback listener plus the devices it serves.
pub struct FakeBridge {
    addr: SocketAddr,
    pub devices: Vec<FakeDevice>,
}

impl FakeBridge {
    /// Binds a loopback port and starts serving the given devices.
    pub async fn start(devices: Vec<FakeDevice>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let served: Arc<Vec<FakeDevice>> = Arc::new(devices.clone());

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let devices = Arc::clone(&served);
                tokio::spawn(async move {
                    handle_connection(stream, &devices).await;
                });
            }
        });

        Self { addr, devices }
    }

    /// Convenience: one device named `serial` with an empty filesystem.
    pub async fn single(serial: &str) -> (Self, FakeDevice) {
        let device = FakeDevice::new(serial);
        let bridge = Self::start(vec![device.clone()]).await;
        (bridge, device)
    }

    pub fn client(&self) -> BridgeClient {
        BridgeClient::new(BridgeConfig {
            server_addr: self.addr,
        })
    }
}

// ── Connection handling ───────────────────────────────────────────────────────

async fn handle_connection(mut stream: TcpStream, devices: &[FakeDevice]) {
    let mut bound: Option<FakeDevice> = None;

    loop {
        let Some(service) = read_request(&mut stream).await else {
            return;
        };

        if let Some(rest) = service.strip_prefix("host:") {
            if rest == "devices" {
                let mut text = String::new();
                for device in devices {
                    text.push_str(&format!("{}\t{}\n", device.serial, device.state));
                }
                write_okay_reply(&mut stream, &text).await;
                return;
            } else if let Some(serial) = rest.strip_prefix("transport:") {
                match devices.iter().find(|d| d.serial == serial) {
                    Some(device) => {
                        bound = Some(device.clone());
                        let _ = stream.write_all(&Status::Okay.as_bytes()).await;
                    }
                    None => {
                        write_fail_reply(&mut stream, &format!("device '{serial}' not found"))
                            .await;
                        return;
                    }
                }
            } else {
                write_fail_reply(&mut stream, "unknown host service").await;
                return;
            }
        } else if service == "sync:" {
            let Some(device) = bound.as_ref() else {
                write_fail_reply(&mut stream, "no device bound").await;
                return;
            };
            let _ = stream.write_all(&Status::Okay.as_bytes()).await;
            serve_sync(&mut stream, device).await;
            return;
        } else if let Some(command_line) = service.strip_prefix("shell:") {
            let Some(device) = bound.as_ref() else {
                write_fail_reply(&mut stream, "no device bound").await;
                return;
            };
            let _ = stream.write_all(&Status::Okay.as_bytes()).await;
            let output = run_fake_shell(device, command_line);
            let _ = stream.write_all(output.as_bytes()).await;
            // Dropping the stream is the shell's end-of-output signal.
            return;
        } else {
            write_fail_reply(&mut stream, "unknown service").await;
            return;
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await.ok()?;
    let len = host::decode_length(prefix).ok()?;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.ok()?;
    String::from_utf8(payload).ok()
}

async fn write_okay_reply(stream: &mut TcpStream, text: &str) {
    let mut reply = Vec::new();
    reply.extend_from_slice(&Status::Okay.as_bytes());
    reply.extend_from_slice(&host::encode_length(text.len()));
    reply.extend_from_slice(text.as_bytes());
    let _ = stream.write_all(&reply).await;
}

async fn write_fail_reply(stream: &mut TcpStream, message: &str) {
    let mut reply = Vec::new();
    reply.extend_from_slice(&Status::Fail.as_bytes());
    reply.extend_from_slice(&host::encode_length(message.len()));
    reply.extend_from_slice(message.as_bytes());
    let _ = stream.write_all(&reply).await;
}

// ── File service ──────────────────────────────────────────────────────────────

/// `FAIL` frame in the 8-byte header shape: id + message length + message.
fn fail_frame(message: &str) -> Vec<u8> {
    let mut frame = FrameHeader {
        id: SyncId::Fail,
        arg: message.len() as u32,
    }
    .encode()
    .to_vec();
    frame.extend_from_slice(message.as_bytes());
    frame
}

async fn serve_sync(stream: &mut TcpStream, device: &FakeDevice) {
    loop {
        let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
        if stream.read_exact(&mut header_bytes).await.is_err() {
            return;
        }
        let Ok(header) = FrameHeader::parse(header_bytes) else {
            return;
        };

        match header.id {
            SyncId::List => {
                let Some(path) = read_text_arg(stream, header.arg).await else {
                    return;
                };
                let reply = {
                    let fs = device.fs.lock().unwrap();
                    match fs.node(&path) {
                        Some(FakeNode::Dir { children }) => {
                            let mut buf = Vec::new();
                            for (name, node) in children {
                                let (mode, size, mtime) = node.stat();
                                buf.extend_from_slice(&SyncId::Dent.code());
                                buf.extend_from_slice(
                                    &DentFields {
                                        mode,
                                        size,
                                        mtime,
                                        name_len: name.len() as u32,
                                    }
                                    .encode(),
                                );
                                buf.extend_from_slice(name.as_bytes());
                            }
                            // Listing DONE is dent-sized: 16 zero field bytes.
                            buf.extend_from_slice(&SyncId::Done.code());
                            buf.extend_from_slice(&[0u8; 16]);
                            buf
                        }
                        _ => fail_frame("No such file or directory"),
                    }
                };
                let _ = stream.write_all(&reply).await;
            }

            SyncId::Recv => {
                let Some(path) = read_text_arg(stream, header.arg).await else {
                    return;
                };
                if path_matches(&path, &device.fail_pull_containing) {
                    let _ = stream.write_all(&fail_frame("Permission denied")).await;
                    continue;
                }
                let bytes = {
                    let fs = device.fs.lock().unwrap();
                    match fs.node(&path) {
                        Some(FakeNode::File { bytes, .. }) => Some(bytes.clone()),
                        _ => None,
                    }
                };
                match bytes {
                    Some(bytes) => {
                        for chunk in bytes.chunks(DATA_CHUNK_MAX) {
                            let data = FrameHeader {
                                id: SyncId::Data,
                                arg: chunk.len() as u32,
                            };
                            let _ = stream.write_all(&data.encode()).await;
                            let _ = stream.write_all(chunk).await;
                        }
                        let done = FrameHeader {
                            id: SyncId::Done,
                            arg: 0,
                        };
                        let _ = stream.write_all(&done.encode()).await;
                    }
                    None => {
                        let _ = stream
                            .write_all(&fail_frame("No such file or directory"))
                            .await;
                    }
                }
            }

            SyncId::Send => {
                let Some(payload) = read_text_arg(stream, header.arg).await else {
                    return;
                };
                let (path, mode) = match payload.rsplit_once(',') {
                    Some((path, mode_text)) => {
                        (path.to_string(), mode_text.parse::<u32>().unwrap_or(0o100644))
                    }
                    None => (payload, 0o100644),
                };

                // Consume the upload body regardless of the verdict.
                let mut bytes = Vec::new();
                let mut mtime = 0u32;
                loop {
                    let mut chunk_header = [0u8; FRAME_HEADER_SIZE];
                    if stream.read_exact(&mut chunk_header).await.is_err() {
                        return;
                    }
                    let Ok(chunk_header) = FrameHeader::parse(chunk_header) else {
                        return;
                    };
                    match chunk_header.id {
                        SyncId::Data => {
                            let mut chunk = vec![0u8; chunk_header.arg as usize];
                            if stream.read_exact(&mut chunk).await.is_err() {
                                return;
                            }
                            bytes.extend_from_slice(&chunk);
                        }
                        SyncId::Done => {
                            mtime = chunk_header.arg;
                            break;
                        }
                        _ => return,
                    }
                }

                let verdict = if path_matches(&path, &device.fail_push_containing) {
                    fail_frame("Permission denied")
                } else {
                    let result = device.fs.lock().unwrap().insert(
                        &path,
                        FakeNode::File { bytes, mode, mtime },
                    );
                    match result {
                        Ok(()) => FrameHeader {
                            id: SyncId::Okay,
                            arg: 0,
                        }
                        .encode()
                        .to_vec(),
                        Err(reason) => fail_frame(&reason),
                    }
                };
                let _ = stream.write_all(&verdict).await;
            }

            SyncId::Quit => return,
            _ => return,
        }
    }
}

async fn read_text_arg(stream: &mut TcpStream, len: u32) -> Option<String> {
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await.ok()?;
    String::from_utf8(payload).ok()
}

fn path_matches(path: &str, needle: &Option<String>) -> bool {
    needle.as_ref().is_some_and(|n| path.contains(n))
}

// ── Shell emulation ───────────────────────────────────────────────────────────

/// Splits a command line into the command word(s) and its double-quoted
/// arguments, undoing the client's backslash escaping.
fn parse_command(command_line: &str) -> (String, Vec<String>) {
    let head_end = command_line.find('"').unwrap_or(command_line.len());
    let head = command_line[..head_end].trim().to_string();

    let mut args = Vec::new();
    let mut chars = command_line[head_end..].chars();
    while let Some(ch) = chars.next() {
        if ch != '"' {
            continue;
        }
        let mut arg = String::new();
        loop {
            match chars.next() {
                Some('\\') => {
                    if let Some(escaped) = chars.next() {
                        arg.push(escaped);
                    }
                }
                Some('"') | None => break,
                Some(other) => arg.push(other),
            }
        }
        args.push(arg);
    }
    (head, args)
}

/// Runs one emulated shell command and returns its merged output.
///
/// Mirrors the toybox diagnostics the mutation commands produce on a real
/// device: success is silent, failure is one line of text. The channel has
/// no exit status either way.
fn run_fake_shell(device: &FakeDevice, command_line: &str) -> String {
    device
        .shell_log
        .lock()
        .unwrap()
        .push(command_line.to_string());

    let (head, args) = parse_command(command_line);
    let mut fs = device.fs.lock().unwrap();

    match (head.as_str(), args.as_slice()) {
        ("mkdir", [path]) => {
            if fs.node(path).is_some() {
                format!("mkdir: '{path}': File exists")
            } else {
                match fs.insert(path, FakeNode::dir()) {
                    Ok(()) => String::new(),
                    Err(reason) => format!("mkdir: {reason}"),
                }
            }
        }
        ("rmdir", [path]) => match fs.node(path) {
            Some(FakeNode::Dir { children }) if children.is_empty() => {
                fs.remove(path);
                String::new()
            }
            Some(FakeNode::Dir { .. }) => format!("rmdir: '{path}': Directory not empty"),
            Some(_) => format!("rmdir: '{path}': Not a directory"),
            None => format!("rmdir: '{path}': No such file or directory"),
        },
        ("rm -f", [path]) => match fs.node(path) {
            Some(FakeNode::Dir { .. }) => format!("rm: '{path}': Is a directory"),
            Some(_) => {
                fs.remove(path);
                String::new()
            }
            // -f silences the missing-file case.
            None => String::new(),
        },
        ("rm -rf", [path]) => {
            fs.remove(path);
            String::new()
        }
        ("mv", [source, destination]) => match fs.remove(source) {
            Some(node) => match fs.insert(destination, node) {
                Ok(()) => String::new(),
                Err(reason) => format!("mv: {reason}"),
            },
            None => format!("mv: bad '{source}': No such file or directory"),
        },
        ("cp -r", [source, destination]) => match fs.node(source).cloned() {
            Some(node) => match fs.insert(destination, node) {
                Ok(()) => String::new(),
                Err(reason) => format!("cp: {reason}"),
            },
            None => format!("cp: bad '{source}': No such file or directory"),
        },
        _ => format!("sh: {head}: inaccessible or not found"),
    }
}
