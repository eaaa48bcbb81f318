//! Client of the OGrEE-3D visualization peer.
//!
//! Messages are JSON documents framed by a 4-byte little-endian length. A
//! background thread reads incoming frames and queues them on a channel that
//! the REPL drains between commands.

use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use serde_json::{Value as Json, json};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum VizError {
    #[error("not connected to OGrEE-3D")]
    NotConnected,
    #[error("cannot resolve OGrEE-3D address {0}")]
    InvalidAddress(String),
    #[error("message of {0} bytes is too large")]
    TooLarge(usize),
    #[error("OGrEE-3D connection error: {0}")]
    Io(#[from] io::Error),
}

/// A peer that receives live updates.
pub trait Viz {
    fn is_connected(&self) -> bool;

    fn send(&mut self, message: &Json) -> Result<(), VizError>;

    fn connect(&mut self, url: &str) -> Result<(), VizError>;

    fn disconnect(&mut self);

    /// Address of the peer, shown by `lsog`.
    fn describe(&self) -> String;

    /// Messages received since the last call.
    fn drain(&mut self) -> Vec<String> {
        Vec::new()
    }
}

/// Largest frame accepted from the peer.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Prefixes `payload` with its length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, VizError> {
    let len = i32::try_from(payload.len()).map_err(|_| VizError::TooLarge(payload.len()))?;
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reads one frame. A stream closed between two frames gives `None`.
pub fn read_frame(reader: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = i32::from_le_bytes(header);
    let len = usize::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative frame length"))?;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {} bytes", len, MAX_FRAME_LEN),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

struct Connection {
    stream: TcpStream,
    connected: Arc<AtomicBool>,
    incoming: Receiver<String>,
    reader: Option<JoinHandle<()>>,
}

/// TCP connection to OGrEE-3D.
pub struct Ogree3D {
    url: String,
    timeout: Duration,
    api_url: String,
    api_token: String,
    connection: Option<Connection>,
}

impl Ogree3D {
    pub fn new(url: &str, timeout: Duration, api_url: &str, api_token: &str) -> Self {
        Ogree3D {
            url: url.to_string(),
            timeout,
            api_url: api_url.to_string(),
            api_token: api_token.to_string(),
            connection: None,
        }
    }

    fn open(&self, url: &str) -> Result<Connection, VizError> {
        let addr = url
            .to_socket_addrs()
            .map_err(|_| VizError::InvalidAddress(url.to_string()))?
            .next()
            .ok_or_else(|| VizError::InvalidAddress(url.to_string()))?;
        let stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_write_timeout(Some(self.timeout))?;

        let connected = Arc::new(AtomicBool::new(true));
        let (tx, incoming) = mpsc::channel();
        let mut read_side = stream.try_clone()?;
        let flag = Arc::clone(&connected);
        let reader = thread::spawn(move || {
            loop {
                match read_frame(&mut read_side) {
                    Ok(Some(payload)) => {
                        let text = String::from_utf8_lossy(&payload).into_owned();
                        if tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "OGrEE-3D read failed");
                        break;
                    }
                }
            }
            flag.store(false, Ordering::SeqCst);
            info!("OGrEE-3D connection closed");
        });

        Ok(Connection {
            stream,
            connected,
            incoming,
            reader: Some(reader),
        })
    }
}

impl Viz for Ogree3D {
    fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.connected.load(Ordering::SeqCst))
    }

    fn send(&mut self, message: &Json) -> Result<(), VizError> {
        if !self.is_connected() {
            return Err(VizError::NotConnected);
        }
        let Some(connection) = self.connection.as_mut() else {
            return Err(VizError::NotConnected);
        };
        let frame = encode_frame(message.to_string().as_bytes())?;
        debug!(kind = %message["type"], "sending message to OGrEE-3D");
        if let Err(e) = connection.stream.write_all(&frame) {
            connection.connected.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    fn connect(&mut self, url: &str) -> Result<(), VizError> {
        self.disconnect();
        let connection = self.open(url)?;
        self.url = url.to_string();
        self.connection = Some(connection);
        info!(url, "connected to OGrEE-3D");
        let login = message::login(&self.api_url, &self.api_token);
        self.send(&login)
    }

    fn disconnect(&mut self) {
        if self.is_connected() {
            if let Err(e) = self.send(&message::logout()) {
                warn!(error = %e, "cannot send logout to OGrEE-3D");
            }
        }
        if let Some(mut connection) = self.connection.take() {
            let _ = connection.stream.shutdown(Shutdown::Both);
            if let Some(reader) = connection.reader.take() {
                let _ = reader.join();
            }
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }

    fn drain(&mut self) -> Vec<String> {
        match &self.connection {
            Some(connection) => connection.incoming.try_iter().collect(),
            None => Vec::new(),
        }
    }
}

impl Drop for Ogree3D {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Keeps every message in memory. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingViz {
    connected: Arc<AtomicBool>,
    url: Arc<Mutex<String>>,
    messages: Arc<Mutex<Vec<Json>>>,
}

impl RecordingViz {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that accepts messages right away.
    pub fn connected() -> Self {
        let viz = Self::default();
        viz.connected.store(true, Ordering::SeqCst);
        viz
    }

    pub fn messages(&self) -> Vec<Json> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Viz for RecordingViz {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(&mut self, message: &Json) -> Result<(), VizError> {
        if !self.is_connected() {
            return Err(VizError::NotConnected);
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.clone());
        }
        Ok(())
    }

    fn connect(&mut self, url: &str) -> Result<(), VizError> {
        if let Ok(mut current) = self.url.lock() {
            *current = url.to_string();
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        self.url.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

/// Messages understood by OGrEE-3D.
pub mod message {
    use super::*;

    fn typed(kind: &str, data: Json) -> Json {
        json!({ "type": kind, "data": data })
    }

    pub fn login(api_url: &str, api_token: &str) -> Json {
        typed("login", json!({ "api_url": api_url, "api_token": api_token }))
    }

    pub fn logout() -> Json {
        typed("logout", Json::String(String::new()))
    }

    pub fn create(object: Json) -> Json {
        typed("create", object)
    }

    pub fn modify(object: Json) -> Json {
        typed("modify", object)
    }

    pub fn delete(id: &str) -> Json {
        typed("delete", Json::String(id.to_string()))
    }

    pub fn interact(id: &str, param: &str, value: Json) -> Json {
        typed("interact", json!({ "id": id, "param": param, "value": value }))
    }

    pub fn ui(command: &str, data: Json) -> Json {
        typed("ui", json!({ "command": command, "data": data }))
    }

    pub fn camera(command: &str, position: [f64; 3], rotation: [f64; 2]) -> Json {
        typed(
            "camera",
            json!({
                "command": command,
                "position": { "x": position[0], "y": position[1], "z": position[2] },
                "rotation": { "x": rotation[0], "y": rotation[1] },
            }),
        )
    }

    pub fn focus(id: &str) -> Json {
        typed("focus", Json::String(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_layout() {
        let frame = encode_frame(b"{}").unwrap();
        assert_eq!(frame, vec![2, 0, 0, 0, b'{', b'}']);
    }

    #[test]
    fn test_read_frames_until_end_of_stream() {
        let mut bytes = encode_frame(b"one").unwrap();
        bytes.extend(encode_frame(b"two").unwrap());
        let mut reader = Cursor::new(bytes);
        assert_eq!(read_frame(&mut reader).unwrap(), Some(b"one".to_vec()));
        assert_eq!(read_frame(&mut reader).unwrap(), Some(b"two".to_vec()));
        assert_eq!(read_frame(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let mut bytes = encode_frame(b"hello").unwrap();
        bytes.truncate(6);
        assert!(read_frame(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let len = i32::try_from(MAX_FRAME_LEN + 1).unwrap();
        let err = read_frame(&mut Cursor::new(len.to_le_bytes().to_vec())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_recording_requires_connection() {
        let mut viz = RecordingViz::new();
        assert!(matches!(
            viz.send(&message::logout()),
            Err(VizError::NotConnected)
        ));
        let record = viz.clone();
        viz.connect("localhost:5500").unwrap();
        viz.send(&message::focus("S.B")).unwrap();
        assert_eq!(record.messages().len(), 1);
        assert_eq!(record.messages()[0]["type"], "focus");
    }
}
