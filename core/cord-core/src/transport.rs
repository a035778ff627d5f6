//! Transport to the local presence service.
//!
//! `Connector` opens a socket; `Transport` speaks the frame protocol over it.
//! Every operation returns `Result<_, TransportError>`. Deciding what to do
//! with a failure is the session worker's job, not this module's.

use chrono::Utc;
use cord_ipc_protocol::Activity;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::PresenceConfig;
use crate::error::TransportError;

/// Upper bound on a single blocking read, so deadlines and cancellation are
/// observed promptly.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Shared cancellation signal for an in-flight connect.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait Connector: Send + Sync {
    fn open(&self) -> Result<Box<dyn Transport>, TransportError>;
}

pub trait Transport: Send {
    /// Sends the handshake and waits for the READY dispatch.
    ///
    /// Must give up with `Timeout` at `deadline` and with `Cancelled` as soon
    /// as `cancel` is raised.
    fn handshake(
        &mut self,
        client_id: u64,
        deadline: Instant,
        cancel: &CancelFlag,
    ) -> Result<(), TransportError>;

    /// Sets the displayed activity; `None` clears it.
    fn set_activity(&mut self, pid: u32, activity: Option<&Activity>)
        -> Result<(), TransportError>;

    fn close(&mut self) -> Result<(), TransportError>;
}

pub(crate) fn make_nonce() -> String {
    let mut random = rand::thread_rng();
    format!(
        "cord-{}-{:x}",
        Utc::now().timestamp_millis(),
        random.next_u64()
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Unix Socket Transport
// ═══════════════════════════════════════════════════════════════════════════════

/// Opens the first presence socket that accepts a connection.
#[derive(Debug, Clone)]
pub struct IpcConnector {
    candidates: Vec<std::path::PathBuf>,
    response_timeout: Duration,
}

impl IpcConnector {
    pub fn from_config(config: &PresenceConfig) -> Self {
        Self {
            candidates: config.socket_candidates(),
            response_timeout: config.response_timeout,
        }
    }
}

#[cfg(unix)]
impl Connector for IpcConnector {
    fn open(&self) -> Result<Box<dyn Transport>, TransportError> {
        use std::os::unix::net::UnixStream;

        for path in &self.candidates {
            match UnixStream::connect(path) {
                Ok(stream) => {
                    tracing::debug!(path = %path.display(), "Connected to presence socket");
                    return Ok(Box::new(unix::IpcTransport::new(
                        stream,
                        self.response_timeout,
                    )));
                }
                Err(err) => {
                    tracing::trace!(path = %path.display(), error = %err, "Presence socket unavailable");
                }
            }
        }

        Err(TransportError::NoSocket {
            attempted: self.candidates.len(),
        })
    }
}

#[cfg(not(unix))]
impl Connector for IpcConnector {
    fn open(&self) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::Unsupported)
    }
}

#[cfg(unix)]
mod unix {
    use cord_ipc_protocol::{
        decode_frame, encode_frame, Activity, CommandRequest, Frame, Handshake, Opcode,
    };
    use serde::Serialize;
    use std::io::{ErrorKind, Read, Write};
    use std::net::Shutdown;
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};

    use super::{make_nonce, CancelFlag, Transport, POLL_INTERVAL};
    use crate::error::TransportError;

    const READ_CHUNK_SIZE: usize = 4096;

    pub struct IpcTransport {
        stream: UnixStream,
        buffer: Vec<u8>,
        response_timeout: Duration,
    }

    impl IpcTransport {
        pub fn new(stream: UnixStream, response_timeout: Duration) -> Self {
            Self {
                stream,
                buffer: Vec::new(),
                response_timeout,
            }
        }

        fn write_frame<T: Serialize>(&mut self, opcode: Opcode, body: &T) -> Result<(), TransportError> {
            let bytes = encode_frame(opcode, body)?;
            self.stream
                .write_all(&bytes)
                .map_err(|err| TransportError::io("Failed to write frame", err))?;
            self.stream
                .flush()
                .map_err(|err| TransportError::io("Failed to flush frame", err))
        }

        /// Reads the next frame, answering pings and surfacing close frames.
        fn next_frame(
            &mut self,
            deadline: Instant,
            cancel: Option<&CancelFlag>,
        ) -> Result<Frame, TransportError> {
            loop {
                let frame = self.read_frame(deadline, cancel)?;
                match frame.opcode {
                    Opcode::Ping => self.write_frame(Opcode::Pong, &frame.body)?,
                    Opcode::Close => {
                        let reason = frame.close_reason();
                        return Err(TransportError::Closed {
                            code: reason.code,
                            message: reason.message,
                        });
                    }
                    Opcode::Frame => return Ok(frame),
                    Opcode::Handshake | Opcode::Pong => {}
                }
            }
        }

        fn read_frame(
            &mut self,
            deadline: Instant,
            cancel: Option<&CancelFlag>,
        ) -> Result<Frame, TransportError> {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                if let Some((frame, used)) = decode_frame(&self.buffer)? {
                    self.buffer.drain(..used);
                    return Ok(frame);
                }

                if cancel.map(CancelFlag::is_cancelled).unwrap_or(false) {
                    return Err(TransportError::Cancelled);
                }
                let now = Instant::now();
                if now >= deadline {
                    return Err(TransportError::Timeout);
                }

                let wait = (deadline - now).min(POLL_INTERVAL);
                self.stream
                    .set_read_timeout(Some(wait))
                    .map_err(|err| TransportError::io("Failed to set read timeout", err))?;

                match self.stream.read(&mut chunk) {
                    Ok(0) => return Err(TransportError::Disconnected),
                    Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                    Err(err)
                        if matches!(
                            err.kind(),
                            ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                        ) => {}
                    Err(err) => return Err(TransportError::io("Failed to read frame", err)),
                }
            }
        }
    }

    impl Transport for IpcTransport {
        fn handshake(
            &mut self,
            client_id: u64,
            deadline: Instant,
            cancel: &CancelFlag,
        ) -> Result<(), TransportError> {
            self.write_frame(Opcode::Handshake, &Handshake::new(client_id))?;

            loop {
                let frame = self.next_frame(deadline, Some(cancel))?;
                let message = frame.message()?;
                if message.is_ready() {
                    tracing::info!(
                        client_id,
                        user = message.ready_username().unwrap_or("unknown"),
                        "Presence handshake complete"
                    );
                    return Ok(());
                }
                if let Some(err) = message.error() {
                    return Err(TransportError::Rejected {
                        code: err.code,
                        message: err.message,
                    });
                }
            }
        }

        fn set_activity(
            &mut self,
            pid: u32,
            activity: Option<&Activity>,
        ) -> Result<(), TransportError> {
            let nonce = make_nonce();
            let request = CommandRequest::set_activity(pid, activity.cloned(), nonce.clone());
            self.write_frame(Opcode::Frame, &request)?;

            let deadline = Instant::now() + self.response_timeout;
            loop {
                let message = self.next_frame(deadline, None)?.message()?;
                if message.nonce.as_deref() != Some(nonce.as_str()) {
                    // Late reply to an earlier command that timed out.
                    continue;
                }
                return match message.error() {
                    Some(err) => Err(TransportError::Rejected {
                        code: err.code,
                        message: err.message,
                    }),
                    None => Ok(()),
                };
            }
        }

        fn close(&mut self) -> Result<(), TransportError> {
            let result = self.write_frame(Opcode::Close, &serde_json::json!({}));
            let _ = self.stream.shutdown(Shutdown::Both);
            result
        }
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use cord_ipc_protocol::{decode_frame, encode_frame, ActivityAssets, Frame, Opcode};
    use serde_json::{json, Value};
    use std::io::{Read, Write};
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::Path;
    use std::thread;
    use tempfile::TempDir;

    fn read_frame(stream: &mut UnixStream, buffer: &mut Vec<u8>) -> Option<Frame> {
        let mut chunk = [0u8; 1024];
        loop {
            if let Ok(Some((frame, used))) = decode_frame(buffer) {
                buffer.drain(..used);
                return Some(frame);
            }
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return None,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }
        }
    }

    fn write_frame(stream: &mut UnixStream, opcode: Opcode, body: Value) {
        let bytes = encode_frame(opcode, &body).unwrap();
        stream.write_all(&bytes).unwrap();
    }

    fn ready_body() -> Value {
        json!({"cmd": "DISPATCH", "evt": "READY", "data": {"v": 1, "user": {"username": "tester"}}})
    }

    fn connector_for(path: &Path) -> IpcConnector {
        let mut config = PresenceConfig::default();
        config.socket_override = Some(path.to_path_buf());
        config.response_timeout = Duration::from_secs(2);
        IpcConnector::from_config(&config)
    }

    fn sample_activity() -> Activity {
        Activity {
            details: "Editing main.rs".to_string(),
            state: None,
            assets: ActivityAssets {
                large_image: "https://assets.test/language/rust.png".to_string(),
                large_text: "Rust".to_string(),
                small_image: None,
                small_text: None,
            },
            timestamps: None,
            buttons: None,
        }
    }

    #[test]
    fn open_fails_without_listener() {
        let dir = TempDir::new().unwrap();
        let connector = connector_for(&dir.path().join("discord-ipc-0"));
        assert!(matches!(
            connector.open(),
            Err(TransportError::NoSocket { attempted: 1 })
        ));
    }

    #[test]
    fn handshake_then_set_activity_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("discord-ipc-0");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buffer = Vec::new();

            let handshake = read_frame(&mut stream, &mut buffer).unwrap();
            assert_eq!(handshake.opcode, Opcode::Handshake);
            assert_eq!(handshake.body["client_id"], "42");
            write_frame(&mut stream, Opcode::Frame, ready_body());

            let command = read_frame(&mut stream, &mut buffer).unwrap();
            let nonce = command.body["nonce"].clone();
            // A ping mid-exchange must be answered without disturbing the reply.
            write_frame(&mut stream, Opcode::Ping, json!({"seq": 1}));
            let pong = read_frame(&mut stream, &mut buffer).unwrap();
            assert_eq!(pong.opcode, Opcode::Pong);
            write_frame(
                &mut stream,
                Opcode::Frame,
                json!({"cmd": "SET_ACTIVITY", "nonce": nonce, "data": {}}),
            );

            let close = read_frame(&mut stream, &mut buffer).unwrap();
            assert_eq!(close.opcode, Opcode::Close);
            command.body
        });

        let connector = connector_for(&path);
        let mut transport = connector.open().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        transport.handshake(42, deadline, &CancelFlag::new()).unwrap();
        transport.set_activity(7, Some(&sample_activity())).unwrap();
        transport.close().unwrap();

        let command = server.join().unwrap();
        assert_eq!(command["cmd"], "SET_ACTIVITY");
        assert_eq!(command["args"]["pid"], 7);
        assert_eq!(command["args"]["activity"]["details"], "Editing main.rs");
    }

    #[test]
    fn rejected_command_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("discord-ipc-0");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buffer = Vec::new();
            read_frame(&mut stream, &mut buffer).unwrap();
            write_frame(&mut stream, Opcode::Frame, ready_body());
            let command = read_frame(&mut stream, &mut buffer).unwrap();
            write_frame(
                &mut stream,
                Opcode::Frame,
                json!({
                    "cmd": "SET_ACTIVITY",
                    "evt": "ERROR",
                    "nonce": command.body["nonce"].clone(),
                    "data": {"code": 4000, "message": "bad activity"}
                }),
            );
            // Keep the socket open until the client has read the reply.
            let _ = read_frame(&mut stream, &mut buffer);
        });

        let mut transport = connector_for(&path).open().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        transport.handshake(1, deadline, &CancelFlag::new()).unwrap();
        let err = transport.set_activity(1, None).unwrap_err();
        assert!(matches!(err, TransportError::Rejected { code: 4000, .. }));
        assert!(!err.is_connection_lost());
        drop(transport);
        server.join().unwrap();
    }

    #[test]
    fn close_frame_during_handshake_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("discord-ipc-0");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buffer = Vec::new();
            read_frame(&mut stream, &mut buffer).unwrap();
            write_frame(
                &mut stream,
                Opcode::Close,
                json!({"code": 4000, "message": "Invalid Client ID"}),
            );
        });

        let mut transport = connector_for(&path).open().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let err = transport
            .handshake(1, deadline, &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed { code: 4000, .. }));
        server.join().unwrap();
    }

    #[test]
    fn silent_server_times_out_at_deadline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("discord-ipc-0");
        let listener = UnixListener::bind(&path).unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(800));
            drop(stream);
        });

        let mut transport = connector_for(&path).open().unwrap();
        let started = Instant::now();
        let deadline = started + Duration::from_millis(300);
        let err = transport
            .handshake(1, deadline, &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
        assert!(started.elapsed() < Duration::from_millis(750));
        server.join().unwrap();
    }

    #[test]
    fn cancelled_handshake_stops_waiting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("discord-ipc-0");
        let listener = UnixListener::bind(&path).unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(800));
            drop(stream);
        });

        let mut transport = connector_for(&path).open().unwrap();
        let cancel = CancelFlag::new();
        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                cancel.cancel();
            })
        };

        let started = Instant::now();
        let err = transport
            .handshake(1, started + Duration::from_secs(30), &cancel)
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
        assert!(started.elapsed() < Duration::from_millis(750));
        canceller.join().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn nonces_are_unique() {
        assert_ne!(make_nonce(), make_nonce());
    }
}
