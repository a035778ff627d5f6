//! Wire types and frame codec for the local presence IPC socket.
//!
//! The presence service speaks length-prefixed JSON frames over a Unix domain
//! socket. Each frame is an 8-byte little-endian header (opcode, body length)
//! followed by a JSON body. This crate owns the framing and the handful of
//! message shapes the bridge needs, so the session code never touches raw
//! bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HANDSHAKE_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 8;
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

pub const MAX_TEXT_CHARS: usize = 128;
pub const MAX_BUTTONS: usize = 2;
pub const MAX_BUTTON_LABEL_CHARS: usize = 32;
pub const MAX_BUTTON_URL_CHARS: usize = 512;

const CMD_DISPATCH: &str = "DISPATCH";
const EVT_READY: &str = "READY";
const EVT_ERROR: &str = "ERROR";

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    #[error("frame body of {len} bytes exceeds the {max} byte limit", max = MAX_FRAME_BYTES)]
    TooLarge { len: usize },

    #[error("frame body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Handshake,
    Frame,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn as_u32(self) -> u32 {
        match self {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = FrameError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

/// A decoded frame. The body is kept as raw JSON; callers pick the shape
/// based on the opcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub opcode: Opcode,
    pub body: Value,
}

impl Frame {
    pub fn message(&self) -> Result<Message, FrameError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn close_reason(&self) -> CloseReason {
        serde_json::from_value(self.body.clone()).unwrap_or_default()
    }
}

pub fn encode_frame<T: Serialize>(opcode: Opcode, body: &T) -> Result<Vec<u8>, FrameError> {
    let body = serde_json::to_vec(body)?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge { len: body.len() });
    }

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&opcode.as_u32().to_le_bytes());
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decodes one frame from the front of `buffer`.
///
/// Returns `Ok(None)` while the buffer holds less than a full frame, and the
/// number of bytes consumed alongside the frame otherwise. Socket reads may
/// split frames anywhere, so callers accumulate bytes and retry.
pub fn decode_frame(buffer: &[u8]) -> Result<Option<(Frame, usize)>, FrameError> {
    if buffer.len() < HEADER_LEN {
        return Ok(None);
    }

    let opcode = read_u32(&buffer[0..4]);
    let len = read_u32(&buffer[4..8]) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge { len });
    }
    let opcode = Opcode::try_from(opcode)?;

    let end = HEADER_LEN + len;
    if buffer.len() < end {
        return Ok(None);
    }

    let body = if len == 0 {
        Value::Null
    } else {
        serde_json::from_slice(&buffer[HEADER_LEN..end])?
    };

    Ok(Some((Frame { opcode, body }, end)))
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Outbound Messages
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    pub v: u32,
    pub client_id: String,
}

impl Handshake {
    pub fn new(client_id: u64) -> Self {
        Self {
            v: HANDSHAKE_VERSION,
            client_id: client_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    SetActivity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandRequest<A> {
    pub cmd: Command,
    pub args: A,
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetActivityArgs {
    pub pid: u32,
    /// `None` clears whatever the service currently displays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
}

impl CommandRequest<SetActivityArgs> {
    pub fn set_activity(pid: u32, activity: Option<Activity>, nonce: impl Into<String>) -> Self {
        Self {
            cmd: Command::SetActivity,
            args: SetActivityArgs { pid, activity },
            nonce: nonce.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloseReason {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Activity Payload
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub assets: ActivityAssets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<ActivityTimestamps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<ActivityButton>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityAssets {
    pub large_image: String,
    pub large_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityTimestamps {
    /// Epoch milliseconds.
    pub start: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

impl Activity {
    /// Checks the limits the presence service enforces, so an activity that
    /// would be rejected remotely is caught before it is sent.
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if self.details.trim().is_empty() {
            return Err(ErrorInfo::new("missing_field", "details is required"));
        }
        require_max_chars(&self.details, MAX_TEXT_CHARS, "details")?;
        if let Some(state) = &self.state {
            require_max_chars(state, MAX_TEXT_CHARS, "state")?;
        }
        require_max_chars(&self.assets.large_text, MAX_TEXT_CHARS, "large_text")?;
        if let Some(small_text) = &self.assets.small_text {
            require_max_chars(small_text, MAX_TEXT_CHARS, "small_text")?;
        }

        if let Some(buttons) = &self.buttons {
            if buttons.len() > MAX_BUTTONS {
                return Err(ErrorInfo::new(
                    "too_many_buttons",
                    format!("at most {} buttons are allowed", MAX_BUTTONS),
                ));
            }
            for button in buttons {
                require_max_chars(&button.label, MAX_BUTTON_LABEL_CHARS, "button label")?;
                require_max_chars(&button.url, MAX_BUTTON_URL_CHARS, "button url")?;
            }
        }

        Ok(())
    }
}

fn require_max_chars(value: &str, max: usize, field: &str) -> Result<(), ErrorInfo> {
    if value.chars().count() > max {
        return Err(ErrorInfo::new(
            "field_too_long",
            format!("{} must be {} characters or fewer", field, max),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Inbound Messages
// ═══════════════════════════════════════════════════════════════════════════════

/// Any JSON message the service sends inside a `Frame` opcode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub evt: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Error payload carried by `evt: "ERROR"` messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl Message {
    pub fn is_ready(&self) -> bool {
        self.cmd.as_deref() == Some(CMD_DISPATCH) && self.evt.as_deref() == Some(EVT_READY)
    }

    pub fn error(&self) -> Option<RpcError> {
        if self.evt.as_deref() != Some(EVT_ERROR) {
            return None;
        }
        Some(
            self.data
                .clone()
                .and_then(|data| serde_json::from_value(data).ok())
                .unwrap_or_default(),
        )
    }

    /// Username announced in the READY dispatch, if any.
    pub fn ready_username(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get("user")?
            .get("username")?
            .as_str()
    }
}
