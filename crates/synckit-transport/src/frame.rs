//! Binary wire framing (`spec.md` §4.5).
//!
//! `[type:u8][timestamp:i64 BE][len:u32 BE][payload:len bytes]`. The
//! 1-byte type discriminator lets a reader dispatch without touching the
//! payload; the payload itself is always a self-describing JSON object so
//! new fields can be added without breaking older readers.
//!
//! Text-JSON mode (negotiated per connection, see `negotiation.rs`) carries
//! the same logical frame, just as a JSON object keyed by `type`/`ts`/
//! `payload` instead of the fixed-width binary header.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use synckit_core::SyncKitError;

/// Wire type discriminator (`spec.md` §4.5's type-code table). Text-JSON
/// mode serializes this as the same `SCREAMING_SNAKE_CASE` name the spec's
/// table uses (`"DELTA"`, `"SYNC_REQUEST"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum FrameType {
    Auth = 0x01,
    AuthSuccess = 0x02,
    AuthError = 0x03,
    Subscribe = 0x10,
    Unsubscribe = 0x11,
    SyncRequest = 0x20,
    SyncResponse = 0x21,
    Delta = 0x30,
    Ack = 0x31,
    Awareness = 0x40,
    Ping = 0x50,
    Pong = 0x51,
    Error = 0xFF,
}

impl FrameType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, SyncKitError> {
        match code {
            0x01 => Ok(FrameType::Auth),
            0x02 => Ok(FrameType::AuthSuccess),
            0x03 => Ok(FrameType::AuthError),
            0x10 => Ok(FrameType::Subscribe),
            0x11 => Ok(FrameType::Unsubscribe),
            0x20 => Ok(FrameType::SyncRequest),
            0x21 => Ok(FrameType::SyncResponse),
            0x30 => Ok(FrameType::Delta),
            0x31 => Ok(FrameType::Ack),
            0x40 => Ok(FrameType::Awareness),
            0x50 => Ok(FrameType::Ping),
            0x51 => Ok(FrameType::Pong),
            0xFF => Ok(FrameType::Error),
            other => Err(SyncKitError::ProtocolError(format!("unknown frame type code 0x{other:02x}"))),
        }
    }
}

/// One logical message on the wire, independent of binary/JSON encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub ts: i64,
    pub payload: Json,
}

impl Frame {
    pub fn new(frame_type: FrameType, ts: i64, payload: Json) -> Self {
        Self { frame_type, ts, payload }
    }

    /// Encode per `spec.md` §4.5's fixed binary header.
    pub fn encode_binary(&self) -> Result<Vec<u8>, SyncKitError> {
        let payload_bytes = serde_json::to_vec(&self.payload)
            .map_err(|e| SyncKitError::ProtocolError(format!("payload encode failed: {e}")))?;
        let mut buf = Vec::with_capacity(1 + 8 + 4 + payload_bytes.len());
        buf.push(self.frame_type.code());
        buf.extend_from_slice(&self.ts.to_be_bytes());
        buf.extend_from_slice(&(payload_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&payload_bytes);
        Ok(buf)
    }

    /// Decode a complete binary frame. Returns `ProtocolError` on a
    /// malformed header or a length prefix that doesn't match the
    /// remaining bytes — the caller should close the connection to that
    /// peer on this error (`spec.md` §7).
    pub fn decode_binary(bytes: &[u8]) -> Result<Self, SyncKitError> {
        if bytes.len() < 13 {
            return Err(SyncKitError::ProtocolError("frame shorter than fixed header (13 bytes)".into()));
        }
        let frame_type = FrameType::from_code(bytes[0])?;
        let ts = i64::from_be_bytes(bytes[1..9].try_into().unwrap());
        let len = u32::from_be_bytes(bytes[9..13].try_into().unwrap()) as usize;
        let payload_bytes = bytes.get(13..13 + len).ok_or_else(|| {
            SyncKitError::ProtocolError(format!("frame declared {len} payload bytes but only {} available", bytes.len().saturating_sub(13)))
        })?;
        let payload: Json = serde_json::from_slice(payload_bytes)
            .map_err(|e| SyncKitError::ProtocolError(format!("payload decode failed: {e}")))?;
        Ok(Self { frame_type, ts, payload })
    }

    /// Encode for the text-JSON fallback: the same fields, just as a JSON
    /// object rather than a fixed-width binary header.
    pub fn encode_text(&self) -> Result<String, SyncKitError> {
        serde_json::to_string(self).map_err(|e| SyncKitError::ProtocolError(format!("text encode failed: {e}")))
    }

    pub fn decode_text(text: &str) -> Result<Self, SyncKitError> {
        serde_json::from_str(text).map_err(|e| SyncKitError::ProtocolError(format!("text decode failed: {e}")))
    }
}
