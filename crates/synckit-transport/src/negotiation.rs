//! Wire-mode negotiation (`spec.md` §4.5): "the first inbound message
//! chooses binary vs. text-JSON for the connection's lifetime." A
//! `tokio-tungstenite` `Message::Binary` picks binary framing, a
//! `Message::Text` picks the JSON fallback; whichever arrives first wins
//! and every later message on that connection is decoded the same way.

use tokio_tungstenite::tungstenite::Message;

use synckit_core::SyncKitError;

use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMode {
    Binary,
    Text,
}

/// Per-connection negotiation state: unset until the first message
/// arrives, then pinned for the rest of the connection's life.
#[derive(Debug, Clone, Copy, Default)]
pub struct Negotiation {
    mode: Option<WireMode>,
}

impl Negotiation {
    pub fn new() -> Self {
        Self { mode: None }
    }

    pub fn mode(&self) -> Option<WireMode> {
        self.mode
    }

    /// Decode an inbound websocket message, pinning the wire mode on the
    /// first call. A later message of the other variant is a protocol
    /// error rather than a silent mode switch.
    pub fn decode(&mut self, message: &Message) -> Result<Frame, SyncKitError> {
        let incoming_mode = match message {
            Message::Binary(_) => WireMode::Binary,
            Message::Text(_) => WireMode::Text,
            other => {
                return Err(SyncKitError::ProtocolError(format!(
                    "expected a binary or text websocket message, got {other:?}"
                )))
            }
        };

        match self.mode {
            None => self.mode = Some(incoming_mode),
            Some(pinned) if pinned != incoming_mode => {
                return Err(SyncKitError::ProtocolError(format!(
                    "connection negotiated {pinned:?} but received a {incoming_mode:?} message"
                )))
            }
            Some(_) => {}
        }

        match message {
            Message::Binary(bytes) => Frame::decode_binary(bytes),
            Message::Text(text) => Frame::decode_text(text),
            _ => unreachable!("checked above"),
        }
    }

    /// Encode an outbound frame using whatever mode was negotiated. Binary
    /// is the default before negotiation completes, since a server never
    /// speaks first on this protocol (`spec.md` §4.5: clients initiate
    /// with AUTH).
    pub fn encode(&self, frame: &Frame) -> Result<Message, SyncKitError> {
        match self.mode.unwrap_or(WireMode::Binary) {
            WireMode::Binary => Ok(Message::Binary(frame.encode_binary()?)),
            WireMode::Text => Ok(Message::Text(frame.encode_text()?)),
        }
    }
}
