//! Message Types für das Signaling-Protokoll
//!
//! Das Protokoll ist textbasiert und leerzeichen-getrennt:
//!
//! - Client → Server: `join <room>`
//! - Server → Client: `sdp <room> <sdp-body>`
//!
//! Der SDP-Body wird als roher Substring nach dem zweiten Trennzeichen
//! übernommen. Mehrfache Leerzeichen, `\r\n` und führende Leerzeichen im
//! Body bleiben dadurch byte-genau erhalten.

use std::fmt;
use thiserror::Error;

/// Verb für Join-Anfragen (Client → Server)
pub const JOIN_VERB: &str = "join";

/// Verb für SDP-Ankündigungen (Server → Client)
pub const SDP_VERB: &str = "sdp";

const DELIMITER: char = ' ';

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,

    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("sdp message without room")]
    MissingRoom,
}

// ============================================================================
// CLIENT → SERVER MESSAGES
// ============================================================================

/// Alle Befehle, die der Client sendet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Raum beitreten
    Join { room: String },
}

impl ClientCommand {
    pub fn join(room: impl Into<String>) -> Self {
        Self::Join { room: room.into() }
    }

    /// Serialisiert den Befehl ins Wire-Format
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join { room } => write!(f, "{}{}{}", JOIN_VERB, DELIMITER, room),
        }
    }
}

// ============================================================================
// SERVER → CLIENT MESSAGES
// ============================================================================

/// Alle Server-Nachrichten, die der Client versteht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// SDP für einen Raum
    Sdp { room: String, sdp: String },
}

impl ServerMessage {
    /// Parst eine eingehende Text-Nachricht
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        if text.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let (verb, rest) = text.split_once(DELIMITER).unwrap_or((text, ""));

        match verb {
            SDP_VERB => {
                // Body ohne zweites Trennzeichen ist leer
                let (room, sdp) = rest.split_once(DELIMITER).unwrap_or((rest, ""));
                if room.is_empty() {
                    return Err(ProtocolError::MissingRoom);
                }
                Ok(Self::Sdp {
                    room: room.to_string(),
                    sdp: sdp.to_string(),
                })
            }
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_join() {
        assert_eq!(ClientCommand::join("party").encode(), "join party");
        assert_eq!(ClientCommand::join("party").to_string(), "join party");
    }

    #[test]
    fn test_parse_sdp() {
        let msg = ServerMessage::parse("sdp party OFFER_BODY_HERE").unwrap();
        assert_eq!(
            msg,
            ServerMessage::Sdp {
                room: "party".to_string(),
                sdp: "OFFER_BODY_HERE".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_sdp_body_with_spaces() {
        let msg = ServerMessage::parse("sdp party PART ONE PART TWO").unwrap();
        assert_eq!(
            msg,
            ServerMessage::Sdp {
                room: "party".to_string(),
                sdp: "PART ONE PART TWO".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_preserves_raw_body() {
        // Mehrfache und führende Leerzeichen dürfen nicht zusammenfallen
        let msg = ServerMessage::parse("sdp party  PART  ONE   TWO ").unwrap();
        let ServerMessage::Sdp { room, sdp } = msg;
        assert_eq!(room, "party");
        assert_eq!(sdp, " PART  ONE   TWO ");
    }

    #[test]
    fn test_parse_real_sdp() {
        let body = "v=0\r\n\
                    o=- 5372151867866539221 2 IN IP4 127.0.0.1\r\n\
                    s=-\r\n\
                    a=candidate:4252876256 1 udp 2122260223 192.168.0.193 59976 typ host\r\n";
        let text = format!("sdp party {}", body);

        let ServerMessage::Sdp { room, sdp } = ServerMessage::parse(&text).unwrap();
        assert_eq!(room, "party");
        assert_eq!(sdp, body);
    }

    #[test]
    fn test_parse_sdp_without_body() {
        let ServerMessage::Sdp { room, sdp } = ServerMessage::parse("sdp party").unwrap();
        assert_eq!(room, "party");
        assert_eq!(sdp, "");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ServerMessage::parse(""), Err(ProtocolError::Empty));
        assert_eq!(
            ServerMessage::parse("ping"),
            Err(ProtocolError::UnknownVerb("ping".to_string()))
        );
        assert_eq!(
            ServerMessage::parse("SDP party body"),
            Err(ProtocolError::UnknownVerb("SDP".to_string()))
        );
        assert_eq!(ServerMessage::parse("sdp"), Err(ProtocolError::MissingRoom));
        assert_eq!(
            ServerMessage::parse("sdp  body"),
            Err(ProtocolError::MissingRoom)
        );
    }
}
