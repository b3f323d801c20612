//! Config Module - Einstellungen für den Signaling-Client
//!
//! - Server-URL (aus `SIGNALING_URL` oder Default)
//! - Kapazitäten der internen Channels
//! - Validierung der Endpoint-URL
//!

mod settings;

pub use settings::{parse_endpoint, SignalingSettings, DEFAULT_SIGNALING_URL};
