//! Signaling Module - WebSocket Client für den Signaling-Server
//!
//! Dieses Modul verwaltet die Kommunikation mit dem Signaling-Server:
//! - WebSocket-Verbindung aufbauen und Verbindungsstatus verfolgen
//! - Räume betreten
//! - Eingehende SDP-Nachrichten parsen und weiterleiten
//!

mod client;
mod messages;

pub use client::{
    ConnectionState, SignalingClient, SignalingError, SignalingEvent, WeakSignalingClient,
};
pub use messages::*;
