//! SDP Signaling - minimaler Client für WebRTC-Signaling
//!
//! Verbindet sich per WebSocket mit einem Signaling-Server, betritt einen
//! benannten Raum und reicht das vom Server gelieferte SDP an die
//! Anwendung weiter:
//!
//! ```no_run
//! use sdp_signaling_lib::signaling::SignalingClient;
//!
//! # async fn demo() -> Result<(), sdp_signaling_lib::signaling::SignalingError> {
//! let client = SignalingClient::new();
//! let weak = client.downgrade();
//!
//! client.on_join(|room, sdp| println!("{room}: {sdp}"));
//! client.on_connect(move || {
//!     if let Some(client) = weak.upgrade() {
//!         client.join("party");
//!     }
//! });
//!
//! client.connect("ws://127.0.0.1:9001")?;
//! # Ok(())
//! # }
//! ```
//!
//! ICE, DTLS und Media-Aushandlung sind nicht Teil dieses Crates.

pub mod config;
pub mod signaling;

use config::SignalingSettings;
use signaling::{SignalingClient, SignalingEvent};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// Raum, den `run()` ohne `SIGNALING_ROOM` betritt
pub const DEFAULT_ROOM: &str = "party";

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// LOGGING
// ============================================================================

/// Initialisiert das Logging (`RUST_LOG` wird berücksichtigt)
///
/// Mehrfache Aufrufe sind harmlos.
pub fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["sdp_signaling_lib=debug", "tungstenite=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Verbindet mit `SIGNALING_URL`, betritt `SIGNALING_ROOM` und gibt alle
/// Events als JSON-Zeilen auf stdout aus
pub async fn run() -> anyhow::Result<()> {
    init_logging();

    let settings = SignalingSettings::from_env()?;
    let room = std::env::var("SIGNALING_ROOM").unwrap_or_else(|_| DEFAULT_ROOM.to_string());

    tracing::info!("Starting signaling client for room '{}'...", room);

    let client = SignalingClient::with_settings(settings);
    let mut events = client.subscribe();

    // Raum betreten, sobald die Verbindung steht
    let weak = client.downgrade();
    client.on_connect(move || {
        if let Some(client) = weak.upgrade() {
            client.join(&room);
        }
    });
    client.on_join(|room, sdp| {
        tracing::info!("Joined room '{}' ({} bytes SDP)", room, sdp.len());
    });

    client.connect_default()?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if event == SignalingEvent::Disconnected {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} signaling events", skipped);
                }
                Err(RecvError::Closed) => break,
            },

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                // Close-Frame abwarten, bevor die Runtime den Task verwirft
                if !client.disconnect_and_wait(SHUTDOWN_TIMEOUT).await {
                    tracing::warn!("Signaling connection did not close cleanly");
                }
                break;
            }
        }
    }

    client.clear_handlers();
    Ok(())
}
