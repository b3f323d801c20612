//! WebSocket Client für den Signaling-Server
//!
//! Verwaltet genau eine WebSocket-Verbindung zum Signaling-Server:
//! - Verbindung aufbauen (asynchron, `connect` kehrt sofort zurück)
//! - Räume betreten (`join <room>`)
//! - SDP-Ankündigungen (`sdp <room> <body>`) an Callbacks weiterreichen
//! - Event-basierte Kommunikation über einen Broadcast-Channel
//!
//! Es gibt bewusst keine automatische Reconnection; ein erneuter Aufruf von
//! `connect` ersetzt die bisherige Verbindung.

use super::messages::{ClientCommand, ServerMessage};
use crate::config::{parse_endpoint, SignalingSettings};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;
use uuid::Uuid;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    #[error("Invalid signaling URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("No tokio runtime available")]
    NoRuntime,

    #[error("Room name must not be empty")]
    EmptyRoom,

    #[error("Not connected to signaling server")]
    NotConnected,

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),
}

// ============================================================================
// SIGNALING EVENTS
// ============================================================================

/// Events die vom SignalingClient ausgelöst werden
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalingEvent {
    /// Verbunden mit Signaling-Server
    Connected,

    /// Verbindung getrennt
    Disconnected,

    /// SDP für einen Raum erhalten
    SdpReceived { room: String, sdp: String },

    /// Fehler der WebSocket-Verbindung
    TransportError { message: String },
}

/// Verbindungsstatus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Ereignisse der Transport-Schicht
#[derive(Debug)]
enum TransportEvent {
    Open,
    Close,
    Error(String),
    Message(String),
}

// ============================================================================
// CLIENT STATE
// ============================================================================

#[derive(Debug, Default)]
struct ClientState {
    connection: ConnectionState,
    endpoint_url: Option<String>,
    /// Identifiziert die aktuelle Verbindung; Events älterer Verbindungen
    /// werden verworfen
    generation: u64,
    outbound: Option<mpsc::Sender<String>>,
}

type ConnectHandler = Arc<dyn Fn() + Send + Sync>;
type JoinHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    on_connect: Option<ConnectHandler>,
    on_join: Option<JoinHandler>,
}

struct Inner {
    id: Uuid,
    settings: SignalingSettings,
    state: RwLock<ClientState>,
    handlers: Mutex<Handlers>,
    task: Mutex<Option<JoinHandle<()>>>,
    event_tx: broadcast::Sender<SignalingEvent>,
}

// ============================================================================
// SIGNALING CLIENT
// ============================================================================

/// WebSocket Client für Signaling-Server Kommunikation
///
/// Klone teilen sich dieselbe Verbindung. Callbacks, die den Client selbst
/// benutzen, sollten einen [`WeakSignalingClient`] halten, sonst entsteht
/// ein Referenzzyklus.
///
/// Wird der letzte Klon verworfen, fällt der Sender für ausgehende Befehle
/// weg. Der Transport-Task schickt daraufhin einen Close-Frame und beendet
/// sich; Callbacks und Events gibt es danach nicht mehr.
#[derive(Clone)]
pub struct SignalingClient {
    inner: Arc<Inner>,
}

/// Schwache Referenz auf einen [`SignalingClient`]
#[derive(Clone)]
pub struct WeakSignalingClient {
    inner: Weak<Inner>,
}

impl WeakSignalingClient {
    pub fn upgrade(&self) -> Option<SignalingClient> {
        self.inner.upgrade().map(|inner| SignalingClient { inner })
    }
}

impl Default for SignalingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingClient {
    /// Erstellt einen neuen SignalingClient mit Standard-Einstellungen
    pub fn new() -> Self {
        Self::with_settings(SignalingSettings::default())
    }

    /// Erstellt einen neuen SignalingClient
    pub fn with_settings(settings: SignalingSettings) -> Self {
        // broadcast::channel panics bei Kapazität 0
        let (event_tx, _) = broadcast::channel(settings.event_capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                settings,
                state: RwLock::new(ClientState::default()),
                handlers: Mutex::new(Handlers::default()),
                task: Mutex::new(None),
                event_tx,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakSignalingClient {
        WeakSignalingClient {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Gibt einen Event-Receiver zurück
    pub fn subscribe(&self) -> broadcast::Receiver<SignalingEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn client_id(&self) -> Uuid {
        self.inner.id
    }

    pub fn settings(&self) -> &SignalingSettings {
        &self.inner.settings
    }

    /// Prüft ob verbunden
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.read().connection
    }

    /// URL des letzten `connect`-Aufrufs
    pub fn endpoint_url(&self) -> Option<String> {
        self.inner.state.read().endpoint_url.clone()
    }

    /// Setzt den Callback für erfolgreiche Verbindungen (ersetzt den alten)
    pub fn on_connect<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.handlers.lock().on_connect = Some(Arc::new(handler));
    }

    /// Setzt den Callback für empfangene SDPs (ersetzt den alten)
    pub fn on_join<F>(&self, handler: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.inner.handlers.lock().on_join = Some(Arc::new(handler));
    }

    /// Entfernt beide Callbacks
    pub fn clear_handlers(&self) {
        *self.inner.handlers.lock() = Handlers::default();
    }

    /// Verbindet mit dem Signaling-Server
    ///
    /// Kehrt sofort zurück. Ergebnis und Fehler des Verbindungsaufbaus kommen
    /// über Callbacks und Events. Eine bestehende Verbindung wird ersetzt.
    pub fn connect(&self, url: &str) -> Result<(), SignalingError> {
        let endpoint = parse_endpoint(url)?;
        let runtime = Handle::try_current().map_err(|_| SignalingError::NoRuntime)?;

        let (tx, rx) = mpsc::channel::<String>(self.inner.settings.outbound_capacity.max(1));

        let (generation, was_connected) = {
            let mut state = self.inner.state.write();
            let was_connected = state.connection == ConnectionState::Connected;
            state.generation += 1;
            state.connection = ConnectionState::Disconnected;
            state.endpoint_url = Some(url.to_string());
            state.outbound = Some(tx);
            (state.generation, was_connected)
        };

        if was_connected {
            let _ = self.inner.event_tx.send(SignalingEvent::Disconnected);
        }

        tracing::info!(client = %self.inner.id, generation, "Connecting to signaling server: {}", endpoint);

        let task = runtime.spawn(run_transport(
            Arc::downgrade(&self.inner),
            generation,
            endpoint,
            rx,
        ));

        if let Some(previous) = self.inner.task.lock().replace(task) {
            previous.abort();
        }

        Ok(())
    }

    /// Verbindet mit der URL aus den Einstellungen
    pub fn connect_default(&self) -> Result<(), SignalingError> {
        let url = self.inner.settings.url.clone();
        self.connect(&url)
    }

    /// Betritt einen Raum
    ///
    /// Gibt `false` zurück, wenn der Raum leer ist oder noch keine
    /// Verbindung besteht. In beiden Fällen wird nichts gesendet.
    pub fn join(&self, room: &str) -> bool {
        match self.try_join(room) {
            Ok(()) => true,
            Err(SignalingError::EmptyRoom) => false,
            Err(SignalingError::NotConnected) => {
                tracing::error!(client = %self.inner.id, "Not connected yet; cannot join.");
                false
            }
            Err(e) => {
                tracing::error!(client = %self.inner.id, "Failed to join room {}: {}", room, e);
                false
            }
        }
    }

    /// Wie [`join`](Self::join), aber mit Fehlergrund
    pub fn try_join(&self, room: &str) -> Result<(), SignalingError> {
        if room.is_empty() {
            return Err(SignalingError::EmptyRoom);
        }

        let tx = {
            let state = self.inner.state.read();
            if state.connection != ConnectionState::Connected {
                return Err(SignalingError::NotConnected);
            }
            state.outbound.clone().ok_or(SignalingError::NotConnected)?
        };

        let command = ClientCommand::join(room);
        tracing::debug!(client = %self.inner.id, "Sending: {}", command);

        // try_send ist non-blocking
        tx.try_send(command.encode())
            .map_err(|e| SignalingError::SendFailed(e.to_string()))
    }

    /// Schließt die aktuelle Verbindung mit einem Close-Frame
    ///
    /// Der Status wechselt erst mit dem Close-Event auf `Disconnected`.
    pub fn disconnect(&self) -> bool {
        let outbound = self.inner.state.write().outbound.take();
        if outbound.is_some() {
            tracing::info!(client = %self.inner.id, "Disconnecting from signaling server");
        }
        outbound.is_some()
    }

    /// Wie [`disconnect`](Self::disconnect), wartet aber auf das Close-Event
    ///
    /// Gibt `false` zurück, wenn keine Verbindung bestand oder das Schließen
    /// länger als `timeout` dauert.
    pub async fn disconnect_and_wait(&self, timeout: Duration) -> bool {
        let mut events = self.subscribe();
        if !self.disconnect() {
            return false;
        }

        let closed = async {
            loop {
                match events.recv().await {
                    Ok(SignalingEvent::Disconnected) | Err(RecvError::Closed) => break,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                }
            }
        };

        tokio::time::timeout(timeout, closed).await.is_ok()
    }
}

impl Inner {
    /// Verarbeitet ein Transport-Event; `false` wenn die Verbindung veraltet ist
    ///
    /// Generation prüfen und Status ändern passieren unter demselben Lock,
    /// sonst könnte ein paralleles `connect` dazwischenkommen.
    fn handle_event(&self, generation: u64, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Open => {
                {
                    let mut state = self.state.write();
                    if state.generation != generation {
                        return self.ignore_superseded(generation);
                    }
                    state.connection = ConnectionState::Connected;
                }
                tracing::info!(client = %self.id, "Connected to signaling server");

                // Lock vor dem Callback freigeben, damit er `join` aufrufen kann
                let handler = self.handlers.lock().on_connect.clone();
                if let Some(handler) = handler {
                    handler();
                }
                let _ = self.event_tx.send(SignalingEvent::Connected);
            }

            TransportEvent::Close => {
                {
                    let mut state = self.state.write();
                    if state.generation != generation {
                        return self.ignore_superseded(generation);
                    }
                    state.connection = ConnectionState::Disconnected;
                    state.outbound = None;
                }
                tracing::info!(client = %self.id, "WebSocket closed");
                let _ = self.event_tx.send(SignalingEvent::Disconnected);
            }

            TransportEvent::Error(message) => {
                if self.state.read().generation != generation {
                    return self.ignore_superseded(generation);
                }
                tracing::error!(client = %self.id, "WebSocket error: {}", message);
                let _ = self.event_tx.send(SignalingEvent::TransportError { message });
            }

            TransportEvent::Message(text) => return self.handle_message(generation, &text),
        }

        true
    }

    fn handle_message(&self, generation: u64, text: &str) -> bool {
        let (room, sdp) = match ServerMessage::parse(text) {
            Ok(ServerMessage::Sdp { room, sdp }) => (room, sdp),
            Err(e) => {
                if self.state.read().generation != generation {
                    return self.ignore_superseded(generation);
                }
                tracing::warn!(client = %self.id, "Signaling - unhandled message: {}", e);
                return true;
            }
        };

        let handler = {
            let state = self.state.read();
            if state.generation != generation {
                return self.ignore_superseded(generation);
            }
            self.handlers.lock().on_join.clone()
        };

        match handler {
            Some(handler) => {
                tracing::debug!(client = %self.id, "Received SDP for room {}", room);
                handler(&room, &sdp);
            }
            None => {
                tracing::warn!(client = %self.id, "Signaling - unhandled message (no join handler)");
            }
        }
        let _ = self.event_tx.send(SignalingEvent::SdpReceived { room, sdp });
        true
    }

    fn ignore_superseded(&self, generation: u64) -> bool {
        tracing::debug!(client = %self.id, generation, "Ignoring event from superseded transport");
        false
    }
}

fn dispatch(inner: &Weak<Inner>, generation: u64, event: TransportEvent) -> bool {
    match inner.upgrade() {
        Some(inner) => inner.handle_event(generation, event),
        None => false,
    }
}

/// Treibt eine WebSocket-Verbindung bis zum Schließen
///
/// Ein- und ausgehende Nachrichten laufen über ein einziges `select!`, daher
/// werden Events nie parallel zueinander verarbeitet.
async fn run_transport(
    inner: Weak<Inner>,
    generation: u64,
    endpoint: Url,
    mut outbound: mpsc::Receiver<String>,
) {
    let ws_stream = match connect_async(endpoint.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            let error = SignalingError::ConnectionFailed(e.to_string());
            if dispatch(&inner, generation, TransportEvent::Error(error.to_string())) {
                dispatch(&inner, generation, TransportEvent::Close);
            }
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if !dispatch(&inner, generation, TransportEvent::Open) {
        return;
    }

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        dispatch(&inner, generation, TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    // Sender wurde entfernt (disconnect)
                    let _ = write.close().await;
                    break;
                }
            },

            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if !dispatch(&inner, generation, TransportEvent::Message(text)) {
                        return;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    dispatch(&inner, generation, TransportEvent::Error(e.to_string()));
                    break;
                }
            },
        }
    }

    dispatch(&inner, generation, TransportEvent::Close);
}

impl std::fmt::Debug for SignalingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingClient")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.read())
            .finish()
    }
}
