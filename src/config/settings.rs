//! Einstellungen für den Signaling-Client

use crate::signaling::SignalingError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Standard-Endpoint des Signaling-Servers
pub const DEFAULT_SIGNALING_URL: &str = "ws://127.0.0.1:9001";

const DEFAULT_CHANNEL_CAPACITY: usize = 100;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingSettings {
    /// WebSocket-URL des Signaling-Servers
    pub url: String,

    /// Puffergröße des Event-Broadcast-Channels
    pub event_capacity: usize,

    /// Puffergröße für ausgehende Befehle
    pub outbound_capacity: usize,
}

impl Default for SignalingSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SIGNALING_URL.to_string(),
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            outbound_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SignalingSettings {
    /// Lädt die Einstellungen aus der Umgebung (`SIGNALING_URL`)
    pub fn from_env() -> Result<Self, SignalingError> {
        let url = std::env::var("SIGNALING_URL")
            .unwrap_or_else(|_| DEFAULT_SIGNALING_URL.to_string());

        let settings = Self {
            url,
            ..Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Prüft URL und Kapazitäten
    pub fn validate(&self) -> Result<(), SignalingError> {
        parse_endpoint(&self.url)?;

        if self.event_capacity == 0 || self.outbound_capacity == 0 {
            return Err(SignalingError::InvalidSettings(
                "channel capacities must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validiert eine Endpoint-URL
///
/// Erlaubt sind `ws://` und `wss://`. `http://` bzw. `https://` werden auf
/// das passende WebSocket-Schema umgeschrieben.
pub fn parse_endpoint(raw: &str) -> Result<Url, SignalingError> {
    let mut url = Url::parse(raw).map_err(|e| SignalingError::InvalidUrl(format!("{raw}: {e}")))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(SignalingError::InvalidUrl(format!(
                "{raw}: unsupported scheme `{other}`"
            )))
        }
    };

    if url.scheme() != scheme {
        url.set_scheme(scheme)
            .map_err(|_| SignalingError::InvalidUrl(format!("{raw}: cannot use scheme {scheme}")))?;
    }

    if url.host_str().is_none() {
        return Err(SignalingError::InvalidUrl(format!("{raw}: missing host")));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = SignalingSettings::default();
        assert_eq!(settings.url, DEFAULT_SIGNALING_URL);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_endpoint() {
        let url = parse_endpoint("ws://127.0.0.1:9001").unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.port(), Some(9001));

        assert_eq!(parse_endpoint("wss://example.com/ws").unwrap().scheme(), "wss");
    }

    #[test]
    fn test_parse_endpoint_rewrites_http() {
        assert_eq!(
            parse_endpoint("http://example.com/ws").unwrap().as_str(),
            "ws://example.com/ws"
        );
        assert_eq!(
            parse_endpoint("https://example.com/ws").unwrap().as_str(),
            "wss://example.com/ws"
        );
    }

    #[test]
    fn test_parse_endpoint_rejects_invalid() {
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(SignalingError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_endpoint("ftp://example.com"),
            Err(SignalingError::InvalidUrl(_))
        ));
        assert!(matches!(parse_endpoint(""), Err(SignalingError::InvalidUrl(_))));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let settings = SignalingSettings {
            outbound_capacity: 0,
            ..SignalingSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SignalingError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_settings_from_json() {
        let settings: SignalingSettings =
            serde_json::from_str(r#"{"url": "wss://signal.example.com"}"#).unwrap();
        assert_eq!(settings.url, "wss://signal.example.com");
        assert_eq!(settings.event_capacity, DEFAULT_CHANNEL_CAPACITY);
    }
}
