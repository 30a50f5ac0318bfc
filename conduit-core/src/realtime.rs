//! Real-time bidirectional audio sessions (Ultravox, ElevenLabs): a
//! full-duplex channel over a WebSocket transport, with VAD-driven
//! interruption and graceful cancellation.
//!
//! A [`RealtimeSession`] owns a send half (`Send(frame)`, returns once the
//! frame is handed to the transport) and a receive half (a lazy, finite,
//! non-restartable stream of [`OutputFrame`]s). Closing the receive half
//! propagates a graceful close to the send half, matching §5's cancellation
//! contract.

use crate::error::ProviderError;
use crate::net::url::to_websocket_url;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// `[Connecting] --open--> [Connected] --close/err--> [Closed|Errored]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Connected,
    Closed,
    Errored,
}

/// Per-provider header auth for the websocket handshake: ElevenLabs takes a
/// bearer token, Ultravox takes a bare API-key header.
#[derive(Debug, Clone)]
pub enum RealtimeAuth {
    Bearer(String),
    ApiKeyHeader { header: String, value: String },
}

/// Snapshot sent as the first outbound frame after connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub voice: Option<String>,
    pub language: Option<String>,
    pub input_format: String,
    pub output_format: String,
    pub vad_enabled: bool,
    pub interruption_enabled: bool,
    pub system_prompt: Option<String>,
}

/// Frame sent by the client carrying one chunk of input audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InputAudioFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub data: String,
    pub timestamp: i64,
}

impl InputAudioFrame {
    pub fn new(pcm_base64: impl Into<String>, timestamp: i64) -> Self {
        Self {
            frame_type: "audio".to_string(),
            data: pcm_base64.into(),
            timestamp,
        }
    }
}

/// Tagged union over everything the server can send back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputFrame {
    AudioDelta { data: String, timestamp: i64 },
    TranscriptionDelta { text: String, is_final: bool, role: TranscriptionRole, timestamp: i64 },
    Error { message: String, timestamp: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionRole {
    User,
    Assistant,
}

/// Accumulated usage over a session's lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUsage {
    pub audio_bytes: u64,
    pub tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Per-provider session limits, advertised so callers can validate a
/// `SessionConfig` before opening.
#[derive(Debug, Clone)]
pub struct SessionCapabilities {
    pub input_sample_rates_hz: Vec<u32>,
    pub output_sample_rates_hz: Vec<u32>,
    pub max_session_seconds: u64,
    pub vad_range_ms: (u32, u32),
    pub supports_function_calling: bool,
}

impl SessionCapabilities {
    pub fn elevenlabs() -> Self {
        Self {
            input_sample_rates_hz: vec![16_000, 24_000, 48_000],
            output_sample_rates_hz: vec![24_000, 48_000],
            max_session_seconds: 3_600,
            vad_range_ms: (50, 500),
            supports_function_calling: false,
        }
    }

    pub fn ultravox() -> Self {
        Self {
            input_sample_rates_hz: vec![8_000, 16_000],
            output_sample_rates_hz: vec![16_000],
            max_session_seconds: 86_400,
            vad_range_ms: (20, 200),
            supports_function_calling: true,
        }
    }
}

/// A full-duplex real-time session. `send` hands a frame to the transport;
/// `recv` pulls the next output frame (or `None` once the session closes).
pub struct RealtimeSession {
    state: SessionState,
    outbound: mpsc::Sender<WsMessage>,
    inbound: mpsc::Receiver<Result<OutputFrame, ProviderError>>,
    usage: SessionUsage,
}

impl RealtimeSession {
    /// Opens a session: derives the `ws`/`wss` URL from `base_url`,
    /// attaches provider-specific auth, connects, and sends the initial
    /// `configure` frame. Spawns a background task that pumps the socket
    /// into an mpsc channel so `recv` never blocks on socket internals.
    pub async fn open(base_url: &str, auth: RealtimeAuth, config: SessionConfig) -> Result<Self, ProviderError> {
        let ws_url = to_websocket_url(base_url).map_err(|message| ProviderError::Configuration { message })?;

        let mut request = tokio_tungstenite::tungstenite::http::Request::builder()
            .uri(&ws_url)
            .header("Host", url_host(&ws_url))
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", tokio_tungstenite::tungstenite::handshake::client::generate_key());

        request = match &auth {
            RealtimeAuth::Bearer(token) => request.header("Authorization", format!("Bearer {token}")),
            RealtimeAuth::ApiKeyHeader { header, value } => request.header(header.as_str(), value.clone()),
        };

        let request = request.body(()).map_err(|e| ProviderError::Configuration {
            message: format!("invalid realtime session request: {e}"),
        })?;

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ProviderError::NetworkError {
                message: format!("realtime session connect failed: {e}"),
            })?;

        let (mut write, mut read) = socket.split();

        let configure_payload = serde_json::to_string(&ConfigureFrame::from(config)).map_err(ProviderError::Serialization)?;
        write
            .send(WsMessage::Text(configure_payload.into()))
            .await
            .map_err(|e| ProviderError::NetworkError {
                message: format!("failed to send configure frame: {e}"),
            })?;

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(64);
        let (inbound_tx, inbound_rx) = mpsc::channel::<Result<OutputFrame, ProviderError>>(64);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let frame = match message {
                    Ok(WsMessage::Text(text)) => serde_json::from_str::<OutputFrame>(&text).map_err(ProviderError::Serialization),
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => Err(ProviderError::NetworkError {
                        message: format!("realtime session transport error: {e}"),
                    }),
                };
                if inbound_tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            state: SessionState::Connected,
            outbound: outbound_tx,
            inbound: inbound_rx,
            usage: SessionUsage::default(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn usage(&self) -> &SessionUsage {
        &self.usage
    }

    /// Sends one input audio frame; returns once the frame has been handed
    /// to the transport task (not once it's on the wire).
    pub async fn send(&mut self, frame: InputAudioFrame) -> Result<(), ProviderError> {
        if self.state != SessionState::Connected {
            return Err(ProviderError::Configuration {
                message: "cannot send on a session that is not connected".to_string(),
            });
        }
        let payload = serde_json::to_string(&frame).map_err(ProviderError::Serialization)?;
        self.usage.audio_bytes += frame.data.len() as u64;
        self.outbound
            .send(WsMessage::Text(payload.into()))
            .await
            .map_err(|_| ProviderError::NetworkError {
                message: "realtime session send channel closed".to_string(),
            })
    }

    /// Sends a VAD-triggered `interrupt` control frame, discarding any
    /// in-flight assistant output; the consumer side resumes with a new
    /// turn once the provider acknowledges.
    pub async fn interrupt(&mut self) -> Result<(), ProviderError> {
        self.outbound
            .send(WsMessage::Text(r#"{"type":"interrupt"}"#.to_string().into()))
            .await
            .map_err(|_| ProviderError::NetworkError {
                message: "realtime session send channel closed".to_string(),
            })
    }

    /// Pulls the next output frame. Returns `None` once the session has
    /// closed (normally or on error) and every buffered frame is drained.
    pub async fn recv(&mut self) -> Option<Result<OutputFrame, ProviderError>> {
        match self.inbound.recv().await {
            Some(Ok(frame)) => {
                if let OutputFrame::Error { .. } = &frame {
                    self.state = SessionState::Errored;
                }
                Some(Ok(frame))
            }
            Some(Err(e)) => {
                self.state = SessionState::Errored;
                Some(Err(e))
            }
            None => {
                if self.state == SessionState::Connected {
                    self.state = SessionState::Closed;
                }
                None
            }
        }
    }

    /// Idempotent: safe to call after a transport failure or a prior close.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed || self.state == SessionState::Errored {
            return;
        }
        let _ = self.outbound.send(WsMessage::Close(None)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.state = SessionState::Closed;
    }
}

#[derive(Serialize)]
struct ConfigureFrame {
    #[serde(rename = "type")]
    frame_type: &'static str,
    #[serde(flatten)]
    config: SessionConfig,
}

impl From<SessionConfig> for ConfigureFrame {
    fn from(config: SessionConfig) -> Self {
        Self {
            frame_type: "session.configure",
            config,
        }
    }
}

fn url_host(url: &str) -> String {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("")
        .to_string()
}
