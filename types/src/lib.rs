//! Shared configuration and wire types for chime
//!
//! This crate contains serializable types that are shared between the
//! announcement server, the listener process and chime-core.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Delivery (one accepted amount on its way to a listener)
// ─────────────────────────────────────────────────────────────────────────────

/// Idempotency identifier assigned by the server to each accepted amount.
///
/// `boot` distinguishes server processes so that a restarted server does not
/// reuse ids a listener has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeliveryId {
    pub boot: u64,
    pub seq: u64,
}

impl DeliveryId {
    pub fn new(boot: u64, seq: u64) -> Self {
        Self { boot, seq }
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.boot, self.seq)
    }
}

/// An accepted amount tagged with its delivery id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub amount: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /api/trigger`.
///
/// `amount` is kept as raw JSON so that missing, non-numeric and numeric-string
/// values can all be told apart during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub amount: Option<RawAmount>,
}

/// Amount as sent by a producing device: a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// Successful ingestion acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    pub amount: f64,
}

impl TriggerResponse {
    pub fn accepted(amount: f64) -> Self {
        Self {
            success: true,
            message: "Amount received".to_string(),
            amount,
        }
    }
}

/// Error body shared by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of `GET /api/check-amounts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Raw amounts in arrival order
    pub amounts: Vec<f64>,
    /// Same amounts with their delivery ids
    #[serde(default)]
    pub deliveries: Vec<Delivery>,
}

impl PullResponse {
    pub fn from_deliveries(deliveries: Vec<Delivery>) -> Self {
        Self {
            amounts: deliveries.iter().map(|d| d.amount).collect(),
            deliveries,
        }
    }
}

/// Body of `GET /api/check-sounds`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundCheckReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_files: Vec<String>,
    pub message: String,
}

impl SoundCheckReport {
    pub fn from_missing(missing_files: Vec<String>) -> Self {
        if missing_files.is_empty() {
            Self {
                success: true,
                missing_files,
                message: "All required sound files are present".to_string(),
            }
        } else {
            Self {
                success: false,
                missing_files,
                message: "Some required sound files are missing".to_string(),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Push channel messages
// ─────────────────────────────────────────────────────────────────────────────

/// Attach acknowledgement carried by the `status` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub id: String,
}

/// Text frame exchanged on the push channel, `{"event": .., "data": ..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum PushMessage {
    /// Server to client, first frame after attach
    Status(SessionStatus),
    /// Server to client, one accepted amount
    TriggerSound(Delivery),
    /// Client to server, ask the relay to announce an amount
    PlayAmount(f64),
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_sounds_dir() -> String {
    "public/sounds".to_string()
}

/// Top-level configuration persisted by confy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChimeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub audio: AudioSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory inspected by `/api/check-sounds`
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: String,
    /// Broadcast relay buffer; subscribers further behind than this skip events
    #[serde(default = "default_relay_capacity")]
    pub relay_capacity: usize,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_relay_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            sounds_dir: default_sounds_dir(),
            relay_capacity: default_relay_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Base URL of the announcement server
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_true")]
    pub push_enabled: bool,
    #[serde(default = "default_true")]
    pub poll_enabled: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Fixed delay between push reconnect attempts (no backoff)
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// Drop deliveries already received over the other path
    #[serde(default = "default_true")]
    pub dedupe: bool,
    /// Number of recent delivery ids remembered for dedupe
    #[serde(default = "default_dedupe_window")]
    pub dedupe_window: usize,
    /// Open the audio gate at startup without waiting for the console
    #[serde(default)]
    pub auto_unlock: bool,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_reconnect_interval_ms() -> u64 {
    5_000
}

fn default_dedupe_window() -> usize {
    256
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            push_enabled: true,
            poll_enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            dedupe: true,
            dedupe_window: default_dedupe_window(),
            auto_unlock: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Directory holding one clip per sound token
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: String,
    /// Clip file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Playback volume, 0-100
    #[serde(default = "default_volume")]
    pub volume: u8,
    /// Pause after every token
    #[serde(default = "default_inter_token_delay_ms")]
    pub inter_token_delay_ms: u64,
    /// Entries kept in the recent-activity log
    #[serde(default = "default_activity_log_len")]
    pub activity_log_len: usize,
}

fn default_extension() -> String {
    "mp3".to_string()
}

fn default_volume() -> u8 {
    100
}

fn default_inter_token_delay_ms() -> u64 {
    300
}

fn default_activity_log_len() -> usize {
    50
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sounds_dir: default_sounds_dir(),
            extension: default_extension(),
            volume: default_volume(),
            inter_token_delay_ms: default_inter_token_delay_ms(),
            activity_log_len: default_activity_log_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_message_wire_format() {
        let msg = PushMessage::Status(SessionStatus {
            connected: true,
            id: "s-1".to_string(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"event":"status","data":{"connected":true,"id":"s-1"}}"#);

        let parsed: PushMessage =
            serde_json::from_str(r#"{"event":"play-amount","data":12.5}"#).unwrap();
        assert_eq!(parsed, PushMessage::PlayAmount(12.5));
    }

    #[test]
    fn trigger_sound_carries_delivery() {
        let msg = PushMessage::TriggerSound(Delivery {
            id: DeliveryId::new(7, 3),
            amount: 456.78,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.starts_with(r#"{"event":"trigger-sound","data":{"id":{"boot":7,"seq":3}"#));
    }

    #[test]
    fn raw_amount_accepts_numbers_strings_and_junk() {
        let req: TriggerRequest = serde_json::from_str(r#"{"amount":456.78}"#).unwrap();
        assert_eq!(req.amount, Some(RawAmount::Number(456.78)));

        let req: TriggerRequest = serde_json::from_str(r#"{"amount":"12"}"#).unwrap();
        assert_eq!(req.amount, Some(RawAmount::Text("12".to_string())));

        let req: TriggerRequest = serde_json::from_str(r#"{"amount":true}"#).unwrap();
        assert!(matches!(req.amount, Some(RawAmount::Other(_))));

        let req: TriggerRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(req.amount, None);
    }

    #[test]
    fn pull_response_keeps_plain_amounts() {
        let resp = PullResponse::from_deliveries(vec![Delivery {
            id: DeliveryId::new(1, 1),
            amount: 456.78,
        }]);
        assert_eq!(resp.amounts, vec![456.78]);
        assert_eq!(resp.deliveries.len(), 1);
    }

    #[test]
    fn sound_check_report_messages() {
        assert!(SoundCheckReport::from_missing(vec![]).success);
        let report = SoundCheckReport::from_missing(vec!["lakh.mp3".to_string()]);
        assert!(!report.success);
        assert_eq!(report.message, "Some required sound files are missing");
    }

    #[test]
    fn config_defaults_fill_missing_sections() {
        let config: ChimeConfig = serde_json::from_str(r#"{"listener":{"dedupe":false}}"#).unwrap();
        assert!(!config.listener.dedupe);
        assert_eq!(config.listener.poll_interval_ms, 2_000);
        assert_eq!(config.listener.reconnect_interval_ms, 5_000);
        assert_eq!(config.audio.inter_token_delay_ms, 300);
        assert_eq!(config.server.bind, "0.0.0.0:3000");
    }
}
