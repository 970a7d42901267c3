use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Accident,
    Status,
}

/// One analyzed frame as handed to persistence, notification and overlay consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccidentEvent {
    pub ts_unix_ms: i64,
    pub stream: String,
    pub frame: u64,
    pub kind: EventKind,
    pub severity: String, // critical | high | medium | low
    pub confidence: f64,
    pub accident_score: f64,
    pub temporal_confidence: f64,
    pub critical_indicators: u32,
    pub method: String, // primary | secondary | tertiary | none
    // Scene counts
    pub vehicles: u32,
    pub persons: u32,
    pub indicators: Vec<String>,
    pub msg: String,
}
