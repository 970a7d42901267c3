use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorRecord;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub primary_score: f64,
    pub primary_min_critical: u32,

    pub secondary_score: f64,
    pub secondary_temporal: f64,
    pub secondary_min_critical: u32,

    pub tertiary_score: f64,
    pub tertiary_min_critical: u32,

    // confidence blend for positive calls
    pub score_weight: f64,
    pub temporal_weight: f64,
    pub per_critical_weight: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            primary_score: 0.70,
            primary_min_critical: 1,
            secondary_score: 0.55,
            secondary_temporal: 0.6,
            secondary_min_critical: 1,
            tertiary_score: 0.50,
            tertiary_min_critical: 2,
            score_weight: 0.6,
            temporal_weight: 0.2,
            per_critical_weight: 0.1,
        }
    }
}

/// Which rule produced the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMethod {
    Primary,
    Secondary,
    Tertiary,
    None,
}

impl DecisionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::None => "none",
        }
    }
}

/// Per-frame verdict handed to persistence, notification and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccidentDecision {
    pub is_accident: bool,
    pub confidence: f64,
    pub accident_score: f64,
    pub temporal_confidence: f64,
    pub critical_indicators: u32,
    pub indicators: Vec<IndicatorRecord>,
    pub method: DecisionMethod,
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    cfg: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(cfg: DecisionConfig) -> Self {
        Self { cfg }
    }

    /// Returns (method, confidence). `method != None` means accident.
    pub fn decide(&self, accident_score: f64, temporal_confidence: f64, critical: u32) -> (DecisionMethod, f64) {
        let c = &self.cfg;

        let primary = accident_score > c.primary_score && critical >= c.primary_min_critical;
        let secondary = accident_score > c.secondary_score
            && temporal_confidence > c.secondary_temporal
            && critical >= c.secondary_min_critical;
        let tertiary = critical >= c.tertiary_min_critical && accident_score > c.tertiary_score;

        let method = if primary {
            DecisionMethod::Primary
        } else if secondary {
            DecisionMethod::Secondary
        } else if tertiary {
            DecisionMethod::Tertiary
        } else {
            DecisionMethod::None
        };

        let confidence = match method {
            DecisionMethod::None => accident_score,
            _ => (accident_score * c.score_weight
                + temporal_confidence * c.temporal_weight
                + critical as f64 * c.per_critical_weight)
                .min(1.0),
        };
        (method, confidence)
    }
}
