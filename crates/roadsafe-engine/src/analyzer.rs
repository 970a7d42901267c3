use serde::Deserialize;
use tracing::{debug, info};

use crate::decision::{AccidentDecision, DecisionConfig, DecisionEngine, DecisionMethod};
use crate::indicators::{IndicatorConfig, IndicatorEvaluator};
use crate::motion::{MotionConfig, MotionTracker};
use crate::severity::SeverityConfig;
use crate::temporal::{AccidentHistoryWindow, TemporalConfig};
use crate::{valid_detections, Detection};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub motion: MotionConfig,
    pub indicators: IndicatorConfig,
    pub temporal: TemporalConfig,
    pub decision: DecisionConfig,
    pub severity: SeverityConfig,
}

/// Per-stream accident analyzer.
///
/// Owns the only cross-frame state (previous-frame vehicles and the recent
/// score window), so every camera stream needs its own instance. Frames must
/// be fed in capture order.
#[derive(Debug, Clone)]
pub struct AccidentAnalyzer {
    motion: MotionTracker,
    evaluator: IndicatorEvaluator,
    history: AccidentHistoryWindow,
    engine: DecisionEngine,
    frames: u64,
}

impl AccidentAnalyzer {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            motion: MotionTracker::new(cfg.motion.clone()),
            evaluator: IndicatorEvaluator::new(cfg.indicators.clone()),
            history: AccidentHistoryWindow::new(cfg.temporal.clone()),
            engine: DecisionEngine::new(cfg.decision.clone()),
            frames: 0,
        }
    }

    pub fn history(&self) -> &AccidentHistoryWindow {
        &self.history
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames
    }

    /// Drop all retained state, e.g. after the stream was interrupted.
    pub fn reset(&mut self) {
        self.motion.reset();
        self.history.clear();
        self.frames = 0;
    }

    pub fn evaluate(&mut self, dets: &[Detection]) -> AccidentDecision {
        self.frames += 1;

        let valid = valid_detections(dets);

        let motion_score = self.motion.update(&valid);
        let frame = self.evaluator.evaluate(&valid, motion_score);

        self.history.push(frame.accident_score);
        let temporal_confidence = self.history.ratio();

        let (method, confidence) =
            self.engine.decide(frame.accident_score, temporal_confidence, frame.critical_indicators);

        debug!(
            "frame {}: score={:.3} motion={:.2} temporal={:.2} critical={} method={}",
            self.frames,
            frame.accident_score,
            motion_score,
            temporal_confidence,
            frame.critical_indicators,
            method.as_str()
        );

        let is_accident = method != DecisionMethod::None;
        if is_accident {
            info!(
                "frame {}: accident ({} rule) confidence={:.2} indicators={}",
                self.frames,
                method.as_str(),
                confidence,
                frame.indicators.len()
            );
        }

        AccidentDecision {
            is_accident,
            confidence,
            accident_score: frame.accident_score,
            temporal_confidence,
            critical_indicators: frame.critical_indicators,
            indicators: frame.indicators,
            method,
        }
    }
}
