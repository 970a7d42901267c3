use std::collections::VecDeque;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    pub window: usize,
    /// Below this many frames the ratio is 0.
    pub min_frames: usize,
    /// Frame scores strictly above this count as accident-like.
    pub high_score: f64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self { window: 5, min_frames: 3, high_score: 0.5 }
    }
}

/// Fixed-capacity FIFO of recent frame scores, oldest first.
#[derive(Debug, Clone)]
pub struct AccidentHistoryWindow {
    cfg: TemporalConfig,
    scores: VecDeque<f64>,
}

impl AccidentHistoryWindow {
    pub fn new(cfg: TemporalConfig) -> Self {
        let scores = VecDeque::with_capacity(cfg.window + 1);
        Self { cfg, scores }
    }

    pub fn push(&mut self, score: f64) {
        self.scores.push_back(score);
        while self.scores.len() > self.cfg.window {
            self.scores.pop_front();
        }
    }

    /// Fraction of retained frames whose score exceeded `high_score`.
    pub fn ratio(&self) -> f64 {
        if self.scores.len() < self.cfg.min_frames || self.scores.is_empty() {
            return 0.0;
        }
        let high = self.scores.iter().filter(|s| **s > self.cfg.high_score).count();
        high as f64 / self.scores.len() as f64
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().copied()
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> AccidentHistoryWindow {
        AccidentHistoryWindow::new(TemporalConfig::default())
    }

    #[test]
    fn test_ratio_zero_below_min_frames() {
        let mut w = window();
        assert_eq!(w.ratio(), 0.0);
        w.push(0.9);
        w.push(0.9);
        assert_eq!(w.ratio(), 0.0);
        w.push(0.9);
        assert_eq!(w.ratio(), 1.0);
    }

    #[test]
    fn test_fifo_eviction_keeps_last_five() {
        let mut w = window();
        for s in [0.1, 0.2, 0.3, 0.4, 0.5, 0.6] {
            w.push(s);
        }
        assert_eq!(w.len(), 5);
        assert_eq!(w.scores().collect::<Vec<_>>(), vec![0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_ratio_is_strictly_above_threshold() {
        let mut w = window();
        for s in [0.5, 0.5, 0.51, 0.9, 0.0] {
            w.push(s);
        }
        assert_eq!(w.ratio(), 2.0 / 5.0);
    }

    #[test]
    fn test_old_high_scores_age_out() {
        let mut w = window();
        for _ in 0..5 {
            w.push(0.9);
        }
        for _ in 0..5 {
            w.push(0.1);
        }
        assert_eq!(w.ratio(), 0.0);
    }
}
