use serde::Deserialize;
use tracing::debug;

use crate::geometry::distance;
use crate::{Detection, ObjectRole};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Nearest previous vehicle closer than this (pixels) is treated as the same vehicle.
    pub match_radius_px: f64,
    /// Relative area change that counts as deformation.
    pub size_change_threshold: f64,
    /// Absolute aspect-ratio change that counts as deformation.
    pub aspect_change_threshold: f64,
    /// Added to the score for every deformed match.
    pub step: f64,
    pub max_score: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            match_radius_px: 100.0,
            size_change_threshold: 0.3,
            aspect_change_threshold: 0.5,
            step: 0.3,
            max_score: 1.0,
        }
    }
}

/// Frame-to-frame deformation check over vehicles and motorcycles.
/// Holds exactly one frame of history: the previous call's vehicles.
#[derive(Debug, Clone)]
pub struct MotionTracker {
    cfg: MotionConfig,
    prev_vehicles: Vec<Detection>,
}

impl MotionTracker {
    pub fn new(cfg: MotionConfig) -> Self {
        Self { cfg, prev_vehicles: vec![] }
    }

    pub fn reset(&mut self) {
        self.prev_vehicles.clear();
    }

    /// Score abrupt size/shape changes against the previous frame, then make
    /// this frame's vehicles the new previous frame.
    pub fn update(&mut self, dets: &[Detection]) -> f64 {
        let current: Vec<Detection> = dets
            .iter()
            .filter(|d| matches!(d.role(), Some(ObjectRole::Vehicle | ObjectRole::Motorcycle)))
            .cloned()
            .collect();

        let mut score = 0.0;
        for cur in &current {
            let nearest = self
                .prev_vehicles
                .iter()
                .map(|p| (p, distance(cur.center, p.center)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            let Some((prev, dist)) = nearest else { continue };
            if dist >= self.cfg.match_radius_px {
                continue;
            }
            // size change is undefined against an empty previous box
            if prev.area <= 0.0 {
                continue;
            }

            let size_change = (cur.area - prev.area).abs() / prev.area;
            let aspect_change = (cur.aspect_ratio - prev.aspect_ratio).abs();
            if size_change > self.cfg.size_change_threshold || aspect_change > self.cfg.aspect_change_threshold {
                debug!(
                    "motion: class={} moved {:.1}px size_change={:.2} aspect_change={:.2}",
                    cur.class_id, dist, size_change, aspect_change
                );
                score += self.cfg.step;
            }
        }

        self.prev_vehicles = current;
        score.min(self.cfg.max_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BBox;

    fn car(x1: f64, y1: f64, x2: f64, y2: f64) -> Detection {
        Detection::new(BBox::new(x1, y1, x2, y2), 0.9, 2)
    }

    #[test]
    fn test_bootstrap_returns_zero_and_stores_vehicles() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        let person = Detection::new(BBox::new(0.0, 0.0, 10.0, 30.0), 0.9, 0);
        let score = mt.update(&[car(0.0, 0.0, 100.0, 50.0), person]);
        assert_eq!(score, 0.0);
        assert_eq!(mt.prev_vehicles.len(), 1);
    }

    #[test]
    fn test_steady_vehicle_scores_zero() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        mt.update(&[car(0.0, 0.0, 100.0, 50.0)]);
        assert_eq!(mt.update(&[car(5.0, 0.0, 105.0, 50.0)]), 0.0);
    }

    #[test]
    fn test_size_jump_scores_step() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        mt.update(&[car(0.0, 0.0, 100.0, 50.0)]);
        // area 5000 -> 7500, aspect 2.0 -> 2.0
        let score = mt.update(&[car(0.0, 0.0, 150.0, 50.0)]);
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_aspect_flip_scores_step() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        mt.update(&[car(0.0, 0.0, 100.0, 50.0)]);
        // same area, aspect 2.0 -> 0.5
        let score = mt.update(&[car(25.0, -25.0, 75.0, 75.0)]);
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_far_vehicle_is_not_matched() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        mt.update(&[car(0.0, 0.0, 100.0, 50.0)]);
        assert_eq!(mt.update(&[car(400.0, 0.0, 600.0, 50.0)]), 0.0);
    }

    #[test]
    fn test_score_is_capped() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        let prev: Vec<Detection> = (0..5).map(|i| car(i as f64 * 300.0, 0.0, i as f64 * 300.0 + 100.0, 50.0)).collect();
        mt.update(&prev);
        let grown: Vec<Detection> = (0..5).map(|i| car(i as f64 * 300.0, 0.0, i as f64 * 300.0 + 100.0, 100.0)).collect();
        assert_eq!(mt.update(&grown), 1.0);
    }

    #[test]
    fn test_zero_area_previous_is_skipped() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        mt.update(&[car(0.0, 0.0, 0.0, 50.0)]);
        assert_eq!(mt.update(&[car(0.0, 0.0, 40.0, 50.0)]), 0.0);
    }

    #[test]
    fn test_history_is_replaced_every_call() {
        let mut mt = MotionTracker::new(MotionConfig::default());
        mt.update(&[car(0.0, 0.0, 100.0, 50.0)]);
        mt.update(&[]);
        assert!(mt.prev_vehicles.is_empty());
        // no previous vehicles again: bootstrap
        assert_eq!(mt.update(&[car(0.0, 0.0, 150.0, 50.0)]), 0.0);
    }
}
