//! Single-frame accident evidence.
//!
//! Each indicator looks at one kind of spatial evidence in the current frame
//! (overlapping boxes, tipped-over shapes, crowding, people close to vehicles)
//! or at the motion score from the previous frame. Triggered indicators are
//! summed into one frame score, clamped to 1.0. Collisions, flipped vehicles,
//! sudden motion and fallen motorcycles also count as critical evidence, once
//! per occurrence.

use serde::{Deserialize, Serialize};

use crate::geometry::{distance, iou};
use crate::{Detection, ObjectRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Collision,
    AbnormalOrientation,
    Clustering,
    MotorcycleIncident,
    PersonInDanger,
    SuddenMotion,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collision => "collision",
            Self::AbnormalOrientation => "abnormal_orientation",
            Self::Clustering => "clustering",
            Self::MotorcycleIncident => "motorcycle_incident",
            Self::PersonInDanger => "person_in_danger",
            Self::SuddenMotion => "sudden_motion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorSeverity {
    Critical,
    High,
    Moderate,
}

impl IndicatorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Moderate => "moderate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub kind: IndicatorKind,
    pub score: f64,
    pub severity_label: IndicatorSeverity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    // vehicle collision
    pub collision_iou: f64,
    pub collision_iou_gain: f64,
    pub collision_weight: f64,

    // abnormal orientation
    pub orientation_max_aspect: f64,
    pub orientation_min_confidence: f64,
    pub orientation_score: f64,

    // sudden motion
    pub sudden_motion_threshold: f64,
    pub sudden_motion_weight: f64,

    // clustering
    pub cluster_min_vehicles: usize,
    pub cluster_distance_factor: f64,
    pub cluster_min_pairs: usize,
    pub cluster_pair_divisor: f64,
    pub cluster_cap: f64,
    pub cluster_weight: f64,

    // motorcycle incident
    pub fallen_motorcycle_max_aspect: f64,
    pub fallen_motorcycle_score: f64,
    pub rider_distance_factor: f64,
    pub rider_weight: f64,

    // person in danger
    pub pedestrian_distance_factor: f64,
    pub pedestrian_per_person: f64,
    pub pedestrian_cap: f64,
    pub pedestrian_weight: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            collision_iou: 0.25,
            collision_iou_gain: 4.0,
            collision_weight: 0.7,

            orientation_max_aspect: 0.85,
            orientation_min_confidence: 0.7,
            orientation_score: 0.6,

            sudden_motion_threshold: 0.2,
            sudden_motion_weight: 0.4,

            cluster_min_vehicles: 3,
            cluster_distance_factor: 0.7,
            cluster_min_pairs: 3,
            cluster_pair_divisor: 4.0,
            cluster_cap: 0.5,
            cluster_weight: 0.4,

            fallen_motorcycle_max_aspect: 1.0,
            fallen_motorcycle_score: 0.5,
            rider_distance_factor: 1.0,
            rider_weight: 0.6,

            pedestrian_distance_factor: 0.8,
            pedestrian_per_person: 0.2,
            pedestrian_cap: 0.3,
            pedestrian_weight: 0.3,
        }
    }
}

/// Outcome of scoring one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAssessment {
    pub accident_score: f64,
    pub critical_indicators: u32,
    pub indicators: Vec<IndicatorRecord>,
}

#[derive(Debug, Clone)]
pub struct IndicatorEvaluator {
    cfg: IndicatorConfig,
}

impl IndicatorEvaluator {
    pub fn new(cfg: IndicatorConfig) -> Self {
        Self { cfg }
    }

    pub fn evaluate(&self, dets: &[Detection], motion_score: f64) -> FrameAssessment {
        let vehicles = by_role(dets, ObjectRole::Vehicle);
        let motorcycles = by_role(dets, ObjectRole::Motorcycle);
        let persons = by_role(dets, ObjectRole::Person);

        if dets.is_empty() || (vehicles.is_empty() && motorcycles.is_empty()) {
            return FrameAssessment::default();
        }

        let all_vehicles: Vec<&Detection> = vehicles.iter().chain(motorcycles.iter()).copied().collect();

        let mut out = FrameAssessment::default();
        self.collision(&all_vehicles, &mut out);
        self.orientation(&vehicles, &mut out);
        self.sudden_motion(motion_score, &mut out);
        self.clustering(&all_vehicles, &mut out);
        self.motorcycle_incident(&motorcycles, &persons, &mut out);
        self.person_in_danger(&vehicles, &persons, &mut out);

        out.accident_score = out.indicators.iter().map(|r| r.score).sum::<f64>().min(1.0);
        out
    }

    fn collision(&self, all_vehicles: &[&Detection], out: &mut FrameAssessment) {
        let c = &self.cfg;
        let mut best: Option<f64> = None;
        for (i, a) in all_vehicles.iter().enumerate() {
            for b in &all_vehicles[i + 1..] {
                let overlap = iou(&a.bbox, &b.bbox);
                if overlap > c.collision_iou {
                    let score = (overlap * c.collision_iou_gain).min(1.0) * c.collision_weight;
                    best = Some(best.map_or(score, |s| s.max(score)));
                    out.critical_indicators += 1;
                }
            }
        }
        if let Some(score) = best {
            push(out, IndicatorKind::Collision, score, IndicatorSeverity::Critical);
        }
    }

    fn orientation(&self, vehicles: &[&Detection], out: &mut FrameAssessment) {
        let c = &self.cfg;
        let flipped = vehicles
            .iter()
            .filter(|v| {
                v.area > 0.0 && v.aspect_ratio < c.orientation_max_aspect && v.confidence > c.orientation_min_confidence
            })
            .count();
        if flipped > 0 {
            out.critical_indicators += flipped as u32;
            push(out, IndicatorKind::AbnormalOrientation, c.orientation_score * flipped as f64, IndicatorSeverity::Critical);
        }
    }

    fn sudden_motion(&self, motion_score: f64, out: &mut FrameAssessment) {
        let c = &self.cfg;
        if motion_score > c.sudden_motion_threshold {
            out.critical_indicators += 1;
            push(out, IndicatorKind::SuddenMotion, motion_score * c.sudden_motion_weight, IndicatorSeverity::Critical);
        }
    }

    fn clustering(&self, all_vehicles: &[&Detection], out: &mut FrameAssessment) {
        let c = &self.cfg;
        if all_vehicles.len() < c.cluster_min_vehicles {
            return;
        }
        let mut close_pairs = 0usize;
        for (i, a) in all_vehicles.iter().enumerate() {
            for b in &all_vehicles[i + 1..] {
                let avg_size = (side(a) + side(b)) / 2.0;
                if distance(a.center, b.center) < avg_size * c.cluster_distance_factor {
                    close_pairs += 1;
                }
            }
        }
        if close_pairs >= c.cluster_min_pairs {
            let score = (close_pairs as f64 / c.cluster_pair_divisor).min(c.cluster_cap) * c.cluster_weight;
            push(out, IndicatorKind::Clustering, score, IndicatorSeverity::Moderate);
        }
    }

    fn motorcycle_incident(&self, motorcycles: &[&Detection], persons: &[&Detection], out: &mut FrameAssessment) {
        let c = &self.cfg;
        if motorcycles
            .iter()
            .any(|m| m.area > 0.0 && m.aspect_ratio < c.fallen_motorcycle_max_aspect)
        {
            out.critical_indicators += 1;
            push(out, IndicatorKind::MotorcycleIncident, c.fallen_motorcycle_score, IndicatorSeverity::Critical);
            return;
        }

        let rider_down = motorcycles.iter().any(|m| {
            persons
                .iter()
                .any(|p| distance(p.center, m.center) < side(m) * c.rider_distance_factor)
        });
        if rider_down {
            push(out, IndicatorKind::MotorcycleIncident, c.fallen_motorcycle_score * c.rider_weight, IndicatorSeverity::High);
        }
    }

    fn person_in_danger(&self, vehicles: &[&Detection], persons: &[&Detection], out: &mut FrameAssessment) {
        let c = &self.cfg;
        let at_risk = persons
            .iter()
            .filter(|p| {
                vehicles
                    .iter()
                    .any(|v| distance(p.center, v.center) < side(v) * c.pedestrian_distance_factor)
            })
            .count();
        if at_risk > 0 {
            let score = (at_risk as f64 * c.pedestrian_per_person).min(c.pedestrian_cap) * c.pedestrian_weight;
            push(out, IndicatorKind::PersonInDanger, score, IndicatorSeverity::High);
        }
    }
}

fn by_role(dets: &[Detection], role: ObjectRole) -> Vec<&Detection> {
    dets.iter().filter(|d| d.role() == Some(role)).collect()
}

// Characteristic size of a box; negative areas from malformed input count as 0.
fn side(d: &Detection) -> f64 {
    d.area.max(0.0).sqrt()
}

fn push(out: &mut FrameAssessment, kind: IndicatorKind, score: f64, severity_label: IndicatorSeverity) {
    out.indicators.push(IndicatorRecord { kind, score, severity_label });
}
