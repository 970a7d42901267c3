use serde::{Deserialize, Serialize};

use crate::decision::AccidentDecision;
use crate::{Detection, ObjectRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub critical_confidence: f64,
    pub critical_min_vehicles: usize, // exclusive
    pub high_confidence: f64,
    pub high_min_vehicles: usize, // exclusive
    pub medium_confidence: f64,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            critical_confidence: 0.9,
            critical_min_vehicles: 3,
            high_confidence: 0.75,
            high_min_vehicles: 2,
            medium_confidence: 0.6,
        }
    }
}

/// Triage label for an accident call. Motorcycles count as vehicles here.
pub fn classify(cfg: &SeverityConfig, decision: &AccidentDecision, dets: &[Detection]) -> Severity {
    let (vehicles, persons) = count_roles(dets);
    let conf = decision.confidence;

    if conf > cfg.critical_confidence && (vehicles > cfg.critical_min_vehicles || persons > 0) {
        Severity::Critical
    } else if conf > cfg.high_confidence && vehicles > cfg.high_min_vehicles {
        Severity::High
    } else if conf > cfg.medium_confidence {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// (vehicles incl. motorcycles, persons)
pub fn count_roles(dets: &[Detection]) -> (usize, usize) {
    dets.iter().fold((0, 0), |(v, p), d| match d.role() {
        Some(ObjectRole::Vehicle | ObjectRole::Motorcycle) => (v + 1, p),
        Some(ObjectRole::Person) => (v, p + 1),
        None => (v, p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionMethod;
    use crate::BBox;

    fn decision(confidence: f64) -> AccidentDecision {
        AccidentDecision {
            is_accident: true,
            confidence,
            accident_score: confidence,
            temporal_confidence: 0.0,
            critical_indicators: 1,
            indicators: vec![],
            method: DecisionMethod::Primary,
        }
    }

    fn objs(vehicles: usize, persons: usize) -> Vec<Detection> {
        let mut out = Vec::new();
        for i in 0..vehicles {
            let class = if i % 2 == 0 { 2 } else { 3 };
            out.push(Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0.9, class));
        }
        for _ in 0..persons {
            out.push(Detection::new(BBox::new(0.0, 0.0, 10.0, 30.0), 0.9, 0));
        }
        // unrelated class
        out.push(Detection::new(BBox::new(0.0, 0.0, 5.0, 5.0), 0.9, 9));
        out
    }

    #[test]
    fn test_count_roles() {
        assert_eq!(count_roles(&objs(3, 2)), (3, 2));
    }

    #[test]
    fn test_tiers() {
        let cfg = SeverityConfig::default();
        assert_eq!(classify(&cfg, &decision(0.95), &objs(1, 1)), Severity::Critical);
        assert_eq!(classify(&cfg, &decision(0.95), &objs(4, 0)), Severity::Critical);
        assert_eq!(classify(&cfg, &decision(0.95), &objs(3, 0)), Severity::High);
        assert_eq!(classify(&cfg, &decision(0.8), &objs(2, 0)), Severity::Medium);
        assert_eq!(classify(&cfg, &decision(0.6), &objs(5, 5)), Severity::Low);
    }

    #[test]
    fn test_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
    }
}
