mod geometry;
pub mod alert;
pub mod analyzer;
pub mod decision;
pub mod doctor;
pub mod indicators;
pub mod motion;
pub mod severity;
pub mod temporal;

pub use analyzer::{AccidentAnalyzer, EngineConfig};
pub use decision::{AccidentDecision, DecisionMethod};
pub use geometry::{distance, iou};
pub use indicators::{IndicatorKind, IndicatorRecord, IndicatorSeverity};

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Pixel-space box, (x1, y1) top-left and (x2, y2) bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point { x: (self.x1 + self.x2) / 2.0, y: (self.y1 + self.y2) / 2.0 }
    }
}

/// Semantic role of a detector class. Anything else the detector reports is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRole {
    Vehicle,
    Motorcycle,
    Person,
}

impl ObjectRole {
    /// COCO ids: 0 person, 2 car, 3 motorcycle, 5 bus, 7 truck.
    pub fn of(class_id: i32) -> Option<Self> {
        match class_id {
            2 | 5 | 7 => Some(Self::Vehicle),
            3 => Some(Self::Motorcycle),
            0 => Some(Self::Person),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DetectionError {
    #[error("non-finite value in detection (class {class_id})")]
    NonFinite { class_id: i32 },

    #[error("inverted box {x1},{y1} -> {x2},{y2} (class {class_id})")]
    Inverted { class_id: i32, x1: f64, y1: f64, x2: f64, y2: f64 },

    #[error("degenerate box {width}x{height} (class {class_id})")]
    Degenerate { class_id: i32, width: f64, height: f64 },
}

/// Wire shape produced by the detector.
#[derive(Debug, Clone, Deserialize)]
struct RawDetection {
    bbox: [f64; 4],
    confidence: f64,
    class_id: i32,
}

impl From<RawDetection> for Detection {
    fn from(r: RawDetection) -> Self {
        let [x1, y1, x2, y2] = r.bbox;
        Detection::new(BBox::new(x1, y1, x2, y2), r.confidence, r.class_id)
    }
}

/// One object reported by the external detector. Derived geometry is fixed at construction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawDetection")]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f64,
    pub class_id: i32,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub area: f64,
    pub aspect_ratio: f64,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f64, class_id: i32) -> Self {
        let width = bbox.width();
        let height = bbox.height();
        let aspect_ratio = if height == 0.0 { 0.0 } else { width / height };
        Self {
            bbox,
            confidence,
            class_id,
            center: bbox.center(),
            width,
            height,
            area: width * height,
            aspect_ratio,
        }
    }

    pub fn role(&self) -> Option<ObjectRole> {
        ObjectRole::of(self.class_id)
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        let b = &self.bbox;
        let finite = [b.x1, b.y1, b.x2, b.y2, self.confidence].iter().all(|v| v.is_finite());
        if !finite {
            return Err(DetectionError::NonFinite { class_id: self.class_id });
        }
        if b.x2 < b.x1 || b.y2 < b.y1 {
            return Err(DetectionError::Inverted {
                class_id: self.class_id,
                x1: b.x1,
                y1: b.y1,
                x2: b.x2,
                y2: b.y2,
            });
        }
        // a line or a point has no shape to judge orientation or deformation from
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(DetectionError::Degenerate {
                class_id: self.class_id,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// The detections that pass [`Detection::validate`], in input order.
/// Rejected ones are logged and dropped.
pub fn valid_detections(dets: &[Detection]) -> Vec<Detection> {
    dets.iter()
        .filter(|d| match d.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("skipping detection: {}", e);
                false
            }
        })
        .cloned()
        .collect()
}

/// One line of a detection log: the detector output for a single captured frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub frame: u64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_geometry() {
        let d = Detection::new(BBox::new(10.0, 20.0, 50.0, 70.0), 0.9, 2);
        assert_eq!(d.width, 40.0);
        assert_eq!(d.height, 50.0);
        assert_eq!(d.area, 2000.0);
        assert_eq!(d.aspect_ratio, 0.8);
        assert_eq!(d.center, Point { x: 30.0, y: 45.0 });
    }

    #[test]
    fn test_zero_height_aspect_is_zero_and_rejected() {
        let d = Detection::new(BBox::new(0.0, 5.0, 10.0, 5.0), 0.9, 2);
        assert_eq!(d.aspect_ratio, 0.0);
        assert_eq!(
            d.validate(),
            Err(DetectionError::Degenerate { class_id: 2, width: 10.0, height: 0.0 })
        );

        let line = Detection::new(BBox::new(5.0, 0.0, 5.0, 40.0), 0.9, 3);
        assert!(matches!(line.validate(), Err(DetectionError::Degenerate { .. })));
    }

    #[test]
    fn test_role_table() {
        assert_eq!(ObjectRole::of(2), Some(ObjectRole::Vehicle));
        assert_eq!(ObjectRole::of(5), Some(ObjectRole::Vehicle));
        assert_eq!(ObjectRole::of(7), Some(ObjectRole::Vehicle));
        assert_eq!(ObjectRole::of(3), Some(ObjectRole::Motorcycle));
        assert_eq!(ObjectRole::of(0), Some(ObjectRole::Person));
        assert_eq!(ObjectRole::of(1), None);
        assert_eq!(ObjectRole::of(9), None);
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let inverted = Detection::new(BBox::new(50.0, 0.0, 10.0, 10.0), 0.9, 2);
        assert!(matches!(inverted.validate(), Err(DetectionError::Inverted { .. })));

        let nan = Detection::new(BBox::new(0.0, 0.0, f64::NAN, 10.0), 0.9, 2);
        assert_eq!(nan.validate(), Err(DetectionError::NonFinite { class_id: 2 }));
    }

    #[test]
    fn test_valid_detections_keeps_order() {
        let dets = [
            Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0.9, 2),
            Detection::new(BBox::new(0.0, 5.0, 10.0, 5.0), 0.9, 2),
            Detection::new(BBox::new(20.0, 0.0, 10.0, 10.0), 0.9, 0),
            Detection::new(BBox::new(30.0, 0.0, 40.0, 20.0), 0.9, 0),
        ];
        let kept = valid_detections(&dets);
        assert_eq!(kept, vec![dets[0].clone(), dets[3].clone()]);
    }

    #[test]
    fn test_frame_from_json() {
        let line = r#"{"frame": 7, "detections": [{"bbox": [0, 0, 100, 50], "confidence": 0.8, "class_id": 3}]}"#;
        let f: Frame = serde_json::from_str(line).unwrap();
        assert_eq!(f.frame, 7);
        assert_eq!(f.detections.len(), 1);
        assert_eq!(f.detections[0].aspect_ratio, 2.0);
        assert_eq!(f.detections[0].role(), Some(ObjectRole::Motorcycle));
    }
}
