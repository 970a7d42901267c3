use crate::{BBox, Point};

/// Intersection over union of two corner-form boxes. Disjoint or degenerate boxes give 0.
pub fn iou(a: &BBox, b: &BBox) -> f64 {
    let ix_a = a.x1.max(b.x1);
    let iy_a = a.y1.max(b.y1);
    let ix_b = a.x2.min(b.x2);
    let iy_b = a.y2.min(b.y2);

    if ix_b < ix_a || iy_b < iy_a {
        return 0.0;
    }

    let inter = (ix_b - ix_a) * (iy_b - iy_a);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

pub fn distance(p: Point, q: Point) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}
