/// Cutoff a detection's confidence must strictly exceed to be counted.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Axis-aligned box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Finite coordinates with x2 >= x1 and y2 >= y1.
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x2 >= self.x1
            && self.y2 >= self.y1
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One object found by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, class_id: usize, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            class_id,
            confidence,
            bbox,
        }
    }

    /// Counted detections clear the threshold and carry a usable box.
    pub fn is_counted(&self) -> bool {
        self.confidence > CONFIDENCE_THRESHOLD && self.bbox.is_well_formed()
    }
}

/// The detections that count toward the total, in model order.
///
/// Counting, drawing, capture enablement and logging all go through this
/// function so they can never disagree.
pub fn counted(detections: &[Detection]) -> Vec<&Detection> {
    detections.iter().filter(|d| d.is_counted()).collect()
}

/// Labels of the counted detections, in model order.
pub fn counted_labels(detections: &[Detection]) -> Vec<String> {
    counted(detections)
        .into_iter()
        .map(|d| d.label.clone())
        .collect()
}
