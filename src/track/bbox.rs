use nalgebra::SVector;

/// Axis-aligned box in pixel coordinates, corners as (x1, y1) top-left and
/// (x2, y2) bottom-right.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    /// Inverted corners collapse to the zero box rather than producing a box
    /// with negative extent.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        if x1 > x2 || y1 > y2 {
            return BBox::default();
        }
        BBox { x1, y1, x2, y2 }
    }

    /// Converts the (cx, cy, area, aspect) form the Kalman filter works in back
    /// to corner form. Non-physical states (negative area or aspect) collapse
    /// to the zero box.
    pub fn from_observation(z: SVector<f64, 4>) -> Self {
        if z[2] < 0.0 || z[3] < 0.0 {
            return BBox::default();
        }
        let w = (z[2] * z[3]).sqrt();
        let h = z[2] / (w + f64::EPSILON);

        Self::new(
            z[0] - w / 2.0,
            z[1] - h / 2.0,
            z[0] + w / 2.0,
            z[1] + h / 2.0,
        )
    }

    pub fn to_observation(&self) -> SVector<f64, 4> {
        let w = (self.x2 - self.x1).max(0.0);
        let h = (self.y2 - self.y1).max(0.0);

        let cx = self.x1 + w / 2.0;
        let cy = self.y1 + h / 2.0;
        let area = w * h;
        let aspect = w / (h + f64::EPSILON);

        SVector::<f64, 4>::new(cx, cy, area, aspect)
    }

    pub fn area(&self) -> f64 {
        ((self.x2 - self.x1) * (self.y2 - self.y1)).max(0.0)
    }

    pub fn centroid_y(&self) -> f64 {
        (self.y1 + self.y2) / 2.0
    }

    pub fn iou(&self, other: &Self) -> f64 {
        let iwidth = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iheight = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let iarea = iwidth * iheight;

        let union = self.area() + other.area() - iarea;
        if union == 0.0 {
            return 0.0;
        }

        iarea / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_corners_collapse_to_zero_box() {
        let bbox = BBox::new(3.0, 4.0, 2.0, 5.0);

        assert_eq!(bbox, BBox::default());
    }

    #[test]
    fn test_from_observation_rejects_negative_area() {
        let z = SVector::<f64, 4>::new(1.0, 1.0, -4.0, 1.0);

        assert_eq!(BBox::from_observation(z), BBox::default());
    }

    #[test]
    fn test_observation_round_trip_preserves_center() {
        let bbox = BBox::new(10.0, 20.0, 50.0, 100.0);
        let back = BBox::from_observation(bbox.to_observation());

        assert!((back.x1 - bbox.x1).abs() < 1e-6);
        assert!((back.y1 - bbox.y1).abs() < 1e-6);
        assert!((back.x2 - bbox.x2).abs() < 1e-6);
        assert!((back.y2 - bbox.y2).abs() < 1e-6);
    }

    #[test]
    fn test_iou_of_quarter_overlap() {
        let a = BBox::new(1.0, 1.0, 2.0, 2.0);
        let b = BBox::new(1.0, 1.0, 1.5, 1.5);

        assert_eq!(a.iou(&b), 0.25);
    }

    #[test]
    fn test_iou_of_disjoint_boxes() {
        let a = BBox::new(0.0, 0.0, 1.0, 2.0);
        let b = BBox::new(1.0, 2.0, 3.0, 3.0);

        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_of_contained_box() {
        let a = BBox::new(0.0, 0.0, 3.0, 3.0);
        let b = BBox::new(1.0, 1.0, 2.0, 2.0);

        assert_eq!(a.iou(&b), 1.0 / 9.0);
    }

    #[test]
    fn test_centroid_y_is_vertical_center() {
        let bbox = BBox::new(0.0, 100.0, 50.0, 300.0);

        assert_eq!(bbox.centroid_y(), 200.0);
    }
}
