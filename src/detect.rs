use ndarray::{Array4, ArrayViewD};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use thiserror::Error;

use crate::track::BBox;

const YOLO_INPUT_SIZE: u32 = 640;

#[rustfmt::skip]
const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear",
    "hair drier", "toothbrush",
];

pub fn class_name(class_id: usize) -> &'static str {
    COCO_CLASSES.get(class_id).copied().unwrap_or("unknown")
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("inference failed: {0}")]
    Ort(#[from] ort::Error),
    #[error("frame conversion failed: {0}")]
    Cv(#[from] opencv::Error),
    #[error("unsupported model output: {0}")]
    UnsupportedOutput(String),
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BBox,
    pub class_id: usize,
    pub confidence: f32,
}

pub struct ObjectDetector {
    session: Session,
    confidence_threshold: f32,
    nms_iou: f32,
}

impl ObjectDetector {
    pub fn new(model: &str, confidence_threshold: f32, nms_iou: f32) -> Result<Self, DetectError> {
        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        let session = if model.starts_with("http://") || model.starts_with("https://") {
            builder.commit_from_url(model)?
        } else {
            builder.commit_from_file(model)?
        };

        Ok(Self {
            session,
            confidence_threshold,
            nms_iou,
        })
    }

    pub fn detect(&mut self, frame: &opencv::core::Mat) -> Result<Vec<Detection>, DetectError> {
        use opencv::prelude::*;

        let rows = frame.rows();
        let cols = frame.cols();
        if rows == 0 || cols == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, scale, pad_x, pad_y) = self.preprocess(frame)?;

        let tensor_ref = TensorRef::from_array_view(input_tensor.view())?.into_dyn();
        let outputs = self.session.run(ort::inputs![tensor_ref])?;

        // YOLOv8 format: one "output0" tensor of shape [1, 4 + classes, anchors]
        let Some(output_val) = outputs.get("output0") else {
            return Err(DetectError::UnsupportedOutput(
                "expected a YOLOv8 model with an 'output0' tensor".into(),
            ));
        };

        let output = output_val.try_extract_array::<f32>()?.to_owned();
        drop(outputs);

        let detections = postprocess(
            &output.view(),
            self.confidence_threshold,
            scale,
            pad_x,
            pad_y,
            cols as f32,
            rows as f32,
        )?;

        Ok(nms(detections, self.nms_iou))
    }

    fn preprocess(
        &self,
        frame: &opencv::core::Mat,
    ) -> Result<(Array4<f32>, f32, f32, f32), DetectError> {
        use opencv::core::{AlgorithmHint, Mat, Size, BORDER_CONSTANT};
        use opencv::imgproc;
        use opencv::prelude::*;

        let rows = frame.rows() as f32;
        let cols = frame.cols() as f32;
        let input_size = YOLO_INPUT_SIZE as f32;

        let scale = (input_size / cols).min(input_size / rows);
        let new_w = (cols * scale).round() as i32;
        let new_h = (rows * scale).round() as i32;

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(new_w, new_h),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let pad_x = ((input_size as i32 - new_w) / 2) as f32;
        let pad_y = ((input_size as i32 - new_h) / 2) as f32;

        let mut padded = Mat::default();
        opencv::core::copy_make_border(
            &resized,
            &mut padded,
            pad_y as i32,
            input_size as i32 - new_h - pad_y as i32,
            pad_x as i32,
            input_size as i32 - new_w - pad_x as i32,
            BORDER_CONSTANT,
            opencv::core::Scalar::new(114.0, 114.0, 114.0, 0.0),
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &padded,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;

        let data = rgb.data_bytes()?;
        let total_size = (YOLO_INPUT_SIZE * YOLO_INPUT_SIZE * 3) as usize;
        if data.len() < total_size {
            return Err(DetectError::UnsupportedOutput("frame data too small".into()));
        }

        let mut tensor =
            Array4::<f32>::zeros((1, 3, YOLO_INPUT_SIZE as usize, YOLO_INPUT_SIZE as usize));
        for y in 0..YOLO_INPUT_SIZE as usize {
            for x in 0..YOLO_INPUT_SIZE as usize {
                let idx = (y * YOLO_INPUT_SIZE as usize + x) * 3;
                tensor[[0, 0, y, x]] = data[idx] as f32 / 255.0;
                tensor[[0, 1, y, x]] = data[idx + 1] as f32 / 255.0;
                tensor[[0, 2, y, x]] = data[idx + 2] as f32 / 255.0;
            }
        }

        Ok((tensor, scale, pad_x, pad_y))
    }
}

fn postprocess(
    output: &ArrayViewD<f32>,
    confidence_threshold: f32,
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    orig_w: f32,
    orig_h: f32,
) -> Result<Vec<Detection>, DetectError> {
    let shape = output.shape();

    // Expected shape: [1, 84, 8400] for the 80-class models.
    if shape.len() != 3 || shape[1] < 5 {
        return Err(DetectError::UnsupportedOutput(format!(
            "unexpected tensor shape {shape:?}"
        )));
    }

    let channels = shape[1];
    let anchors = shape[2];
    let num_classes = channels - 4;

    let flat = output
        .as_slice()
        .ok_or_else(|| DetectError::UnsupportedOutput("non-contiguous tensor".into()))?;

    let mut detections = Vec::new();

    for anchor in 0..anchors {
        let mut max_score = 0.0f32;
        let mut max_class = 0usize;

        for class in 0..num_classes {
            let score = flat[(4 + class) * anchors + anchor];
            if score > max_score {
                max_score = score;
                max_class = class;
            }
        }

        if max_score < confidence_threshold {
            continue;
        }

        // Box format: (cx, cy, w, h) in letterboxed input pixels.
        let cx = flat[anchor];
        let cy = flat[anchors + anchor];
        let w = flat[2 * anchors + anchor];
        let h = flat[3 * anchors + anchor];

        // Convert to original image coordinates.
        let x1 = ((cx - w / 2.0) - pad_x) / scale;
        let y1 = ((cy - h / 2.0) - pad_y) / scale;
        let x2 = ((cx + w / 2.0) - pad_x) / scale;
        let y2 = ((cy + h / 2.0) - pad_y) / scale;

        let x1 = x1.clamp(0.0, orig_w);
        let y1 = y1.clamp(0.0, orig_h);
        let x2 = x2.clamp(0.0, orig_w);
        let y2 = y2.clamp(0.0, orig_h);

        detections.push(Detection {
            bbox: BBox::new(x1 as f64, y1 as f64, x2 as f64, y2 as f64),
            class_id: max_class,
            confidence: max_score,
        });
    }

    Ok(detections)
}

/// Greedy per-class non-maximum suppression, strongest detection first.
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for det in detections {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == det.class_id && det.bbox.iou(&kept.bbox) > iou_threshold as f64
        });
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, class_id: usize, confidence: f32) -> Detection {
        Detection {
            bbox: BBox::new(x1, y1, x2, y2),
            class_id,
            confidence,
        }
    }

    #[test]
    fn test_class_name_lookup() {
        assert_eq!(class_name(2), "car");
        assert_eq!(class_name(3), "motorcycle");
        assert_eq!(class_name(5), "bus");
        assert_eq!(class_name(7), "truck");
        assert_eq!(class_name(500), "unknown");
    }

    #[test]
    fn test_nms_keeps_strongest_of_overlapping_pair() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 2, 0.6),
            det(1.0, 1.0, 11.0, 11.0, 2, 0.9),
        ];

        let kept = nms(detections, 0.5);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_never_suppresses_across_classes() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 2, 0.9),
            det(0.0, 0.0, 10.0, 10.0, 7, 0.8),
        ];

        let kept = nms(detections, 0.5);

        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_postprocess_extracts_boxes_above_threshold() {
        // Two anchors, 4 + 2 channels: anchor 0 scores 0.9 on class 1, anchor 1
        // stays below threshold.
        let mut data = vec![0.0f32; 6 * 2];
        let anchors = 2;
        // anchor 0 box: cx=100, cy=200, w=40, h=80
        data[0] = 100.0;
        data[anchors] = 200.0;
        data[anchors * 2] = 40.0;
        data[anchors * 3] = 80.0;
        data[anchors * 5] = 0.9; // class 1 score, anchor 0
        data[anchors * 4 + 1] = 0.2; // class 0 score, anchor 1

        let output = ArrayD::from_shape_vec(vec![1, 6, 2], data).unwrap();

        let detections =
            postprocess(&output.view(), 0.4, 1.0, 0.0, 0.0, 640.0, 640.0).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 1);
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[0].bbox, BBox::new(80.0, 160.0, 120.0, 240.0));
    }

    #[test]
    fn test_postprocess_undoes_letterbox() {
        // One anchor centered at (340, 320) in input space with a 20px
        // horizontal pad and 0.5 scale maps back to (640, 640) in the source.
        let mut data = vec![0.0f32; 5];
        data[0] = 340.0;
        data[1] = 320.0;
        data[2] = 40.0;
        data[3] = 80.0;
        data[4] = 0.8;

        let output = ArrayD::from_shape_vec(vec![1, 5, 1], data).unwrap();

        let detections =
            postprocess(&output.view(), 0.4, 0.5, 20.0, 0.0, 1280.0, 720.0).unwrap();

        assert_eq!(detections.len(), 1);
        let bbox = detections[0].bbox;
        assert_eq!((bbox.x1 + bbox.x2) / 2.0, 640.0);
        assert_eq!((bbox.y1 + bbox.y2) / 2.0, 640.0);
    }

    #[test]
    fn test_postprocess_rejects_flat_tensor() {
        let output = ArrayD::from_shape_vec(vec![84], vec![0.0f32; 84]).unwrap();

        assert!(postprocess(&output.view(), 0.4, 1.0, 0.0, 0.0, 640.0, 640.0).is_err());
    }
}
