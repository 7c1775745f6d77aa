use std::collections::HashSet;

use pathfinding::prelude::{kuhn_munkres_min, Matrix};

use super::bbox::BBox;

// The Hungarian solver works on integer weights, so IoU scores are scaled to
// fixed point before negation.
const IOU_MULTIPLIER: f64 = 10000.0;
const CLASS_MISMATCH_COST: i64 = (100.0 * IOU_MULTIPLIER) as i64;

/// Assigns detections to track predictions by maximum total IoU.
///
/// Returns `(matched, unmatched_detections, unmatched_tracks)` where `matched`
/// holds `(detection_index, track_index)` pairs. Assignments whose IoU falls
/// below `iou_threshold` or whose classes differ are rejected and reported as
/// unmatched on both sides.
pub fn associate(
    det_boxes: &[BBox],
    det_classes: &[usize],
    trk_boxes: &[BBox],
    trk_classes: &[usize],
    iou_threshold: f64,
) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
    let rows = det_boxes.len();
    let columns = trk_boxes.len();

    if rows == 0 || columns == 0 {
        return (
            Vec::new(),
            (0..rows).collect(),
            (0..columns).collect(),
        );
    }

    let mut iou_matrix = Matrix::new(rows, columns, 0i64);
    for (i, det) in det_boxes.iter().enumerate() {
        for (j, trk) in trk_boxes.iter().enumerate() {
            iou_matrix[(i, j)] = -(det.iou(trk) * IOU_MULTIPLIER) as i64;
        }
    }

    let mut cost_matrix = iou_matrix.clone();
    for i in 0..rows {
        for j in 0..columns {
            if det_classes[i] != trk_classes[j] {
                cost_matrix[(i, j)] += CLASS_MISMATCH_COST;
            }
        }
    }

    // kuhn_munkres requires rows <= columns.
    let transpose = rows > columns;
    let transposed;
    let weights = if transpose {
        transposed = cost_matrix.transposed();
        &transposed
    } else {
        &cost_matrix
    };

    let assignment = kuhn_munkres_min(weights).1;
    let assigned: HashSet<usize> = assignment.iter().copied().collect();

    let mut unmatched_detections: Vec<usize> = if transpose {
        (0..rows).filter(|i| !assigned.contains(i)).collect()
    } else {
        Vec::new()
    };
    let mut unmatched_tracks: Vec<usize> = if transpose {
        Vec::new()
    } else {
        (0..columns).filter(|j| !assigned.contains(j)).collect()
    };

    let mut matched = Vec::new();
    for (row, &column) in assignment.iter().enumerate() {
        let (det, trk) = if transpose {
            (column, row)
        } else {
            (row, column)
        };

        let invalid_iou = -iou_matrix[(det, trk)] < (iou_threshold * IOU_MULTIPLIER) as i64;
        let invalid_class = det_classes[det] != trk_classes[trk];

        if invalid_iou || invalid_class {
            unmatched_detections.push(det);
            unmatched_tracks.push(trk);
            continue;
        }
        matched.push((det, trk));
    }

    (matched, unmatched_detections, unmatched_tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_pair_matches_extra_detection_stays_unmatched() {
        let det_boxes = vec![BBox::new(0.0, 0.0, 1.0, 1.0), BBox::new(2.0, 3.0, 4.0, 4.0)];
        let det_classes = vec![2, 2];
        let trk_boxes = vec![BBox::new(0.5, 0.0, 1.5, 1.0)];
        let trk_classes = vec![2];

        let (matched, unmatched_dets, unmatched_trks) =
            associate(&det_boxes, &det_classes, &trk_boxes, &trk_classes, 0.3);

        assert_eq!(matched, vec![(0, 0)]);
        assert_eq!(unmatched_dets, vec![1]);
        assert_eq!(unmatched_trks, Vec::<usize>::new());
    }

    #[test]
    fn test_low_iou_assignment_is_rejected() {
        let det_boxes = vec![BBox::new(0.0, 0.0, 1.0, 1.0)];
        let det_classes = vec![2];
        let trk_boxes = vec![BBox::new(0.9, 0.9, 1.9, 1.9)];
        let trk_classes = vec![2];

        let (matched, unmatched_dets, unmatched_trks) =
            associate(&det_boxes, &det_classes, &trk_boxes, &trk_classes, 0.3);

        assert!(matched.is_empty());
        assert_eq!(unmatched_dets, vec![0]);
        assert_eq!(unmatched_trks, vec![0]);
    }

    #[test]
    fn test_class_mismatch_is_rejected_despite_perfect_overlap() {
        let det_boxes = vec![BBox::new(0.0, 0.0, 2.0, 2.0)];
        let det_classes = vec![2];
        let trk_boxes = vec![BBox::new(0.0, 0.0, 2.0, 2.0)];
        let trk_classes = vec![7];

        let (matched, unmatched_dets, unmatched_trks) =
            associate(&det_boxes, &det_classes, &trk_boxes, &trk_classes, 0.3);

        assert!(matched.is_empty());
        assert_eq!(unmatched_dets, vec![0]);
        assert_eq!(unmatched_trks, vec![0]);
    }

    #[test]
    fn test_more_detections_than_tracks_takes_transposed_path() {
        let det_boxes = vec![
            BBox::new(100.0, 100.0, 120.0, 120.0),
            BBox::new(0.0, 0.0, 2.0, 2.0),
            BBox::new(50.0, 50.0, 60.0, 60.0),
        ];
        let det_classes = vec![2, 2, 2];
        let trk_boxes = vec![BBox::new(0.1, 0.0, 2.1, 2.0)];
        let trk_classes = vec![2];

        let (matched, mut unmatched_dets, unmatched_trks) =
            associate(&det_boxes, &det_classes, &trk_boxes, &trk_classes, 0.3);

        unmatched_dets.sort_unstable();
        assert_eq!(matched, vec![(1, 0)]);
        assert_eq!(unmatched_dets, vec![0, 2]);
        assert_eq!(unmatched_trks, Vec::<usize>::new());
    }

    #[test]
    fn test_empty_inputs_report_everything_unmatched() {
        let (matched, unmatched_dets, unmatched_trks) =
            associate(&[], &[], &[BBox::new(0.0, 0.0, 1.0, 1.0)], &[2], 0.3);

        assert!(matched.is_empty());
        assert!(unmatched_dets.is_empty());
        assert_eq!(unmatched_trks, vec![0]);
    }
}
