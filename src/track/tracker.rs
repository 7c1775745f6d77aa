use crate::detect::Detection;

use super::assign::associate;
use super::bbox::BBox;
use super::kalman::KalmanBoxFilter;

/// A confirmed track as reported to the counting stage.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: u32,
    pub bbox: BBox,
    pub class_id: usize,
}

struct TrackEntry {
    id: u32,
    filter: KalmanBoxFilter,
    bbox: BBox,
    class_id: usize,
    hits: u32,
    time_since_update: u32,
}

impl TrackEntry {
    fn is_confirmed(&self, min_hits: u32) -> bool {
        self.hits >= min_hits
    }
}

/// SORT-style multi-object tracker: per-track constant-velocity Kalman filters
/// associated to detections with Hungarian matching on IoU. Ids increase
/// monotonically and are never reused within a run; an object that expires and
/// is re-detected later comes back under a fresh id.
pub struct SortTracker {
    entries: Vec<TrackEntry>,
    next_id: u32,
    max_age: u32,
    min_hits: u32,
    iou_threshold: f64,
}

impl SortTracker {
    pub fn new(max_age: u32, min_hits: u32, iou_threshold: f64) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            max_age,
            min_hits,
            iou_threshold,
        }
    }

    /// Advances the tracker one frame and returns the confirmed tracks matched
    /// in this frame. Tracks missing from the detection list merely age; after
    /// `max_age` consecutive misses they are dropped for good.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        for entry in &mut self.entries {
            entry.bbox = entry.filter.predict();
            entry.time_since_update += 1;
        }

        let det_boxes: Vec<BBox> = detections.iter().map(|d| d.bbox).collect();
        let det_classes: Vec<usize> = detections.iter().map(|d| d.class_id).collect();
        let trk_boxes: Vec<BBox> = self.entries.iter().map(|e| e.bbox).collect();
        let trk_classes: Vec<usize> = self.entries.iter().map(|e| e.class_id).collect();

        let (matched, unmatched_detections, _) = associate(
            &det_boxes,
            &det_classes,
            &trk_boxes,
            &trk_classes,
            self.iou_threshold,
        );

        for (det_index, trk_index) in matched {
            let entry = &mut self.entries[trk_index];
            entry.filter.update(detections[det_index].bbox);
            entry.bbox = detections[det_index].bbox;
            entry.hits += 1;
            entry.time_since_update = 0;
        }

        for det_index in unmatched_detections {
            let detection = &detections[det_index];
            self.entries.push(TrackEntry {
                id: self.next_id,
                filter: KalmanBoxFilter::new(detection.bbox),
                bbox: detection.bbox,
                class_id: detection.class_id,
                hits: 1,
                time_since_update: 0,
            });
            self.next_id += 1;
        }

        self.entries
            .retain(|entry| entry.time_since_update <= self.max_age);

        self.entries
            .iter()
            .filter(|e| e.time_since_update == 0 && e.is_confirmed(self.min_hits))
            .map(|e| Track {
                id: e.id,
                bbox: e.bbox,
                class_id: e.class_id,
            })
            .collect()
    }
}
