use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::config::Config;
use crate::counter::CrossingCounter;
use crate::detect::{self, DetectError, Detection, ObjectDetector};
use crate::report::{CountRecord, EventLog, ReportError, SessionRecord, SummaryRecord};
use crate::track::SortTracker;
use crate::video::{
    derive_output_path, draw_counting_line, draw_total, draw_track, PreviewWindow, VideoError,
    VideoSink, VideoSource,
};

const PROGRESS_LOG_INTERVAL: u64 = 30;
const PREVIEW_WINDOW_NAME: &str = "countline";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Video(#[from] VideoError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("overlay drawing failed: {0}")]
    Draw(#[from] opencv::Error),
}

pub struct RunOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub headless: bool,
    pub log_json: Option<PathBuf>,
    pub config: Config,
}

pub struct RunSummary {
    pub total_count: u64,
    pub frames: u64,
    pub output_path: PathBuf,
}

/// Processes the input video frame by frame: detect, filter, track, count,
/// draw, record. Runs synchronously until end of stream, a quit key press, or
/// the shutdown flag; any per-frame failure aborts the run and all resources
/// (capture, writer, window) are released on the way out.
pub fn run(options: RunOptions, shutdown: &AtomicBool) -> Result<RunSummary, PipelineError> {
    let RunOptions {
        input,
        output,
        headless,
        log_json,
        config,
    } = options;

    tracing::info!(model = %config.detector.model, "loading detection model");
    let mut detector = ObjectDetector::new(
        &config.detector.model,
        config.detector.confidence_threshold,
        config.detector.nms_iou,
    )?;

    let mut source = VideoSource::open(&input)?;
    tracing::info!(
        input = %input.display(),
        width = source.width(),
        height = source.height(),
        fps = format!("{:.1}", source.fps()),
        "opened video source"
    );

    let output_path = output.unwrap_or_else(|| derive_output_path(&input));
    let mut sink = VideoSink::create(
        output_path.clone(),
        source.fps(),
        source.width(),
        source.height(),
    )?;

    let line_position = config
        .counting
        .line_position
        .unwrap_or(source.height() / 2);
    let mut counter = CrossingCounter::new(line_position, config.counting.offset);
    let mut tracker = SortTracker::new(
        config.tracker.max_age,
        config.tracker.min_hits,
        config.tracker.iou_threshold,
    );

    let mut event_log = match &log_json {
        Some(path) => Some(EventLog::create(path)?),
        None => None,
    };
    if let Some(log) = event_log.as_mut() {
        let input_str = input.display().to_string();
        let output_str = output_path.display().to_string();
        log.write_event(&SessionRecord {
            event: "session_start",
            input: &input_str,
            output: &output_str,
            line_position,
            offset: config.counting.offset,
            confidence_threshold: config.detector.confidence_threshold,
            vehicle_classes: &config.detector.vehicle_classes,
            max_age: config.tracker.max_age,
        })?;
        log.flush()?;
    }

    let window = if headless {
        None
    } else {
        match PreviewWindow::open(PREVIEW_WINDOW_NAME) {
            Ok(window) => Some(window),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open preview window, continuing headless");
                None
            }
        }
    };

    let mut frames: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        let Some(mut frame) = source.next_frame()? else {
            tracing::info!("end of stream reached");
            break;
        };
        frames += 1;

        if frames % PROGRESS_LOG_INTERVAL == 0 {
            tracing::debug!(frame = frames, total = counter.total(), "processing");
        }

        let detections = detector.detect(&frame)?;
        let vehicles = filter_vehicles(
            detections,
            &config.detector.vehicle_classes,
            config.detector.confidence_threshold,
        );
        let tracks = tracker.update(&vehicles);

        for track in &tracks {
            draw_track(&mut frame, track)?;

            if counter.observe(track.id, track.bbox.centroid_y() as i32) {
                tracing::info!(
                    track = track.id,
                    class = detect::class_name(track.class_id),
                    total = counter.total(),
                    "vehicle counted"
                );
                if let Some(log) = event_log.as_mut() {
                    log.write_event(&CountRecord {
                        event: "count",
                        frame: frames,
                        track_id: track.id,
                        class: detect::class_name(track.class_id),
                        total: counter.total(),
                    })?;
                }
            }
        }

        draw_counting_line(&mut frame, counter.line_position())?;
        draw_total(&mut frame, counter.total())?;
        sink.write(&frame)?;

        if let Some(window) = &window {
            window.show(&frame)?;
            if window.quit_requested()? {
                tracing::info!("stopped by user");
                break;
            }
        }
    }

    if let Some(log) = event_log.as_mut() {
        let output_str = output_path.display().to_string();
        log.write_event(&SummaryRecord {
            event: "summary",
            frames,
            total: counter.total(),
            output: &output_str,
        })?;
        log.flush()?;
    }

    Ok(RunSummary {
        total_count: counter.total(),
        frames,
        output_path,
    })
}

/// Keeps detections whose class is on the vehicle allow-list and whose score
/// clears the confidence threshold; everything else never reaches the tracker.
fn filter_vehicles(
    detections: Vec<Detection>,
    allowed_classes: &[usize],
    min_confidence: f32,
) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| allowed_classes.contains(&d.class_id) && d.confidence > min_confidence)
        .collect()
}
