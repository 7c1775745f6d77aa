use std::path::Path;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio;

use super::VideoError;

/// A decoded video file as a lazy, finite sequence of frames. Restartable only
/// by opening a new source; the capture is released on drop on every exit path.
pub struct VideoSource {
    capture: videoio::VideoCapture,
    width: i32,
    height: i32,
    fps: f64,
}

impl VideoSource {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let path_str = path.to_string_lossy();
        let capture = videoio::VideoCapture::from_file(&path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(VideoError::OpenSource(path.display().to_string()));
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let fps = if fps > 0.0 { fps } else { 30.0 };

        Ok(Self {
            capture,
            width,
            height,
            fps,
        })
    }

    /// Next frame of the stream, `None` once the stream is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Mat>, VideoError> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}
