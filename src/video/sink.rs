use std::path::{Path, PathBuf};

use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio::{self, VideoWriter};

use super::VideoError;

/// Sibling output path for an input video: `videos/traffic.mp4` becomes
/// `videos/traffic_counted.mp4`.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_counted.mp4"))
}

/// Encoded output stream with the same dimensions and frame rate as the
/// source. The writer is released on drop on every exit path.
pub struct VideoSink {
    writer: VideoWriter,
    path: PathBuf,
}

impl VideoSink {
    pub fn create(path: PathBuf, fps: f64, width: i32, height: i32) -> Result<Self, VideoError> {
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            fps,
            Size::new(width, height),
            true,
        )?;
        if !writer.is_opened()? {
            return Err(VideoError::OpenSink(path.display().to_string()));
        }

        Ok(Self { writer, path })
    }

    pub fn write(&mut self, frame: &Mat) -> Result<(), VideoError> {
        self.writer.write(frame)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
