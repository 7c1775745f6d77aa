mod overlay;
mod sink;
mod source;

use thiserror::Error;

pub use overlay::{draw_counting_line, draw_total, draw_track, PreviewWindow};
pub use sink::{derive_output_path, VideoSink};
pub use source::VideoSource;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("could not open video source {0}")]
    OpenSource(String),
    #[error("could not create video writer for {0}")]
    OpenSink(String),
    #[error("video backend error: {0}")]
    Cv(#[from] opencv::Error),
}
