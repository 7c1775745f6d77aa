use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc};

use crate::track::Track;

fn box_color() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn line_color() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn total_color() -> Scalar {
    Scalar::new(0.0, 255.0, 255.0, 0.0)
}

pub fn draw_track(frame: &mut Mat, track: &Track) -> Result<(), opencv::Error> {
    let rect = Rect::new(
        track.bbox.x1 as i32,
        track.bbox.y1 as i32,
        (track.bbox.x2 - track.bbox.x1) as i32,
        (track.bbox.y2 - track.bbox.y1) as i32,
    );
    imgproc::rectangle(frame, rect, box_color(), 2, imgproc::LINE_8, 0)?;

    let label = format!("ID: {}", track.id);
    let origin = Point::new(rect.x, (rect.y - 10).max(0));
    imgproc::put_text(
        frame,
        &label,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.7,
        box_color(),
        2,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

pub fn draw_counting_line(frame: &mut Mat, y: i32) -> Result<(), opencv::Error> {
    let width = frame.cols();
    imgproc::line(
        frame,
        Point::new(0, y),
        Point::new(width, y),
        line_color(),
        2,
        imgproc::LINE_8,
        0,
    )
}

pub fn draw_total(frame: &mut Mat, total: u64) -> Result<(), opencv::Error> {
    let text = format!("Total vehicles: {total}");
    imgproc::put_text(
        frame,
        &text,
        Point::new(20, 50),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        total_color(),
        2,
        imgproc::LINE_8,
        false,
    )
}

/// Live preview window. Destroyed on drop so the display resource is released
/// on every exit path.
pub struct PreviewWindow {
    name: String,
}

impl PreviewWindow {
    pub fn open(name: &str) -> Result<Self, opencv::Error> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn show(&self, frame: &Mat) -> Result<(), opencv::Error> {
        highgui::imshow(&self.name, frame)
    }

    /// Polls the window event loop; true when the user pressed `q` or Esc.
    pub fn quit_requested(&self) -> Result<bool, opencv::Error> {
        let key = highgui::wait_key(1)?;
        Ok(key == 27 || key == 113)
    }
}

impl Drop for PreviewWindow {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.name);
    }
}
