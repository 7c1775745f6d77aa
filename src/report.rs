use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not write event log: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize event: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
pub struct SessionRecord<'a> {
    pub event: &'static str,
    pub input: &'a str,
    pub output: &'a str,
    pub line_position: i32,
    pub offset: i32,
    pub confidence_threshold: f32,
    pub vehicle_classes: &'a [usize],
    pub max_age: u32,
}

#[derive(Serialize)]
pub struct CountRecord<'a> {
    pub event: &'static str,
    pub frame: u64,
    pub track_id: u32,
    pub class: &'a str,
    pub total: u64,
}

#[derive(Serialize)]
pub struct SummaryRecord<'a> {
    pub event: &'static str,
    pub frames: u64,
    pub total: u64,
    pub output: &'a str,
}

/// Newline-delimited JSON event log, one record per line.
pub struct EventLog {
    writer: BufWriter<File>,
}

impl EventLog {
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}
