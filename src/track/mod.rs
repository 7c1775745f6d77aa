mod assign;
mod bbox;
mod kalman;
mod tracker;

pub use bbox::BBox;
pub use tracker::{SortTracker, Track};
