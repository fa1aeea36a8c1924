pub mod course;
pub mod progress;

pub use course::{Course, Lesson, Library, MediaType, ScanStats, Section};
pub use progress::{Progress, ProgressUpdate};
