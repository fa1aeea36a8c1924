//! Course library derived from the folder layout on disk.

pub mod natural;
pub mod scanner;
pub mod title;

pub use natural::{natural_cmp, sort_naturally, NaturalKey};
pub use scanner::{scan_course, scan_library, ScanError, ScanOptions, DEFAULT_VIDEO_EXTENSIONS};
pub use title::{folder_title, lesson_title, strip_index_prefix};
