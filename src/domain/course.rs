use serde::Serialize;
use std::path::PathBuf;

/// Container format of a lesson video, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
  Mp4,
  Mkv,
  Webm,
  Mov,
  M4v,
  Avi,
  Other,
}

impl MediaType {
  pub fn from_extension(ext: &str) -> Self {
    match ext.to_ascii_lowercase().as_str() {
      "mp4" => Self::Mp4,
      "mkv" => Self::Mkv,
      "webm" => Self::Webm,
      "mov" => Self::Mov,
      "m4v" => Self::M4v,
      "avi" => Self::Avi,
      _ => Self::Other,
    }
  }

  pub fn mime(&self) -> &'static str {
    match self {
      Self::Mp4 => "video/mp4",
      Self::Mkv => "video/x-matroska",
      Self::Webm => "video/webm",
      Self::Mov => "video/quicktime",
      Self::M4v => "video/x-m4v",
      Self::Avi => "video/x-msvideo",
      Self::Other => "application/octet-stream",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Lesson {
  /// Path relative to the course folder, `/`-separated. Used as the progress key.
  pub id: String,
  pub file_name: String,
  pub title: String,
  pub path: PathBuf,
  pub media_type: MediaType,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
  /// Raw folder name. Empty for videos placed directly in the course folder.
  pub id: String,
  pub title: String,
  pub path: PathBuf,
  pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
  /// Raw folder name under the library root
  pub id: String,
  pub title: String,
  pub path: PathBuf,
  pub sections: Vec<Section>,
}

impl Course {
  /// All lessons in playback order.
  pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
    self.sections.iter().flat_map(|s| s.lessons.iter())
  }

  pub fn lesson_count(&self) -> usize {
    self.sections.iter().map(|s| s.lessons.len()).sum()
  }

  pub fn find_lesson(&self, lesson_id: &str) -> Option<&Lesson> {
    self.lessons().find(|l| l.id == lesson_id)
  }

  /// Returns the lessons immediately before and after `lesson_id` in playback order.
  pub fn neighbours(&self, lesson_id: &str) -> (Option<&Lesson>, Option<&Lesson>) {
    let lessons: Vec<&Lesson> = self.lessons().collect();
    match lessons.iter().position(|l| l.id == lesson_id) {
      Some(idx) => {
        let prev = idx.checked_sub(1).map(|i| lessons[i]);
        let next = lessons.get(idx + 1).copied();
        (prev, next)
      }
      None => (None, None),
    }
  }
}

/// Counters collected while walking the library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
  pub courses_seen: usize,
  pub sections_seen: usize,
  pub lessons_seen: usize,
  /// Course or section folders that could not be read
  pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Library {
  pub courses: Vec<Course>,
  pub stats: ScanStats,
}

impl Library {
  pub fn find_course(&self, course_id: &str) -> Option<&Course> {
    self.courses.iter().find(|c| c.id == course_id)
  }

  pub fn contains_lesson(&self, course_id: &str, lesson_id: &str) -> bool {
    self
      .find_course(course_id)
      .is_some_and(|c| c.find_lesson(lesson_id).is_some())
  }
}
