use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted watch state for one lesson of one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
  pub course_id: String,
  pub lesson_id: String,
  /// Last playback position in seconds
  pub position_seconds: f64,
  pub completed: bool,
  pub updated_at: DateTime<Utc>,
}

impl Progress {
  pub fn is_started(&self) -> bool {
    self.completed || self.position_seconds > 0.0
  }

  /// Position formatted as `m:ss` or `h:mm:ss`.
  pub fn position_label(&self) -> String {
    format_position(self.position_seconds)
  }
}

/// A playback event reported by the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ProgressUpdate {
  #[serde(default)]
  pub position_seconds: f64,
  /// `true` marks the lesson watched. `false` leaves an earlier completion untouched.
  #[serde(default)]
  pub completed: bool,
}

impl ProgressUpdate {
  pub fn at(position_seconds: f64) -> Self {
    Self {
      position_seconds,
      completed: false,
    }
  }

  pub fn completed(position_seconds: f64) -> Self {
    Self {
      position_seconds,
      completed: true,
    }
  }

  /// Negative and non-finite positions collapse to zero.
  pub fn clamped_position(&self) -> f64 {
    if self.position_seconds.is_finite() {
      self.position_seconds.max(0.0)
    } else {
      0.0
    }
  }
}

pub fn format_position(seconds: f64) -> String {
  let total = if seconds.is_finite() && seconds > 0.0 {
    seconds.floor() as u64
  } else {
    0
  };
  let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
  if h > 0 {
    format!("{}:{:02}:{:02}", h, m, s)
  } else {
    format!("{}:{:02}", m, s)
  }
}
