//! JSON endpoints used by the player script and for scripting.

use axum::{
  extract::{Path, State},
  Json,
};
use serde::Serialize;

use super::{ApiError, AppError};
use crate::db;
use crate::domain::{Library, Progress, ProgressUpdate};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Removed<T> {
  pub removed: T,
}

/// The scanned course hierarchy
pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Library>, ApiError> {
  Ok(Json(state.scan_library()?))
}

/// Stored progress for a lesson, `null` when it was never played
pub async fn get_lesson_progress(
  State(state): State<AppState>,
  Path((course_id, lesson_id)): Path<(String, String)>,
) -> Result<Json<Option<Progress>>, ApiError> {
  let conn = state.conn()?;
  Ok(Json(db::get_progress(&conn, &course_id, &lesson_id)?))
}

/// Record a playback event for a lesson that exists on disk
pub async fn save_lesson_progress(
  State(state): State<AppState>,
  Path((course_id, lesson_id)): Path<(String, String)>,
  Json(update): Json<ProgressUpdate>,
) -> Result<Json<Progress>, ApiError> {
  let course = state
    .scan_course(&course_id)?
    .ok_or(AppError::NotFound("course"))?;
  if course.find_lesson(&lesson_id).is_none() {
    return Err(AppError::NotFound("lesson").into());
  }

  let conn = state.conn()?;
  let progress = db::set_progress(&conn, &course.id, &lesson_id, &update)?;
  tracing::debug!(
    "Progress {}/{}: {:.1}s completed={}",
    course.id,
    lesson_id,
    progress.position_seconds,
    progress.completed
  );
  Ok(Json(progress))
}

/// Mark a lesson unwatched by forgetting its progress
pub async fn clear_lesson_progress(
  State(state): State<AppState>,
  Path((course_id, lesson_id)): Path<(String, String)>,
) -> Result<Json<Removed<bool>>, ApiError> {
  let conn = state.conn()?;
  let removed = db::clear_progress(&conn, &course_id, &lesson_id)?;
  Ok(Json(Removed { removed }))
}

/// Delete progress for lessons that are no longer on disk.
///
/// Refuses to run when the library cannot be scanned in full.
pub async fn prune_progress(State(state): State<AppState>) -> Result<Json<Removed<usize>>, ApiError> {
  let library = state.scan_library()?;
  if library.stats.skipped > 0 {
    return Err(AppError::IncompleteScan(library.stats.skipped).into());
  }
  let conn = state.conn()?;
  let removed = db::delete_orphaned_progress(&conn, &library)?;
  Ok(Json(Removed { removed }))
}
