pub mod api;
pub mod courses;
pub mod error;
pub mod lesson;

use axum::{
  routing::{get, post},
  Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

pub use api::{clear_lesson_progress, get_lesson_progress, list_courses, prune_progress, save_lesson_progress};
pub use courses::{course_page, index};
pub use error::{ApiError, AppError};
pub use lesson::{lesson_page, video};

/// Folder holding CSS and JS assets
pub const STATIC_DIR: &str = "static";

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(index))
    .route("/course/{course}", get(course_page))
    .route("/course/{course}/lesson/{*lesson}", get(lesson_page))
    .route("/video/{course}/{*lesson}", get(video))
    .route("/api/courses", get(list_courses))
    .route(
      "/api/progress/{course}/{*lesson}",
      get(get_lesson_progress)
        .post(save_lesson_progress)
        .delete(clear_lesson_progress),
    )
    .route("/api/maintenance/prune-progress", post(prune_progress))
    .nest_service("/static", ServeDir::new(STATIC_DIR))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ==================== URL helpers ====================

/// Percent-encode each `/`-separated segment of a lesson id.
fn encode_lesson_id(lesson_id: &str) -> String {
  lesson_id
    .split('/')
    .map(|segment| urlencoding::encode(segment).into_owned())
    .collect::<Vec<_>>()
    .join("/")
}

pub fn course_href(course_id: &str) -> String {
  format!("/course/{}", urlencoding::encode(course_id))
}

pub fn lesson_href(course_id: &str, lesson_id: &str) -> String {
  format!("{}/lesson/{}", course_href(course_id), encode_lesson_id(lesson_id))
}

pub fn video_href(course_id: &str, lesson_id: &str) -> String {
  format!("/video/{}/{}", urlencoding::encode(course_id), encode_lesson_id(lesson_id))
}

pub fn progress_api_href(course_id: &str, lesson_id: &str) -> String {
  format!("/api/progress/{}/{}", urlencoding::encode(course_id), encode_lesson_id(lesson_id))
}
