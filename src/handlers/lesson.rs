use askama::Template;
use axum::{
  body::Body,
  extract::{Path, Request, State},
  response::{Html, IntoResponse, Response},
};
use tower_http::services::ServeFile;

use super::{course_href, lesson_href, progress_api_href, video_href, AppError};
use crate::db::{self, LogOnError};
use crate::domain::{Course, Lesson};
use crate::filters;
use crate::state::AppState;

/// Link to a neighbouring lesson
pub struct NavLink {
  pub title: String,
  pub href: String,
}

#[derive(Template)]
#[template(path = "lesson.html")]
pub struct LessonTemplate {
  pub course_title: String,
  pub course_href: String,
  pub section_title: String,
  pub lesson_title: String,
  pub video_href: String,
  pub mime: &'static str,
  pub progress_href: String,
  pub resume_seconds: f64,
  pub completed: bool,
  pub prev: Option<NavLink>,
  pub next: Option<NavLink>,
}

fn nav_link(course: &Course, lesson: Option<&Lesson>) -> Option<NavLink> {
  lesson.map(|l| NavLink {
    title: l.title.clone(),
    href: lesson_href(&course.id, &l.id),
  })
}

/// Scan the course and locate a lesson in it.
fn find_lesson(state: &AppState, course_id: &str, lesson_id: &str) -> Result<(Course, Lesson), AppError> {
  let course = state
    .scan_course(course_id)?
    .ok_or(AppError::NotFound("course"))?;
  let lesson = course
    .find_lesson(lesson_id)
    .cloned()
    .ok_or(AppError::NotFound("lesson"))?;
  Ok((course, lesson))
}

/// Player page for a single lesson
pub async fn lesson_page(
  State(state): State<AppState>,
  Path((course_id, lesson_id)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
  let (course, lesson) = find_lesson(&state, &course_id, &lesson_id)?;

  let progress = {
    let conn = state.conn()?;
    db::get_progress(&conn, &course.id, &lesson.id).log_warn("Failed to load lesson progress").flatten()
  };

  let section_title = course
    .sections
    .iter()
    .find(|s| s.lessons.iter().any(|l| l.id == lesson.id))
    .map(|s| s.title.clone())
    .unwrap_or_default();

  let (prev, next) = course.neighbours(&lesson.id);

  let template = LessonTemplate {
    course_title: course.title.clone(),
    course_href: course_href(&course.id),
    section_title,
    lesson_title: lesson.title.clone(),
    video_href: video_href(&course.id, &lesson.id),
    mime: lesson.media_type.mime(),
    progress_href: progress_api_href(&course.id, &lesson.id),
    // Completed lessons restart from the beginning
    resume_seconds: progress
      .as_ref()
      .filter(|p| !p.completed)
      .map(|p| p.position_seconds)
      .unwrap_or(0.0),
    completed: progress.as_ref().is_some_and(|p| p.completed),
    prev: nav_link(&course, prev),
    next: nav_link(&course, next),
  };

  Ok(Html(template.render().unwrap_or_default()))
}

/// Serve a lesson's video file, honouring `Range` requests.
///
/// Only files the scanner reports as lessons are served, so the URL can
/// never reach outside the courses root.
pub async fn video(
  State(state): State<AppState>,
  Path((course_id, lesson_id)): Path<(String, String)>,
  request: Request,
) -> Result<Response, AppError> {
  let (_, lesson) = find_lesson(&state, &course_id, &lesson_id)?;

  let response = ServeFile::new(&lesson.path).try_call(request).await?;
  Ok(response.map(Body::new).into_response())
}
