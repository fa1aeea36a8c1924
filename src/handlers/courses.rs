use std::collections::{HashMap, HashSet};

use askama::Template;
use axum::{
  extract::{Path, Query, State},
  response::Html,
};
use serde::Deserialize;

use super::{course_href, lesson_href, AppError};
use crate::config;
use crate::db::{self, LogOnError};
use crate::domain::{Course, Library, Progress, ScanStats};
use crate::filters;
use crate::state::AppState;

/// A course entry on the home page
pub struct CourseCard {
  pub title: String,
  pub href: String,
  pub section_count: usize,
  pub lesson_count: usize,
  pub completed_count: usize,
  pub percent: usize,
}

/// A lesson under "Continue watching"
pub struct RecentLesson {
  pub course_title: String,
  pub lesson_title: String,
  pub href: String,
  pub position: String,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
  pub courses: Vec<CourseCard>,
  pub recent: Vec<RecentLesson>,
  pub q: String,
  pub courses_dir: String,
  pub scan_error: Option<String>,
  pub stats: ScanStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
  pub q: Option<String>,
}

fn percent(done: usize, total: usize) -> usize {
  if total == 0 { 0 } else { done * 100 / total }
}

fn matches_query(course: &Course, query: &str) -> bool {
  let query = query.to_lowercase();
  course.title.to_lowercase().contains(&query) || course.id.to_lowercase().contains(&query)
}

fn recent_lessons(library: &Library, recent: Vec<Progress>) -> Vec<RecentLesson> {
  recent
    .into_iter()
    .filter_map(|p| {
      let course = library.find_course(&p.course_id)?;
      let lesson = course.find_lesson(&p.lesson_id)?;
      Some(RecentLesson {
        course_title: course.title.clone(),
        lesson_title: lesson.title.clone(),
        href: lesson_href(&course.id, &lesson.id),
        position: p.position_label(),
      })
    })
    .take(config::RECENT_LESSONS_LIMIT)
    .collect()
}

/// Course list page
pub async fn index(
  State(state): State<AppState>,
  Query(query): Query<HomeQuery>,
) -> Result<Html<String>, AppError> {
  let q = query.q.map(|q| q.trim().to_string()).unwrap_or_default();

  // A failed scan still renders the page, with the reason instead of courses
  let (library, scan_error) = match state.scan_library() {
    Ok(library) => (library, None),
    Err(e) => {
      tracing::warn!("Library scan failed: {}", e);
      (Library::default(), Some(e.user_message().to_string()))
    }
  };

  let (completed, recent): (HashSet<(String, String)>, Vec<Progress>) = {
    let conn = state.conn()?;
    (
      db::get_completed_lessons(&conn).log_warn_default("Failed to load completed lessons"),
      // Fetch extra rows, some may point at lessons that no longer exist
      db::get_recent_progress(&conn, config::RECENT_LESSONS_LIMIT * 4)
        .log_warn_default("Failed to load recent progress"),
    )
  };

  let courses = library
    .courses
    .iter()
    .filter(|c| q.is_empty() || matches_query(c, &q))
    .map(|course| {
      let lesson_count = course.lesson_count();
      let completed_count = course
        .lessons()
        .filter(|l| completed.contains(&(course.id.clone(), l.id.clone())))
        .count();
      CourseCard {
        title: course.title.clone(),
        href: course_href(&course.id),
        section_count: course.sections.len(),
        lesson_count,
        completed_count,
        percent: percent(completed_count, lesson_count),
      }
    })
    .collect();

  let template = HomeTemplate {
    courses,
    recent: if q.is_empty() { recent_lessons(&library, recent) } else { Vec::new() },
    q,
    courses_dir: state.settings.courses_dir.display().to_string(),
    scan_error,
    stats: library.stats,
  };

  Ok(Html(template.render().unwrap_or_default()))
}

/// A lesson row on the course page
pub struct LessonRow {
  pub title: String,
  pub href: String,
  /// "watched", "started" or "new"
  pub status: &'static str,
  pub position: Option<String>,
}

pub struct SectionView {
  pub title: String,
  pub lessons: Vec<LessonRow>,
  pub completed_count: usize,
}

#[derive(Template)]
#[template(path = "course.html")]
pub struct CourseTemplate {
  pub title: String,
  pub sections: Vec<SectionView>,
  pub lesson_count: usize,
  pub completed_count: usize,
  pub percent: usize,
  pub continue_href: Option<String>,
  pub continue_label: String,
}

fn lesson_row(course_id: &str, lesson: &crate::domain::Lesson, progress: Option<&Progress>) -> LessonRow {
  let status = match progress {
    Some(p) if p.completed => "watched",
    Some(p) if p.is_started() => "started",
    _ => "new",
  };
  LessonRow {
    title: lesson.title.clone(),
    href: lesson_href(course_id, &lesson.id),
    status,
    position: progress
      .filter(|p| !p.completed && p.is_started())
      .map(Progress::position_label),
  }
}

/// Course page: sections, lessons and their watch state
pub async fn course_page(
  State(state): State<AppState>,
  Path(course_id): Path<String>,
) -> Result<Html<String>, AppError> {
  let course = state
    .scan_course(&course_id)?
    .ok_or(AppError::NotFound("course"))?;

  let progress: HashMap<String, Progress> = {
    let conn = state.conn()?;
    db::get_course_progress(&conn, &course.id)?
  };

  let sections: Vec<SectionView> = course
    .sections
    .iter()
    .map(|section| {
      let lessons: Vec<LessonRow> = section
        .lessons
        .iter()
        .map(|l| lesson_row(&course.id, l, progress.get(&l.id)))
        .collect();
      SectionView {
        title: section.title.clone(),
        completed_count: lessons.iter().filter(|l| l.status == "watched").count(),
        lessons,
      }
    })
    .collect();

  let lesson_count = course.lesson_count();
  let completed_count: usize = sections.iter().map(|s| s.completed_count).sum();

  // Resume at the first lesson not yet watched
  let next_up = course
    .lessons()
    .find(|l| !progress.get(&l.id).is_some_and(|p| p.completed));
  let continue_label = match next_up {
    Some(l) if progress.get(&l.id).is_some_and(Progress::is_started) => "Resume",
    Some(_) if completed_count > 0 => "Continue",
    _ => "Start",
  };

  let template = CourseTemplate {
    title: course.title.clone(),
    continue_href: next_up.map(|l| lesson_href(&course.id, &l.id)),
    continue_label: continue_label.to_string(),
    sections,
    lesson_count,
    completed_count,
    percent: percent(completed_count, lesson_count),
  };

  Ok(Html(template.render().unwrap_or_default()))
}
