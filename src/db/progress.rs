//! Per-lesson watch progress.
//!
//! One row per `(course_id, lesson_id)`. Course ids are raw course folder
//! names and lesson ids are course-relative file paths, exactly as produced
//! by the library scanner.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Result, Row};

use crate::domain::{Library, Progress, ProgressUpdate};

const PROGRESS_COLUMNS: &str = "course_id, lesson_id, position_seconds, completed, updated_at";

fn parse_timestamp(idx: usize, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_progress(row: &Row) -> Result<Progress> {
    let updated_at: String = row.get(4)?;
    Ok(Progress {
        course_id: row.get(0)?,
        lesson_id: row.get(1)?,
        position_seconds: row.get(2)?,
        completed: row.get(3)?,
        updated_at: parse_timestamp(4, &updated_at)?,
    })
}

/// Get the stored progress for one lesson, if any.
pub fn get_progress(conn: &Connection, course_id: &str, lesson_id: &str) -> Result<Option<Progress>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM progress WHERE course_id = ?1 AND lesson_id = ?2",
        PROGRESS_COLUMNS
    ))?;

    let mut rows = stmt.query(params![course_id, lesson_id])?;
    if let Some(row) = rows.next()? {
        Ok(Some(row_to_progress(row)?))
    } else {
        Ok(None)
    }
}

/// Record a playback event, inserting or updating the lesson's row.
///
/// The position always replaces the stored one. Completion is sticky:
/// an update with `completed: false` keeps an earlier completion.
pub fn set_progress(
    conn: &Connection,
    course_id: &str,
    lesson_id: &str,
    update: &ProgressUpdate,
) -> Result<Progress> {
    // Fixed width so `ORDER BY updated_at` is chronological
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    conn.query_row(
        &format!(
            r#"
            INSERT INTO progress (course_id, lesson_id, position_seconds, completed, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(course_id, lesson_id) DO UPDATE SET
                position_seconds = excluded.position_seconds,
                completed = progress.completed OR excluded.completed,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            PROGRESS_COLUMNS
        ),
        params![course_id, lesson_id, update.clamped_position(), update.completed, now],
        row_to_progress,
    )
}

/// Forget a lesson's progress. Returns whether a row existed.
pub fn clear_progress(conn: &Connection, course_id: &str, lesson_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM progress WHERE course_id = ?1 AND lesson_id = ?2",
        params![course_id, lesson_id],
    )?;
    Ok(deleted > 0)
}

/// All progress rows for a course, keyed by lesson id.
pub fn get_course_progress(conn: &Connection, course_id: &str) -> Result<HashMap<String, Progress>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM progress WHERE course_id = ?1",
        PROGRESS_COLUMNS
    ))?;

    let rows = stmt
        .query_map(params![course_id], row_to_progress)?
        .collect::<Result<Vec<_>>>()?;

    Ok(rows.into_iter().map(|p| (p.lesson_id.clone(), p)).collect())
}

/// `(course_id, lesson_id)` of every completed lesson.
pub fn get_completed_lessons(conn: &Connection) -> Result<HashSet<(String, String)>> {
    let mut stmt = conn.prepare("SELECT course_id, lesson_id FROM progress WHERE completed = 1")?;

    let completed = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<HashSet<_>>>()?;
    Ok(completed)
}

/// Most recently touched unfinished lessons, newest first.
pub fn get_recent_progress(conn: &Connection, limit: usize) -> Result<Vec<Progress>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM progress WHERE completed = 0 ORDER BY updated_at DESC LIMIT ?1",
        PROGRESS_COLUMNS
    ))?;

    let rows = stmt
        .query_map(params![limit as i64], row_to_progress)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Delete rows whose course or lesson is no longer in `library`.
///
/// Only run on request; a scan that misses a temporarily unmounted drive
/// would otherwise wipe its progress. Nothing is deleted when the scan
/// skipped unreadable folders, since their lessons are absent from `library`.
pub fn delete_orphaned_progress(conn: &Connection, library: &Library) -> Result<usize> {
    if library.stats.skipped > 0 {
        tracing::warn!(
            "Not pruning progress: {} folders could not be read",
            library.stats.skipped
        );
        return Ok(0);
    }

    let known: HashSet<(&str, &str)> = library
        .courses
        .iter()
        .flat_map(|c| c.lessons().map(move |l| (c.id.as_str(), l.id.as_str())))
        .collect();

    let tx = conn.unchecked_transaction()?;
    let orphans: Vec<(String, String)> = {
        let mut stmt = tx.prepare("SELECT course_id, lesson_id FROM progress")?;
        stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|(c, l)| !known.contains(&(c.as_str(), l.as_str())))
            .collect()
    };

    for (course_id, lesson_id) in &orphans {
        tx.execute(
            "DELETE FROM progress WHERE course_id = ?1 AND lesson_id = ?2",
            params![course_id, lesson_id],
        )?;
    }
    tx.commit()?;

    if !orphans.is_empty() {
        tracing::info!("Removed {} orphaned progress records", orphans.len());
    }
    Ok(orphans.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScanStats;
    use crate::library::{scan_library, ScanOptions};
    use crate::testing::{CourseTree, TestDb};

    #[test]
    fn test_set_then_get_round_trip() {
        let db = TestDb::new().unwrap();

        let stored = set_progress(&db.conn, "c1", "l1", &ProgressUpdate::at(42.0)).unwrap();
        assert_eq!(stored.position_seconds, 42.0);
        assert!(!stored.completed);

        let loaded = get_progress(&db.conn, "c1", "l1").unwrap().unwrap();
        assert_eq!(loaded, stored);
    }

    #[test]
    fn test_get_missing_is_none() {
        let db = TestDb::new().unwrap();
        assert!(get_progress(&db.conn, "c1", "l1").unwrap().is_none());
    }

    #[test]
    fn test_set_twice_upserts() {
        let db = TestDb::new().unwrap();

        set_progress(&db.conn, "c1", "l1", &ProgressUpdate::at(10.0)).unwrap();
        set_progress(&db.conn, "c1", "l1", &ProgressUpdate::at(99.5)).unwrap();

        let loaded = get_progress(&db.conn, "c1", "l1").unwrap().unwrap();
        assert_eq!(loaded.position_seconds, 99.5);

        let rows: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM progress", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_keys_are_scoped_by_course() {
        let db = TestDb::new().unwrap();

        set_progress(&db.conn, "c1", "intro.mp4", &ProgressUpdate::at(5.0)).unwrap();
        set_progress(&db.conn, "c2", "intro.mp4", &ProgressUpdate::at(7.0)).unwrap();

        assert_eq!(get_progress(&db.conn, "c1", "intro.mp4").unwrap().unwrap().position_seconds, 5.0);
        assert_eq!(get_progress(&db.conn, "c2", "intro.mp4").unwrap().unwrap().position_seconds, 7.0);
    }

    #[test]
    fn test_completion_is_sticky() {
        let db = TestDb::new().unwrap();

        set_progress(&db.conn, "c1", "l1", &ProgressUpdate::completed(300.0)).unwrap();
        let after = set_progress(&db.conn, "c1", "l1", &ProgressUpdate::at(12.0)).unwrap();

        assert!(after.completed);
        assert_eq!(after.position_seconds, 12.0);
    }

    #[test]
    fn test_negative_position_clamped() {
        let db = TestDb::new().unwrap();
        let stored = set_progress(&db.conn, "c1", "l1", &ProgressUpdate::at(-4.0)).unwrap();
        assert_eq!(stored.position_seconds, 0.0);
    }

    #[test]
    fn test_clear_progress() {
        let db = TestDb::new().unwrap();

        set_progress(&db.conn, "c1", "l1", &ProgressUpdate::completed(1.0)).unwrap();
        assert!(clear_progress(&db.conn, "c1", "l1").unwrap());
        assert!(!clear_progress(&db.conn, "c1", "l1").unwrap());
        assert!(get_progress(&db.conn, "c1", "l1").unwrap().is_none());
    }

    #[test]
    fn test_progress_survives_reopen() {
        let db = TestDb::new().unwrap();
        set_progress(&db.conn, "c1", "l1", &ProgressUpdate::at(42.0)).unwrap();

        let reopened = Connection::open(db.path()).unwrap();
        let loaded = get_progress(&reopened, "c1", "l1").unwrap().unwrap();
        assert_eq!(loaded.position_seconds, 42.0);
    }

    #[test]
    fn test_course_progress_and_completed_lessons() {
        let db = TestDb::new().unwrap();

        set_progress(&db.conn, "c1", "a", &ProgressUpdate::completed(1.0)).unwrap();
        set_progress(&db.conn, "c1", "b", &ProgressUpdate::at(2.0)).unwrap();
        set_progress(&db.conn, "c2", "a", &ProgressUpdate::completed(3.0)).unwrap();

        let course = get_course_progress(&db.conn, "c1").unwrap();
        assert_eq!(course.len(), 2);
        assert!(course["a"].completed);
        assert_eq!(course["b"].position_seconds, 2.0);

        let completed = get_completed_lessons(&db.conn).unwrap();
        assert_eq!(completed.len(), 2);
        assert!(completed.contains(&("c1".to_string(), "a".to_string())));
        assert!(!completed.contains(&("c1".to_string(), "b".to_string())));
    }

    fn touch(conn: &Connection, lesson_id: &str, updated_at: &str) {
        conn.execute(
            "UPDATE progress SET updated_at = ?1 WHERE lesson_id = ?2",
            params![updated_at, lesson_id],
        )
        .unwrap();
    }

    #[test]
    fn test_recent_progress_newest_first_without_completed() {
        let db = TestDb::new().unwrap();

        for (lesson, completed) in [("a", false), ("b", true), ("c", false), ("d", false)] {
            let update = if completed {
                ProgressUpdate::completed(2.0)
            } else {
                ProgressUpdate::at(1.0)
            };
            set_progress(&db.conn, "c1", lesson, &update).unwrap();
        }
        touch(&db.conn, "a", "2026-03-01T09:00:00.000000Z");
        touch(&db.conn, "b", "2026-03-04T09:00:00.000000Z");
        touch(&db.conn, "c", "2026-03-03T09:00:00.000000Z");
        touch(&db.conn, "d", "2026-03-02T09:00:00.000000Z");

        let recent = get_recent_progress(&db.conn, 10).unwrap();
        let ids: Vec<_> = recent.iter().map(|p| p.lesson_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "a"]);

        let newest = get_recent_progress(&db.conn, 1).unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].lesson_id, "c");
    }

    #[test]
    fn test_set_progress_timestamps_sort_chronologically() {
        let db = TestDb::new().unwrap();

        let first = set_progress(&db.conn, "c1", "a", &ProgressUpdate::at(1.0)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = set_progress(&db.conn, "c1", "b", &ProgressUpdate::at(1.0)).unwrap();
        assert!(second.updated_at > first.updated_at);

        let ids: Vec<_> = get_recent_progress(&db.conn, 10)
            .unwrap()
            .into_iter()
            .map(|p| p.lesson_id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_delete_orphaned_progress() {
        let db = TestDb::new().unwrap();
        let tree = CourseTree::new()
            .lesson("Rust", "1 Basics", "1 Intro.mp4")
            .lesson("Rust", "1 Basics", "2 Cargo.mp4");
        let library = scan_library(tree.path(), &ScanOptions::default()).unwrap();

        set_progress(&db.conn, "Rust", "1 Basics/1 Intro.mp4", &ProgressUpdate::at(1.0)).unwrap();
        set_progress(&db.conn, "Rust", "1 Basics/9 Deleted.mp4", &ProgressUpdate::at(1.0)).unwrap();
        set_progress(&db.conn, "Gone", "1 Basics/1 Intro.mp4", &ProgressUpdate::at(1.0)).unwrap();

        assert_eq!(delete_orphaned_progress(&db.conn, &library).unwrap(), 2);
        assert!(get_progress(&db.conn, "Rust", "1 Basics/1 Intro.mp4").unwrap().is_some());
        assert!(get_progress(&db.conn, "Gone", "1 Basics/1 Intro.mp4").unwrap().is_none());

        assert_eq!(delete_orphaned_progress(&db.conn, &library).unwrap(), 0);
    }

    #[test]
    fn test_prune_keeps_everything_when_folders_were_skipped() {
        let db = TestDb::new().unwrap();
        set_progress(&db.conn, "Go", "1 Basics/1 Intro.mp4", &ProgressUpdate::completed(60.0)).unwrap();

        let library = Library {
            courses: Vec::new(),
            stats: ScanStats {
                skipped: 1,
                ..ScanStats::default()
            },
        };

        assert_eq!(delete_orphaned_progress(&db.conn, &library).unwrap(), 0);
        let kept = get_progress(&db.conn, "Go", "1 Basics/1 Intro.mp4").unwrap().unwrap();
        assert!(kept.completed);
    }
}
