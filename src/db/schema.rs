use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS progress (
      course_id TEXT NOT NULL,
      lesson_id TEXT NOT NULL,
      position_seconds REAL NOT NULL DEFAULT 0,
      completed INTEGER NOT NULL DEFAULT 0,
      updated_at TEXT NOT NULL,
      PRIMARY KEY (course_id, lesson_id)
    );

    CREATE INDEX IF NOT EXISTS idx_progress_updated_at ON progress(updated_at);
    "#,
  )?;

  Ok(())
}
