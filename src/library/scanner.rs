//! Library scanning - walking the courses root into Course → Section → Lesson.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/<course>/<section>/<lesson video>
//! <root>/<course>/<lesson video>          (loose lessons, grouped first)
//! ```
//!
//! Every call walks the filesystem again; nothing is cached between requests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::natural::sort_naturally;
use super::title::{folder_title, lesson_title};
use crate::domain::{Course, Lesson, Library, MediaType, ScanStats, Section};

/// Video containers recognised when no extensions are configured
pub const DEFAULT_VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "webm", "mov", "m4v"];

/// Title of the section holding videos placed directly in a course folder
pub const LOOSE_SECTION_TITLE: &str = "Lessons";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("library root {} does not exist", .0.display())]
    RootMissing(PathBuf),
    #[error("library root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("library root {} is not readable: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Message suitable for pages, without the underlying OS error.
    pub fn user_message(&self) -> &'static str {
        match self {
            ScanError::RootMissing(_) => "The courses folder does not exist",
            ScanError::NotADirectory(_) => "The courses path is not a folder",
            ScanError::RootUnreadable { .. } => "The courses folder could not be read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lowercase extensions without the leading dot
    pub video_extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            video_extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl ScanOptions {
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            video_extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    fn video_extension<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let ext = Path::new(file_name).extension()?.to_str()?;
        let lower = ext.to_ascii_lowercase();
        self.video_extensions.iter().any(|e| *e == lower).then_some(ext)
    }
}

enum EntryKind {
    Dir,
    File,
}

struct Entry {
    name: String,
    path: PathBuf,
    kind: EntryKind,
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

struct Listing {
    entries: Vec<Entry>,
    /// Entries whose name or type could not be read
    unreadable: usize,
}

/// List visible entries of a directory. Symlinks are followed.
fn list_entries(dir: &Path) -> io::Result<Listing> {
    let mut listing = Listing {
        entries: Vec::new(),
        unreadable: 0,
    };

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                listing.unreadable += 1;
                continue;
            }
        };
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            tracing::debug!("Skipping non UTF-8 name in {}", dir.display());
            continue;
        };
        if is_hidden(&name) {
            continue;
        }

        let path = entry.path();
        let kind = match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => EntryKind::Dir,
            Ok(meta) if meta.is_file() => EntryKind::File,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                listing.unreadable += 1;
                continue;
            }
        };

        listing.entries.push(Entry { name, path, kind });
    }

    Ok(listing)
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::NotADirectory(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ScanError::RootMissing(root.to_path_buf()))
        }
        Err(source) => Err(ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        }),
    }
}

/// Scan every course under `root`.
///
/// Fails only when the root itself is missing or unreadable. Course and
/// section folders that cannot be read are logged, counted in
/// [`ScanStats::skipped`] and left out.
pub fn scan_library(root: &Path, options: &ScanOptions) -> Result<Library, ScanError> {
    check_root(root)?;
    let listing = list_entries(root).map_err(|source| ScanError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut stats = ScanStats {
        skipped: listing.unreadable,
        ..ScanStats::default()
    };
    let mut courses = Vec::new();

    for entry in listing.entries {
        if !matches!(entry.kind, EntryKind::Dir) {
            continue;
        }
        match scan_course_dir(&entry.name, &entry.path, options, &mut stats) {
            Ok(course) => courses.push(course),
            Err(e) => {
                tracing::warn!("Skipping unreadable course {}: {}", entry.path.display(), e);
                stats.skipped += 1;
            }
        }
    }

    sort_naturally(&mut courses, |c| c.id.as_str());
    stats.courses_seen = courses.len();

    tracing::debug!(
        "Scanned {}: {} courses, {} sections, {} lessons, {} skipped",
        root.display(),
        stats.courses_seen,
        stats.sections_seen,
        stats.lessons_seen,
        stats.skipped
    );

    Ok(Library { courses, stats })
}

/// Whether `course_id` can only name an immediate child of the root.
fn is_valid_course_id(course_id: &str) -> bool {
    !course_id.is_empty()
        && !is_hidden(course_id)
        && !course_id.contains(std::path::is_separator)
        && Path::new(course_id).components().count() == 1
}

/// Scan a single course by folder name.
///
/// Returns `Ok(None)` when the id does not name a readable course folder,
/// including ids that try to leave the root.
pub fn scan_course(
    root: &Path,
    course_id: &str,
    options: &ScanOptions,
) -> Result<Option<Course>, ScanError> {
    check_root(root)?;
    if !is_valid_course_id(course_id) {
        tracing::debug!("Rejected course id {:?}", course_id);
        return Ok(None);
    }

    let path = root.join(course_id);
    if !path.is_dir() {
        return Ok(None);
    }

    let mut stats = ScanStats::default();
    match scan_course_dir(course_id, &path, options, &mut stats) {
        Ok(course) => Ok(Some(course)),
        Err(e) => {
            tracing::warn!("Course {} is not readable: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn scan_course_dir(
    course_id: &str,
    course_path: &Path,
    options: &ScanOptions,
    stats: &mut ScanStats,
) -> io::Result<Course> {
    let listing = list_entries(course_path)?;
    stats.skipped += listing.unreadable;

    let mut loose = Vec::new();
    let mut sections = Vec::new();

    for entry in listing.entries {
        match entry.kind {
            EntryKind::File => {
                if let Some(ext) = options.video_extension(&entry.name) {
                    loose.push(make_lesson("", entry.name.clone(), entry.path.clone(), ext));
                }
            }
            EntryKind::Dir => match scan_section_dir(&entry.name, &entry.path, options) {
                Ok(section) if section.lessons.is_empty() => {}
                Ok(section) => sections.push(section),
                Err(e) => {
                    tracing::warn!("Skipping unreadable section {}: {}", entry.path.display(), e);
                    stats.skipped += 1;
                }
            },
        }
    }

    sort_naturally(&mut sections, |s| s.id.as_str());

    if !loose.is_empty() {
        sort_naturally(&mut loose, |l| l.file_name.as_str());
        sections.insert(
            0,
            Section {
                id: String::new(),
                title: LOOSE_SECTION_TITLE.to_string(),
                path: course_path.to_path_buf(),
                lessons: loose,
            },
        );
    }

    stats.sections_seen += sections.len();
    stats.lessons_seen += sections.iter().map(|s| s.lessons.len()).sum::<usize>();

    Ok(Course {
        id: course_id.to_string(),
        title: folder_title(course_id),
        path: course_path.to_path_buf(),
        sections,
    })
}

fn scan_section_dir(section_id: &str, path: &Path, options: &ScanOptions) -> io::Result<Section> {
    let mut lessons: Vec<Lesson> = list_entries(path)?
        .entries
        .into_iter()
        .filter(|e| matches!(e.kind, EntryKind::File))
        .filter_map(|e| {
            let ext = options.video_extension(&e.name)?.to_string();
            Some(make_lesson(section_id, e.name, e.path, &ext))
        })
        .collect();

    sort_naturally(&mut lessons, |l| l.file_name.as_str());

    Ok(Section {
        id: section_id.to_string(),
        title: folder_title(section_id),
        path: path.to_path_buf(),
        lessons,
    })
}

fn make_lesson(section_id: &str, file_name: String, path: PathBuf, ext: &str) -> Lesson {
    let id = if section_id.is_empty() {
        file_name.clone()
    } else {
        format!("{}/{}", section_id, file_name)
    };

    Lesson {
        id,
        title: lesson_title(&file_name),
        media_type: MediaType::from_extension(ext),
        file_name,
        path,
    }
}
