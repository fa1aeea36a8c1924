use std::fs;
use std::path::{Path, PathBuf};

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use course_shelf::config::Settings;
use course_shelf::db::{self, IN_MEMORY};
use course_shelf::handlers;
use course_shelf::state::AppState;

struct TestApp {
    server: TestServer,
    courses: TempDir,
}

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn app_for(courses_dir: PathBuf) -> TestServer {
    let settings = Settings {
        courses_dir,
        database_path: PathBuf::from(IN_MEMORY),
        ..Settings::default()
    };
    let pool = db::init_db(&settings.database_path).unwrap();
    let state = AppState::new(pool, settings);
    TestServer::new(handlers::router(state)).unwrap()
}

fn test_app() -> TestApp {
    let courses = TempDir::new().unwrap();
    let root = courses.path();
    write(root, "10 Go/1 Setup/1 Install.mp4", b"go-install");
    write(root, "10 Go/1 Setup/2 Hello.mp4", b"go-hello");
    write(root, "2 Rust/1 Basics/2 Cargo.mp4", b"rust-cargo");
    write(root, "2 Rust/1 Basics/10 Traits.mp4", b"rust-traits");
    write(root, "2 Rust/2 Async/1 Futures.mkv", b"0123456789");
    write(root, "2 Rust/2 Async/notes.txt", b"ignored");

    TestApp {
        server: app_for(root.to_path_buf()),
        courses,
    }
}

#[tokio::test]
async fn home_lists_courses_in_natural_order() {
    let app = test_app();

    let response = app.server.get("/").await;
    response.assert_status_ok();

    let html = response.text();
    let rust = html.find("Rust").expect("Rust course listed");
    let go = html.find("Go").expect("Go course listed");
    assert!(rust < go, "2 Rust should be listed before 10 Go");
    assert!(html.contains("/course/2%20Rust"));
}

#[tokio::test]
async fn home_search_filters_courses() {
    let app = test_app();

    let html = app.server.get("/").add_query_param("q", "rust").await.text();
    assert!(html.contains("/course/2%20Rust"));
    assert!(!html.contains("/course/10%20Go"));
}

#[tokio::test]
async fn home_reports_missing_root_without_failing() {
    let missing = TempDir::new().unwrap().path().join("gone");
    let server = app_for(missing);

    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("The courses folder does not exist"));
}

#[tokio::test]
async fn course_page_shows_sections_and_lessons_in_order() {
    let app = test_app();

    let response = app.server.get("/course/2%20Rust").await;
    response.assert_status_ok();

    let html = response.text();
    let cargo = html.find("Cargo").unwrap();
    let traits = html.find("Traits").unwrap();
    let futures = html.find("Futures").unwrap();
    assert!(cargo < traits && traits < futures);
    assert!(!html.contains("notes"));
}

#[tokio::test]
async fn unknown_course_and_lesson_are_not_found() {
    let app = test_app();

    app.server.get("/course/Python").await.assert_status_not_found();
    app.server
        .get("/course/2%20Rust/lesson/1%20Basics/99%20Missing.mp4")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn course_page_on_missing_root_is_unavailable() {
    let missing = TempDir::new().unwrap().path().join("gone");
    let server = app_for(missing);

    server
        .get("/course/2%20Rust")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn lesson_page_links_video_and_neighbours() {
    let app = test_app();

    let response = app.server.get("/course/2%20Rust/lesson/1%20Basics/10%20Traits.mp4").await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("/video/2%20Rust/1%20Basics/10%20Traits.mp4"));
    assert!(html.contains("/api/progress/2%20Rust/1%20Basics/10%20Traits.mp4"));
    assert!(html.contains("rel=\"prev\""));
    assert!(html.contains("rel=\"next\""));
}

#[tokio::test]
async fn progress_round_trip_and_upsert() {
    let app = test_app();
    let url = "/api/progress/2%20Rust/1%20Basics/2%20Cargo.mp4";

    let before: Value = app.server.get(url).await.json();
    assert_eq!(before, Value::Null);

    app.server
        .post(url)
        .json(&json!({ "position_seconds": 42 }))
        .await
        .assert_status_ok();
    let saved: Value = app
        .server
        .post(url)
        .json(&json!({ "position_seconds": 64.5 }))
        .await
        .json();
    assert_eq!(saved["position_seconds"], json!(64.5));

    let stored: Value = app.server.get(url).await.json();
    assert_eq!(stored["course_id"], json!("2 Rust"));
    assert_eq!(stored["lesson_id"], json!("1 Basics/2 Cargo.mp4"));
    assert_eq!(stored["position_seconds"], json!(64.5));
    assert_eq!(stored["completed"], json!(false));
}

#[tokio::test]
async fn progress_completion_shows_on_course_page() {
    let app = test_app();

    app.server
        .post("/api/progress/2%20Rust/1%20Basics/2%20Cargo.mp4")
        .json(&json!({ "position_seconds": 10, "completed": true }))
        .await
        .assert_status_ok();

    let html = app.server.get("/course/2%20Rust").await.text();
    assert!(html.contains("1/3 lessons watched"));

    let removed: Value = app
        .server
        .delete("/api/progress/2%20Rust/1%20Basics/2%20Cargo.mp4")
        .await
        .json();
    assert_eq!(removed, json!({ "removed": true }));

    let html = app.server.get("/course/2%20Rust").await.text();
    assert!(html.contains("0/3 lessons watched"));
}

#[tokio::test]
async fn progress_for_unknown_lesson_is_rejected() {
    let app = test_app();

    let response = app
        .server
        .post("/api/progress/2%20Rust/1%20Basics/missing.mp4")
        .json(&json!({ "position_seconds": 1 }))
        .await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Lesson not found"));
}

#[tokio::test]
async fn prune_removes_progress_for_deleted_files() {
    let app = test_app();

    for lesson in ["1%20Basics/2%20Cargo.mp4", "1%20Basics/10%20Traits.mp4"] {
        app.server
            .post(&format!("/api/progress/2%20Rust/{}", lesson))
            .json(&json!({ "position_seconds": 5 }))
            .await
            .assert_status_ok();
    }

    fs::remove_file(app.courses.path().join("2 Rust/1 Basics/10 Traits.mp4")).unwrap();

    let pruned: Value = app.server.post("/api/maintenance/prune-progress").await.json();
    assert_eq!(pruned, json!({ "removed": 1 }));

    let kept: Value = app.server.get("/api/progress/2%20Rust/1%20Basics/2%20Cargo.mp4").await.json();
    assert_eq!(kept["position_seconds"], json!(5.0));
}

#[cfg(unix)]
#[tokio::test]
async fn prune_refuses_when_a_course_cannot_be_read() {
    let app = test_app();

    app.server
        .post("/api/progress/10%20Go/1%20Setup/1%20Install.mp4")
        .json(&json!({ "position_seconds": 30, "completed": true }))
        .await
        .assert_status_ok();

    let go = app.courses.path().join("10 Go");
    fs::remove_dir_all(&go).unwrap();
    std::os::unix::fs::symlink("10 Go", &go).unwrap();

    let response = app.server.post("/api/maintenance/prune-progress").await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("nothing was removed"));

    let kept: Value = app.server.get("/api/progress/10%20Go/1%20Setup/1%20Install.mp4").await.json();
    assert_eq!(kept["completed"], json!(true));
}

#[tokio::test]
async fn courses_api_returns_hierarchy() {
    let app = test_app();

    let library: Value = app.server.get("/api/courses").await.json();
    let courses = library["courses"].as_array().unwrap();
    assert_eq!(courses.len(), 2);
    assert_eq!(courses[0]["id"], json!("2 Rust"));
    assert_eq!(courses[0]["sections"][0]["lessons"][0]["id"], json!("1 Basics/2 Cargo.mp4"));
    assert_eq!(courses[0]["sections"][1]["lessons"][0]["media_type"], json!("mkv"));
    assert_eq!(library["stats"]["lessons_seen"], json!(5));
}

#[tokio::test]
async fn video_supports_range_requests() {
    let app = test_app();
    let url = "/video/2%20Rust/2%20Async/1%20Futures.mkv";

    let full = app.server.get(url).await;
    full.assert_status_ok();
    assert_eq!(full.as_bytes().as_ref(), b"0123456789");

    let partial = app
        .server
        .get(url)
        .add_header(header::RANGE, HeaderValue::from_static("bytes=2-5"))
        .await;
    partial.assert_status(StatusCode::PARTIAL_CONTENT);
    assert_eq!(partial.as_bytes().as_ref(), b"2345");
}

#[tokio::test]
async fn video_outside_library_is_not_served() {
    let app = test_app();

    app.server
        .get("/video/2%20Rust/2%20Async/notes.txt")
        .await
        .assert_status_not_found();
    app.server
        .get("/video/..%2F..%2Fetc/passwd")
        .await
        .assert_status_not_found();
}
