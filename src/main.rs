use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_shelf::{config::Settings, db, handlers, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "course_shelf=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = Settings::load();

  let pool = db::init_db(&settings.database_path).map_err(|e| {
    tracing::error!("Failed to initialize database {}: {}", settings.database_path.display(), e);
    e
  })?;

  let state = AppState::new(pool, settings);

  // Startup scan only reports; pages rescan on every request
  match state.scan_library() {
    Ok(library) => tracing::info!(
      "Found {} courses with {} lessons",
      library.stats.courses_seen,
      library.stats.lessons_seen
    ),
    Err(e) => tracing::warn!("Initial library scan failed: {}", e),
  }

  let bind_addr = state.settings.bind_addr.clone();
  let app = handlers::router(state);

  let listener = tokio::net::TcpListener::bind(&bind_addr).await.map_err(|e| {
    tracing::error!("Failed to bind to {}: {}", bind_addr, e);
    e
  })?;

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, app).await?;
  Ok(())
}
