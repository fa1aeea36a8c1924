//! Error type for handlers.
//!
//! Page handlers return [`AppError`], which renders an HTML error page.
//! JSON endpoints wrap it in [`ApiError`] to answer with a JSON body instead.

use askama::Template;
use axum::{
  http::StatusCode,
  response::{Html, IntoResponse, Response},
  Json,
};
use thiserror::Error;

use crate::db::DbLockError;
use crate::filters;
use crate::library::ScanError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0} not found")]
  NotFound(&'static str),
  #[error(transparent)]
  Scan(#[from] ScanError),
  #[error("{0} folders could not be read")]
  IncompleteScan(usize),
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),
  #[error(transparent)]
  DbUnavailable(#[from] DbLockError),
  #[error("file error: {0}")]
  Io(#[from] std::io::Error),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Scan(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::IncompleteScan(_) => StatusCode::CONFLICT,
      AppError::Database(_) | AppError::DbUnavailable(_) | AppError::Io(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  /// Message shown to the user, without paths or driver details.
  pub fn user_message(&self) -> String {
    match self {
      AppError::NotFound(what) => format!("{} not found", capitalize(what)),
      AppError::Scan(e) => e.user_message().to_string(),
      AppError::IncompleteScan(n) => {
        format!("{} course or section folders could not be read; nothing was removed", n)
      }
      AppError::Database(_) | AppError::DbUnavailable(_) => "Progress database unavailable".to_string(),
      AppError::Io(_) => "The file could not be read".to_string(),
    }
  }

  fn log(&self) {
    if self.status().is_server_error() {
      tracing::error!("{}", self);
    } else {
      tracing::debug!("{}", self);
    }
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
  pub status: u16,
  pub message: String,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    self.log();
    let status = self.status();
    let template = ErrorTemplate {
      status: status.as_u16(),
      message: self.user_message(),
    };
    (status, Html(template.render().unwrap_or_default())).into_response()
  }
}

/// [`AppError`] rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
  E: Into<AppError>,
{
  fn from(err: E) -> Self {
    ApiError(err.into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    self.0.log();
    let body = serde_json::json!({ "error": self.0.user_message() });
    (self.0.status(), Json(body)).into_response()
  }
}
