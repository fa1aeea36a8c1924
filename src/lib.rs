pub mod config;
pub mod db;
pub mod domain;
pub mod filters;
pub mod handlers;
pub mod library;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
