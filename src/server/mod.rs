// Memordo backend
// Account/token handling and per-user visit history over SQLite; the REST
// layer on top is only built with the `server` feature.

pub mod auth_service;
pub mod history_service;

#[cfg(feature = "server")]
pub mod api_error;
#[cfg(feature = "server")]
pub mod auth;
#[cfg(feature = "server")]
pub mod routes;
