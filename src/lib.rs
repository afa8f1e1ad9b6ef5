//! Memordo: browsing history collection for a browser extension and the
//! per-user history server it reports to.
//!
//! The extension side (store, collector, session bridge, message router) and
//! the server side (auth, history service, REST routes) share the types in
//! [`types`]. The binaries and integration tests use everything through this
//! library crate.

pub mod config;
pub mod database;
pub mod message_router;
pub mod server;
pub mod services;
pub mod store;
pub mod types;
