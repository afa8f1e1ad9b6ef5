// Memordo extension services
// Collection, session handling, bookmark toggling, local search and the
// backend client.

pub mod backend_client;
pub mod bookmark_toggle;
pub mod history_collector;
pub mod history_search;
#[cfg(feature = "client")]
pub mod http_backend;
pub mod session_bridge;
pub mod url_normalizer;
