// Memordo shared type definitions
// Each submodule defines types used by both the extension logic and the backend.

pub mod bookmark;
pub mod errors;
pub mod history;
pub mod navigation;
pub mod session;
pub mod settings;
pub mod visit;
