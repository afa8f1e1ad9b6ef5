// Memordo extension storage
// The injected key-value store and the typed view over its keys.

pub mod extension_storage;
pub mod local_store;

pub use extension_storage::ExtensionStorage;
pub use local_store::{JsonFileStore, LocalStore, MemoryStore};
