pub mod preferences;
pub mod store;

pub use preferences::{FilePreferences, MemoryPreferences, Preferences};
pub use store::SessionStore;
