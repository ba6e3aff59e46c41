pub mod app;
pub mod refresh;
pub mod screen;

pub use app::{http_backend_factory, BackendFactory, Controller, ControllerSettings, Notice};
pub use refresh::{AppEvent, RefreshTimer};
pub use screen::{BindFlow, Screen};
