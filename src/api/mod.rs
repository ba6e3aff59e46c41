pub mod backend;
pub mod client;
pub mod demo;

pub use backend::{generate_token, ApiResult, Backend, Biometric};
pub use client::ApiClient;
pub use demo::DemoBackend;
