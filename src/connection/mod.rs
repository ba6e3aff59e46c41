pub mod resolver;

pub use resolver::{normalize, strip, validate, Resolver, DEFAULT_ADDRESS, DEFAULT_PORT};
