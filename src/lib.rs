pub mod core;
pub mod models;
pub mod stores;
pub mod api;
pub mod connection;
pub mod session;
pub mod validation;
pub mod view;
pub mod controller;
pub mod utils;
