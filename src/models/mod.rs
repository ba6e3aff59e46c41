pub mod log_entry;
pub mod requests;
pub mod user;
