pub mod user_cache;

pub use user_cache::{ChannelMap, ChannelSlot, UserCache};
