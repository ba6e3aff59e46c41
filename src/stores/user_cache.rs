use crate::models::user::{User, CHANNEL_COUNT};
use tracing::warn;

/// Last user list fetched from the backend.
///
/// Replaced wholesale on every successful fetch; never merged.
#[derive(Debug, Clone, Default)]
pub struct UserCache {
    users: Vec<User>,
}

/// Occupant of a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSlot {
    pub user_id: u32,
    pub name: String,
}

/// Occupancy of channels 1..=5
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    slots: [Option<ChannelSlot>; CHANNEL_COUNT as usize],
}

impl ChannelMap {
    pub fn holder(&self, channel: u8) -> Option<&ChannelSlot> {
        let index = usize::from(channel).checked_sub(1)?;
        self.slots.get(index)?.as_ref()
    }

    pub fn is_free(&self, channel: u8) -> bool {
        self.holder(channel).is_none()
    }

    /// `(channel, occupant)` for every channel in order
    pub fn iter(&self) -> impl Iterator<Item = (u8, Option<&ChannelSlot>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (index as u8 + 1, slot.as_ref()))
    }

    pub fn free_channels(&self) -> Vec<u8> {
        self.iter()
            .filter(|(_, slot)| slot.is_none())
            .map(|(channel, _)| channel)
            .collect()
    }
}

impl UserCache {
    pub fn new() -> Self {
        Self { users: Vec::new() }
    }

    pub fn from_users(users: Vec<User>) -> Self {
        Self { users }
    }

    /// Replace the whole snapshot
    pub fn replace(&mut self, users: Vec<User>) {
        self.users = users;
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn get_user_by_id(&self, user_id: u32) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    pub fn get_user_by_id_mut(&mut self, user_id: u32) -> Option<&mut User> {
        self.users.iter_mut().find(|user| user.id == user_id)
    }

    /// The user holding `channel`, if any
    pub fn channel_holder(&self, channel: u8) -> Option<&User> {
        self.users.iter().find(|user| user.channel() == Some(channel))
    }

    pub fn channel_map(&self) -> ChannelMap {
        let mut map = ChannelMap::default();
        for user in &self.users {
            let Some(channel) = user.channel() else {
                continue;
            };
            let slot = &mut map.slots[usize::from(channel) - 1];
            match slot {
                Some(existing) => {
                    warn!(
                        channel = channel,
                        holder = existing.user_id,
                        duplicate = user.id,
                        "Channel reported for two users, keeping the first"
                    );
                }
                None => {
                    *slot = Some(ChannelSlot {
                        user_id: user.id,
                        name: user.name.clone(),
                    });
                }
            }
        }
        map
    }

    /// Picker labels, e.g. `"3 - Alice"`, in cache order
    pub fn labels(&self) -> Vec<String> {
        self.users.iter().map(User::label).collect()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
