use serde::{Deserialize, Deserializer, Serialize};

/// Number of physical channels on the appliance
pub const CHANNEL_COUNT: u8 = 5;

/// Auth level granted to administrators
pub const ADMIN_AUTH_LEVEL: u8 = 1;

/// Auth level of a standard user
pub const STANDARD_AUTH_LEVEL: u8 = 2;

/// A user as reported by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    #[serde(rename = "user_id", alias = "id")]
    pub id: u32,
    pub name: String,
    /// 1 = admin, 2 = standard
    pub auth_level: u8,
    /// Assigned channel (1..=5), `None` when unassigned
    #[serde(default)]
    pub assigned_channel: Option<u8>,
    #[serde(default, deserialize_with = "flag")]
    pub has_face: bool,
    #[serde(default, deserialize_with = "flag")]
    pub has_fingerprint: bool,
    #[serde(default = "default_active", deserialize_with = "flag")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Standard,
}

fn default_active() -> bool {
    true
}

/// The backend stores flags as SQLite integers; accept both `0/1` and booleans.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

impl User {
    pub fn new(id: u32, name: impl Into<String>, auth_level: u8, assigned_channel: Option<u8>) -> Self {
        Self {
            id,
            name: name.into(),
            auth_level,
            assigned_channel,
            has_face: false,
            has_fingerprint: false,
            is_active: true,
        }
    }

    pub fn with_biometrics(mut self, has_face: bool, has_fingerprint: bool) -> Self {
        self.has_face = has_face;
        self.has_fingerprint = has_fingerprint;
        self
    }

    pub fn role(&self) -> Role {
        if self.auth_level == ADMIN_AUTH_LEVEL {
            Role::Admin
        } else {
            Role::Standard
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    /// Assigned channel, only if it addresses a physical channel
    pub fn channel(&self) -> Option<u8> {
        self.assigned_channel.filter(|ch| is_valid_channel(*ch))
    }

    /// Picker label, e.g. `"3 - Alice"`
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }
}

pub fn is_valid_channel(channel: u8) -> bool {
    (1..=CHANNEL_COUNT).contains(&channel)
}
