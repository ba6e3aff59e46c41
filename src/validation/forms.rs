use crate::core::error::ValidationError;
use crate::models::requests::CreateUserRequest;
use crate::models::user::{is_valid_channel, ADMIN_AUTH_LEVEL, STANDARD_AUTH_LEVEL};

/// Raw text of the "create user" form, as typed
#[derive(Debug, Clone, Default)]
pub struct NewUserForm {
    pub name: String,
    /// "1" (admin) or "2" (standard)
    pub auth_level: String,
    /// Optional channel, empty for none
    pub channel: String,
}

impl NewUserForm {
    pub fn new(name: impl Into<String>, auth_level: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth_level: auth_level.into(),
            channel: channel.into(),
        }
    }

    pub fn validate(&self) -> Result<CreateUserRequest, ValidationError> {
        let name = parse_name(&self.name)?;
        let auth_level = parse_auth_level(&self.auth_level)?;
        let assigned_channel = parse_optional_channel(&self.channel)?;

        Ok(CreateUserRequest {
            name,
            auth_level,
            assigned_channel,
        })
    }
}

pub fn parse_name(text: &str) -> Result<String, ValidationError> {
    let name = text.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    Ok(name.to_string())
}

pub fn parse_auth_level(text: &str) -> Result<u8, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::MissingField("auth level"));
    }
    let level: i64 = text
        .parse()
        .map_err(|_| ValidationError::NotANumber("auth level"))?;

    match u8::try_from(level) {
        Ok(level) if level == ADMIN_AUTH_LEVEL || level == STANDARD_AUTH_LEVEL => Ok(level),
        _ => Err(ValidationError::InvalidAuthLevel(level)),
    }
}

/// Empty means "no channel"
pub fn parse_optional_channel(text: &str) -> Result<Option<u8>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let channel: i64 = text
        .parse()
        .map_err(|_| ValidationError::NotANumber("channel"))?;
    check_channel(channel).map(Some)
}

pub fn check_channel(channel: i64) -> Result<u8, ValidationError> {
    match u8::try_from(channel) {
        Ok(ch) if is_valid_channel(ch) => Ok(ch),
        _ => Err(ValidationError::ChannelOutOfRange(channel)),
    }
}
