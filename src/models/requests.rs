use serde::{Deserialize, Serialize};

/// Sent as `assigned_channel` to release a user's channel
pub const RELEASE_CHANNEL: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub auth_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_channel: Option<u8>,
}

/// Partial update. Omitted fields are left unchanged by the server;
/// `assigned_channel: Some(RELEASE_CHANNEL)` clears the assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_channel: Option<u8>,
}

impl UpdateUserRequest {
    pub fn assign_channel(channel: u8) -> Self {
        Self {
            name: None,
            assigned_channel: Some(channel),
        }
    }

    pub fn release_channel() -> Self {
        Self::assign_channel(RELEASE_CHANNEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRequest {
    pub user_id: u32,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub token: String,
}

/// Generic acknowledgement returned by command, bind and delete endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Some("ok".to_string()),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_omits_absent_fields() {
        let json = serde_json::to_string(&UpdateUserRequest::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_release_sends_zero() {
        let json = serde_json::to_string(&UpdateUserRequest::release_channel()).unwrap();
        assert_eq!(json, r#"{"assigned_channel":0}"#);
    }

    #[test]
    fn test_create_without_channel() {
        let req = CreateUserRequest {
            name: "Alice".to_string(),
            auth_level: 2,
            assigned_channel: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"name":"Alice","auth_level":2}"#);
    }

    #[test]
    fn test_status_response_tolerates_missing_fields() {
        let resp: StatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp, StatusResponse::default());
    }
}
