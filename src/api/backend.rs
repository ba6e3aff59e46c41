use crate::core::error::ApiError;
use crate::models::log_entry::LogEntry;
use crate::models::requests::{CreateUserRequest, StatusResponse, UpdateUserRequest};
use crate::models::user::User;
use async_trait::async_trait;

pub type ApiResult<T> = Result<T, ApiError>;

/// Biometric modality for enrollment commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Biometric {
    Face,
    Fingerprint,
}

impl Biometric {
    pub fn command_path(self) -> &'static str {
        match self {
            Biometric::Face => "command/enroll_face",
            Biometric::Fingerprint => "command/enroll_finger",
        }
    }
}

/// Operations exposed by the appliance backend.
///
/// Every call is a single attempt: no retry, no de-duplication.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_users(&self) -> ApiResult<Vec<User>>;

    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<User>;

    async fn update_user(&self, user_id: u32, request: &UpdateUserRequest) -> ApiResult<User>;

    async fn delete_user(&self, user_id: u32) -> ApiResult<StatusResponse>;

    /// Queue a hardware enrollment. Success means the command was accepted,
    /// not that enrollment finished.
    async fn enroll(
        &self,
        kind: Biometric,
        user_id: u32,
        finger_label: Option<&str>,
    ) -> ApiResult<StatusResponse>;

    async fn unlock(&self, channel: u8) -> ApiResult<StatusResponse>;

    async fn bind_device(&self, user_id: u32, token: &str) -> ApiResult<StatusResponse>;

    async fn auth(&self, token: &str) -> ApiResult<User>;

    async fn get_logs(&self, limit: u32) -> ApiResult<Vec<LogEntry>>;
}

/// Fresh bind token: 128 random bits, lowercase hex
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_command_paths() {
        assert_eq!(Biometric::Face.command_path(), "command/enroll_face");
        assert_eq!(Biometric::Fingerprint.command_path(), "command/enroll_finger");
    }
}
