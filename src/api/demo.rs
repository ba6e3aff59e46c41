use crate::api::backend::{ApiResult, Backend, Biometric};
use crate::core::error::ApiError;
use crate::models::log_entry::LogEntry;
use crate::models::requests::{CreateUserRequest, StatusResponse, UpdateUserRequest, RELEASE_CHANNEL};
use crate::models::user::{is_valid_channel, User, ADMIN_AUTH_LEVEL, STANDARD_AUTH_LEVEL};
use crate::utils::time::current_timestamp;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const BAD_REQUEST: u16 = 400;
const UNAUTHORIZED: u16 = 401;
const NOT_FOUND: u16 = 404;
const UNPROCESSABLE: u16 = 422;

/// The two users demo mode starts with
pub fn seed_users() -> Vec<User> {
    vec![
        User::new(1, "Admin Demo", ADMIN_AUTH_LEVEL, Some(2)).with_biometrics(true, true),
        User::new(2, "Utilisateur Demo", STANDARD_AUTH_LEVEL, Some(1)),
    ]
}

/// In-memory stand-in for the appliance, used by demo mode.
///
/// Mirrors the server's rules closely enough for the UI to behave the same:
/// channel conflicts answer 400, unknown users 404, stale tokens 401.
pub struct DemoBackend {
    state: Mutex<DemoState>,
}

#[derive(Default)]
struct DemoState {
    users: Vec<User>,
    tokens: HashMap<String, u32>,
    logs: Vec<LogEntry>,
}

impl DemoState {
    fn user_mut(&mut self, user_id: u32) -> ApiResult<&mut User> {
        self.users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(ApiError::Status(NOT_FOUND))
    }

    fn check_channel_free(&self, channel: u8, for_user: Option<u32>) -> ApiResult<()> {
        if !is_valid_channel(channel) {
            return Err(ApiError::Status(BAD_REQUEST));
        }
        let taken = self.users.iter().any(|user| {
            user.is_active && user.channel() == Some(channel) && Some(user.id) != for_user
        });
        if taken {
            return Err(ApiError::Status(BAD_REQUEST));
        }
        Ok(())
    }

    fn log(&mut self, user_id: Option<u32>, event_type: &str, status: &str) {
        let log_id = self.logs.len() as u32 + 1;
        self.logs.push(LogEntry {
            log_id: Some(log_id),
            user_id,
            timestamp: current_timestamp().to_string(),
            event_type: event_type.to_string(),
            status: Some(status.to_string()),
            detail_message: None,
        });
    }
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::with_users(seed_users())
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            state: Mutex::new(DemoState {
                users,
                ..DemoState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for DemoBackend {
    async fn list_users(&self) -> ApiResult<Vec<User>> {
        Ok(self.state().users.clone())
    }

    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<User> {
        let mut state = self.state();
        if request.name.trim().is_empty()
            || (request.auth_level != ADMIN_AUTH_LEVEL && request.auth_level != STANDARD_AUTH_LEVEL)
        {
            return Err(ApiError::Status(UNPROCESSABLE));
        }
        if let Some(channel) = request.assigned_channel {
            state.check_channel_free(channel, None)?;
        }

        let id = state.users.iter().map(|user| user.id + 1).max().unwrap_or(1);
        let user = User::new(id, request.name.trim(), request.auth_level, request.assigned_channel);
        state.users.push(user.clone());
        state.log(Some(id), "USER_CREATED", "SUCCESS");
        debug!(user_id = id, "Demo user created");
        Ok(user)
    }

    async fn update_user(&self, user_id: u32, request: &UpdateUserRequest) -> ApiResult<User> {
        let mut state = self.state();
        state.user_mut(user_id)?;

        match request.assigned_channel {
            Some(RELEASE_CHANNEL) | None => {}
            Some(channel) => state.check_channel_free(channel, Some(user_id))?,
        }

        let user = state.user_mut(user_id)?;
        if let Some(name) = &request.name {
            user.name = name.clone();
        }
        match request.assigned_channel {
            Some(RELEASE_CHANNEL) => user.assigned_channel = None,
            Some(channel) => user.assigned_channel = Some(channel),
            None => {}
        }
        let user = user.clone();
        state.log(Some(user_id), "USER_UPDATED", "SUCCESS");
        Ok(user)
    }

    async fn delete_user(&self, user_id: u32) -> ApiResult<StatusResponse> {
        let mut state = self.state();
        state.user_mut(user_id)?;
        state.users.retain(|user| user.id != user_id);
        state.tokens.retain(|_, bound| *bound != user_id);
        state.log(Some(user_id), "USER_DELETED", "SUCCESS");
        Ok(StatusResponse::ok("User deleted"))
    }

    async fn enroll(
        &self,
        kind: Biometric,
        user_id: u32,
        _finger_label: Option<&str>,
    ) -> ApiResult<StatusResponse> {
        let mut state = self.state();
        let user = state.user_mut(user_id)?;
        let event = match kind {
            Biometric::Face => {
                user.has_face = true;
                "ENROLL_FACE"
            }
            Biometric::Fingerprint => {
                user.has_fingerprint = true;
                "ENROLL_FINGER"
            }
        };
        state.log(Some(user_id), event, "SUCCESS");
        Ok(StatusResponse::ok("Enrollment started"))
    }

    async fn unlock(&self, channel: u8) -> ApiResult<StatusResponse> {
        let mut state = self.state();
        if !is_valid_channel(channel) {
            return Err(ApiError::Status(BAD_REQUEST));
        }
        let holder = state
            .users
            .iter()
            .find(|user| user.channel() == Some(channel))
            .map(|user| user.id);
        state.log(holder, "UNLOCK", "SUCCESS");
        Ok(StatusResponse::ok(format!("Channel {} unlocked", channel)))
    }

    async fn bind_device(&self, user_id: u32, token: &str) -> ApiResult<StatusResponse> {
        let mut state = self.state();
        state.user_mut(user_id)?;
        state.tokens.insert(token.to_string(), user_id);
        state.log(Some(user_id), "BIND", "SUCCESS");
        Ok(StatusResponse::ok("Device bound"))
    }

    async fn auth(&self, token: &str) -> ApiResult<User> {
        let state = self.state();
        let user_id = state
            .tokens
            .get(token)
            .copied()
            .ok_or(ApiError::Status(UNAUTHORIZED))?;
        state
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
            .ok_or(ApiError::Status(UNAUTHORIZED))
    }

    async fn get_logs(&self, limit: u32) -> ApiResult<Vec<LogEntry>> {
        let state = self.state();
        Ok(state.logs.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_pair() {
        let backend = DemoBackend::new();
        let users = backend.list_users().await.unwrap();

        assert_eq!(users.len(), 2);
        assert!(users[0].is_admin());
        assert_eq!(users[0].assigned_channel, Some(2));
        assert!(users[0].has_face && users[0].has_fingerprint);
        assert!(!users[1].is_admin());
        assert_eq!(users[1].assigned_channel, Some(1));
    }

    #[tokio::test]
    async fn test_channel_conflict_is_bad_request() {
        let backend = DemoBackend::new();
        let err = backend
            .update_user(2, &UpdateUserRequest::assign_channel(2))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Status(400));

        let user = backend
            .update_user(2, &UpdateUserRequest::assign_channel(4))
            .await
            .unwrap();
        assert_eq!(user.assigned_channel, Some(4));
    }

    #[tokio::test]
    async fn test_release_channel() {
        let backend = DemoBackend::new();
        let user = backend
            .update_user(1, &UpdateUserRequest::release_channel())
            .await
            .unwrap();
        assert_eq!(user.assigned_channel, None);
    }

    #[tokio::test]
    async fn test_create_allocates_next_id() {
        let backend = DemoBackend::new();
        let request = CreateUserRequest {
            name: "Nouveau".to_string(),
            auth_level: 2,
            assigned_channel: Some(3),
        };
        let user = backend.create_user(&request).await.unwrap();
        assert_eq!(user.id, 3);

        let empty = DemoBackend::with_users(Vec::new());
        assert_eq!(empty.create_user(&request).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_bind_then_auth() {
        let backend = DemoBackend::new();
        assert_eq!(backend.auth("tok").await.unwrap_err(), ApiError::Status(401));

        backend.bind_device(2, "tok").await.unwrap();
        assert_eq!(backend.auth("tok").await.unwrap().id, 2);

        backend.delete_user(2).await.unwrap();
        assert_eq!(backend.auth("tok").await.unwrap_err(), ApiError::Status(401));
    }

    #[tokio::test]
    async fn test_enroll_and_logs() {
        let backend = DemoBackend::new();
        backend.enroll(Biometric::Face, 2, None).await.unwrap();
        backend.unlock(1).await.unwrap();

        let users = backend.list_users().await.unwrap();
        assert!(users[1].has_face);
        assert!(!users[1].has_fingerprint);

        let logs = backend.get_logs(1).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_type, "UNLOCK");
        assert_eq!(logs[0].user_id, Some(2));
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let backend = DemoBackend::new();
        assert_eq!(backend.delete_user(42).await.unwrap_err(), ApiError::Status(404));
        assert_eq!(backend.unlock(6).await.unwrap_err(), ApiError::Status(400));
    }
}
