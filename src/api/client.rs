use crate::api::backend::{ApiResult, Backend, Biometric};
use crate::core::error::ApiError;
use crate::models::log_entry::LogEntry;
use crate::models::requests::{
    AuthRequest, BindRequest, CreateUserRequest, StatusResponse, UpdateUserRequest,
};
use crate::models::user::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the appliance REST API
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` must be normalized (scheme, port and trailing slash)
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn dispatch(&self, request: reqwest::RequestBuilder, op: &'static str) -> ApiResult<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            warn!(operation = op, base_url = %self.base_url, error = %e, "Backend unreachable");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(operation = op, status = status.as_u16(), "Backend returned error status");
            return Err(ApiError::Status(status.as_u16()));
        }

        debug!(operation = op, status = status.as_u16(), "Backend call succeeded");
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, op: &'static str) -> ApiResult<T> {
        let response = self.dispatch(request, op).await?;
        response.json::<T>().await.map_err(|e| {
            warn!(operation = op, error = %e, "Failed to parse backend response");
            ApiError::Decode(e.to_string())
        })
    }

    /// Acknowledgement endpoints: the status code decides success, the body is informative
    async fn acknowledge(&self, request: reqwest::RequestBuilder, op: &'static str) -> ApiResult<StatusResponse> {
        let response = self.dispatch(request, op).await?;
        let body = response.bytes().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        if body.is_empty() {
            return Ok(StatusResponse::default());
        }

        match serde_json::from_slice::<StatusResponse>(&body) {
            Ok(status) => Ok(status),
            Err(e) => {
                debug!(operation = op, error = %e, "Unstructured acknowledgement body");
                Ok(StatusResponse::default())
            }
        }
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn list_users(&self) -> ApiResult<Vec<User>> {
        self.fetch(self.client.get(self.url("users")), "list_users").await
    }

    async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<User> {
        self.fetch(self.client.post(self.url("users")).json(request), "create_user")
            .await
    }

    async fn update_user(&self, user_id: u32, request: &UpdateUserRequest) -> ApiResult<User> {
        let url = self.url(&format!("users/{}", user_id));
        self.fetch(self.client.patch(url).json(request), "update_user").await
    }

    async fn delete_user(&self, user_id: u32) -> ApiResult<StatusResponse> {
        let url = self.url(&format!("users/{}", user_id));
        self.acknowledge(self.client.delete(url), "delete_user").await
    }

    async fn enroll(
        &self,
        kind: Biometric,
        user_id: u32,
        finger_label: Option<&str>,
    ) -> ApiResult<StatusResponse> {
        let mut query = vec![("user_id", user_id.to_string())];
        if let (Biometric::Fingerprint, Some(label)) = (kind, finger_label) {
            query.push(("finger_label", label.to_string()));
        }

        let request = self.client.post(self.url(kind.command_path())).query(&query);
        self.acknowledge(request, "enroll").await
    }

    async fn unlock(&self, channel: u8) -> ApiResult<StatusResponse> {
        let request = self
            .client
            .post(self.url("command/unlock"))
            .query(&[("channel", channel.to_string())]);
        self.acknowledge(request, "unlock").await
    }

    async fn bind_device(&self, user_id: u32, token: &str) -> ApiResult<StatusResponse> {
        let body = BindRequest {
            user_id,
            token: token.to_string(),
        };
        self.acknowledge(self.client.post(self.url("bind")).json(&body), "bind_device")
            .await
    }

    async fn auth(&self, token: &str) -> ApiResult<User> {
        let body = AuthRequest {
            token: token.to_string(),
        };
        self.fetch(self.client.post(self.url("auth")).json(&body), "auth").await
    }

    async fn get_logs(&self, limit: u32) -> ApiResult<Vec<LogEntry>> {
        let request = self
            .client
            .get(self.url("logs"))
            .query(&[("limit", limit.to_string())]);
        self.fetch(request, "get_logs").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn client(base_url: String) -> ApiClient {
        ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_api_client_creation() {
        let client = ApiClient::new("http://192.168.4.1:8000/".to_string(), Duration::from_secs(30));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().url("users"), "http://192.168.4.1:8000/users");
    }

    #[tokio::test]
    async fn test_list_users() {
        let router = Router::new().route(
            "/users",
            get(|| async {
                Json(json!([
                    {"user_id": 1, "name": "Admin", "auth_level": 1, "assigned_channel": 2, "is_active": 1},
                    {"user_id": 2, "name": "Bob", "auth_level": 2, "assigned_channel": null, "is_active": 1}
                ]))
            }),
        );
        let api = client(spawn_backend(router).await);

        let users = api.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].assigned_channel, Some(2));
        assert!(users[0].is_admin());
        assert_eq!(users[1].assigned_channel, None);
    }

    #[tokio::test]
    async fn test_update_user_sends_release_sentinel() {
        let router = Router::new().route(
            "/users/{id}",
            patch(|Path(id): Path<u32>, Json(body): Json<Value>| async move {
                assert_eq!(body, json!({"assigned_channel": 0}));
                Json(json!({"user_id": id, "name": "Bob", "auth_level": 2,
                    "assigned_channel": null, "is_active": 1}))
            }),
        );
        let api = client(spawn_backend(router).await);

        let user = api
            .update_user(5, &UpdateUserRequest::release_channel())
            .await
            .unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(user.assigned_channel, None);
    }

    #[tokio::test]
    async fn test_conflict_maps_to_status() {
        let router = Router::new().route(
            "/users/{id}",
            patch(|| async { (StatusCode::BAD_REQUEST, Json(json!({"detail": "Channel taken"}))) }),
        );
        let api = client(spawn_backend(router).await);

        let err = api
            .update_user(1, &UpdateUserRequest::assign_channel(3))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Status(400));
    }

    #[tokio::test]
    async fn test_enroll_finger_query() {
        let router = Router::new().route(
            "/command/enroll_finger",
            post(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("user_id").map(String::as_str), Some("4"));
                assert_eq!(params.get("finger_label").map(String::as_str), Some("index"));
                Json(json!({"status": "queued", "message": "enrollment started"}))
            }),
        );
        let api = client(spawn_backend(router).await);

        let status = api
            .enroll(Biometric::Fingerprint, 4, Some("index"))
            .await
            .unwrap();
        assert_eq!(status.status.as_deref(), Some("queued"));
    }

    #[tokio::test]
    async fn test_unlock_with_empty_body() {
        let router = Router::new().route(
            "/command/unlock",
            post(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("channel").map(String::as_str), Some("3"));
                StatusCode::OK
            }),
        );
        let api = client(spawn_backend(router).await);

        let status = api.unlock(3).await.unwrap();
        assert_eq!(status, StatusResponse::default());
    }

    #[tokio::test]
    async fn test_bind_and_auth() {
        let router = Router::new()
            .route(
                "/bind",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["user_id"], 9);
                    assert_eq!(body["token"], "tok");
                    Json(json!({"status": "ok"}))
                }),
            )
            .route(
                "/auth",
                post(|Json(body): Json<Value>| async move {
                    if body["token"] == "tok" {
                        Ok(Json(json!({"id": 9, "name": "Zoe", "auth_level": 2, "is_active": 1})))
                    } else {
                        Err(StatusCode::UNAUTHORIZED)
                    }
                }),
            );
        let api = client(spawn_backend(router).await);

        api.bind_device(9, "tok").await.unwrap();
        assert_eq!(api.auth("tok").await.unwrap().id, 9);
        assert_eq!(api.auth("stale").await.unwrap_err(), ApiError::Status(401));
    }

    #[tokio::test]
    async fn test_get_logs_limit() {
        let router = Router::new().route(
            "/logs",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("limit").map(String::as_str), Some("20"));
                Json(json!([{"log_id": 1, "user_id": 2, "timestamp": "t",
                    "event_type": "UNLOCK", "status": "SUCCESS", "detail_message": null}]))
            }),
        );
        let api = client(spawn_backend(router).await);

        let logs = api.get_logs(20).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_type, "UNLOCK");
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let router = Router::new().route("/users", get(|| async { "not json" }));
        let api = client(spawn_backend(router).await);

        assert!(matches!(api.list_users().await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client(format!("http://{}/", addr));
        let err = api.list_users().await.unwrap_err();
        assert!(err.is_transport());
    }
}
