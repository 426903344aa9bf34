//! HTTP client for the external identity and access-control service.
//!
//! A single attempt per call: retry and backoff belong to the caller,
//! which decides based on [`ExternalError::is_transient`].

use std::sync::Arc;

use fpo_core::access::{AccessControlService, ExternalError, PermissionChecker, UserProfile};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AccessClientConfig;

/// Longest response body excerpt carried into an error message.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Error)]
pub enum AccessClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

#[derive(Serialize)]
struct CreateOrganizationBody<'a> {
    name: &'a str,
    metadata: &'a serde_json::Value,
}

#[derive(Serialize)]
struct CreateUserBody<'a> {
    organization_id: &'a str,
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    role: &'a str,
}

#[derive(Serialize)]
struct PermissionCheckBody<'a> {
    subject_id: Uuid,
    resource: &'a str,
    action: &'a str,
    organization_id: Uuid,
}

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Deserialize)]
struct PermissionCheckResponse {
    allowed: bool,
}

/// Shared, cheaply cloneable client.
#[derive(Clone)]
pub struct HttpAccessControlClient {
    client: Arc<Client>,
    config: AccessClientConfig,
}

impl HttpAccessControlClient {
    pub fn new(config: AccessClientConfig) -> Result<Self, AccessClientError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .use_rustls_tls()
            .build()
            .map_err(|e| AccessClientError::Build(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(self.config.url(path));
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send `request`, classify failures, and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ExternalError> {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.map_err(|e| {
            ExternalError::Unexpected(format!("{operation}: invalid response body: {e}"))
        })
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, ExternalError> {
        debug!(operation, "Calling access-control service");

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(operation, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_status(status, &excerpt(&body));
        warn!(
            operation,
            status = status.as_u16(),
            transient = error.is_transient(),
            "Access-control service returned an error"
        );
        Err(error)
    }
}

impl PermissionChecker for HttpAccessControlClient {
    async fn check(
        &self,
        actor_id: Uuid,
        resource: &str,
        action: &str,
        org_id: Uuid,
    ) -> Result<bool, ExternalError> {
        let request = self.post("/v1/permissions/check").json(&PermissionCheckBody {
            subject_id: actor_id,
            resource,
            action,
            organization_id: org_id,
        });
        let response: PermissionCheckResponse =
            self.send_json("permission check", request).await?;
        Ok(response.allowed)
    }
}

impl AccessControlService for HttpAccessControlClient {
    async fn create_organization(
        &self,
        name: &str,
        metadata: &serde_json::Value,
    ) -> Result<String, ExternalError> {
        let request = self
            .post("/v1/organizations")
            .json(&CreateOrganizationBody { name, metadata });
        let created: CreatedResponse = self.send_json("create organization", request).await?;
        Ok(created.id)
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<String, ExternalError> {
        let request = self.post("/v1/users").json(&CreateUserBody {
            organization_id: &profile.external_org_ref,
            name: &profile.name,
            email: &profile.email,
            phone: profile.phone.as_deref(),
            role: &profile.role,
        });
        let created: CreatedResponse = self.send_json("create user", request).await?;
        Ok(created.id)
    }

    async fn assign_default_roles(&self, external_org_ref: &str) -> Result<(), ExternalError> {
        let path = format!("/v1/organizations/{external_org_ref}/default-roles");
        self.send("assign default roles", self.post(&path)).await?;
        Ok(())
    }
}

/// Map an error status to an [`ExternalError`].
///
/// - 408 → `Timeout`
/// - 429, 5xx → `Unavailable`
/// - 400, 409, 422 → `Rejected`
/// - anything else → `Unexpected`
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ExternalError {
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };

    match status {
        StatusCode::REQUEST_TIMEOUT => ExternalError::Timeout,
        StatusCode::TOO_MANY_REQUESTS => ExternalError::Unavailable(message),
        s if s.is_server_error() => ExternalError::Unavailable(message),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ExternalError::Rejected(message)
        }
        _ => ExternalError::Unexpected(message),
    }
}

fn classify_transport(operation: &str, err: &reqwest::Error) -> ExternalError {
    if err.is_timeout() {
        ExternalError::Timeout
    } else if err.is_decode() || err.is_builder() {
        ExternalError::Unexpected(format!("{operation}: {err}"))
    } else {
        ExternalError::Unavailable(format!("{operation}: {err}"))
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outages_and_throttling_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = classify_status(status, "");
            assert!(matches!(err, ExternalError::Unavailable(_)), "{status}");
            assert!(err.is_transient());
        }
        assert_eq!(
            classify_status(StatusCode::REQUEST_TIMEOUT, ""),
            ExternalError::Timeout
        );
    }

    #[test]
    fn client_errors_are_rejections_or_unexpected() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::CONFLICT,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            assert!(matches!(
                classify_status(status, "duplicate email"),
                ExternalError::Rejected(ref m) if m.contains("duplicate email")
            ));
        }
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
        ] {
            let err = classify_status(status, "");
            assert!(matches!(err, ExternalError::Unexpected(_)), "{status}");
            assert!(!err.is_transient());
        }
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY + 50);
        let short = excerpt(&body);
        assert_eq!(short.len(), MAX_ERROR_BODY + 3);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("  short  "), "short");
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let client = HttpAccessControlClient::new(AccessClientConfig {
            base_url: "http://127.0.0.1:1".into(),
            connect_timeout_secs: 2,
            request_timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        let err = client
            .assign_default_roles("ext-org-1")
            .await
            .unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}
