//! API client for the identity endpoint and the task document store.
//!
//! Sign-in and sign-up go to the identity endpoint with the project API key.
//! Task documents live in the `todos` collection of the document store; each
//! store request is authorized with the session's access token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::{AuthBackend, AuthError, AuthGrant, AuthMode, Credentials};
use crate::models::document::FIELD_OWNER;
use crate::models::{Document, Task, TaskId};
use crate::tasks::TaskStore;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL of the identity endpoint
pub const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Default base URL of the document store
pub const DEFAULT_STORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Collection holding task documents
const TASK_COLLECTION: &str = "todos";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where to reach the identity endpoint and the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_base_url: String,
    pub store_base_url: String,
    pub api_key: String,
    pub project_id: String,
}

impl Endpoints {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            store_base_url: DEFAULT_STORE_BASE_URL.to_string(),
            api_key: api_key.into(),
            project_id: project_id.into(),
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.store_base_url.trim_end_matches('/'),
            self.project_id
        )
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.documents_url(), TASK_COLLECTION)
    }

    /// URL of a single task document, with the id as one escaped segment
    fn task_url(&self, id: &TaskId) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.collection_url())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.collection_url(), e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.collection_url()))?
            .push(id.as_str());
        Ok(url)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    email: String,
    /// Token lifetime in seconds, sent as a string
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<Document>,
}

/// API client for the identity endpoint and the document store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(endpoints: Endpoints) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, endpoints })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        response.json().await.map_err(|e| {
            warn!(error = %e, what, "Failed to parse response");
            ApiError::InvalidResponse(format!("Failed to parse {} response: {}", what, e))
        })
    }

    fn owner_query(owner_id: &str) -> serde_json::Value {
        serde_json::json!({
            "structuredQuery": {
                "from": [{ "collectionId": TASK_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": FIELD_OWNER },
                        "op": "EQUAL",
                        "value": { "stringValue": owner_id }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn authenticate(
        &self,
        mode: AuthMode,
        credentials: &Credentials,
    ) -> Result<AuthGrant, AuthError> {
        let url = format!(
            "{}/accounts:{}",
            self.endpoints.auth_base_url.trim_end_matches('/'),
            mode.endpoint()
        );
        let body = AuthRequest {
            email: &credentials.email,
            password: &credentials.password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.endpoints.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to send authentication request");
                AuthError::Unknown
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::error_code(&body)
                .map(|code| AuthError::from_code(&code))
                .unwrap_or(AuthError::Unknown);
            debug!(%status, ?error, "Authentication rejected");
            return Err(error);
        }

        let auth: AuthResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse auth response");
            AuthError::Unknown
        })?;

        let expires_in_secs = auth.expires_in.trim().parse::<i64>().map_err(|_| {
            warn!(expires_in = %auth.expires_in, "Unreadable token lifetime");
            AuthError::Unknown
        })?;

        Ok(AuthGrant {
            subject_id: auth.local_id,
            access_token: auth.id_token,
            email: if auth.email.is_empty() {
                credentials.email.clone()
            } else {
                auth.email
            },
            expires_in_secs,
        })
    }
}

#[async_trait]
impl TaskStore for ApiClient {
    async fn list_tasks(&self, token: &str, owner_id: &str) -> Result<Vec<Task>, ApiError> {
        let url = format!("{}:runQuery", self.endpoints.documents_url());
        let request = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&Self::owner_query(owner_id));

        let items: Vec<RunQueryItem> = Self::send_json(request, "task query").await?;

        let tasks = items
            .into_iter()
            .filter_map(|item| item.document)
            .filter_map(|doc| match doc.to_task() {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed task document");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(count = tasks.len(), "Fetched tasks");
        Ok(tasks)
    }

    async fn create_task(&self, token: &str, task: &Task) -> Result<Task, ApiError> {
        let request = self
            .client
            .post(self.endpoints.collection_url())
            .bearer_auth(token)
            .json(&Document::from_task(task));

        let created: Document = Self::send_json(request, "create task").await?;
        created.to_task().map_err(ApiError::InvalidResponse)
    }

    async fn set_completed(
        &self,
        token: &str,
        id: &TaskId,
        completed: bool,
    ) -> Result<(), ApiError> {
        let url = self.endpoints.task_url(id)?;
        let response = self
            .client
            .patch(url)
            .query(&[("updateMask.fieldPaths", "isCompleted")])
            .bearer_auth(token)
            .json(&Document::completion_patch(completed))
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }
}
