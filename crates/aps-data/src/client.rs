//! Bearer-authenticated GET client for the APS read APIs

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Default base URL for the Data Management endpoints
pub const DEFAULT_DATA_BASE_URL: &str = "https://developer.api.autodesk.com";

/// Default user-profile (OIDC userinfo) endpoint
pub const DEFAULT_USERINFO_URL: &str = "https://api.userprofile.autodesk.com/userinfo";

/// Client for the hubs/projects/folders/items read endpoints.
///
/// Which of the session's two tokens to pass is the caller's decision; every
/// method simply attaches the given bearer token.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: reqwest::Client,
    base_url: String,
    userinfo_url: String,
}

impl DataClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_DATA_BASE_URL.into(),
            userinfo_url: DEFAULT_USERINFO_URL.into(),
        }
    }

    /// Point the client at a different Data Management host (tests, staging).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Point the client at a different userinfo endpoint.
    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    /// Fetch the authenticated user's profile document.
    pub async fn user_profile(&self, token: &str) -> Result<Value> {
        let url = self.userinfo_url.clone();
        self.get_json(&url, token).await
    }

    /// List hubs visible to the token.
    pub async fn hubs(&self, token: &str) -> Result<Value> {
        let url = format!("{}/project/v1/hubs", self.base_url);
        self.get_data(&url, token).await
    }

    /// List projects in a hub.
    pub async fn projects(&self, hub_id: &str, token: &str) -> Result<Value> {
        let url = format!(
            "{}/project/v1/hubs/{}/projects",
            self.base_url,
            encode_segment(hub_id)
        );
        self.get_data(&url, token).await
    }

    /// List a project's top-level folders.
    pub async fn top_folders(&self, hub_id: &str, project_id: &str, token: &str) -> Result<Value> {
        let url = format!(
            "{}/project/v1/hubs/{}/projects/{}/topFolders",
            self.base_url,
            encode_segment(hub_id),
            encode_segment(project_id)
        );
        self.get_data(&url, token).await
    }

    /// List the contents of a folder within a project.
    pub async fn folder_contents(
        &self,
        project_id: &str,
        folder_id: &str,
        token: &str,
    ) -> Result<Value> {
        let url = format!(
            "{}/data/v1/projects/{}/folders/{}/contents",
            self.base_url,
            encode_segment(project_id),
            encode_segment(folder_id)
        );
        self.get_data(&url, token).await
    }

    /// List the versions of an item.
    pub async fn item_versions(&self, project_id: &str, item_id: &str, token: &str) -> Result<Value> {
        let url = format!(
            "{}/data/v1/projects/{}/items/{}/versions",
            self.base_url,
            encode_segment(project_id),
            encode_segment(item_id)
        );
        self.get_data(&url, token).await
    }

    /// GET a JSON:API collection document and extract its `data` array.
    async fn get_data(&self, url: &str, token: &str) -> Result<Value> {
        let mut doc = self.get_json(url, token).await?;
        Ok(doc
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Array(Vec::new())))
    }

    async fn get_json(&self, url: &str, token: &str) -> Result<Value> {
        debug!(url, "upstream read");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("upstream request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading upstream response: {e}")))?;

        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

/// Percent-encode the characters that appear in APS resource ids (project
/// ids like `b.7f0be...`, folder urns like `urn:adsk.wipprod:fs.folder:co.x`)
/// and would otherwise break path routing.
fn encode_segment(s: &str) -> String {
    s.replace('%', "%25")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('#', "%23")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::routing::get;

    async fn start_mock_upstream() -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            let app = Router::new()
                .route(
                    "/project/v1/hubs",
                    get(|headers: HeaderMap| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        axum::Json(serde_json::json!({
                            "jsonapi": {"version": "1.0"},
                            "data": [{"type": "hubs", "id": "b.hub-1", "auth_seen": auth}],
                        }))
                    }),
                )
                .route(
                    "/project/v1/hubs/{hub}/projects",
                    get(|| async {
                        (
                            StatusCode::FORBIDDEN,
                            axum::Json(serde_json::json!({"developerMessage": "no access to hub"})),
                        )
                    }),
                )
                .route(
                    "/userinfo",
                    get(|| async {
                        axum::Json(serde_json::json!({"sub": "u1", "name": "Ada Lovelace"}))
                    }),
                )
                .fallback(|uri: Uri| async move {
                    axum::Json(serde_json::json!({"data": [], "path_seen": uri.path()}))
                });
            axum::serve(listener, app).await.unwrap();
        });

        (url, handle)
    }

    fn test_client(url: &str) -> DataClient {
        DataClient::new(reqwest::Client::new())
            .with_base_url(url)
            .with_userinfo_url(format!("{url}/userinfo"))
    }

    #[tokio::test]
    async fn hubs_extracts_data_array_and_sends_bearer() {
        let (url, _server) = start_mock_upstream().await;
        let client = test_client(&url);

        let hubs = client.hubs("at_secret").await.unwrap();
        let hubs = hubs.as_array().expect("data must be an array");
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0]["id"], "b.hub-1");
        assert_eq!(hubs[0]["auth_seen"], "Bearer at_secret");
    }

    #[tokio::test]
    async fn non_2xx_passes_through_status_and_body() {
        let (url, _server) = start_mock_upstream().await;
        let client = test_client(&url);

        let result = client.projects("b.hub-1", "at").await;
        match result {
            Err(Error::Upstream { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("no access to hub"));
            }
            other => panic!("expected Upstream error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn user_profile_returns_whole_document() {
        let (url, _server) = start_mock_upstream().await;
        let client = test_client(&url);

        let profile = client.user_profile("at").await.unwrap();
        assert_eq!(profile["name"], "Ada Lovelace");
    }

    #[tokio::test]
    async fn folder_urns_are_encoded_in_the_path() {
        let (url, _server) = start_mock_upstream().await;
        let client = test_client(&url);

        // The fallback echoes the (decoded) path; the request must not have
        // been split by the colons in the urn
        let contents = client
            .folder_contents("b.proj", "urn:adsk.wipprod:fs.folder:co.x", "at")
            .await
            .unwrap();
        // fallback returns {"data": [...]} so get_data extracted the array
        assert!(contents.is_array());
    }

    #[tokio::test]
    async fn unreachable_upstream_maps_to_http_error() {
        let client = test_client("http://127.0.0.1:1");
        let result = client.hubs("at").await;
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[test]
    fn encode_segment_escapes_urn_characters() {
        assert_eq!(
            encode_segment("urn:adsk.wipprod:fs.folder:co.x"),
            "urn%3Aadsk.wipprod%3Afs.folder%3Aco.x"
        );
        assert_eq!(encode_segment("b.project-1"), "b.project-1");
        assert_eq!(encode_segment("a/b%c"), "a%2Fb%25c");
    }
}
