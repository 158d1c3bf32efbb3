//! HTTP transport for the admin service.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::{DataProxyApi, LaunchPlansApi, ProjectsApi, TasksApi, WorkflowsApi};
use crate::error::{ALREADY_EXISTS_CODE, Error, ErrorResponse, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for source archive uploads.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Typed client for the admin service REST API. Cheap to clone.
///
/// # Example
///
/// ```no_run
/// use flowctl_client::AdminClient;
///
/// # async fn example() -> flowctl_client::Result<()> {
/// let client = AdminClient::builder()
///     .base_url("http://localhost:30080")
///     .build()?;
///
/// let projects = client.projects().list().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    /// Always ends in `/` so relative joins keep the full path.
    base_url: Url,
    timeout: Duration,
    upload_timeout: Duration,
}

impl AdminClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn tasks(&self) -> TasksApi {
        TasksApi::new(self.clone())
    }

    pub fn workflows(&self) -> WorkflowsApi {
        WorkflowsApi::new(self.clone())
    }

    pub fn launch_plans(&self) -> LaunchPlansApi {
        LaunchPlansApi::new(self.clone())
    }

    pub fn projects(&self) -> ProjectsApi {
        ProjectsApi::new(self.clone())
    }

    /// Signed upload locations for source archives.
    pub fn data_proxy(&self) -> DataProxyApi {
        DataProxyApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────────

    /// `<base>/api/v1/<path>`.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        Ok(self.inner.base_url.join(&format!("api/v1/{path}"))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        tracing::debug!(%method, %url, "admin request");
        Ok(self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.request(Method::GET, path)?.send().await?).await
    }

    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        decode(self.request(Method::GET, path)?.query(query).send().await?).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        decode(self.request(Method::POST, path)?.json(body).send().await?).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        decode(self.request(Method::PUT, path)?.json(body).send().await?).await
    }

    /// Upload raw bytes to a signed URL. Relative targets resolve against the base URL.
    pub(crate) async fn put_bytes(&self, target: &str, bytes: Vec<u8>) -> Result<()> {
        let url = match Url::parse(target) {
            Ok(url) => url,
            Err(_) => self.inner.base_url.join(target.trim_start_matches('/'))?,
        };
        tracing::debug!(%url, size = bytes.len(), "uploading artifact");
        let response = self
            .inner
            .http
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .timeout(self.inner.upload_timeout)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from(response).await)
        }
    }
}

/// Decode a JSON body. An empty body reads as `{}`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    let body = response.bytes().await?;
    let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
    Ok(serde_json::from_slice(body)?)
}

/// Map a non-2xx response onto [`Error`].
async fn error_from(response: Response) -> Error {
    let status = response.status().as_u16();
    let Ok(body) = response.json::<ErrorResponse>().await else {
        return Error::Api {
            status,
            code: "unknown".to_string(),
            message: format!("HTTP {status}"),
        };
    };
    match status {
        401 => Error::Auth(body.message),
        404 => Error::NotFound(body.message),
        409 if body.code == ALREADY_EXISTS_CODE => Error::AlreadyExists(body.message),
        409 => Error::Conflict(body.message),
        _ => Error::Api {
            status,
            code: body.code,
            message: body.message,
        },
    }
}

/// Builder for [`AdminClient`]. Only the base URL is required.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    auth_token: Option<String>,
    timeout: Duration,
    upload_timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            user_agent: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn maybe_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<AdminClient> {
        let Some(raw) = self.base_url else {
            return Err(Error::Config("an admin base URL is required".to_string()));
        };
        let mut base_url = Url::parse(&raw)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::Config("auth token is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("flowctl-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(AdminClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                upload_timeout: self.upload_timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:30080")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:30080/");

        let client = ClientBuilder::new()
            .base_url("http://localhost:30080/")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:30080/");
    }

    #[test]
    fn test_url_building() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:30080")
            .build()
            .unwrap();

        let url = client.url("tasks").unwrap();
        assert_eq!(url.as_str(), "http://localhost:30080/api/v1/tasks");

        let url = client.url("/launch_plans/p/d").unwrap();
        assert_eq!(url.as_str(), "http://localhost:30080/api/v1/launch_plans/p/d");
    }

    #[test]
    fn test_invalid_token_rejected() {
        let result = ClientBuilder::new()
            .base_url("http://localhost:30080")
            .auth_token("bad\ntoken")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
