use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use swarmdeploy_shared::{DeployError, DeployResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// Status and decoded body of an admin API call.
///
/// Bodies that are not JSON are kept as a JSON string; empty bodies are null.
#[derive(Debug, Clone)]
pub struct AdminResponse {
    pub status: u16,
    pub body: Value,
}

impl AdminResponse {
    pub fn is(&self, codes: &[u16]) -> bool {
        codes.contains(&self.status)
    }

    /// `"<status> <body>"` for error messages.
    pub fn describe(&self) -> String {
        match &self.body {
            Value::Null => self.status.to_string(),
            Value::String(s) => format!("{} {}", self.status, s),
            other => format!("{} {}", self.status, other),
        }
    }
}

/// Keycloak admin REST surface used by the bootstrap.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Access token for `admin-cli` on the master realm (password grant).
    async fn admin_token(&self, username: &str, password: &str) -> DeployResult<String>;

    /// Authenticated call to `path` (e.g. `/admin/realms/statechecker`).
    async fn call(
        &self,
        token: &str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> DeployResult<AdminResponse>;
}

/// [`AdminApi`] over HTTP.
pub struct HttpAdmin {
    client: Client,
    base_url: String,
}

impl HttpAdmin {
    pub fn new(base_url: &str) -> DeployResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeployError::Http(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn http_error(url: &str, err: reqwest::Error) -> DeployError {
    DeployError::Http(format!("request to {} failed: {}", url, err))
}

#[async_trait]
impl AdminApi for HttpAdmin {
    async fn admin_token(&self, username: &str, password: &str) -> DeployResult<String> {
        let url = self.url("/realms/master/protocol/openid-connect/token");
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", "admin-cli"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| http_error(&url, e))?;
        if !status.is_success() {
            return Err(DeployError::Keycloak(format!(
                "failed to obtain admin token: {} {}",
                status.as_u16(),
                text
            )));
        }

        let body: Value = serde_json::from_str(&text)?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DeployError::Keycloak("token response missing access_token".into()))
    }

    async fn call(
        &self,
        token: &str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> DeployResult<AdminResponse> {
        let url = self.url(path);
        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        }
        .bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| http_error(&url, e))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| http_error(&url, e))?;
        tracing::debug!(?method, path, status, "Keycloak admin call");

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(AdminResponse { status, body })
    }
}
