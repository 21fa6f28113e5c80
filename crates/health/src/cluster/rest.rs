//! REST client for the cluster management API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use health_config::ClusterSettings;

use super::{ClusterConnector, ClusterSession};
use crate::error::AcquisitionError;

const LOGIN_PATH: &str = "/v1/session/login";
const NODES_PATH: &str = "/v1/cluster/nodes/";
const SLOTS_PATH: &str = "/v1/cluster/slots/";
const SETTINGS_PATH: &str = "/v1/cluster/settings";
const NODE_STATE_PATH: &str = "/v1/node/state";
const TIME_STATUS_PATH: &str = "/v1/time/status";
const VERSION_PATH: &str = "/v1/version";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    bearer_token: String,
}

/// Connects to the cluster REST endpoint and logs in.
#[derive(Clone)]
pub struct RestConnector {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl RestConnector {
    /// Build a connector for `https://<address>:<rest_port>`.
    pub fn from_settings(settings: &ClusterSettings) -> Result<Self, AcquisitionError> {
        let host = if settings.address.contains(':') && !settings.address.starts_with('[') {
            format!("[{}]", settings.address)
        } else {
            settings.address.clone()
        };

        Self::new(
            &format!("https://{host}:{}", settings.rest_port),
            &settings.username,
            &settings.password,
            Duration::from_secs(settings.timeout_secs),
            settings.accept_invalid_certs,
        )
    }

    /// Build a connector for an explicit base URL.
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| AcquisitionError::Connect {
                endpoint: base_url.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            timeout,
        })
    }

    /// Check that the REST port accepts TCP connections before logging in.
    async fn probe(&self) -> Result<(), AcquisitionError> {
        let unreachable = |reason: String| AcquisitionError::Connect {
            endpoint: self.base_url.clone(),
            reason,
        };

        let url = Url::parse(&self.base_url).map_err(|e| unreachable(e.to_string()))?;
        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .ok_or_else(|| unreachable("URL has no host".to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| unreachable("URL has no port".to_string()))?;

        match tokio::time::timeout(self.timeout, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(_stream)) => {
                debug!(host = %host, port, "Cluster port reachable");
                Ok(())
            }
            Ok(Err(e)) => Err(unreachable(e.to_string())),
            Err(_) => Err(AcquisitionError::Timeout {
                query: format!("connect {host}:{port}"),
            }),
        }
    }
}

#[async_trait]
impl ClusterConnector for RestConnector {
    fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    async fn connect(&self) -> Result<Box<dyn ClusterSession>, AcquisitionError> {
        self.probe().await?;

        let url = format!("{}{LOGIN_PATH}", self.base_url);
        debug!(url = %url, user = %self.username, "Logging in");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| map_request_error(&self.base_url, "login", &e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Cluster rejected credentials");
            return Err(AcquisitionError::Auth(format!(
                "invalid credentials for user '{}' ({status}): {text}",
                self.username
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AcquisitionError::query("login", format!("{status}: {text}")));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| map_request_error(&self.base_url, "login", &e))?;

        info!(endpoint = %self.base_url, "Logged in to cluster");

        Ok(Box::new(RestSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: login.bearer_token,
        }))
    }
}

/// Authenticated REST session.
pub struct RestSession {
    client: Client,
    base_url: String,
    token: String,
}

impl RestSession {
    /// Make an authenticated GET request.
    async fn get(&self, path: &str) -> Result<Value, AcquisitionError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| map_request_error(&self.base_url, path, &e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AcquisitionError::Auth(format!("{path} returned {status}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AcquisitionError::query(path, format!("{status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| map_request_error(&self.base_url, path, &e))
    }

    async fn get_list(&self, path: &str) -> Result<Vec<Value>, AcquisitionError> {
        match self.get(path).await? {
            Value::Array(items) => Ok(items),
            other => Err(AcquisitionError::query(
                path,
                format!("expected a JSON array, got {}", json_type(&other)),
            )),
        }
    }

    async fn get_string_field(&self, path: &str, field: &str) -> Result<String, AcquisitionError> {
        let value = self.get(path).await?;
        match value.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(AcquisitionError::query(
                path,
                format!("response has no string field '{field}'"),
            )),
        }
    }
}

#[async_trait]
impl ClusterSession for RestSession {
    async fn list_nodes(&self) -> Result<Vec<Value>, AcquisitionError> {
        self.get_list(NODES_PATH).await
    }

    async fn list_drives(&self) -> Result<Vec<Value>, AcquisitionError> {
        self.get_list(SLOTS_PATH).await
    }

    async fn cluster_name(&self) -> Result<String, AcquisitionError> {
        self.get_string_field(SETTINGS_PATH, "cluster_name").await
    }

    async fn cluster_uuid(&self) -> Result<String, AcquisitionError> {
        self.get_string_field(NODE_STATE_PATH, "cluster_id").await
    }

    async fn cluster_time(&self) -> Result<String, AcquisitionError> {
        self.get_string_field(TIME_STATUS_PATH, "time").await
    }

    async fn software_version(&self) -> Result<String, AcquisitionError> {
        self.get_string_field(VERSION_PATH, "revision_id").await
    }
}

/// Map a transport-level reqwest error onto the acquisition taxonomy.
fn map_request_error(base_url: &str, query: &str, e: &reqwest::Error) -> AcquisitionError {
    if e.is_timeout() {
        AcquisitionError::Timeout {
            query: query.to_string(),
        }
    } else if e.is_connect() {
        AcquisitionError::Connect {
            endpoint: base_url.to_string(),
            reason: e.to_string(),
        }
    } else {
        AcquisitionError::query(query, e.to_string())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(address: &str) -> ClusterSettings {
        ClusterSettings {
            address: address.to_string(),
            name: "CoffeeTime".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            rest_port: 8000,
            timeout_secs: 5,
            accept_invalid_certs: true,
        }
    }

    #[test]
    fn test_endpoint_from_settings() {
        let connector = RestConnector::from_settings(&settings("10.120.0.34")).unwrap();
        assert_eq!(connector.endpoint(), "https://10.120.0.34:8000");
    }

    #[test]
    fn test_ipv6_address_is_bracketed() {
        let connector = RestConnector::from_settings(&settings("fd00::10")).unwrap();
        assert_eq!(connector.endpoint(), "https://[fd00::10]:8000");
    }

    #[test]
    fn test_json_type_names() {
        assert_eq!(json_type(&serde_json::json!({})), "an object");
        assert_eq!(json_type(&serde_json::json!(null)), "null");
    }
}
