//! Auth key retrieval
//!
//! The store answers a lookup with a map of secret name to value; the
//! credential is the entry keyed by the exact name that was asked for.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::{SecretBackend, SecretSettings};
use crate::error::SecretError;
use crate::identity::SecretReference;

/// Tailnet auth key. Kept in memory only, wiped on drop, never printed.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Secret store client
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<HashMap<String, String>, SecretError>;
}

/// Fetch the auth key stored under `name`.
///
/// A response without an entry for `name`, or with an empty one, is
/// reported as [`SecretError::NotFound`].
pub async fn fetch_secret(
    store: &dyn SecretStore,
    name: &SecretReference,
) -> Result<Credential, SecretError> {
    let mut response = store.get_secret(name.as_str()).await?;
    match response.remove(name.as_str()) {
        Some(value) if !value.is_empty() => Ok(Credential::new(value)),
        _ => Err(SecretError::NotFound {
            name: name.to_string(),
        }),
    }
}

/// Build the store selected in settings
pub fn store_from_settings(settings: &SecretSettings) -> Box<dyn SecretStore> {
    match settings.backend {
        SecretBackend::Http => {
            let token = std::env::var(&settings.token_env).ok().filter(|t| !t.is_empty());
            Box::new(HttpSecretStore::new(&settings.url, token))
        }
        SecretBackend::Env => Box::new(EnvSecretStore),
    }
}

/// HTTP secret store: `GET {base}/secrets/{name}` answering a JSON object.
pub struct HttpSecretStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSecretStore {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/secrets/{}", self.base_url, name)
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    async fn get_secret(&self, name: &str) -> Result<HashMap<String, String>, SecretError> {
        let transport = |reason: String| SecretError::TransportFailure {
            name: name.to_string(),
            reason,
        };

        let url = self.url_for(name);
        debug!("Fetching secret {} from {}", name, self.base_url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| transport(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SecretError::NotFound {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(transport(format!("store answered {}", status)));
        }

        response
            .json::<HashMap<String, String>>()
            .await
            .map_err(|e| transport(format!("malformed response: {}", e)))
    }
}

/// Secrets injected into the process environment by the invoking wrapper
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<HashMap<String, String>, SecretError> {
        match std::env::var(name) {
            Ok(value) => Ok(HashMap::from([(name.to_string(), value)])),
            Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(SecretError::TransportFailure {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemorySecretStore;
    use crate::identity::NodeIdentity;

    fn reference(hostname: &str) -> SecretReference {
        SecretReference::derive(&NodeIdentity::new(hostname).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_extracts_keyed_value() {
        let store = MemorySecretStore::new().with("TAILSCALE_AUTHKEY_EDGE_NODE_7", "tskey-abc");
        let credential = fetch_secret(&store, &reference("edge-node-7")).await.unwrap();

        assert_eq!(credential.expose(), "tskey-abc");
        assert_eq!(store.requests(), vec!["TAILSCALE_AUTHKEY_EDGE_NODE_7"]);
    }

    #[tokio::test]
    async fn test_fetch_missing_secret() {
        let store = MemorySecretStore::new();
        let err = fetch_secret(&store, &reference("edge-node-7")).await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { name } if name == "TAILSCALE_AUTHKEY_EDGE_NODE_7"));
    }

    #[tokio::test]
    async fn test_response_without_requested_key() {
        let store = MemorySecretStore::new().answering_with(HashMap::from([(
            "SOMETHING_ELSE".to_string(),
            "tskey-other".to_string(),
        )]));
        let err = fetch_secret(&store, &reference("edge")).await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_value_is_not_found() {
        let store = MemorySecretStore::new().with("TAILSCALE_AUTHKEY_EDGE", "");
        let err = fetch_secret(&store, &reference("edge")).await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let store = MemorySecretStore::new().failing("connection refused");
        let err = fetch_secret(&store, &reference("edge")).await.unwrap_err();
        assert!(matches!(err, SecretError::TransportFailure { reason, .. } if reason == "connection refused"));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("tskey-super-secret");
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("tskey"));
    }

    #[tokio::test]
    async fn test_unreachable_http_store_is_transport_failure() {
        let store = HttpSecretStore::new("http://127.0.0.1:1/", None);
        assert_eq!(store.url_for("X"), "http://127.0.0.1:1/secrets/X");

        let err = store.get_secret("X").await.unwrap_err();
        assert!(matches!(err, SecretError::TransportFailure { .. }));
    }

    /// Serve one canned HTTP response on a local port; the returned handle
    /// yields the raw request that was received.
    async fn serve_once(
        status: &str,
        body: &str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    #[tokio::test]
    async fn test_http_store_returns_keyed_secret() {
        let (base, server) =
            serve_once("200 OK", r#"{"TAILSCALE_AUTHKEY_EDGE":"tskey-http"}"#).await;
        let store = HttpSecretStore::new(&base, Some("ops-token".to_string()));

        let credential = fetch_secret(&store, &reference("edge")).await.unwrap();
        assert_eq!(credential.expose(), "tskey-http");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /secrets/TAILSCALE_AUTHKEY_EDGE "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer ops-token"));
    }

    #[tokio::test]
    async fn test_http_store_404_is_not_found() {
        let (base, server) = serve_once("404 Not Found", "{}").await;
        let store = HttpSecretStore::new(&base, None);

        let err = store.get_secret("TAILSCALE_AUTHKEY_EDGE").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { name } if name == "TAILSCALE_AUTHKEY_EDGE"));

        let request = server.await.unwrap();
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_http_store_500_is_transport_failure() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;
        let store = HttpSecretStore::new(&base, None);

        let err = store.get_secret("X").await.unwrap_err();
        assert!(matches!(err, SecretError::TransportFailure { reason, .. } if reason.contains("500")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_store_malformed_body_is_transport_failure() {
        let (base, server) = serve_once("200 OK", "not json at all").await;
        let store = HttpSecretStore::new(&base, None);

        let err = store.get_secret("X").await.unwrap_err();
        assert!(matches!(err, SecretError::TransportFailure { reason, .. } if reason.contains("malformed")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_env_store_present_and_absent() {
        let present = format!("TAILGATE_TEST_SECRET_PRESENT_{}", std::process::id());
        let absent = format!("TAILGATE_TEST_SECRET_ABSENT_{}", std::process::id());
        std::env::set_var(&present, "tskey-env");
        std::env::remove_var(&absent);

        let store = EnvSecretStore;
        let found = store.get_secret(&present).await.unwrap();
        assert_eq!(found.get(&present).map(String::as_str), Some("tskey-env"));

        let err = store.get_secret(&absent).await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { name } if name == absent));

        std::env::remove_var(&present);
    }
}
