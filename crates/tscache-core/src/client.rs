//! HTTP access to the registry: the package catalog and the legacy profile
//! endpoint, with bounded retries on throttling and server errors.

use crate::config::{Config, RegistryConfig, RetryPolicy};
use crate::{Error, Package, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode, Url};
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, instrument, warn};

/// Longest response body kept in [`Error::Transport`].
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the registry's package list and legacy profile endpoints
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: Url,
    community: String,
    retry: RetryPolicy,
}

impl RegistryClient {
    /// Creates a client from the loaded configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_settings(&config.registry, config.profile.clone())
    }

    /// Creates a client with explicit registry settings and retry policy (primarily for tests)
    pub fn with_settings(registry: &RegistryConfig, retry: RetryPolicy) -> Result<Self> {
        let base_url = Url::parse(registry.base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid registry base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Registry base URL '{base_url}' cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(registry.request_timeout())
            .user_agent(registry.user_agent.clone())
            .gzip(true)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            base_url,
            community: registry.community.clone(),
            retry,
        })
    }

    /// Community whose catalog [`fetch_catalog`](Self::fetch_catalog) returns
    pub fn community(&self) -> &str {
        &self.community
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    fn package_list_url(&self, community: &str) -> Url {
        self.endpoint(&["c", community, "api", "v1", "package"])
    }

    fn legacy_profile_url(&self, code: &str) -> Url {
        self.endpoint(&["api", "experimental", "legacyprofile", "get", code])
    }

    /// Fetches the full package catalog for the configured community.
    ///
    /// No retry here; the refresh loop simply tries again next interval.
    pub async fn fetch_catalog(&self) -> Result<Vec<Package>> {
        self.fetch_packages(&self.community).await
    }

    /// Fetches the package metadata for one community
    pub async fn fetch_community_packages(&self, community: &str) -> Result<Vec<Package>> {
        let community = community.trim();
        if community.is_empty() {
            return Err(Error::InvalidInput("community is empty".to_string()));
        }
        self.fetch_packages(community).await
    }

    #[instrument(skip(self))]
    async fn fetch_packages(&self, community: &str) -> Result<Vec<Package>> {
        let url = self.package_list_url(community);
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(transport_error(response).await);
        }

        let body = response.bytes().await?;
        let packages: Vec<Package> = serde_json::from_slice(&body).map_err(|e| {
            Error::Format(format!("package list from {url} did not decode: {e}"))
        })?;

        info!("Fetched {} packages ({} bytes) for {}", packages.len(), body.len(), community);
        Ok(packages)
    }

    /// Fetches the raw text of a legacy profile export.
    ///
    /// Retries 429 and 5xx answers with exponential backoff, honouring
    /// `Retry-After`. When a deadline is given the whole exchange, sleeps
    /// included, must finish before it or [`Error::Timeout`] is returned.
    #[instrument(skip(self, deadline))]
    pub async fn fetch_legacy_profile(&self, code: &str, deadline: Option<Instant>) -> Result<String> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::InvalidInput("profile code is empty".to_string()));
        }

        let url = self.legacy_profile_url(code);
        let exchange = self.get_text_with_retry(url, code);
        match deadline {
            Some(deadline) => timeout_at(deadline, exchange).await.map_err(|_| {
                Error::Timeout(format!("profile '{code}' was not fetched before the deadline"))
            })?,
            None => exchange.await,
        }
    }

    async fn get_text_with_retry(&self, url: Url, code: &str) -> Result<String> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.text().await?);
            }

            if status == StatusCode::NOT_FOUND {
                return Err(Error::KeyNotFound(format!(
                    "profile code '{code}' was not found; it may be expired or mistyped"
                )));
            }

            let last = attempt == max_attempts;

            if status == StatusCode::TOO_MANY_REQUESTS {
                if last {
                    return Err(Error::RateLimited { attempts: attempt });
                }
                let delay = retry_after_secs(&response)
                    .map_or_else(|| self.retry.backoff(attempt), |s| self.retry.retry_after(s));
                warn!("Rate limited (attempt {}/{}), retrying in {:?}", attempt, max_attempts, delay);
                sleep(delay).await;
                continue;
            }

            if status.is_server_error() && !last {
                let delay = self.retry.backoff(attempt);
                warn!("Server error {} (attempt {}/{}), retrying in {:?}", status, attempt, max_attempts, delay);
                sleep(delay).await;
                continue;
            }

            return Err(transport_error(response).await);
        }

        Err(Error::RateLimited {
            attempts: max_attempts,
        })
    }
}

/// Positive integer `Retry-After` seconds, if the server sent one.
fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&secs| secs > 0)
}

async fn transport_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Error::Transport { status, body }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const PROFILE_PATH: &str = "/api/experimental/legacyprofile/get/abc-123/";

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 1,
            backoff_factor: 1.8,
            max_backoff_ms: 5,
            max_retry_after_secs: 0,
            timeout_secs: 5,
        }
    }

    fn client_for(server: &MockServer, retry: RetryPolicy) -> RegistryClient {
        let registry = RegistryConfig {
            base_url: server.uri(),
            community: "valheim".to_string(),
            ..RegistryConfig::default()
        };
        RegistryClient::with_settings(&registry, retry).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let registry = RegistryConfig {
            base_url: "https://thunderstore.io/".to_string(),
            ..RegistryConfig::default()
        };
        let client = RegistryClient::with_settings(&registry, RetryPolicy::default()).unwrap();
        assert_eq!(
            client.package_list_url("valheim").as_str(),
            "https://thunderstore.io/c/valheim/api/v1/package/"
        );
        assert_eq!(
            client.legacy_profile_url("01 9a").as_str(),
            "https://thunderstore.io/api/experimental/legacyprofile/get/01%209a/"
        );
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let registry = RegistryConfig {
            base_url: "not a url".to_string(),
            ..RegistryConfig::default()
        };
        assert!(matches!(
            RegistryClient::with_settings(&registry, RetryPolicy::default()),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_catalog_decodes_packages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/c/valheim/api/v1/package/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"owner":"Azumatt","name":"AzuCraftyBoxes","versions":[{"version_number":"1.0.0","downloads":3}]}]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let packages = client_for(&server, fast_retry(1)).fetch_catalog().await.unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].total_downloads(), 3);
    }

    #[tokio::test]
    async fn test_fetch_catalog_bad_body_is_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/c/valheim/api/v1/package/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"detail\": \"oops\"}"))
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(1)).fetch_catalog().await.unwrap_err();
        assert!(matches!(err, Error::Format(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_community_packages_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/c/lethal-company/api/v1/package/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(3))
            .fetch_community_packages("lethal-company")
            .await
            .unwrap_err();
        match err {
            Error::Transport { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            },
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_profile_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(5))
            .fetch_legacy_profile("abc-123", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_profile_rate_limit_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("#r2modmanAAAA"))
            .mount(&server)
            .await;

        let text = client_for(&server, fast_retry(5))
            .fetch_legacy_profile(" abc-123 ", None)
            .await
            .unwrap();
        assert_eq!(text, "#r2modmanAAAA");
    }

    #[tokio::test]
    async fn test_profile_rate_limit_exhausts_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(3))
            .fetch_legacy_profile("abc-123", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited { attempts: 3 }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_profile_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("#r2modman"))
            .mount(&server)
            .await;

        let text = client_for(&server, fast_retry(2))
            .fetch_legacy_profile("abc-123", None)
            .await
            .unwrap();
        assert_eq!(text, "#r2modman");
    }

    #[tokio::test]
    async fn test_profile_server_error_on_last_attempt_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(2))
            .fetch_legacy_profile("abc-123", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { status: 502, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_profile_retry_after_overrides_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("#r2modman"))
            .mount(&server)
            .await;

        // Computed backoff alone would blow the deadline; the clamped
        // Retry-After (0s) must be used instead.
        let retry = RetryPolicy {
            initial_backoff_ms: 30_000,
            max_backoff_ms: 30_000,
            ..fast_retry(3)
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        let text = client_for(&server, retry)
            .fetch_legacy_profile("abc-123", Some(deadline))
            .await
            .unwrap();
        assert_eq!(text, "#r2modman");
    }

    #[tokio::test]
    async fn test_profile_deadline_is_distinct_from_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let retry = RetryPolicy {
            max_retry_after_secs: 60,
            ..fast_retry(5)
        };
        let deadline = Instant::now() + Duration::from_millis(300);
        let err = client_for(&server, retry)
            .fetch_legacy_profile("abc-123", Some(deadline))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_empty_profile_code_is_rejected() {
        let server = MockServer::start().await;
        let err = client_for(&server, fast_retry(1))
            .fetch_legacy_profile("   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
