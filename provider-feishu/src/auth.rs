//! Tenant access token management
//!
//! Self-built apps authenticate with an app id and app secret. The tenant
//! token is cached and refreshed shortly before it expires.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{FeishuError, Result};
use crate::types::{TenantTokenRequest, TenantTokenResponse};

/// Refresh the token this many seconds before it expires
pub const TOKEN_REFRESH_BUFFER_SECS: i64 = 60;

const TENANT_TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";

/// Cached tenant token
#[derive(Debug, Clone)]
pub struct TenantToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl TenantToken {
    /// Check whether the token expires within `buffer_seconds` of `now`
    pub fn is_expired_with_buffer(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        now + Duration::seconds(buffer_seconds) >= self.expires_at
    }
}

/// Obtains and caches tenant access tokens
pub struct TenantAuth {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    app_id: String,
    app_secret: String,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<TenantToken>>,
}

impl TenantAuth {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            clock: Arc::new(SystemClock),
            cached: RwLock::new(None),
        }
    }

    /// Replace the time source (tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Return a valid tenant token, fetching a new one when needed
    pub async fn token(&self) -> Result<String> {
        let now = self.clock.now();

        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired_with_buffer(now, TOKEN_REFRESH_BUFFER_SECS) {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired_with_buffer(now, TOKEN_REFRESH_BUFFER_SECS) {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call fetches a fresh one
    pub async fn invalidate(&self) {
        debug!("Invalidating cached tenant token");
        *self.cached.write().await = None;
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<TenantToken> {
        if self.app_id.is_empty() || self.app_secret.is_empty() {
            return Err(FeishuError::AuthenticationFailed(
                "app id and app secret must be configured".to_string(),
            ));
        }

        let url = format!("{}{}", self.base_url, TENANT_TOKEN_PATH);
        let request = HttpRequest::new(HttpMethod::Post, url).json(&TenantTokenRequest {
            app_id: &self.app_id,
            app_secret: &self.app_secret,
        })?;

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(FeishuError::AuthenticationFailed(format!(
                "token endpoint returned status {}",
                response.status
            )));
        }

        let body: TenantTokenResponse = serde_json::from_slice(&response.body).map_err(|e| {
            FeishuError::ParseError(format!("Failed to parse tenant token response: {}", e))
        })?;

        if body.code != 0 || body.tenant_access_token.is_empty() {
            return Err(FeishuError::AuthenticationFailed(format!(
                "code {}: {}",
                body.code, body.msg
            )));
        }

        info!("Obtained tenant access token (expires in {}s)", body.expire);

        Ok(TenantToken {
            value: body.tenant_access_token,
            expires_at: self.clock.now() + Duration::seconds(body.expire),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use bridge_traits::time::FixedClock;
    use bytes::Bytes;
    use chrono::TimeZone;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn token_response(token: &str, expire: i64) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(format!(
                r#"{{"code":0,"msg":"ok","tenant_access_token":"{}","expire":{}}}"#,
                token, expire
            )),
        }
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()))
    }

    #[test]
    fn test_token_expiry_buffer() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let token = TenantToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(90),
        };

        assert!(!token.is_expired_with_buffer(now, 60));
        assert!(token.is_expired_with_buffer(now, 120));
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Post);
                assert!(req.url.ends_with(TENANT_TOKEN_PATH));
                let body = String::from_utf8(req.body.unwrap().to_vec()).unwrap();
                assert!(body.contains("\"app_id\":\"cli_a\""));
                Ok(token_response("t-first", 7200))
            });

        let auth = TenantAuth::new(Arc::new(mock_http), "https://api.test", "cli_a", "secret")
            .with_clock(fixed_clock());

        assert_eq!(auth.token().await.unwrap(), "t-first");
        assert_eq!(auth.token().await.unwrap(), "t-first");
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refetched() {
        let mut mock_http = MockHttpClient::new();
        let mut counter = 0;
        mock_http.expect_execute().times(2).returning(move |_| {
            counter += 1;
            // Lifetime inside the refresh buffer
            Ok(token_response(&format!("t-{}", counter), 30))
        });

        let auth = TenantAuth::new(Arc::new(mock_http), "https://api.test", "cli_a", "secret")
            .with_clock(fixed_clock());

        assert_eq!(auth.token().await.unwrap(), "t-1");
        assert_eq!(auth.token().await.unwrap(), "t-2");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(2)
            .returning(|_| Ok(token_response("t-abc", 7200)));

        let auth = TenantAuth::new(Arc::new(mock_http), "https://api.test", "cli_a", "secret")
            .with_clock(fixed_clock());

        auth.token().await.unwrap();
        auth.invalidate().await;
        auth.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from(r#"{"code":10014,"msg":"app secret invalid"}"#),
            })
        });

        let auth = TenantAuth::new(Arc::new(mock_http), "https://api.test", "cli_a", "wrong");
        let result = auth.token().await;

        assert!(matches!(result, Err(FeishuError::AuthenticationFailed(msg)) if msg.contains("10014")));
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_request() {
        let mock_http = MockHttpClient::new();
        let auth = TenantAuth::new(Arc::new(mock_http), "https://api.test", "", "");

        assert!(matches!(
            auth.token().await,
            Err(FeishuError::AuthenticationFailed(_))
        ));
    }
}
