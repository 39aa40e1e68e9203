// Shared HTTP plumbing for provider clients.
//
// One `ProviderHttp` per vendor: it owns the reqwest client (timeout), the
// vendor's auth scheme, the fixed-delay retry policy and an optional request
// rate limit. Provider clients only build paths and parse bodies.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::metrics;
use crate::settings::Http;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// How a vendor expects its API key.
#[derive(Debug, Clone)]
pub enum ApiAuth {
    Header(&'static str),
    Query(&'static str),
}

/// Fixed attempt budget with a fixed pause between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(http: &Http) -> Self {
        Self {
            attempts: http.retry_attempts.max(1),
            delay: http.retry_delay(),
        }
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.delay).take(self.attempts.saturating_sub(1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Outcome of a single attempt, before retry classification.
#[derive(Debug)]
enum AttemptError {
    /// Timeout (including 408), connection failure, 5xx, 429.
    Transient(String),
    NotFound,
    Status(StatusCode),
    Decode(String),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        matches!(self, AttemptError::Transient(_))
    }

    fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::NOT_FOUND {
            AttemptError::NotFound
        } else if status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
        {
            AttemptError::Transient(format!("HTTP {}", status))
        } else {
            AttemptError::Status(status)
        }
    }
}

/// Vendor endpoint with retry, auth and rate limiting applied to every GET.
pub struct ProviderHttp {
    provider: &'static str,
    client: reqwest::Client,
    base_url: String,
    auth: ApiAuth,
    api_key: String,
    retry: RetryPolicy,
    limiter: Option<DirectRateLimiter>,
}

impl ProviderHttp {
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        auth: ApiAuth,
        api_key: impl Into<String>,
        http: &Http,
        qps_limit: Option<u32>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout())
            .user_agent(concat!("matchday-oracle/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let limiter = qps_limit
            .and_then(NonZeroU32::new)
            .map(|qps| RateLimiter::direct(Quota::per_second(qps)));

        Ok(Self {
            provider,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            api_key: api_key.into(),
            retry: RetryPolicy::from_settings(http),
            limiter,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// GET `base_url + path` and decode the JSON body.
    ///
    /// `match_id` is only used to label a 404 as `NotFound`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        match_id: Option<u64>,
    ) -> Result<T, ProviderError> {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result = RetryIf::spawn(
            self.retry.strategy(),
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.attempt::<T>(path, query)
            },
            |e: &AttemptError| {
                if e.is_transient() {
                    warn!(
                        provider = self.provider,
                        path,
                        attempt = attempts.load(Ordering::Relaxed),
                        max_attempts = self.retry.attempts,
                        "provider request failed, retrying in {:?}: {:?}",
                        self.retry.delay,
                        e
                    );
                }
                e.is_transient()
            },
        )
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        metrics::record_provider_request(self.provider, started.elapsed(), result.is_ok());

        result.map_err(|e| match e {
            AttemptError::Transient(reason) => ProviderError::Unavailable {
                provider: self.provider.to_string(),
                attempts,
                reason,
            },
            AttemptError::NotFound => match match_id {
                Some(match_id) => ProviderError::NotFound {
                    provider: self.provider.to_string(),
                    match_id,
                },
                None => ProviderError::Rejected {
                    provider: self.provider.to_string(),
                    status: StatusCode::NOT_FOUND.as_u16(),
                },
            },
            AttemptError::Status(status) => ProviderError::Rejected {
                provider: self.provider.to_string(),
                status: status.as_u16(),
            },
            AttemptError::Decode(reason) => ProviderError::Malformed {
                provider: self.provider.to_string(),
                reason,
            },
        })
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AttemptError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).query(query);
        request = match self.auth {
            ApiAuth::Header(name) => request.header(name, &self.api_key),
            ApiAuth::Query(name) => request.query(&[(name, self.api_key.as_str())]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::from_status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;
        debug!(provider = self.provider, path, bytes = body.len(), "provider response");

        serde_json::from_slice(&body).map_err(|e| AttemptError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(AttemptError::from_status(StatusCode::BAD_GATEWAY).is_transient());
        assert!(AttemptError::from_status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(AttemptError::from_status(StatusCode::REQUEST_TIMEOUT).is_transient());
        assert!(matches!(
            AttemptError::from_status(StatusCode::NOT_FOUND),
            AttemptError::NotFound
        ));
        assert!(matches!(
            AttemptError::from_status(StatusCode::UNAUTHORIZED),
            AttemptError::Status(StatusCode::UNAUTHORIZED)
        ));
    }

    #[test]
    fn retry_strategy_spends_attempts_minus_one_delays() {
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(10),
        };
        let delays: Vec<_> = policy.strategy().collect();
        assert_eq!(delays, vec![Duration::from_millis(10); 2]);

        let single = RetryPolicy {
            attempts: 1,
            delay: Duration::from_millis(10),
        };
        assert_eq!(single.strategy().count(), 0);
    }

    #[tokio::test]
    async fn connection_failures_exhaust_the_budget() {
        let http = Http {
            timeout_seconds: 1,
            retry_attempts: 3,
            retry_delay_ms: 1,
        };
        // Closed port: every attempt fails to connect.
        let client = ProviderHttp::new(
            "closed",
            "http://127.0.0.1:1",
            ApiAuth::Header("X-Auth-Token"),
            "key",
            &http,
            None,
        )
        .unwrap();

        let err = client
            .get_json::<serde_json::Value>("/matches", &[], None)
            .await
            .unwrap_err();
        match err {
            ProviderError::Unavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
