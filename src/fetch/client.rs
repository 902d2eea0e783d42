//! HTTP client with bounded retry for the catalog service.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, REFERER};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Backoff, FetchError, RequestThrottle, RetryPolicy, StatusClass};
use crate::config::HttpSettings;

const CATALOG_REFERER: &str = "https://boardgamegeek.com/";
const API_KEY_HEADER: &str = "x-api-key";

/// Executes read-only GET requests with backoff over transient failures.
///
/// Built once per run; headers and credentials never change afterwards.
pub struct FetchClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    throttle: Arc<RequestThrottle>,
}

impl FetchClient {
    pub fn new(
        settings: &HttpSettings,
        policy: RetryPolicy,
        throttle: Arc<RequestThrottle>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(default_headers(settings)?)
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            policy,
            throttle,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch the body of `url` as text.
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.get_parsed(url, |body| Ok::<_, std::convert::Infallible>(body.to_string()))
            .await
    }

    /// Fetch `url` and run `parse` on the body. A body that fails to parse is
    /// treated like a transient failure: the service sometimes answers 200
    /// with a truncated or placeholder document while it is under load.
    pub async fn get_parsed<T, E, F>(&self, url: &str, parse: F) -> Result<T, FetchError>
    where
        F: Fn(&str) -> Result<T, E> + Send + Sync,
        T: Send,
        E: Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            self.throttle.acquire().await;
            debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);

            let backoff = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match StatusClass::of(status) {
                        StatusClass::Success => match response.text().await {
                            Ok(body) => match parse(&body) {
                                Ok(value) => return Ok(value),
                                Err(e) => {
                                    last_failure = format!("unparsable body: {}", e);
                                    Backoff::Unparsable
                                }
                            },
                            Err(e) => {
                                last_failure = format!("failed to read body: {}", e);
                                Backoff::Transient
                            }
                        },
                        StatusClass::Transient => {
                            last_failure = format!("HTTP {}", status);
                            Backoff::Transient
                        }
                        StatusClass::Throttled => {
                            last_failure = format!("HTTP {}", status);
                            Backoff::Throttled
                        }
                        StatusClass::Permanent => {
                            return Err(FetchError::Rejected {
                                url: url.to_string(),
                                status,
                            });
                        }
                    }
                }
                Err(e) if e.is_builder() => {
                    return Err(FetchError::InvalidRequest {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    last_failure = e.to_string();
                    Backoff::Transient
                }
            };

            if self.policy.has_attempts_left(attempt) {
                let delay = self.policy.sample_delay(backoff, attempt);
                warn!(
                    "{} failed ({}), retry {}/{} in {:.1}s",
                    url,
                    last_failure,
                    attempt,
                    max_attempts - 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_failure,
        })
    }
}

fn default_headers(settings: &HttpSettings) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));
    headers.insert(REFERER, HeaderValue::from_static(CATALOG_REFERER));

    if let Some(token) = &settings.bearer_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Bearer token contains invalid header characters")?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    if let Some(key) = &settings.api_key {
        let mut value =
            HeaderValue::from_str(key).context("API key contains invalid header characters")?;
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
    }

    Ok(headers)
}
