use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header::RETRY_AFTER, Client};

use crate::error::{Error, Result};

static RETRY_AFTER_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Retry after (\d+) seconds").unwrap());

const BODY_PREVIEW: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Numeric `Retry-After` header, in seconds.
    pub retry_after: Option<u64>,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: &str) -> Self {
        RawResponse {
            status: 200,
            retry_after: None,
            body: body.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_throttled(&self) -> bool {
        self.status == 503 || self.status == 429
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = response.text().await?;
        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub default_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub fn wait_for(&self, response: &RawResponse) -> Duration {
        let wait = response
            .retry_after
            .or_else(|| retry_after_from_body(&response.body))
            .map(Duration::from_secs)
            .unwrap_or(self.default_wait);
        wait.min(self.max_wait)
    }
}

/// arXiv puts the back-off in the 503 page text rather than always in a header.
pub fn retry_after_from_body(body: &str) -> Option<u64> {
    RETRY_AFTER_BODY
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// GET `url`, sleeping off 503/429 responses until `policy` runs out.
pub async fn fetch<T>(transport: &T, url: &str, policy: &RetryPolicy) -> Result<String>
where
    T: Transport + ?Sized,
{
    let mut attempts = 0;
    loop {
        tracing::debug!(url, "request");
        let response = transport.get(url).await?;
        if response.is_success() {
            return Ok(response.body);
        }
        if !response.is_throttled() {
            return Err(Error::Status {
                status: response.status,
                body: preview(&response.body),
            });
        }
        if attempts >= policy.max_retries {
            return Err(Error::RetriesExhausted {
                url: url.to_string(),
                attempts,
            });
        }
        attempts += 1;
        let wait = policy.wait_for(&response);
        tracing::warn!(
            status = response.status,
            attempt = attempts,
            "throttled, sleeping for {} seconds",
            wait.as_secs()
        );
        tokio::time::sleep(wait).await;
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
