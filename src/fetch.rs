use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::HttpSettings;
use crate::error::HubError;

pub trait Fetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, HubError>;

    fn fetch(&self, url: &str) -> Result<Vec<String>, HubError> {
        Ok(self
            .fetch_text(url)?
            .lines()
            .map(str::to_string)
            .collect())
    }
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: usize,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, HubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("trackhub-registry/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HubError::Http {
                    url: String::new(),
                    message: err.to_string(),
                })?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| HubError::Http {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            max_retries: settings.max_retries,
        })
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, HubError> {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        tracing::debug!(url, status, attempt, "retrying fetch");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        tracing::debug!(url, error = %err, attempt, "retrying fetch");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(HubError::Http {
                        url: url.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, HubError> {
        let response = self.send_with_retries(url)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(HubError::HttpStatus {
                url: url.to_string(),
                status,
                message,
            });
        }
        response.text().map_err(|err| HubError::Http {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
