use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

/// Status codes carried in the `response_code` field of a quiz payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    NoResults,
    InvalidParameter,
    TokenNotFound,
    TokenEmpty,
    RateLimit,
    Unknown(i64),
}

impl From<i64> for ResponseCode {
    fn from(code: i64) -> Self {
        match code {
            0 => ResponseCode::Success,
            1 => ResponseCode::NoResults,
            2 => ResponseCode::InvalidParameter,
            3 => ResponseCode::TokenNotFound,
            4 => ResponseCode::TokenEmpty,
            5 => ResponseCode::RateLimit,
            other => ResponseCode::Unknown(other),
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseCode::Success => write!(f, "success"),
            ResponseCode::NoResults => write!(f, "not enough questions for the query"),
            ResponseCode::InvalidParameter => write!(f, "invalid parameter"),
            ResponseCode::TokenNotFound => write!(f, "session token not found"),
            ResponseCode::TokenEmpty => write!(f, "session token exhausted"),
            ResponseCode::RateLimit => write!(f, "rate limited"),
            ResponseCode::Unknown(code) => write!(f, "unknown code {}", code),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriviaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Trivia API refused the query: {0}")]
    ResponseCode(ResponseCode),
}

impl From<reqwest::Error> for TriviaError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TriviaError::Status(status.as_u16()),
            None if err.is_decode() => TriviaError::MalformedResponse(err.to_string()),
            None => TriviaError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for TriviaError {
    fn from(err: serde_json::Error) -> Self {
        TriviaError::MalformedResponse(err.to_string())
    }
}

/// Performs a GET against the trivia API and returns the parsed JSON body.
///
/// `path` is relative to the API base, e.g. `api_category.php` or `api.php?amount=10`.
#[async_trait]
pub trait TriviaApi: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, TriviaError>;
}

pub struct HttpTriviaApi {
    client: Client,
    base_url: String,
}

impl HttpTriviaApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TriviaError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl TriviaApi for HttpTriviaApi {
    async fn get(&self, path: &str) -> Result<Value, TriviaError> {
        let url = self.url(path);
        log::debug!("GET {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(body)
    }
}

#[cfg(test)]
pub mod mock {
    use std::sync::{Arc, Mutex};

    use tokio::sync::Notify;

    use super::*;

    /// Canned [`TriviaApi`] that records every requested path.
    pub struct MockApi {
        response: Result<Value, TriviaError>,
        requests: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockApi {
        pub fn ok(body: Value) -> Self {
            Self {
                response: Ok(body),
                requests: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        pub fn err(err: TriviaError) -> Self {
            Self {
                response: Err(err),
                requests: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        /// Holds every request until the returned handle is notified.
        pub fn gated(mut self) -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            self.gate = Some(gate.clone());
            (self, gate)
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TriviaApi for MockApi {
        async fn get(&self, path: &str) -> Result<Value, TriviaError> {
            self.requests.lock().unwrap().push(path.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.response.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let api = HttpTriviaApi::new("https://opentdb.com/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.url("api.php?amount=10"), "https://opentdb.com/api.php?amount=10");

        let api = HttpTriviaApi::new("https://opentdb.com", Duration::from_secs(1)).unwrap();
        assert_eq!(api.url("api_category.php"), "https://opentdb.com/api_category.php");
    }

    #[test]
    fn response_codes_decode() {
        assert_eq!(ResponseCode::from(0), ResponseCode::Success);
        assert_eq!(ResponseCode::from(1), ResponseCode::NoResults);
        assert_eq!(ResponseCode::from(5), ResponseCode::RateLimit);
        assert_eq!(ResponseCode::from(42), ResponseCode::Unknown(42));
    }

    #[test]
    fn json_errors_are_malformed_responses() {
        let err = serde_json::from_str::<Value>("{not json").unwrap_err();
        assert!(matches!(
            TriviaError::from(err),
            TriviaError::MalformedResponse(_)
        ));
    }
}
