// src/utils/http.rs

//! HTTP client utilities.
//!
//! The pipeline only talks to the network through [`Fetcher`], so tests can
//! substitute an in-memory implementation.

use std::error::Error as StdError;
use std::io;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::error::{AppError, FetchKind, Result};
use crate::models::CrawlerConfig;

/// Transport used by the catalog pipeline.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn fetch(&self, url: &str, user_agent: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, user_agent: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(
                url,
                FetchKind::Status(status.as_u16()),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        Ok(decode_body(body.to_vec(), content_type.as_deref()))
    }
}

/// Map a transport error onto a [`FetchKind`].
fn classify(url: &str, err: reqwest::Error) -> AppError {
    let kind = if err.is_timeout() {
        FetchKind::Timeout
    } else if err.is_connect() || is_dropped_connection(&err) {
        FetchKind::Connect
    } else if let Some(status) = err.status() {
        FetchKind::Status(status.as_u16())
    } else {
        FetchKind::Other
    };
    AppError::fetch(url, kind, err)
}

/// The peer reset, aborted or truncated the exchange after connecting.
fn is_dropped_connection(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        if let Some(hyper) = err.downcast_ref::<hyper::Error>() {
            if hyper.is_incomplete_message() || hyper.is_canceled() {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// Transcode a body to UTF-8.
///
/// The charset comes from the `Content-Type` header, then from a `<meta>`
/// declaration near the top of the page; UTF-8 bodies are returned as is.
/// Undecodable sequences become U+FFFD.
pub fn decode_body(body: Vec<u8>, content_type: Option<&str>) -> Vec<u8> {
    let declared = content_type
        .and_then(|value| charset_label(value.as_bytes()))
        .or_else(|| meta_charset(&body));
    let encoding = declared.unwrap_or(UTF_8);
    if encoding == UTF_8 {
        return body;
    }

    let (text, _, had_errors) = encoding.decode(&body);
    if had_errors {
        log::debug!("body is not valid {}; replaced bad sequences", encoding.name());
    }
    text.into_owned().into_bytes()
}

fn charset_label(text: &[u8]) -> Option<&'static Encoding> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_:.\-]+)"#)
            .expect("charset regex should compile")
    });
    let label = re.captures(text)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*charset"#).expect("meta charset regex should compile")
    });
    let head = &body[..body.len().min(1024)];
    let tag = re.find(head)?;
    charset_label(&head[tag.start()..])
}

/// In-memory [`Fetcher`] for pipeline tests.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::Fetcher;
    use crate::error::{AppError, FetchKind, Result};

    /// Scripted response for one URL.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Body(String),
        Bytes(Vec<u8>),
        /// Serve the body after a pause
        Delayed(Duration, String),
        Fail(FetchKind),
        /// Fail with the kind for the first `n` calls, then serve the body
        Flaky(usize, FetchKind, String),
        /// Never answer
        Hang,
    }

    #[derive(Debug, Default)]
    pub struct MockFetcher {
        replies: HashMap<String, Reply>,
        calls: Mutex<HashMap<String, usize>>,
        agents: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.replies.insert(url.to_string(), Reply::Body(body.to_string()));
            self
        }

        pub fn reply(mut self, url: &str, reply: Reply) -> Self {
            self.replies.insert(url.to_string(), reply);
            self
        }

        pub fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }

        pub fn user_agents(&self) -> Vec<String> {
            self.agents.lock().unwrap().clone()
        }

        /// Most requests ever outstanding at once.
        pub fn peak_in_flight(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str, user_agent: &str, _timeout: Duration) -> Result<Vec<u8>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.entry(url.to_string()).or_default();
                *count += 1;
                *count
            };
            self.agents.lock().unwrap().push(user_agent.to_string());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            match self.replies.get(url) {
                None => Err(AppError::fetch(url, FetchKind::Status(404), "Not Found")),
                Some(Reply::Body(body)) => Ok(body.clone().into_bytes()),
                Some(Reply::Bytes(body)) => Ok(body.clone()),
                Some(Reply::Delayed(pause, body)) => {
                    tokio::time::sleep(*pause).await;
                    Ok(body.clone().into_bytes())
                }
                Some(Reply::Fail(kind)) => Err(AppError::fetch(url, *kind, "scripted failure")),
                Some(Reply::Flaky(failures, kind, body)) => {
                    if call <= *failures {
                        Err(AppError::fetch(url, *kind, "scripted failure"))
                    } else {
                        Ok(body.clone().into_bytes())
                    }
                }
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(AppError::fetch(url, FetchKind::Other, "unreachable"))
                }
            }
        }
    }
}
