use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Opens the byte stream behind a resource locator.
///
/// The returned reader is owned by the caller and released when dropped.
pub trait ResourceStore {
    fn open(&self, locator: &str) -> Result<Box<dyn Read + Send>>;
}

const URL_REDACTION: &str = "<redacted>";

/// Reads resources from the local filesystem (`file://` URLs or plain paths).
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStore;

impl ResourceStore for LocalStore {
    fn open(&self, locator: &str) -> Result<Box<dyn Read + Send>> {
        let path = match locator.strip_prefix("file://") {
            Some(stripped) => PathBuf::from(stripped),
            None => PathBuf::from(locator),
        };

        if path.is_dir() {
            return Err(CacheError::UnsupportedFetchUrl {
                url: redact_url(locator),
            });
        }

        Ok(Box::new(File::open(&path)?))
    }
}

/// Streams resources over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpStore {
    agent: ureq::Agent,
}

impl HttpStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

impl Default for HttpStore {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl ResourceStore for HttpStore {
    fn open(&self, locator: &str) -> Result<Box<dyn Read + Send>> {
        let safe_url = redact_url(locator);
        let response = self.agent.get(locator).call().map_err(|err| {
            let message = match err {
                ureq::Error::Status(code, _response) => {
                    format!("server returned status {code} for {safe_url}")
                }
                ureq::Error::Transport(transport) => {
                    format!("transport error for {safe_url}: {transport}")
                }
            };
            CacheError::Http { message }
        })?;

        Ok(Box::new(response.into_reader()))
    }
}

/// Picks the store that understands `locator`'s scheme.
pub fn store_for_url(locator: &str) -> Result<Box<dyn ResourceStore>> {
    store_for_url_with(locator, DEFAULT_FETCH_TIMEOUT)
}

/// Like [`store_for_url`], with HTTP requests bounded by `timeout`.
pub fn store_for_url_with(locator: &str, timeout: Duration) -> Result<Box<dyn ResourceStore>> {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        return Ok(Box::new(HttpStore::new(timeout)));
    }
    if locator.contains("://") && !locator.starts_with("file://") {
        return Err(CacheError::UnsupportedFetchUrl {
            url: redact_url(locator),
        });
    }
    Ok(Box::new(LocalStore))
}

/// Strips userinfo, query values and fragments from `url` so it can be logged or put in an
/// error message.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_idx) = url.find("://") else {
        return url.to_owned();
    };

    let (scheme, rest) = url.split_at(scheme_idx + 3);
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let authority = match authority.rfind('@') {
        Some(at_pos) => format!("{URL_REDACTION}@{}", &authority[at_pos + 1..]),
        None => authority.to_owned(),
    };

    let (tail, fragment) = match tail.split_once('#') {
        Some((before, _)) => (before, format!("#{URL_REDACTION}")),
        None => (tail, String::new()),
    };
    let tail = match tail.split_once('?') {
        Some((path, query)) => {
            let query = query
                .split('&')
                .filter(|part| !part.is_empty())
                .map(|part| {
                    let name = part.split_once('=').map_or(part, |(name, _)| name);
                    format!("{name}={URL_REDACTION}")
                })
                .collect::<Vec<_>>()
                .join("&");
            format!("{path}?{query}")
        }
        None => tail.to_owned(),
    };

    format!("{scheme}{authority}{tail}{fragment}")
}
