use crate::error::{ApiError, Result};
use crate::loader::Loader;
use crate::object::ApiObject;
use cra_cache::redact_url;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.cloudylogic.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the API server lives and how long a single request may take.
#[derive(Clone, Debug)]
pub struct Endpoint {
    base_url: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            timeout,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bound on each request made against this server, object loads and image downloads alike.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL of an API object: `<base_url>/<api_path>/`.
    pub fn object_url(&self, api_path: &str) -> String {
        format!("{}/{}/", self.base_url, api_path.trim_matches('/'))
    }

    /// A loader for the object published under `kind`.
    pub fn loader<T>(&self, kind: &str) -> HttpLoader<T> {
        self.loader_at(kind, kind)
    }

    /// A loader for a variant of `kind` served at a longer path, e.g.
    /// `image-paths/JavaDesktop`. Version checks still use `kind`.
    pub fn loader_at<T>(&self, kind: &str, api_path: &str) -> HttpLoader<T> {
        HttpLoader {
            agent: self.agent.clone(),
            kind: kind.to_owned(),
            url: self.object_url(api_path),
            _payload: PhantomData,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }
}

/// Fetches one API object with `GET` and decodes the JSON envelope.
#[derive(Debug)]
pub struct HttpLoader<T> {
    agent: ureq::Agent,
    kind: String,
    url: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T> HttpLoader<T> {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<T> Loader for HttpLoader<T>
where
    T: DeserializeOwned,
{
    type Object = ApiObject<T>;

    fn kind(&self) -> &str {
        &self.kind
    }

    fn load(&self) -> Result<ApiObject<T>> {
        let network_error = |message: String| ApiError::Network {
            api: self.kind.clone(),
            message,
        };
        let safe_url = redact_url(&self.url);

        let response = self.agent.get(&self.url).call().map_err(|err| match err {
            ureq::Error::Status(code, _response) => {
                network_error(format!("server returned status {code} for {safe_url}"))
            }
            ureq::Error::Transport(transport) => {
                network_error(format!("transport error for {safe_url}: {transport}"))
            }
        })?;

        let body = response
            .into_string()
            .map_err(|err| network_error(format!("failed to read body from {safe_url}: {err}")))?;

        let object: ApiObject<T> =
            serde_json::from_str(&body).map_err(|err| ApiError::decode(&self.kind, &err))?;

        if !object.dbg_obj.parse_ok {
            return Err(ApiError::ServerParse {
                api: self.kind.clone(),
                trace: object.dbg_obj.trace_msg_q,
            });
        }

        tracing::debug!(
            target: "cra.api",
            api = %self.kind,
            version = %object.api_ver,
            "loaded object from network"
        );
        Ok(object)
    }
}
