use cra_cache::CacheError;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Why a single API object could not be produced.
///
/// None of these are fatal to other objects; callers typically log them and treat the object
/// as unavailable.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error loading {api}: {message}")]
    Network { api: String, message: String },

    #[error("failed to decode {api} response: {message}")]
    Decode { api: String, message: String },

    #[error("server could not parse the request for {api}")]
    ServerParse { api: String, trace: Vec<String> },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ApiError {
    /// Builds a `Decode` error without echoing response content into the message.
    pub(crate) fn decode(api: &str, err: &serde_json::Error) -> Self {
        Self::Decode {
            api: api.to_owned(),
            message: format!(
                "{:?} error at line {} column {}",
                err.classify(),
                err.line(),
                err.column()
            ),
        }
    }
}
