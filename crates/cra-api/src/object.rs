use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Names of the API objects the server publishes. Each is also the object's cache key.
pub mod kinds {
    pub const ABOUT_US: &str = "about-us";
    pub const CONTACT_INFO: &str = "contact-info";
    pub const IMAGE_PATHS: &str = "image-paths";
    pub const OUR_WORK: &str = "our-work";
    pub const REELS: &str = "reels";
    pub const VERSIONS: &str = "versions";
}

/// Version fingerprint of one API object: which object, which API revision, which data
/// revision. Compared only for equality to decide whether a cached copy is stale.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    #[serde(rename = "apiName")]
    pub api_name: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(rename = "apiDataVersion")]
    pub api_data_version: String,
}

impl ApiVersion {
    pub fn new(
        api_name: impl Into<String>,
        api_version: impl Into<String>,
        api_data_version: impl Into<String>,
    ) -> Self {
        Self {
            api_name: api_name.into(),
            api_version: api_version.into(),
            api_data_version: api_data_version.into(),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (api {}, data {})",
            self.api_name, self.api_version, self.api_data_version
        )
    }
}

/// Server-side trace block attached to every response. Informational only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbgObj {
    /// Whether the server could parse the API name and parameters.
    #[serde(rename = "parseOK")]
    pub parse_ok: bool,
    #[serde(rename = "traceMsgQ", default)]
    pub trace_msg_q: Vec<String>,
    /// API keys as parsed by the server.
    #[serde(rename = "restAPIkeys", default)]
    pub rest_api_keys: Vec<String>,
    #[serde(default)]
    pub request_uri: String,
    #[serde(default)]
    pub query_string: Option<String>,
}

/// Exposes the fingerprint embedded in a loaded object.
pub trait VersionSource {
    fn api_version(&self) -> &ApiVersion;
}

/// The envelope every API object arrives in: trace block, fingerprint and the payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiObject<T> {
    #[serde(rename = "dbgObj")]
    pub dbg_obj: DbgObj,
    #[serde(rename = "apiVer")]
    pub api_ver: ApiVersion,
    #[serde(rename = "apiObj")]
    pub api_obj: T,
}

impl<T> VersionSource for ApiObject<T> {
    fn api_version(&self) -> &ApiVersion {
        &self.api_ver
    }
}

/// A payload kept as untyped JSON, for objects whose shape the caller does not model.
///
/// Human-readable formats see the JSON value itself. Binary formats (the object cache) store it
/// as JSON text, since they cannot encode a self-describing value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonPayload(pub serde_json::Value);

impl Serialize for JsonPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            self.0.serialize(serializer)
        } else {
            let text = serde_json::to_string(&self.0).map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&text)
        }
    }
}

impl<'de> Deserialize<'de> for JsonPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            serde_json::Value::deserialize(deserializer).map(Self)
        } else {
            let text = String::deserialize(deserializer)?;
            serde_json::from_str(&text)
                .map(Self)
                .map_err(serde::de::Error::custom)
        }
    }
}
