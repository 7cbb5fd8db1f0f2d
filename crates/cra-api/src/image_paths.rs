use serde::{Deserialize, Serialize};

/// Where on the server the images for one client live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePath {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "imagePath")]
    pub image_path: String,
}

/// Payload of the `image-paths` object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePaths {
    #[serde(rename = "imagePaths")]
    pub image_paths: Vec<ImagePath>,
}

impl ImagePaths {
    pub fn for_client(&self, client_id: &str) -> Option<&ImagePath> {
        self.image_paths
            .iter()
            .find(|entry| entry.client_id == client_id)
    }
}

impl ImagePath {
    /// Network locator of `resource_name` for this client.
    ///
    /// `http://` and `https://` image paths are used as-is and scheme-less ones are taken
    /// relative to `base_url`. Any other scheme is server data pointing off the network
    /// (`file://` and the like) and yields `None`.
    pub fn locator(&self, base_url: &str, resource_name: &str) -> Option<String> {
        let dir = self.image_path.trim_end_matches('/');
        let resource_name = resource_name.trim_start_matches('/');
        if dir.starts_with("http://") || dir.starts_with("https://") {
            return Some(format!("{dir}/{resource_name}"));
        }
        if dir.contains("://") {
            return None;
        }
        Some(format!(
            "{}/{}/{resource_name}",
            base_url.trim_end_matches('/'),
            dir.trim_start_matches('/')
        ))
    }
}
