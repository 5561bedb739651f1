use serde::{Deserialize, Serialize};

/// Placeholder substituted with the application id in endpoint templates
pub const APP_ID_PLACEHOLDER: &str = "{app_id}";

pub const PRIMARY_ENDPOINT: &str = "https://dl.flathub.org/repo/appstream/{app_id}.flatpakref";
pub const FALLBACK_ENDPOINT: &str = "https://flathub.org/repo/appstream/{app_id}.flatpakref";

pub const DESCRIPTOR_EXTENSION: &str = "flatpakref";

pub const DEFAULT_USER_AGENT: &str =
    concat!("flatref/", env!("CARGO_PKG_VERSION"), " (+https://flathub.org/)");

/// Where and how descriptors are fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Endpoint templates, tried in order
    pub endpoints: Vec<String>,

    /// Sent as `User-Agent` on every request
    pub user_agent: String,

    /// Extension of the saved descriptor files
    pub extension: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![PRIMARY_ENDPOINT.to_string(), FALLBACK_ENDPOINT.to_string()],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            extension: DESCRIPTOR_EXTENSION.to_string(),
        }
    }
}

impl FetchConfig {
    /// Replace the endpoint templates, keeping the other settings
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn urls_for(&self, app_id: &str) -> Vec<String> {
        self.endpoints
            .iter()
            .map(|template| template.replace(APP_ID_PLACEHOLDER, app_id))
            .collect()
    }

    pub fn file_name_for(&self, app_id: &str) -> String {
        format!("{app_id}.{}", self.extension)
    }
}
