use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base url {0:?} cannot carry a path")]
    CannotBeABase(String),
    #[error("poll interval {0:?} is outside 1s..=10s")]
    PollInterval(Duration),
}

/// Settings shared by every component that talks to the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url parses"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(60),
            user_agent: concat!("docflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Result<Self, ConfigError> {
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            ..Default::default()
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        if !(MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&interval) {
            return Err(ConfigError::PollInterval(interval));
        }
        self.poll_interval = interval;
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds `{base}/{segments..}`. Each segment is split on `/` and
    /// percent-encoded piecewise, so nested document paths stay nested.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }
        url
    }

    /// Like [`endpoint`](Self::endpoint) but keeps a trailing slash, which
    /// the directory listing route needs for the root folder.
    pub fn directory_endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint(segments);
        if let Ok(mut path) = url.path_segments_mut() {
            path.push("");
        }
        url
    }

    pub fn download_url(&self, video_id: &str) -> String {
        self.endpoint(&["download", video_id]).to_string()
    }

    pub fn presentation_download_url(&self, video_id: &str) -> String {
        self.endpoint(&["download-presentation", video_id]).to_string()
    }
}
