use log::{error, info};
use reqwest::blocking::Client;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::settings::FetchSettings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {0}: {1}")]
    InvalidUrl(String, #[source] url::ParseError),

    #[error("URL has no file name: {0}")]
    MissingFileName(String),

    #[error("Request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to fetch {url}: status {status}")]
    BadStatus { url: String, status: u16 },
}

pub struct FetchedFile {
    pub file_name: String,
    pub file_bytes: Vec<u8>,
}

impl fmt::Debug for FetchedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedFile")
            .field("file_name", &self.file_name)
            .field("file_bytes", &self.file_bytes.len())
            .finish()
    }
}

pub struct FileFetcher {
    client: Client,
}

impl FileFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(timeout_secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        let file_name = file_name_from_url(url)?;

        info!("Fetching {}", url);
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!("Failed to fetch {}: {}", url, status);

            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status,
            });
        }
        let file_bytes = response.bytes()?.to_vec();
        info!("Fetched {} ({} bytes)", file_name, file_bytes.len());

        Ok(FetchedFile {
            file_name,
            file_bytes,
        })
    }
}

/// One-off fetch with the default client settings.
#[allow(dead_code)]
pub fn fetch_file_bytes(url: &str) -> Result<FetchedFile, FetchError> {
    FileFetcher::new(&FetchSettings::default())?.fetch(url)
}

/// The last path segment, exactly as written in the URL: percent escapes such as `%20`
/// are kept, not decoded.
pub fn file_name_from_url(url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(url).map_err(|err| FetchError::InvalidUrl(url.to_string(), err))?;

    parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .ok_or_else(|| FetchError::MissingFileName(url.to_string()))
}

/// Only http(s) sources can be fetched; `data:`, `mailto:` and the like are not files.
pub fn is_fetchable_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Resolves `reference` (an `src` or `href` value) against the page it came from.
/// Absolute references are returned unchanged.
pub fn resolve_url(base_url: Option<&str>, reference: &str) -> Result<String, FetchError> {
    match Url::parse(reference) {
        Ok(_) => Ok(reference.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let invalid = |err| FetchError::InvalidUrl(reference.to_string(), err);
            let base_url = base_url.ok_or_else(|| invalid(url::ParseError::RelativeUrlWithoutBase))?;
            let base = Url::parse(base_url).map_err(invalid)?;
            let resolved = base.join(reference).map_err(invalid)?;

            Ok(resolved.to_string())
        }
        Err(err) => Err(FetchError::InvalidUrl(reference.to_string(), err)),
    }
}
