use log::{info, warn};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::blocks::DEFAULT_MAX_IMAGE_FILE_NAME_LENGTH;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub blocks: BlockSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchSettings {
    pub user_agent: String,
    // Unset leaves the HTTP client's own default in place
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BlockSettings {
    pub max_image_file_name_length: usize,
    pub document_extensions: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for BlockSettings {
    fn default() -> Self {
        BlockSettings {
            max_image_file_name_length: DEFAULT_MAX_IMAGE_FILE_NAME_LENGTH,
            document_extensions: vec![
                "pdf".to_string(),
                "doc".to_string(),
                "docx".to_string(),
            ],
        }
    }
}

pub async fn load_settings_with_fallback(file_path: &str) -> Settings {
    match load_settings(file_path).await {
        Ok(settings) => {
            info!("Loaded settings from {}", file_path);

            settings
        }
        Err(err) => {
            warn!(
                "Failed to load settings from {} ({}), using default settings",
                file_path, err
            );

            Settings::default()
        }
    }
}

async fn load_settings(file_path: &str) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut file = File::open(file_path).await?;

    let mut contents = vec![];
    file.read_to_end(&mut contents).await?;
    let settings = serde_json::from_slice(&contents)?;

    Ok(settings)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn test_partial_settings_fill_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "fetch": {{ "timeout_secs": 30 }}, "blocks": {{ "document_extensions": ["pdf"] }} }}"#
        )
        .unwrap();

        let settings = load_settings_with_fallback(file.path().to_str().unwrap()).await;

        assert_eq!(settings.fetch.timeout_secs, Some(30));
        assert_eq!(settings.fetch.user_agent, FetchSettings::default().user_agent);
        assert_eq!(settings.blocks.document_extensions, vec!["pdf".to_string()]);
        assert_eq!(
            settings.blocks.max_image_file_name_length,
            DEFAULT_MAX_IMAGE_FILE_NAME_LENGTH
        );
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let settings = load_settings_with_fallback("./does-not-exist/settings.json").await;

        assert_eq!(settings.fetch.timeout_secs, None);
        assert_eq!(settings.blocks.document_extensions.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let settings = load_settings_with_fallback(file.path().to_str().unwrap()).await;

        assert_eq!(
            settings.blocks.max_image_file_name_length,
            DEFAULT_MAX_IMAGE_FILE_NAME_LENGTH
        );
    }
}
