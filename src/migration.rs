use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

use crate::blocks::{
    create_document_link_block, create_image_block_with_limit, create_media_embed_block,
    ContentBlock,
};
use crate::debugging::text_preview;
use crate::network::{is_fetchable_url, resolve_url, FetchError, FetchedFile, FileFetcher};
use crate::parsing::{
    extract_document_urls, extract_image_urls, extract_media_embed_urls, extract_pullquotes,
    parse_body_blocks, ParseError,
};
use crate::settings::BlockSettings;

pub const PAGES_FILE_NAME: &str = "pages.json";
pub const FILES_DIR_NAME: &str = "files";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Page has no body: {0}")]
    MissingBody(String),

    #[error("Failed to parse body: {0}")]
    ParseError(#[from] ParseError),

    #[error("Failed to fetch file: {0}")]
    FetchError(#[from] FetchError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// One page of the legacy site export.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPage {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl LegacyPage {
    pub fn body(&self) -> Result<&str, MigrationError> {
        self.body
            .as_deref()
            .ok_or_else(|| MigrationError::MissingBody(self.title.clone()))
    }

    #[allow(dead_code)]
    pub fn pullquotes(&self) -> Result<Vec<String>, MigrationError> {
        Ok(extract_pullquotes(self.body()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigratedPage {
    pub title: String,
    pub publication_date: Option<String>,
    pub blocks: Vec<ContentBlock>,
}

pub trait FileSource {
    fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError>;
}

impl FileSource for FileFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        FileFetcher::fetch(self, url)
    }
}

pub struct MigrationReport {
    pub pages: Vec<MigratedPage>,
    pub failed_pages: usize,
}

/// Builds the full block stream for one page: the body blocks, then embeds, images and
/// documents in the order they appear in the body.
pub fn migrate_page<S: FileSource>(
    page: &LegacyPage,
    source: &S,
    settings: &BlockSettings,
) -> Result<MigratedPage, MigrationError> {
    let body = page.body()?;
    let base_url = page.url.as_deref();

    let mut blocks = parse_body_blocks(body)?;

    for embed_url in extract_media_embed_urls(body) {
        blocks.push(create_media_embed_block(&embed_url));
    }

    for image_url in extract_image_urls(body) {
        let image_url = resolve_url(base_url, &image_url)?;
        if !is_fetchable_url(&image_url) {
            warn!("Skipping image that is not a remote file: {}", text_preview(&image_url));
            continue;
        }
        let fetched = source.fetch(&image_url)?;
        blocks.push(create_image_block_with_limit(
            &fetched.file_name,
            fetched.file_bytes,
            settings.max_image_file_name_length,
        ));
    }

    for document_url in extract_document_urls(body, &settings.document_extensions) {
        let document_url = resolve_url(base_url, &document_url)?;
        if !is_fetchable_url(&document_url) {
            warn!("Skipping document that is not a remote file: {}", text_preview(&document_url));
            continue;
        }
        let fetched = source.fetch(&document_url)?;
        blocks.push(create_document_link_block(
            &fetched.file_name,
            fetched.file_bytes,
        ));
    }

    debug!(
        "Block types for {}: {:?}",
        page.title,
        blocks.iter().map(ContentBlock::block_type).collect::<Vec<_>>()
    );

    Ok(MigratedPage {
        title: page.title.clone(),
        publication_date: page.publication_date.clone(),
        blocks,
    })
}

/// Migrates every page. A page that fails is logged and left out of the report.
pub fn run_migration<S: FileSource>(
    pages: &[LegacyPage],
    source: &S,
    settings: &BlockSettings,
) -> MigrationReport {
    let mut migrated_pages = vec![];
    let mut failed_pages = 0;

    for page in pages {
        info!("Migrating page: {}", page.title);
        match migrate_page(page, source, settings) {
            Ok(migrated_page) => {
                info!(
                    "Migrated page {} into {} blocks",
                    page.title,
                    migrated_page.blocks.len()
                );
                migrated_pages.push(migrated_page);
            }
            Err(err) => {
                error!("Failed to migrate page {}: {}", page.title, err);
                failed_pages += 1;
            }
        }
    }

    MigrationReport {
        pages: migrated_pages,
        failed_pages,
    }
}

pub fn load_export(export_path: &Path) -> Result<Vec<LegacyPage>, MigrationError> {
    let file = File::open(export_path)?;
    let pages: Vec<LegacyPage> = serde_json::from_reader(BufReader::new(file))?;
    info!("Loaded {} pages from {}", pages.len(), export_path.display());

    Ok(pages)
}

/// Writes `pages.json` and every attached file under `files/`.
///
/// Each attachment gets its own file; a name already used in this run gets a numeric
/// suffix, and the block is updated to the name actually stored.
pub fn write_output(output_dir: &Path, pages: &mut [MigratedPage]) -> Result<(), MigrationError> {
    let files_dir = output_dir.join(FILES_DIR_NAME);
    fs::create_dir_all(&files_dir)?;

    let mut stored_names = HashSet::new();
    for attachment in pages
        .iter_mut()
        .flat_map(|page| page.blocks.iter_mut())
        .filter_map(|block| block.attachment_mut())
    {
        let stored_name = unique_file_name(&attachment.file_name, &stored_names);
        if stored_name != attachment.file_name {
            warn!(
                "File name {} already used, storing as {}",
                attachment.file_name, stored_name
            );
            attachment.file_name = stored_name.clone();
        }

        fs::write(files_dir.join(&stored_name), &attachment.bytes)?;
        stored_names.insert(stored_name);
    }

    let pages_file = File::create(output_dir.join(PAGES_FILE_NAME))?;
    serde_json::to_writer_pretty(BufWriter::new(pages_file), pages)?;
    info!("Wrote {} pages to {}", pages.len(), output_dir.display());

    Ok(())
}

/// `file_name`, or `stem-N.ext` with the lowest `N` not in `taken`.
fn unique_file_name(file_name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(file_name) {
        return file_name.to_string();
    }

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (file_name, None),
    };

    (1..)
        .map(|suffix| match extension {
            Some(extension) => format!("{}-{}.{}", stem, suffix, extension),
            None => format!("{}-{}", stem, suffix),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| file_name.to_string())
}
