use serde::{Serialize, Serializer};
use std::fmt;

pub const DEFAULT_MAX_IMAGE_FILE_NAME_LENGTH: usize = 100;

/// One unit of a page's block stream. Serializes as `{"type": ..., "value": ...}`,
/// the shape the CMS block field imports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentBlock {
    Pullquote(String),
    RichText(String),
    Image(ImageBlock),
    Embed(MediaEmbed),
    Document(DocumentLink),
}

impl ContentBlock {
    pub fn block_type(&self) -> &'static str {
        match self {
            ContentBlock::Pullquote(_) => "pullquote",
            ContentBlock::RichText(_) => "rich_text",
            ContentBlock::Image(_) => "image",
            ContentBlock::Embed(_) => "embed",
            ContentBlock::Document(_) => "document",
        }
    }

    /// The binary attachment carried by image and document blocks.
    #[cfg(test)]
    pub fn attachment(&self) -> Option<&FileAttachment> {
        match self {
            ContentBlock::Image(image_block) => Some(&image_block.image),
            ContentBlock::Document(document_link) => Some(&document_link.file),
            _ => None,
        }
    }

    pub fn attachment_mut(&mut self) -> Option<&mut FileAttachment> {
        match self {
            ContentBlock::Image(image_block) => Some(&mut image_block.image),
            ContentBlock::Document(document_link) => Some(&mut document_link.file),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaEmbed {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageBlock {
    pub title: String,
    pub image: FileAttachment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLink {
    pub title: String,
    pub file: FileAttachment,
}

/// File content waiting for upload. Only the size is written out with the block;
/// the bytes themselves go to the output `files/` directory.
#[derive(Clone, PartialEq, Serialize)]
pub struct FileAttachment {
    pub file_name: String,
    #[serde(rename = "size", serialize_with = "serialize_byte_count")]
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FileAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAttachment")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

fn serialize_byte_count<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(bytes.len() as u64)
}

pub fn create_media_embed_block(url: &str) -> ContentBlock {
    ContentBlock::Embed(MediaEmbed {
        url: url.to_string(),
    })
}

#[allow(dead_code)]
pub fn create_image_block(file_name: &str, file_bytes: Vec<u8>) -> ContentBlock {
    create_image_block_with_limit(file_name, file_bytes, DEFAULT_MAX_IMAGE_FILE_NAME_LENGTH)
}

/// Image block whose stored file name is cut down to `max_file_name_length` characters.
pub fn create_image_block_with_limit(
    file_name: &str,
    file_bytes: Vec<u8>,
    max_file_name_length: usize,
) -> ContentBlock {
    ContentBlock::Image(ImageBlock {
        title: file_stem(file_name).to_string(),
        image: FileAttachment {
            file_name: shorten_file_name(file_name, max_file_name_length),
            bytes: file_bytes,
        },
    })
}

pub fn create_document_link_block(file_name: &str, file_bytes: Vec<u8>) -> ContentBlock {
    ContentBlock::Document(DocumentLink {
        title: file_name.to_string(),
        file: FileAttachment {
            file_name: file_name.to_string(),
            bytes: file_bytes,
        },
    })
}

fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Keeps the leading characters and the extension when possible.
fn shorten_file_name(file_name: &str, max_length: usize) -> String {
    if file_name.chars().count() <= max_length {
        return file_name.to_string();
    }

    let extension = match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => Some(extension),
        _ => None,
    };

    match extension {
        Some(extension) if extension.chars().count() + 1 < max_length => {
            let stem_length = max_length - extension.chars().count() - 1;
            let stem: String = file_name.chars().take(stem_length).collect();

            format!("{}.{}", stem, extension)
        }
        _ => file_name.chars().take(max_length).collect(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const LOGO_FILE_NAME: &str = "logo-2020-%20transparency-120px_0.png";

    #[test]
    fn test_create_media_embed_block() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        let block = create_media_embed_block(url);

        assert_eq!(block.block_type(), "embed");
        match block {
            ContentBlock::Embed(embed) => assert_eq!(embed.url, url),
            other => panic!("Expected an embed block, got {:?}", other),
        }
    }

    #[test]
    fn test_create_image_block() {
        let block = create_image_block(LOGO_FILE_NAME, vec![0x89, 0x50, 0x4E, 0x47]);
        let attachment = block.attachment().unwrap();

        assert_eq!(block.block_type(), "image");
        assert_eq!(&attachment.file_name[..5], &LOGO_FILE_NAME[..5]);
        assert_eq!(attachment.bytes, vec![0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_create_image_block_shortens_long_names() {
        let long_name = format!("{}.jpeg", "x".repeat(200));
        let block = create_image_block_with_limit(&long_name, vec![], 20);
        let attachment = block.attachment().unwrap();

        assert_eq!(attachment.file_name, format!("{}.jpeg", "x".repeat(15)));
        assert!(long_name.starts_with(&attachment.file_name[..15]));
    }

    #[test]
    fn test_shorten_file_name_without_extension() {
        assert_eq!(shorten_file_name("abcdefghij", 4), "abcd");
        assert_eq!(shorten_file_name(".hidden-file", 4), ".hid");
        assert_eq!(shorten_file_name("short.png", 100), "short.png");
    }

    #[test]
    fn test_create_document_link_block() {
        let file_name = "friendsbulletinp525unse_2.pdf";
        let block = create_document_link_block(file_name, vec![1, 2, 3]);

        match &block {
            ContentBlock::Document(document_link) => {
                assert_eq!(document_link.title, file_name);
                assert_eq!(document_link.file.bytes, vec![1, 2, 3]);
            }
            other => panic!("Expected a document block, got {:?}", other),
        }
    }

    #[test]
    fn test_block_serialization_shape() {
        let blocks = vec![
            ContentBlock::Pullquote("with a pullquote".to_string()),
            create_document_link_block("report.pdf", vec![0; 42]),
        ];

        let json = serde_json::to_value(&blocks).unwrap();

        assert_eq!(
            json,
            serde_json::json!([
                { "type": "pullquote", "value": "with a pullquote" },
                {
                    "type": "document",
                    "value": {
                        "title": "report.pdf",
                        "file": { "file_name": "report.pdf", "size": 42 }
                    }
                }
            ])
        );
    }
}
