use log::debug;
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::blocks::ContentBlock;
use crate::debugging::text_preview;
use crate::markup::{
    attribute, find_elements, find_elements_named, inner_html, parse_html_fragment,
    rewrite_text_nodes, text_content,
};

// Legacy bodies mark pullquotes with shortcode-style brackets inside the text, so
// they are matched as text and never through the HTML tag model.
static PULLQUOTE_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[pullquote\](.*?)\[/pullquote\]").expect("Error compiling pullquote pattern")
});
static PULLQUOTE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[/?pullquote\]").expect("Error compiling pullquote pattern"));

const EMBED_TAGS: [&str; 2] = ["iframe", "embed"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to serialize remaining markup: {0}")]
    SerializeError(#[from] std::io::Error),
}

/// Inner text of every `[pullquote]...[/pullquote]` span, in document order.
///
/// Only the text content of the body is searched, the same text the markers are later
/// stripped from, so markers in attributes or comments are ignored.
pub fn extract_pullquotes(html: &str) -> Vec<String> {
    pullquotes_in(&parse_html_fragment(html))
}

fn pullquotes_in(fragment: &Handle) -> Vec<String> {
    PULLQUOTE_SPAN
        .captures_iter(&text_content(fragment))
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Strips the bracket markers from every text node in `node`, leaving the quoted text
/// where it was.
pub fn remove_pullquote_tags(node: Handle) -> Handle {
    rewrite_text_nodes(&node, &|text: &str| {
        if PULLQUOTE_MARKER.is_match(text) {
            Some(PULLQUOTE_MARKER.replace_all(text, "").into_owned())
        } else {
            None
        }
    });

    node
}

pub fn extract_image_urls(html: &str) -> Vec<String> {
    let fragment = parse_html_fragment(html);

    find_elements(&fragment, "img")
        .iter()
        .filter_map(|img| attribute(img, "src"))
        .collect()
}

/// Sources of `<iframe>` and `<embed>` elements, in document order.
pub fn extract_media_embed_urls(html: &str) -> Vec<String> {
    let fragment = parse_html_fragment(html);

    find_elements_named(&fragment, &EMBED_TAGS)
        .iter()
        .filter_map(|element| attribute(element, "src"))
        .collect()
}

/// Link targets whose path ends in one of `extensions` (compared case-insensitively).
pub fn extract_document_urls(html: &str, extensions: &[String]) -> Vec<String> {
    let fragment = parse_html_fragment(html);

    find_elements(&fragment, "a")
        .iter()
        .filter_map(|link| attribute(link, "href"))
        .filter(|href| has_document_extension(href, extensions))
        .collect()
}

fn has_document_extension(href: &str, extensions: &[String]) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let extension = match path.rsplit_once('.') {
        Some((_, extension)) => extension.to_lowercase(),
        None => return false,
    };

    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').to_lowercase() == extension)
}

/// Splits a legacy page body into its block stream.
///
/// Pullquotes come first, in the order they appear, followed by at most one rich text
/// block holding everything else with the pullquote markers stripped. Pullquote
/// positions within the body are not kept. A body without pullquotes always gives
/// exactly one rich text block, even when it is only whitespace.
pub fn parse_body_blocks(body_html: &str) -> Result<Vec<ContentBlock>, ParseError> {
    if body_html.is_empty() {
        return Ok(vec![]);
    }

    let fragment = parse_html_fragment(body_html);
    let mut blocks: Vec<ContentBlock> = pullquotes_in(&fragment)
        .into_iter()
        .map(|pullquote| {
            debug!("Found pullquote: {}", text_preview(&pullquote));
            ContentBlock::Pullquote(pullquote)
        })
        .collect();
    let has_pullquotes = !blocks.is_empty();

    if has_pullquotes && !has_content_outside_pullquotes(body_html) {
        return Ok(blocks);
    }

    let fragment = remove_pullquote_tags(fragment);
    let remaining_html = inner_html(&fragment)?;
    if !has_pullquotes || !remaining_html.trim().is_empty() {
        debug!("Rich text: {}", text_preview(&text_content(&fragment)));
        blocks.push(ContentBlock::RichText(remaining_html));
    }

    Ok(blocks)
}

fn has_content_outside_pullquotes(html: &str) -> bool {
    !PULLQUOTE_SPAN.replace_all(html, "").trim().is_empty()
}
