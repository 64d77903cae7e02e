/// Shortened single-line form of `text` for log lines.
pub fn text_preview(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview = flattened.chars().take(40).collect::<String>();

    if preview.len() < flattened.len() {
        format!("{}...", preview)
    } else {
        preview
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        assert_eq!(text_preview("with a pullquote"), "with a pullquote");
    }

    #[test]
    fn test_long_text_is_cut() {
        let text = "a".repeat(100);

        assert_eq!(text_preview(&text), format!("{}...", "a".repeat(40)));
    }

    #[test]
    fn test_newlines_are_flattened() {
        assert_eq!(text_preview("<p>\n  one\n</p>"), "<p> one </p>");
    }
}
