// Markup helpers for rendered HTML fragments
// Plain text extraction and line-break splitting used by the segmenter.

use ammonia::Builder;
use pulldown_cmark_escape::{escape_html, escape_html_body_text};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use thiserror::Error;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern"));

static UNTERMINATED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z/!][^>]*$").expect("valid tag pattern"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unterminated tag at byte {offset}")]
    Unterminated { offset: usize },
    #[error("failed to extract text: {0}")]
    Extraction(String),
}

/// Turns a markup fragment into the text a reader would see.
///
/// Implementations strip tags, decode entities and keep the whitespace
/// between words. The segmenter takes one of these so it does not depend on
/// a particular HTML engine.
pub trait TextExtractor {
    fn plain_text(&self, markup: &str) -> Result<String, MarkupError>;
}

impl<F> TextExtractor for F
where
    F: Fn(&str) -> Result<String, MarkupError>,
{
    fn plain_text(&self, markup: &str) -> Result<String, MarkupError> {
        self(markup)
    }
}

/// Extracts text by parsing the fragment with html5ever, like DOM `textContent`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextExtractor;

impl TextExtractor for HtmlTextExtractor {
    fn plain_text(&self, markup: &str) -> Result<String, MarkupError> {
        // The parser would silently drop everything after a tag that never closes
        if let Some(m) = UNTERMINATED_TAG.find(markup) {
            return Err(MarkupError::Unterminated { offset: m.start() });
        }
        if !markup.contains('<') && !markup.contains('&') {
            return Ok(markup.to_string());
        }

        let fragment = Html::parse_fragment(markup);
        Ok(fragment.root_element().text().collect())
    }
}

/// Returns true if the fragment contains at least one `<br>` marker
pub fn has_line_break(markup: &str) -> bool {
    LINE_BREAK.is_match(markup)
}

/// Split a fragment on `<br>` markers, keeping inline markup inside each part
pub fn split_line_breaks(markup: &str) -> Vec<&str> {
    LINE_BREAK.split(markup).collect()
}

/// Escape text for an element body
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = escape_html_body_text(&mut out, text);
    out
}

/// Escape text for a double-quoted attribute value
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let _ = escape_html(&mut out, value);
    out
}

/// Close tags a `<br>` split left open and drop unmatched end tags
pub fn balance_fragment(markup: &str) -> String {
    if !markup.contains('<') {
        return markup.to_string();
    }
    Html::parse_fragment(markup).root_element().inner_html()
}

/// Decode character references the way a `<textarea>` would, leaving tags as text
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') || text.to_ascii_lowercase().contains("</textarea") {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(&format!("<textarea>{}</textarea>", text));
    fragment.root_element().text().collect()
}

static SANITIZER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::default();
    builder
        .add_generic_attributes(["dir", "style", "data-source-line"])
        .add_tags(["input"])
        .add_tag_attributes("input", ["type", "checked", "disabled"])
        .add_tag_attributes("ol", ["start"])
        .add_tag_attributes("code", ["class"])
        .add_tag_attributes("pre", ["class"]);
    builder
});

/// Remove scripts, event handlers and unsafe URLs from preview HTML.
/// Direction, inline style and source line attributes survive.
pub fn sanitize_html(html: &str) -> String {
    SANITIZER.clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags() {
        let text = HtmlTextExtractor
            .plain_text("Hello <strong>bold</strong> and <em>it</em>")
            .unwrap();
        assert_eq!(text, "Hello bold and it");
    }

    #[test]
    fn test_plain_text_decodes_entities() {
        let text = HtmlTextExtractor.plain_text("a &amp; b &lt;c&gt;").unwrap();
        assert_eq!(text, "a & b <c>");
    }

    #[test]
    fn test_plain_text_passes_plain_strings() {
        assert_eq!(HtmlTextExtractor.plain_text("سلام دنیا").unwrap(), "سلام دنیا");
        assert_eq!(HtmlTextExtractor.plain_text("").unwrap(), "");
    }

    #[test]
    fn test_plain_text_rejects_unterminated_tag() {
        let err = HtmlTextExtractor.plain_text("text <a href=\"x").unwrap_err();
        assert_eq!(err, MarkupError::Unterminated { offset: 5 });
    }

    #[test]
    fn test_closure_extractor() {
        let upper = |s: &str| Ok::<_, MarkupError>(s.to_uppercase());
        assert_eq!(upper.plain_text("abc").unwrap(), "ABC");
    }

    #[test]
    fn test_split_line_breaks_variants() {
        assert!(has_line_break("a<br>b"));
        assert!(has_line_break("a<BR/>b"));
        assert!(!has_line_break("a<b>b</b>"));
        assert_eq!(
            split_line_breaks("one<br>two<br />three<br/>four"),
            vec!["one", "two", "three", "four"]
        );
    }

    #[test]
    fn test_split_keeps_inline_markup() {
        let parts = split_line_breaks("<em>first</em><br />\nsecond <code>x</code>");
        assert_eq!(parts, vec!["<em>first</em>", "\nsecond <code>x</code>"]);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_text("<a href=\"x\">&</a>"), "&lt;a href=\"x\"&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape_attribute("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go&gt;");
    }

    #[test]
    fn test_balance_fragment() {
        assert_eq!(balance_fragment("<p>first"), "<p>first</p>");
        assert_eq!(balance_fragment("<em>a</em> &amp; b"), "<em>a</em> &amp; b");
        assert_eq!(balance_fragment("plain"), "plain");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&lt;h1&gt;سلام&lt;/h1&gt;"), "<h1>سلام</h1>");
        assert_eq!(decode_entities("no entities"), "no entities");
    }

    #[test]
    fn test_sanitize_keeps_annotations() {
        let html = sanitize_html(
            "<p dir=\"rtl\" style=\"direction: rtl; text-align: right;\" data-source-line=\"2\" onclick=\"x()\">سلام</p><script>alert(1)</script>",
        );
        assert_eq!(
            html,
            "<p dir=\"rtl\" style=\"direction: rtl; text-align: right;\" data-source-line=\"2\">سلام</p>"
        );
    }

    #[test]
    fn test_sanitize_drops_javascript_links() {
        let html = sanitize_html("<a href=\"javascript:alert(1)\">x</a>");
        assert!(!html.contains("javascript:"));
        assert!(html.contains(">x</a>"));
    }
}
