// Saved document format
//
// A saved document is plain Markdown with two optional extras: a leading
// `<!--PAGE_SETTINGS:{json}-->` comment holding page styling, and embedded
// images written as `![image-<id>](<src>)` at the end of the file. Exported
// HTML pages carry the original Markdown in an
// `<!--ORIGINAL_MARKDOWN_BASE64:...-->` comment so they can be reopened.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static ORIGINAL_MARKDOWN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*ORIGINAL_MARKDOWN_BASE64:([A-Za-z0-9+/=\n\r]+)\s*-->")
        .expect("valid original markdown pattern")
});

static PAGE_SETTINGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^<!--\s*PAGE_SETTINGS:(\{.*?\})\s*-->").expect("valid page settings pattern")
});

static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\((data:[^)]+|[^)]+)\)").expect("valid image pattern")
});

const IMAGE_ID_PREFIX: &str = "image-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderSide {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageBorder {
    pub sides: Vec<BorderSide>,
    pub width: f64,
    pub style: BorderStyle,
    pub color: String,
}

impl Default for PageBorder {
    fn default() -> Self {
        PageBorder {
            sides: Vec::new(),
            width: 0.0,
            style: BorderStyle::Solid,
            color: "#000000".to_string(),
        }
    }
}

/// Page-level styling saved alongside the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSettings {
    /// Legacy single font, superseded by the per-language fonts
    pub font_family: String,
    pub font_family_fa: String,
    pub font_family_en: String,
    pub font_size: f64,
    pub color: String,
    pub background: Option<String>,
    pub line_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub border: Option<PageBorder>,
}

impl Default for PageSettings {
    fn default() -> Self {
        PageSettings {
            font_family: "Vazirmatn".to_string(),
            font_family_fa: "Vazirmatn".to_string(),
            font_family_en: "Inter".to_string(),
            font_size: 16.0,
            color: "#1a1a1a".to_string(),
            background: Some("#ffffff".to_string()),
            line_height: 1.7,
            margin_top: 40.0,
            margin_bottom: 40.0,
            margin_left: 40.0,
            margin_right: 40.0,
            border: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedImage {
    pub id: String,
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMarkdown {
    pub content: String,
    pub page_settings: Option<PageSettings>,
    pub images: Vec<ParsedImage>,
}

fn decode_original_markdown(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

/// Split a saved file into Markdown content, page settings and images
pub fn parse_markdown_file(text: &str) -> ParsedMarkdown {
    let mut working = text.to_string();

    if let Some(caps) = ORIGINAL_MARKDOWN.captures(text) {
        match decode_original_markdown(&caps[1]) {
            Some(decoded) => working = decoded.trim().to_string(),
            None => warn!("Ignoring undecodable embedded Markdown"),
        }
    }

    let mut page_settings = None;
    if let Some(caps) = PAGE_SETTINGS.captures(&working) {
        match serde_json::from_str::<PageSettings>(&caps[1]) {
            Ok(settings) => page_settings = Some(settings),
            Err(err) => warn!("Ignoring malformed page settings: {}", err),
        }
        let meta_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        working = working[meta_end..].trim().to_string();
    }

    let images = IMAGE
        .captures_iter(&working)
        .map(|caps| {
            let alt = caps[1].to_string();
            let id = match alt.strip_prefix(IMAGE_ID_PREFIX) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => uuid::Uuid::new_v4().to_string(),
            };
            ParsedImage {
                id,
                src: caps[2].to_string(),
                alt,
            }
        })
        .collect();

    let content = IMAGE.replace_all(&working, "").trim().to_string();

    ParsedMarkdown {
        content,
        page_settings,
        images,
    }
}

/// Build the saved file body. Without page settings only the Markdown and
/// images are written, which keeps the file clean for other editors.
pub fn compose_markdown_file(
    content: &str,
    page_settings: Option<&PageSettings>,
    images: &[ParsedImage],
) -> Result<String, serde_json::Error> {
    let mut out = String::new();

    if let Some(settings) = page_settings {
        out.push_str("<!--PAGE_SETTINGS:");
        out.push_str(&serde_json::to_string(settings)?);
        out.push_str("-->\n\n");
    }

    out.push_str(content);
    for image in images {
        out.push_str(&format!("\n\n![{}{}]({})", IMAGE_ID_PREFIX, image.id, image.src));
    }

    Ok(out)
}
