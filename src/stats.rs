// Word, character and direction statistics for the status bar

use crate::direction::{Direction, classify_document};
use crate::outline::{Heading, extract_headings};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid fence pattern"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").expect("valid code pattern"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link pattern"));
static MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_~`>\-|]").expect("valid marker pattern"));

/// Count words of prose, ignoring code and Markdown punctuation
pub fn count_words(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }

    let cleaned = FENCED_CODE.replace_all(text, "");
    let cleaned = INLINE_CODE.replace_all(&cleaned, "");
    let cleaned = LINK.replace_all(&cleaned, "$1");
    let cleaned = MARKERS.replace_all(&cleaned, "");

    cleaned.split_whitespace().count()
}

/// Count user-perceived characters (grapheme clusters)
pub fn count_characters(text: &str) -> usize {
    text.graphemes(true).count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentStats {
    pub words: usize,
    pub characters: usize,
    pub direction: Direction,
    pub headings: Vec<Heading>,
}

impl DocumentStats {
    pub fn compute(content: &str) -> Self {
        DocumentStats {
            words: count_words(content),
            characters: count_characters(content),
            direction: classify_document(content),
            headings: extract_headings(content),
        }
    }
}
