// Document outline: ATX headings with their source lines

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static ATX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading pattern"));

static SLUG_DROP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_\s\x{0600}-\x{06FF}]").expect("valid slug pattern")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub id: String,
    pub text: String,
    pub level: u8,
    /// 1-based line in the source
    pub line: usize,
}

fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let kept = SLUG_DROP.replace_all(&lower, "");
    WHITESPACE.replace_all(&kept, "-").into_owned()
}

/// Collect `#`-style headings line by line
pub fn extract_headings(content: &str) -> Vec<Heading> {
    content
        .split('\n')
        .enumerate()
        .filter_map(|(index, line)| {
            let caps = ATX_HEADING.captures(line)?;
            let level = caps[1].len() as u8;
            let text = caps[2].trim().to_string();
            Some(Heading {
                id: format!("heading-{}-{}", index, slugify(&text)),
                level,
                line: index + 1,
                text,
            })
        })
        .collect()
}
