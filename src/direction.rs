// Text direction detection for mixed Persian/English content
// Word-level dominance decides whether a run of text reads right-to-left.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Share of classified words a script needs before the document verdict commits to it
const DOCUMENT_DOMINANCE: f64 = 0.6;

/// Overall reading direction of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
    Mixed,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
            Direction::Mixed => "mixed",
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Direction::Rtl)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ltr" => Ok(Direction::Ltr),
            "rtl" => Ok(Direction::Rtl),
            "mixed" => Ok(Direction::Mixed),
            other => Err(format!("Unknown direction '{}'", other)),
        }
    }
}

/// Direction of a single paragraph. Always commits to one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphDirection {
    #[default]
    Ltr,
    Rtl,
}

impl ParagraphDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParagraphDirection::Ltr => "ltr",
            ParagraphDirection::Rtl => "rtl",
        }
    }
}

impl fmt::Display for ParagraphDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ParagraphDirection> for Direction {
    fn from(dir: ParagraphDirection) -> Self {
        match dir {
            ParagraphDirection::Ltr => Direction::Ltr,
            ParagraphDirection::Rtl => Direction::Rtl,
        }
    }
}

/// Returns true for code points in the Arabic-script blocks used for Farsi
pub fn is_persian_char(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}' | // Arabic
        '\u{0750}'..='\u{077F}' | // Arabic Supplement
        '\u{08A0}'..='\u{08FF}' | // Arabic Extended-A
        '\u{FB50}'..='\u{FDFF}' | // Arabic Presentation Forms-A
        '\u{FE70}'..='\u{FEFF}'   // Arabic Presentation Forms-B
    )
}

/// Returns true for ASCII letters, Latin-1 supplement letters and digits
pub fn is_latin_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\u{00C0}'..='\u{00FF}')
}

/// Characters that can be part of a word for paragraph tokenization
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || is_persian_char(c)
}

/// Tally words by script. A word holding any Persian character counts as Persian only.
fn count_scripts<'a>(words: impl Iterator<Item = &'a str>) -> (usize, usize) {
    let mut persian = 0;
    let mut latin = 0;
    for word in words {
        if word.chars().any(is_persian_char) {
            persian += 1;
        } else if word.chars().any(is_latin_char) {
            latin += 1;
        }
    }
    (persian, latin)
}

/// Coarse direction of a whole document or block.
///
/// Words are whitespace-separated tokens. A script must own more than 60%
/// of the classified words to win; anything in between is `Mixed`.
pub fn classify_document(text: &str) -> Direction {
    if text.trim().is_empty() {
        return Direction::Ltr;
    }

    let (persian, latin) = count_scripts(text.split_whitespace());
    let total = persian + latin;
    if total == 0 {
        return Direction::Ltr;
    }

    let total = total as f64;
    if persian as f64 / total > DOCUMENT_DOMINANCE {
        Direction::Rtl
    } else if latin as f64 / total > DOCUMENT_DOMINANCE {
        Direction::Ltr
    } else {
        Direction::Mixed
    }
}

/// Direction of a single paragraph or line.
///
/// A Persian majority of words gives RTL; ties and Latin majorities give LTR,
/// so one English word inside a Persian sentence does not flip it. Text
/// without any word characters falls back to the first strong character.
pub fn classify_paragraph(text: &str) -> ParagraphDirection {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParagraphDirection::Ltr;
    }

    let words = trimmed.split(|c: char| !is_word_char(c)).filter(|w| !w.is_empty());
    let (persian, latin) = count_scripts(words);

    if persian == 0 && latin == 0 {
        for ch in trimmed.chars() {
            if is_persian_char(ch) {
                return ParagraphDirection::Rtl;
            }
            if is_latin_char(ch) {
                return ParagraphDirection::Ltr;
            }
        }
        return ParagraphDirection::Ltr;
    }

    if persian > latin {
        ParagraphDirection::Rtl
    } else {
        ParagraphDirection::Ltr
    }
}

/// Paragraph classification for callers that may not have any text at all
pub fn classify_paragraph_opt(text: Option<&str>) -> ParagraphDirection {
    classify_paragraph(text.unwrap_or_default())
}

/// Inline style values derived from a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionStyles {
    pub direction: ParagraphDirection,
    pub text_align: &'static str,
}

impl DirectionStyles {
    /// CSS declarations suitable for a `style` attribute
    pub fn to_css(&self) -> String {
        format!("direction: {}; text-align: {};", self.direction, self.text_align)
    }
}

pub fn direction_styles(direction: ParagraphDirection) -> DirectionStyles {
    DirectionStyles {
        direction,
        text_align: match direction {
            ParagraphDirection::Rtl => "right",
            ParagraphDirection::Ltr => "left",
        },
    }
}
