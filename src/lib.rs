// Library exports for autopersiantype

pub mod blocks;
pub mod direction;
pub mod document;
pub mod markdown_file;
pub mod markup;
pub mod outline;
pub mod preview_sync;
pub mod render;
pub mod segmenter;
pub mod settings;
pub mod stats;

pub use direction::{Direction, ParagraphDirection, classify_document, classify_paragraph};
pub use render::{RenderOptions, render_markdown};
pub use segmenter::{LineMapper, annotate_blocks};
