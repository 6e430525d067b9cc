// Rendered block model
// Blocks are the structural units the Markdown renderer produces and the
// segmenter annotates with direction and source line.

use crate::direction::{Direction, ParagraphDirection, direction_styles};
use crate::markup::escape_attribute;
use std::ops::Range;

/// Kind of a rendered block, mapped one-to-one onto an HTML tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Heading(u8), // 1-6
    ListItem,
    Blockquote,
    Table,
    TableRow,
    Preformatted,
}

impl BlockKind {
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "p",
            BlockKind::Heading(1) => "h1",
            BlockKind::Heading(2) => "h2",
            BlockKind::Heading(3) => "h3",
            BlockKind::Heading(4) => "h4",
            BlockKind::Heading(5) => "h5",
            BlockKind::Heading(_) => "h6",
            BlockKind::ListItem => "li",
            BlockKind::Blockquote => "blockquote",
            BlockKind::Table => "table",
            BlockKind::TableRow => "tr",
            BlockKind::Preformatted => "pre",
        }
    }

    pub fn from_tag(tag: &str) -> Option<BlockKind> {
        let kind = match tag.to_ascii_lowercase().as_str() {
            "p" => BlockKind::Paragraph,
            "h1" => BlockKind::Heading(1),
            "h2" => BlockKind::Heading(2),
            "h3" => BlockKind::Heading(3),
            "h4" => BlockKind::Heading(4),
            "h5" => BlockKind::Heading(5),
            "h6" => BlockKind::Heading(6),
            "li" => BlockKind::ListItem,
            "blockquote" => BlockKind::Blockquote,
            "table" => BlockKind::Table,
            "tr" => BlockKind::TableRow,
            "pre" => BlockKind::Preformatted,
            _ => return None,
        };
        Some(kind)
    }

    /// Only paragraphs, blockquotes and list items are split on internal line breaks
    pub fn is_splittable(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph | BlockKind::Blockquote | BlockKind::ListItem
        )
    }
}

/// A block as produced by the renderer, before annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub inner_html: String,
    /// Child content rendered inside this element after `inner_html`
    pub nested: Vec<RenderNode>,
    /// Attributes carried over from raw HTML
    pub attributes: Vec<(String, String)>,
    /// Byte range of the block in the source, when the renderer knows it
    pub source_range: Option<Range<usize>>,
}

impl Block {
    pub fn new(kind: BlockKind, inner_html: impl Into<String>) -> Self {
        Block {
            kind,
            inner_html: inner_html.into(),
            nested: Vec::new(),
            attributes: Vec::new(),
            source_range: None,
        }
    }

    pub fn with_nested(mut self, nested: Vec<RenderNode>) -> Self {
        self.nested = nested;
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<(String, String)>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_source_range(mut self, range: Range<usize>) -> Self {
        self.source_range = Some(range);
        self
    }
}

/// Write ` name="value"` pairs
pub fn write_attributes<'a>(out: &mut String, attributes: impl IntoIterator<Item = &'a (String, String)>) {
    for (name, value) in attributes {
        out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
    }
}

/// Renderer output: annotatable blocks interleaved with structural markup
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Block(Block),
    Markup(String),
}

/// A block or segment after the direction and line pass
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedBlock {
    pub kind: BlockKind,
    pub inner_html: String,
    /// `None` when the block was passed through after a failure
    pub direction: Option<Direction>,
    pub source_line: Option<usize>,
    pub nested: Vec<AnnotatedNode>,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatedNode {
    Block(AnnotatedBlock),
    Markup(String),
}

impl AnnotatedBlock {
    /// Wrap a block without any annotation
    pub fn passthrough(block: Block, nested: Vec<AnnotatedNode>) -> Self {
        AnnotatedBlock {
            kind: block.kind,
            inner_html: block.inner_html,
            direction: None,
            source_line: None,
            nested,
            attributes: block.attributes,
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn write_html(&self, out: &mut String) {
        let tag = self.kind.tag();
        out.push('<');
        out.push_str(tag);

        let Some(direction) = self.direction else {
            write_attributes(out, &self.attributes);
            self.write_tail(tag, out);
            return;
        };

        // Our direction and line replace any from raw HTML; an inline style is extended
        write_attributes(
            out,
            self.attributes
                .iter()
                .filter(|(name, _)| !matches!(name.as_str(), "dir" | "style" | "data-source-line")),
        );
        let dir = match direction {
            Direction::Mixed => "auto",
            other => other.as_str(),
        };
        out.push_str(&format!(" dir=\"{}\"", dir));

        let mut style = self
            .attributes
            .iter()
            .find(|(name, _)| name == "style")
            .map(|(_, value)| value.trim().trim_end_matches(';').to_string())
            .filter(|existing| !existing.is_empty())
            .map(|existing| format!("{}; ", existing))
            .unwrap_or_default();
        style.push_str(&self.style());
        out.push_str(&format!(" style=\"{}\"", escape_attribute(&style)));
        if let Some(line) = self.source_line {
            out.push_str(&format!(" data-source-line=\"{}\"", line));
        }
        self.write_tail(tag, out);
    }

    fn write_tail(&self, tag: &str, out: &mut String) {
        out.push('>');

        out.push_str(&self.inner_html);
        for node in &self.nested {
            node.write_html(out);
        }

        out.push_str("</");
        out.push_str(tag);
        out.push_str(">\n");
    }

    fn style(&self) -> String {
        let paragraph_dir = match self.direction {
            Some(Direction::Rtl) => ParagraphDirection::Rtl,
            _ => ParagraphDirection::Ltr,
        };
        let mut style = direction_styles(paragraph_dir).to_css();

        // Quote bar sits on the side where reading starts
        if self.kind == BlockKind::Blockquote {
            let (bar, other) = match paragraph_dir {
                ParagraphDirection::Rtl => ("right", "left"),
                ParagraphDirection::Ltr => ("left", "right"),
            };
            style.push_str(&format!(
                " border-{bar}: 4px solid hsl(217, 91%, 60%); border-{other}: none; \
                 padding-{bar}: 1rem; padding-{other}: 0.5em;"
            ));
        }
        style
    }
}

impl AnnotatedNode {
    pub fn write_html(&self, out: &mut String) {
        match self {
            AnnotatedNode::Block(block) => block.write_html(out),
            AnnotatedNode::Markup(markup) => out.push_str(markup),
        }
    }

    pub fn as_block(&self) -> Option<&AnnotatedBlock> {
        match self {
            AnnotatedNode::Block(block) => Some(block),
            AnnotatedNode::Markup(_) => None,
        }
    }
}

/// Serialize a sequence of annotated nodes back into HTML
pub fn nodes_to_html(nodes: &[AnnotatedNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_html(&mut out);
    }
    out
}

/// Blocks in document order, descending into nested content
pub fn flatten_blocks(nodes: &[AnnotatedNode]) -> Vec<&AnnotatedBlock> {
    let mut blocks = Vec::new();
    collect_blocks(nodes, &mut blocks);
    blocks
}

fn collect_blocks<'a>(nodes: &'a [AnnotatedNode], blocks: &mut Vec<&'a AnnotatedBlock>) {
    for node in nodes {
        if let AnnotatedNode::Block(block) = node {
            blocks.push(block);
            collect_blocks(&block.nested, blocks);
        }
    }
}
