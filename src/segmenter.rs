// Block segmentation and source line mapping
//
// Walks rendered blocks in document order, gives each block (or each line of
// a block that contains `<br>` markers) a reading direction, and finds the
// source line its text came from so the preview can be synced with the editor.

use crate::blocks::{AnnotatedBlock, AnnotatedNode, Block, BlockKind, RenderNode};
use crate::direction::{Direction, classify_paragraph};
use crate::markup::{
    HtmlTextExtractor, MarkupError, TextExtractor, balance_fragment, has_line_break, split_line_breaks,
};
use log::{debug, warn};
use std::ops::Range;

/// One visual line of a block, before it is turned into an `AnnotatedBlock`
struct Segment {
    inner_html: String,
    direction: Direction,
    source_line: Option<usize>,
}

/// Per-walk state for mapping rendered text back to source lines.
///
/// `last_index` is a byte offset into the source marking the end of the most
/// recent match. It only moves forward, so lines assigned during one walk
/// never go backwards. Create a new mapper for every render pass.
pub struct LineMapper<'a> {
    source: &'a str,
    extractor: &'a dyn TextExtractor,
    last_index: usize,
}

impl<'a> LineMapper<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_extractor(source, &HtmlTextExtractor)
    }

    pub fn with_extractor(source: &'a str, extractor: &'a dyn TextExtractor) -> Self {
        LineMapper {
            source,
            extractor,
            last_index: 0,
        }
    }

    /// Current search anchor in the source text
    pub fn last_index(&self) -> usize {
        self.last_index
    }

    /// Annotate one block. Splittable blocks with line breaks come back as
    /// several segments of the same kind; everything else as a single block.
    pub fn annotate(&mut self, block: Block) -> Vec<AnnotatedBlock> {
        let Block {
            kind,
            inner_html,
            nested,
            attributes,
            source_range,
        } = block;

        let segments = match self.segment(kind, &inner_html, source_range) {
            Ok(segments) => segments,
            Err(err) => {
                warn!("Leaving <{}> block unannotated: {}", kind.tag(), err);
                let nested = self.annotate_nodes(nested);
                let block = Block::new(kind, inner_html).with_attributes(attributes);
                return vec![AnnotatedBlock::passthrough(block, nested)];
            }
        };

        let mut annotated: Vec<AnnotatedBlock> = segments
            .into_iter()
            .map(|segment| AnnotatedBlock {
                kind,
                inner_html: segment.inner_html,
                direction: Some(segment.direction),
                source_line: segment.source_line,
                nested: Vec::new(),
                attributes: attributes.clone(),
            })
            .collect();

        // Nested content follows the block's own text in the source
        let nested = self.annotate_nodes(nested);
        if let Some(last) = annotated.last_mut() {
            last.nested = nested;
        }

        annotated
    }

    /// Annotate a node sequence, passing structural markup through untouched
    pub fn annotate_nodes(&mut self, nodes: Vec<RenderNode>) -> Vec<AnnotatedNode> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                RenderNode::Block(block) => {
                    out.extend(self.annotate(block).into_iter().map(AnnotatedNode::Block));
                }
                RenderNode::Markup(markup) => out.push(AnnotatedNode::Markup(markup)),
            }
        }
        out
    }

    fn segment(
        &mut self,
        kind: BlockKind,
        inner_html: &str,
        source_range: Option<Range<usize>>,
    ) -> Result<Vec<Segment>, MarkupError> {
        if kind.is_splittable() && has_line_break(inner_html) {
            // Extract everything first so a failure leaves the cursor where it was
            let mut parts = Vec::new();
            for part in split_line_breaks(inner_html) {
                let part_html = part.trim();
                let text = if part_html.is_empty() {
                    String::new()
                } else {
                    self.extractor.plain_text(part_html)?.trim().to_string()
                };
                parts.push((part_html.to_string(), text));
            }

            let mut segments = Vec::with_capacity(parts.len());
            for (part_html, text) in parts {
                let source_line = if text.is_empty() {
                    self.locate_blank_line()
                } else {
                    self.locate(&text).unwrap_or(1)
                };
                // Keep blank lines visible in the preview
                let inner_html = if part_html.is_empty() {
                    "&nbsp;".to_string()
                } else {
                    balance_fragment(&part_html)
                };
                segments.push(Segment {
                    inner_html,
                    direction: classify_paragraph(&text).into(),
                    source_line: Some(source_line),
                });
            }
            return Ok(segments);
        }

        let text = self.extractor.plain_text(inner_html)?;
        let text = text.trim();
        let source_line = if text.is_empty() {
            None
        } else {
            let line = self
                .locate(text)
                .or_else(|| source_range.map(|range| self.skip_to(range)))
                .unwrap_or(1);
            Some(line)
        };

        Ok(vec![Segment {
            inner_html: inner_html.to_string(),
            direction: classify_paragraph(text).into(),
            source_line,
        }])
    }

    /// Find `text` at or after the cursor. The cursor stays put when the
    /// text cannot be found.
    fn locate(&mut self, text: &str) -> Option<usize> {
        let found = self
            .source
            .get(self.last_index..)
            .and_then(|rest| rest.find(text));

        found.map(|offset| {
            let idx = self.last_index + offset;
            self.last_index = idx + text.len();
            line_at(self.source, idx)
        })
    }

    /// Use the block's known source position when its text has no literal match
    fn skip_to(&mut self, range: Range<usize>) -> usize {
        let start = range.start.min(self.source.len());
        self.last_index = self.last_index.max(range.end.min(self.source.len()));
        line_at(self.source, start)
    }

    /// Blank segments take the line after the next newline
    fn locate_blank_line(&mut self) -> usize {
        let found = self
            .source
            .get(self.last_index..)
            .and_then(|rest| rest.find('\n'));

        match found {
            Some(offset) => {
                let newline = self.last_index + offset;
                self.last_index = newline + 1;
                line_at(self.source, newline) + 1
            }
            None => 1,
        }
    }
}

/// 1-based line number of the byte offset `idx`
fn line_at(source: &str, idx: usize) -> usize {
    source.as_bytes()[..idx].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Annotate a block sequence against its source text with a fresh cursor
pub fn annotate_blocks(blocks: impl IntoIterator<Item = Block>, source: &str) -> Vec<AnnotatedBlock> {
    annotate_blocks_with(blocks, source, &HtmlTextExtractor)
}

/// Like [`annotate_blocks`] with a caller-supplied text extractor
pub fn annotate_blocks_with(
    blocks: impl IntoIterator<Item = Block>,
    source: &str,
    extractor: &dyn TextExtractor,
) -> Vec<AnnotatedBlock> {
    let mut mapper = LineMapper::with_extractor(source, extractor);
    let mut out = Vec::new();
    for block in blocks {
        out.extend(mapper.annotate(block));
    }
    debug!(
        "Annotated {} segments, cursor stopped at byte {}",
        out.len(),
        mapper.last_index()
    );
    out
}

/// Annotate renderer output (blocks plus structural markup) with a fresh cursor
pub fn annotate_nodes(nodes: Vec<RenderNode>, source: &str) -> Vec<AnnotatedNode> {
    LineMapper::new(source).annotate_nodes(nodes)
}
