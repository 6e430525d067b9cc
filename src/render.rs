// Markdown renderer
// Converts Markdown source into blocks via pulldown-cmark and, when automatic
// direction is on, annotates every block with `dir` and `data-source-line`.
// Output is always sanitized before it reaches the preview.

use crate::blocks::{
    AnnotatedNode, Block, BlockKind, RenderNode, flatten_blocks, nodes_to_html, write_attributes,
};
use crate::markup::{decode_entities, escape_attribute, escape_text, sanitize_html};
use crate::segmenter::LineMapper;
use crate::settings::EditorSettings;
use log::{debug, warn};
use pulldown_cmark::{Event, Options, Parser, Tag, html};
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::ops::Range;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9_-]*)\b[^>]*>").expect("valid html tag pattern")
});

static DECODED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*[a-zA-Z][^>]*>").expect("valid decoded tag pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Annotate blocks with reading direction and source line
    pub auto_direction: bool,
    /// Keep raw HTML (sanitized) instead of showing it as text
    pub raw_html: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            auto_direction: true,
            raw_html: true,
        }
    }
}

impl From<&EditorSettings> for RenderOptions {
    fn from(settings: &EditorSettings) -> Self {
        RenderOptions {
            auto_direction: settings.auto_direction,
            ..RenderOptions::default()
        }
    }
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// An event with the byte range of source it came from
type Spanned<'a> = (Event<'a>, Range<usize>);

/// Parse Markdown into blocks and structural markup.
///
/// Every soft line break is rendered as `<br />` so each source line stays a
/// visual line in the preview.
pub fn render_nodes(content: &str, options: &RenderOptions) -> Vec<RenderNode> {
    let events: Vec<Spanned> = Parser::new_ext(content, parser_options())
        .into_offset_iter()
        .map(|(event, range)| {
            let event = match event {
                Event::SoftBreak => Event::HardBreak,
                Event::Html(raw) | Event::InlineHtml(raw) if !options.raw_html => Event::Text(raw),
                other => other,
            };
            (event, range)
        })
        .collect();

    block_nodes(&events, options)
}

/// Index of the `End` event matching the `Start` at `start`
fn matching_end(events: &[Spanned], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, (event, _)) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    events.len().saturating_sub(1)
}

fn render_html(events: &[Spanned]) -> String {
    let mut out = String::new();
    html::push_html(&mut out, events.iter().map(|(event, _)| event.clone()));
    out
}

/// Render `events` and drop the outer element pulldown-cmark writes around them
fn render_unwrapped(events: &[Spanned], open: &str, close: &str) -> String {
    let rendered = render_html(events);
    match rendered
        .trim_end()
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
    {
        Some(inner) => inner.to_string(),
        None => rendered,
    }
}

/// Inner events of a container holding exactly one paragraph, without the `<p>`
fn lone_paragraph<'e, 'a>(inner: &'e [Spanned<'a>]) -> Option<&'e [Spanned<'a>]> {
    let starts_with_paragraph = matches!(inner.first(), Some((Event::Start(Tag::Paragraph), _)));
    let lone = starts_with_paragraph && matching_end(inner, 0) + 1 == inner.len();
    lone.then(|| &inner[1..inner.len() - 1])
}

fn block_nodes(events: &[Spanned], options: &RenderOptions) -> Vec<RenderNode> {
    let mut nodes = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let (Event::Start(tag), range) = &events[i] else {
            match &events[i].0 {
                Event::Rule => nodes.push(RenderNode::Markup("<hr />\n".to_string())),
                _ => nodes.push(RenderNode::Markup(render_html(&events[i..=i]))),
            }
            i += 1;
            continue;
        };

        let end = matching_end(events, i);
        let inner = &events[(i + 1).min(end)..end];
        let whole = &events[i..=end];
        let block = |kind: BlockKind, inner_html: String| {
            RenderNode::Block(Block::new(kind, inner_html).with_source_range(range.clone()))
        };

        match tag {
            Tag::Paragraph => nodes.push(block(BlockKind::Paragraph, render_html(inner))),
            Tag::Heading { level, .. } => {
                nodes.push(block(BlockKind::Heading(*level as u8), render_html(inner)));
            }
            Tag::CodeBlock(_) => {
                let inner_html = render_unwrapped(whole, "<pre>", "</pre>");
                nodes.push(block(BlockKind::Preformatted, inner_html));
            }
            Tag::BlockQuote(_) => {
                // A single-paragraph quote is split line by line like a paragraph
                let inner_html = match lone_paragraph(inner) {
                    Some(paragraph) => render_html(paragraph),
                    None => render_html(inner),
                };
                nodes.push(block(BlockKind::Blockquote, inner_html));
            }
            Tag::List(start) => {
                let (open, close) = match start {
                    Some(1) => ("<ol>\n".to_string(), "</ol>\n"),
                    Some(n) => (format!("<ol start=\"{}\">\n", n), "</ol>\n"),
                    None => ("<ul>\n".to_string(), "</ul>\n"),
                };
                nodes.push(RenderNode::Markup(open));
                nodes.extend(list_items(inner, options));
                nodes.push(RenderNode::Markup(close.to_string()));
            }
            Tag::Table(_) => {
                let inner_html = render_unwrapped(whole, "<table>", "</table>");
                nodes.push(block(BlockKind::Table, inner_html));
            }
            Tag::HtmlBlock if !options.raw_html => {
                nodes.push(block(BlockKind::Paragraph, render_html(inner)));
            }
            Tag::HtmlBlock => {
                let raw: String = inner
                    .iter()
                    .filter_map(|(event, _)| match event {
                        Event::Html(text) => Some(text.as_ref()),
                        _ => None,
                    })
                    .collect();
                let parsed = html_nodes(&raw);
                if parsed.iter().any(|node| matches!(node, RenderNode::Block(_))) {
                    nodes.extend(parsed);
                } else {
                    nodes.push(RenderNode::Markup(render_html(whole)));
                }
            }
            _ => nodes.push(RenderNode::Markup(render_html(whole))),
        }

        i = end + 1;
    }

    nodes
}

/// Each list item keeps its own content; a nested list and anything after it
/// becomes the item's nested content. A loose item's single paragraph is
/// unwrapped so its lines split cleanly.
fn list_items(events: &[Spanned], options: &RenderOptions) -> Vec<RenderNode> {
    let mut nodes = Vec::new();
    let mut i = 0;

    while i < events.len() {
        if !matches!(events[i].0, Event::Start(Tag::Item)) {
            i += 1;
            continue;
        }

        let end = matching_end(events, i);
        let inner = &events[(i + 1).min(end)..end];
        let split = inner
            .iter()
            .position(|(event, _)| matches!(event, Event::Start(Tag::List(_))))
            .unwrap_or(inner.len());

        let (own, rest) = inner.split_at(split);
        let own_html = render_html(lone_paragraph(own).unwrap_or(own));
        let item = Block::new(BlockKind::ListItem, own_html.trim_end().to_string())
            .with_nested(block_nodes(rest, options))
            .with_source_range(events[i].1.clone());
        nodes.push(RenderNode::Block(item));

        i = end + 1;
    }

    nodes
}

/// A child of a parsed HTML element
enum HtmlPiece<'a> {
    Text(&'a str),
    Comment(&'a str),
    Element(ElementRef<'a>),
}

impl HtmlPiece<'_> {
    fn to_html(&self) -> String {
        match self {
            HtmlPiece::Text(text) => escape_text(text),
            HtmlPiece::Comment(comment) => format!("<!--{}-->", comment),
            HtmlPiece::Element(element) => element.html(),
        }
    }

    /// True for an annotatable element or one that contains annotatable elements
    fn holds_block(&self) -> bool {
        let HtmlPiece::Element(element) = self else {
            return false;
        };
        element
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|e| BlockKind::from_tag(e.value().name()).is_some())
    }
}

fn html_pieces(parent: ElementRef<'_>) -> Vec<HtmlPiece<'_>> {
    parent
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(HtmlPiece::Text(&**text)),
            Node::Comment(comment) => Some(HtmlPiece::Comment(&**comment)),
            Node::Element(_) => ElementRef::wrap(child).map(HtmlPiece::Element),
            _ => None,
        })
        .collect()
}

fn element_attributes(element: ElementRef<'_>) -> Vec<(String, String)> {
    element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Turn raw HTML into render nodes so its paragraphs, headings, list items,
/// quotes, code blocks and tables are annotated like Markdown output.
pub fn html_nodes(html: &str) -> Vec<RenderNode> {
    let fragment = Html::parse_fragment(html);
    let mut nodes = Vec::new();
    collect_html_nodes(&html_pieces(fragment.root_element()), &mut nodes);
    nodes
}

fn collect_html_nodes(pieces: &[HtmlPiece], out: &mut Vec<RenderNode>) {
    for piece in pieces {
        let HtmlPiece::Element(element) = piece else {
            out.push(RenderNode::Markup(piece.to_html()));
            continue;
        };
        let element = *element;
        let name = element.value().name();

        match BlockKind::from_tag(name) {
            Some(kind @ (BlockKind::Table | BlockKind::Preformatted)) => {
                let block = Block::new(kind, element.inner_html())
                    .with_attributes(element_attributes(element));
                out.push(RenderNode::Block(block));
            }
            Some(kind) => {
                // Own content up to the first child that holds blocks, the rest is nested
                let children = html_pieces(element);
                let split = children
                    .iter()
                    .position(HtmlPiece::holds_block)
                    .unwrap_or(children.len());
                let own: String = children[..split].iter().map(HtmlPiece::to_html).collect();
                let mut nested = Vec::new();
                collect_html_nodes(&children[split..], &mut nested);

                let block = Block::new(kind, own)
                    .with_attributes(element_attributes(element))
                    .with_nested(nested);
                out.push(RenderNode::Block(block));
            }
            None if piece.holds_block() => {
                let mut open = format!("<{}", name);
                for (attr, value) in element.value().attrs() {
                    open.push_str(&format!(" {}=\"{}\"", attr, escape_attribute(value)));
                }
                open.push('>');
                out.push(RenderNode::Markup(open));
                collect_html_nodes(&html_pieces(element), out);
                out.push(RenderNode::Markup(format!("</{}>", name)));
            }
            None => out.push(RenderNode::Markup(element.html())),
        }
    }
}

fn plain_node_html(node: &RenderNode, out: &mut String) {
    match node {
        RenderNode::Markup(markup) => out.push_str(markup),
        RenderNode::Block(block) => {
            let tag = block.kind.tag();
            out.push('<');
            out.push_str(tag);
            write_attributes(out, &block.attributes);
            out.push('>');
            out.push_str(&block.inner_html);
            for child in &block.nested {
                plain_node_html(child, out);
            }
            out.push_str(&format!("</{}>\n", tag));
        }
    }
}

/// HTML for the nodes without any direction or line annotation
pub fn nodes_to_plain_html(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        plain_node_html(node, &mut out);
    }
    out
}

/// Content that is itself entity-encoded HTML (`&lt;h1&gt;...`), decoded
fn encoded_html(content: &str) -> Option<String> {
    if !content.contains("&lt;") {
        return None;
    }
    let decoded = decode_entities(content);
    let looks_like_html = decoded != content
        && decoded.trim_start().starts_with('<')
        && DECODED_TAG.is_match(&decoded);
    looks_like_html.then_some(decoded)
}

/// Nodes to preview for `content`, or `None` when only the raw source can be shown
fn preview_nodes(content: &str, options: &RenderOptions) -> Option<Vec<RenderNode>> {
    if options.raw_html
        && let Some(decoded) = encoded_html(content)
    {
        debug!("Content is entity-encoded HTML, rendering the decoded markup");
        return Some(html_nodes(&decoded));
    }

    let nodes = render_nodes(content, options);
    if !content.trim().is_empty() && nodes_to_plain_html(&nodes).trim().is_empty() {
        if options.raw_html && HTML_TAG.is_match(content) {
            return Some(html_nodes(content));
        }
        warn!(
            "Rendered HTML is empty for non-empty content, showing raw source: {:?}",
            content.chars().take(200).collect::<String>()
        );
        return None;
    }
    Some(nodes)
}

/// Render and annotate in one step, returning the annotated node tree
pub fn render_annotated(content: &str, options: &RenderOptions) -> Vec<AnnotatedNode> {
    match preview_nodes(content, options) {
        Some(nodes) => LineMapper::new(content).annotate_nodes(nodes),
        None => Vec::new(),
    }
}

fn raw_fallback(content: &str) -> String {
    format!("<pre class=\"markdown-raw\">{}</pre>", escape_text(content))
}

/// Render Markdown content to sanitized HTML for the preview.
///
/// Entity-encoded HTML is decoded and shown as HTML. Content that renders to
/// nothing is shown as HTML when it contains a tag, and as escaped source
/// otherwise.
pub fn render_markdown(content: &str, options: &RenderOptions) -> String {
    if content.is_empty() {
        return String::new();
    }

    let Some(nodes) = preview_nodes(content, options) else {
        return raw_fallback(content);
    };

    let html = if options.auto_direction {
        nodes_to_html(&LineMapper::new(content).annotate_nodes(nodes))
    } else {
        nodes_to_plain_html(&nodes)
    };

    let clean = sanitize_html(&html);
    if clean.trim().is_empty() && !content.trim().is_empty() {
        warn!("Nothing left after sanitizing, showing raw source");
        return raw_fallback(content);
    }
    clean
}

/// Source line of every annotated block, in preview order
pub fn block_lines(nodes: &[AnnotatedNode]) -> Vec<Option<usize>> {
    flatten_blocks(nodes)
        .into_iter()
        .map(|block| block.source_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(nodes: &[RenderNode]) -> Vec<&Block> {
        nodes
            .iter()
            .filter_map(|node| match node {
                RenderNode::Block(block) => Some(block),
                RenderNode::Markup(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_paragraph_soft_breaks_become_br() {
        let nodes = render_nodes("one\ntwo", &RenderOptions::default());
        let blocks = blocks(&nodes);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].inner_html, "one<br />\ntwo");
    }

    #[test]
    fn test_heading_and_code_block() {
        let nodes = render_nodes("## Title\n\n```rust\nfn main() {}\n```", &RenderOptions::default());
        let blocks = blocks(&nodes);
        assert_eq!(blocks[0].kind, BlockKind::Heading(2));
        assert_eq!(blocks[0].inner_html, "Title");
        assert_eq!(blocks[1].kind, BlockKind::Preformatted);
        assert_eq!(
            blocks[1].inner_html,
            "<code class=\"language-rust\">fn main() {}\n</code>"
        );
    }

    #[test]
    fn test_list_items_with_nested_list() {
        let nodes = render_nodes("- one\n  - inner\n- two", &RenderOptions::default());
        assert_eq!(nodes.first(), Some(&RenderNode::Markup("<ul>\n".to_string())));
        let items = blocks(&nodes);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].inner_html, "one");
        assert!(items[0].nested.iter().any(|n| matches!(n, RenderNode::Block(b) if b.inner_html == "inner")));
        assert_eq!(items[1].inner_html, "two");
    }

    #[test]
    fn test_ordered_list_start() {
        let nodes = render_nodes("3. three\n4. four", &RenderOptions::default());
        assert_eq!(nodes.first(), Some(&RenderNode::Markup("<ol start=\"3\">\n".to_string())));
    }

    #[test]
    fn test_table_is_single_block() {
        let nodes = render_nodes("| a | b |\n|---|---|\n| 1 | 2 |", &RenderOptions::default());
        let blocks = blocks(&nodes);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Table);
        assert!(blocks[0].inner_html.starts_with("<thead>"));
    }

    #[test]
    fn test_blockquote_paragraph_is_unwrapped() {
        let nodes = render_nodes("> سلام\n> دنیا", &RenderOptions::default());
        let quotes = blocks(&nodes);
        assert_eq!(quotes[0].kind, BlockKind::Blockquote);
        assert_eq!(quotes[0].inner_html, "سلام<br />\nدنیا");

        let nodes = render_nodes("> one\n>\n> two", &RenderOptions::default());
        assert_eq!(blocks(&nodes)[0].inner_html, "<p>one</p>\n<p>two</p>\n");
    }

    #[test]
    fn test_rule_is_markup() {
        let nodes = render_nodes("a\n\n---\n\nb", &RenderOptions::default());
        assert!(nodes.contains(&RenderNode::Markup("<hr />\n".to_string())));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_markdown("", &RenderOptions::default()), "");
    }

    #[test]
    fn test_render_annotates_direction_and_lines() {
        let html = render_markdown("# عنوان\n\nhello world", &RenderOptions::default());
        assert!(html.contains("<h1 dir=\"rtl\""));
        assert!(html.contains("data-source-line=\"1\">عنوان</h1>"));
        assert!(html.contains("<p dir=\"ltr\""));
        assert!(html.contains("data-source-line=\"3\">hello world</p>"));
    }

    #[test]
    fn test_render_without_auto_direction() {
        let options = RenderOptions {
            auto_direction: false,
            ..RenderOptions::default()
        };
        assert_eq!(render_markdown("hello", &options), "<p>hello</p>\n");
    }

    #[test]
    fn test_render_splits_lines_of_paragraph() {
        let html = render_markdown("سلام دنیا\nhello world", &RenderOptions::default());
        assert!(html.contains("<p dir=\"rtl\" style=\"direction: rtl; text-align: right;\" data-source-line=\"1\">سلام دنیا</p>"));
        assert!(html.contains("<p dir=\"ltr\" style=\"direction: ltr; text-align: left;\" data-source-line=\"2\">hello world</p>"));
    }

    #[test]
    fn test_reference_definition_only_falls_back_to_raw() {
        let html = render_markdown("[a]: https://example.com", &RenderOptions::default());
        assert_eq!(html, "<pre class=\"markdown-raw\">[a]: https://example.com</pre>");
    }

    #[test]
    fn test_raw_html_escaped_when_disabled() {
        let options = RenderOptions {
            auto_direction: false,
            raw_html: false,
        };
        let html = render_markdown("<script>alert(1)</script>", &options);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_loose_list_item_is_unwrapped() {
        let nodes = render_nodes("- a\n  b\n\n- c", &RenderOptions::default());
        let items = blocks(&nodes);
        assert_eq!(items[0].inner_html, "a<br />\nb");
        assert_eq!(items[1].inner_html, "c");
    }

    #[test]
    fn test_task_list_items() {
        let nodes = render_annotated("- [ ] buy milk\n- [x] call home", &RenderOptions::default());
        assert_eq!(block_lines(&nodes), vec![Some(1), Some(2)]);

        let html = render_markdown("- [ ] buy milk\n- [x] call home", &RenderOptions::default());
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("checked"));
        assert!(!html.contains("[ ]"));
    }

    #[test]
    fn test_table_line_comes_from_source_range() {
        let nodes = render_annotated(
            "intro\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nafter",
            &RenderOptions::default(),
        );
        assert_eq!(block_lines(&nodes), vec![Some(1), Some(3), Some(7)]);
    }

    #[test]
    fn test_raw_html_block_is_annotated() {
        let html = render_markdown("intro\n\n<p>سلام دنیا</p>\n\nend", &RenderOptions::default());
        assert!(html.contains(
            "<p dir=\"rtl\" style=\"direction: rtl; text-align: right;\" data-source-line=\"3\">سلام دنیا</p>"
        ));
        assert!(html.contains("data-source-line=\"5\">end</p>"));
    }

    #[test]
    fn test_raw_html_style_is_merged() {
        let html = render_markdown(
            "<p class=\"note\" style=\"color: red\">سلام</p>",
            &RenderOptions::default(),
        );
        assert_eq!(
            html.trim_end(),
            "<p dir=\"rtl\" style=\"color: red; direction: rtl; text-align: right;\" data-source-line=\"1\">سلام</p>"
        );
    }

    #[test]
    fn test_raw_html_container_keeps_wrapper() {
        let nodes = html_nodes("<div class=\"box\"><p>one</p><p>two</p></div>");
        assert_eq!(nodes.first(), Some(&RenderNode::Markup("<div class=\"box\">".to_string())));
        assert_eq!(blocks(&nodes).len(), 2);
        assert_eq!(nodes.last(), Some(&RenderNode::Markup("</div>".to_string())));
    }

    #[test]
    fn test_encoded_html_is_decoded() {
        let html = render_markdown("&lt;h1&gt;سلام&lt;/h1&gt;", &RenderOptions::default());
        assert!(html.starts_with("<h1 dir=\"rtl\""));
        assert!(html.contains(">سلام</h1>"));

        // Escaped text inside a sentence stays text
        let html = render_markdown("use &lt;b&gt; for bold", &RenderOptions::default());
        assert!(html.contains("use &lt;b&gt; for bold"));
    }

    #[test]
    fn test_output_is_sanitized() {
        let html = render_markdown(
            "<script>alert(1)</script>\n\n[x](javascript:alert(1))\n\n<img src=x onerror=alert(1)>",
            &RenderOptions::default(),
        );
        assert!(!html.contains("<script"));
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn test_options_from_settings() {
        let settings = EditorSettings {
            auto_direction: false,
            ..EditorSettings::default()
        };
        assert!(!RenderOptions::from(&settings).auto_direction);
    }
}
