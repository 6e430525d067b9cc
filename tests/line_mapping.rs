// End-to-end checks of source line mapping through the Markdown renderer

use autopersiantype::blocks::{Block, BlockKind, flatten_blocks};
use autopersiantype::direction::Direction;
use autopersiantype::markup::MarkupError;
use autopersiantype::preview_sync::PreviewSync;
use autopersiantype::render::{RenderOptions, block_lines, render_annotated};
use autopersiantype::segmenter::annotate_blocks_with;
use std::cell::Cell;
use std::rc::Rc;

fn lines_of(content: &str) -> Vec<Option<usize>> {
    block_lines(&render_annotated(content, &RenderOptions::default()))
}

#[test]
fn test_mixed_document_lines() {
    let source = "# عنوان\n\nسلام\nدنیا\n\n- one\n- two\n\n> quote\n\nend";
    let lines: Vec<usize> = lines_of(source).into_iter().flatten().collect();
    assert_eq!(lines, vec![1, 3, 4, 6, 7, 9, 11]);
}

#[test]
fn test_duplicate_paragraphs_advance() {
    assert_eq!(lines_of("same\n\nsame\n\nsame"), vec![Some(1), Some(3), Some(5)]);
}

#[test]
fn test_nested_list_lines() {
    let source = "- parent\n  - child\n- sibling";
    assert_eq!(lines_of(source), vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn test_directions_follow_each_line() {
    let nodes = render_annotated("سلام دنیا\nhello world\nیک two سه", &RenderOptions::default());
    let directions: Vec<_> = flatten_blocks(&nodes).iter().map(|b| b.direction).collect();
    assert_eq!(
        directions,
        vec![Some(Direction::Rtl), Some(Direction::Ltr), Some(Direction::Rtl)]
    );
}

#[test]
fn test_render_passes_are_independent() {
    let source = "alpha\n\nbeta\ngamma\n\n## delta";
    assert_eq!(lines_of(source), lines_of(source));
}

#[test]
fn test_unlocatable_text_maps_to_line_one() {
    let shout = |markup: &str| Ok::<String, MarkupError>(markup.to_uppercase());
    let blocks = vec![
        Block::new(BlockKind::Paragraph, "quiet"),
        Block::new(BlockKind::Paragraph, "42"),
    ];
    let out = annotate_blocks_with(blocks, "intro\n\nquiet\n\n42", &shout);
    assert_eq!(out[0].source_line, Some(1));
    assert_eq!(out[1].source_line, Some(5));
}

#[test]
fn test_preview_click_reports_source_line() {
    let nodes = render_annotated("# Title\n\nfirst\nsecond", &RenderOptions::default());
    let mut sync = PreviewSync::new(&nodes);
    let jumped = Rc::new(Cell::new(0));
    let target = Rc::clone(&jumped);
    sync.on_jump(move |line| target.set(line));

    sync.click(2);
    assert_eq!(jumped.get(), 4);
    assert_eq!(sync.block_for_line(3), Some(1));
}
