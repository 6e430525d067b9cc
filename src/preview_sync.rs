// Click-to-source and scroll synchronisation between preview and editor
//
// The preview reports clicks by block index; the host editor receives the
// 1-based source line through a registered `LineJumpHandler`.

use crate::blocks::{AnnotatedNode, flatten_blocks};
use log::debug;

/// Receives the source line the editor should jump to
pub trait LineJumpHandler {
    fn jump_to_line(&mut self, line: usize);
}

impl<F> LineJumpHandler for F
where
    F: FnMut(usize),
{
    fn jump_to_line(&mut self, line: usize) {
        self(line)
    }
}

pub struct PreviewSync {
    lines: Vec<Option<usize>>,
    handler: Option<Box<dyn LineJumpHandler>>,
}

impl PreviewSync {
    pub fn new(nodes: &[AnnotatedNode]) -> Self {
        PreviewSync {
            lines: flatten_blocks(nodes).into_iter().map(|b| b.source_line).collect(),
            handler: None,
        }
    }

    pub fn on_jump(&mut self, handler: impl LineJumpHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    pub fn block_count(&self) -> usize {
        self.lines.len()
    }

    /// Blocks without a recorded line (or out of range) map to line 1
    pub fn line_for_block(&self, index: usize) -> usize {
        self.lines.get(index).copied().flatten().unwrap_or(1)
    }

    /// Handle a click on the block at `index`, returning the line jumped to
    pub fn click(&mut self, index: usize) -> usize {
        let line = self.line_for_block(index);
        debug!("Preview block {} clicked, jumping to line {}", index, line);
        if let Some(handler) = self.handler.as_mut() {
            handler.jump_to_line(line);
        }
        line
    }

    /// Block to reveal for an editor line: an exact match, else the first block with any line
    pub fn block_for_line(&self, line: usize) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| *l == Some(line))
            .or_else(|| self.lines.iter().position(Option::is_some))
    }
}

/// Line in the middle of the visible editor range
pub fn center_line(start: usize, end: usize) -> usize {
    ((start + end) as f64 / 2.0).round() as usize
}

fn max_scroll(scroll_height: f64, client_height: f64) -> f64 {
    (scroll_height - client_height).max(0.0)
}

/// Scroll offset for a position given as a fraction in `[0, 1]`
pub fn scroll_top_for_percent(percent: f64, scroll_height: f64, client_height: f64) -> f64 {
    percent.clamp(0.0, 1.0) * max_scroll(scroll_height, client_height)
}

/// Fraction of the scrollable range covered by `scroll_top`
pub fn percent_for_scroll_top(scroll_top: f64, scroll_height: f64, client_height: f64) -> f64 {
    let max = max_scroll(scroll_height, client_height);
    if max <= 0.0 {
        return 0.0;
    }
    (scroll_top / max).clamp(0.0, 1.0)
}
