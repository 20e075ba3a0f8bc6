//! Debug log pane showing captured tracing output.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::log_capture::LogBuffer;

/// Scroll-back kept by the pane (the capture queue itself is smaller).
const HISTORY: usize = 1000;

pub struct DebugLogState {
    source: LogBuffer,
    lines: Vec<String>,
    pub visible: bool,
    /// Lines scrolled up from the bottom.
    scroll: usize,
}

impl DebugLogState {
    pub fn new(source: LogBuffer) -> Self {
        Self {
            source,
            lines: Vec::new(),
            visible: false,
            scroll: 0,
        }
    }

    /// Pull newly captured lines. Call once per loop iteration.
    pub fn refresh(&mut self) -> bool {
        let fresh = self.source.drain();
        if fresh.is_empty() {
            return false;
        }
        self.lines.extend(fresh);
        if self.lines.len() > HISTORY {
            let excess = self.lines.len() - HISTORY;
            self.lines.drain(..excess);
            self.scroll = self.scroll.saturating_sub(excess);
        }
        true
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        if self.visible {
            self.scroll = 0;
        }
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = (self.scroll + n).min(self.lines.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }
}

pub fn render(area: Rect, buf: &mut Buffer, state: &DebugLogState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Debug Log (F12 hides, PgUp/PgDn scroll) ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    block.render(area, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let end = state.lines.len().saturating_sub(state.scroll);
    let start = end.saturating_sub(inner.height as usize);
    let shown: Vec<Line> = state.lines[start..end]
        .iter()
        .map(|l| Line::from(Span::styled(l.clone(), Style::default().fg(level_color(l)))))
        .collect();
    Paragraph::new(shown).render(inner, buf);
}

/// Color by the level the fmt layer printed.
fn level_color(line: &str) -> Color {
    let level = line
        .split_whitespace()
        .find(|w| matches!(*w, "ERROR" | "WARN" | "INFO" | "DEBUG" | "TRACE"));
    match level {
        Some("ERROR") => Color::Red,
        Some("WARN") => Color::Yellow,
        Some("INFO") => Color::Green,
        Some(_) => Color::DarkGray,
        None => Color::White,
    }
}
