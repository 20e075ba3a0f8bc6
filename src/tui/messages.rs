//! Messages pane: the open conversation's messages with attachments and
//! delivery state.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::messaging::attachments::{self, AttachmentKind};
use crate::models::{Conversation, Delivery, Message};

/// Selection and scroll state for the messages pane.
pub struct MessagesState {
    /// Index of the highlighted message.
    pub selected: usize,
    /// Keep the newest message in view as messages arrive.
    pub follow: bool,
}

impl Default for MessagesState {
    fn default() -> Self {
        Self {
            selected: 0,
            follow: true,
        }
    }
}

impl MessagesState {
    pub fn select_previous(&mut self) {
        self.follow = false;
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self, count: usize) {
        if self.selected + 1 < count {
            self.selected += 1;
        }
        self.follow = self.selected + 1 >= count;
    }

    /// Jump to the newest message and keep following.
    pub fn scroll_to_latest(&mut self, count: usize) {
        self.selected = count.saturating_sub(1);
        self.follow = true;
    }

    /// Re-anchor after the list changed underneath us.
    pub fn sync_len(&mut self, count: usize) {
        if self.follow {
            self.selected = count.saturating_sub(1);
        } else {
            self.selected = self.selected.min(count.saturating_sub(1));
        }
    }
}

/// What the pane shows besides the messages themselves.
pub struct MessagesView<'a> {
    pub conversation: Option<&'a Conversation>,
    pub messages: Vec<&'a Message>,
    pub loading: bool,
    pub has_unread: bool,
    pub own_id: &'a str,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the messages pane into the given area.
pub fn render(area: Rect, buf: &mut Buffer, state: &MessagesState, view: &MessagesView<'_>, focused: bool) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);

    let inner = block.inner(area);
    block.render(area, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let Some(conversation) = view.conversation else {
        render_hint(inner, buf, " Pick a conversation from the list (Enter to open)");
        return;
    };

    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_header(header_area, buf, conversation, view);

    let body = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if body.height == 0 {
        return;
    }

    if view.loading && view.messages.is_empty() {
        render_hint(body, buf, " Loading messages...");
        return;
    }
    if view.messages.is_empty() {
        let hint = if conversation.id.is_virtual() {
            format!(" Say hello to {}! The conversation starts with your first message.", conversation.display_name)
        } else {
            " No messages yet".to_string()
        };
        render_hint(body, buf, &hint);
        return;
    }

    let (lines, ranges) = build_lines(view, state.selected, body.width as usize);
    let height = body.height as usize;
    let scroll = if state.follow {
        lines.len().saturating_sub(height)
    } else {
        scroll_to_show(&ranges, state.selected, height, lines.len())
    };

    for (row, line) in lines.iter().skip(scroll).take(height).enumerate() {
        let line_area = Rect::new(body.x, body.y + row as u16, body.width, 1);
        Paragraph::new(line.clone()).render(line_area, buf);
    }

    if lines.len() > height {
        let x = body.x + body.width.saturating_sub(1);
        if scroll > 0 {
            let cell = &mut buf[(x, body.y)];
            cell.set_char('^');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
        if scroll + height < lines.len() {
            let cell = &mut buf[(x, body.y + body.height - 1)];
            cell.set_char('v');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
    }
}

fn render_hint(area: Rect, buf: &mut Buffer, text: &str) {
    let row = Rect::new(area.x, area.y, area.width, 1.min(area.height));
    Paragraph::new(Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .render(row, buf);
}

fn render_header(area: Rect, buf: &mut Buffer, conversation: &Conversation, view: &MessagesView<'_>) {
    let mut spans = vec![Span::styled(
        format!(" {} ", conversation.display_name),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )];
    if conversation.is_group() {
        spans.push(Span::styled("(group) ", Style::default().fg(Color::Gray)));
    }
    if conversation.id.is_virtual() {
        spans.push(Span::styled("(new) ", Style::default().fg(Color::Gray)));
    }
    if view.loading {
        spans.push(Span::styled("loading... ", Style::default().fg(Color::Gray)));
    }
    if view.has_unread {
        spans.push(Span::styled(
            "\u{25CF} new messages ",
            Style::default().fg(Color::Yellow),
        ));
    }
    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Lay out every message; returns the lines plus each message's line range.
fn build_lines(
    view: &MessagesView<'_>,
    selected: usize,
    width: usize,
) -> (Vec<Line<'static>>, Vec<(usize, usize)>) {
    let mut lines = Vec::new();
    let mut ranges = Vec::new();
    for (i, msg) in view.messages.iter().enumerate() {
        let start = lines.len();
        push_message(&mut lines, msg, i == selected, msg.sender_id.as_str() == view.own_id, width);
        lines.push(Line::from(""));
        ranges.push((start, lines.len()));
    }
    (lines, ranges)
}

fn push_message(lines: &mut Vec<Line<'static>>, msg: &Message, selected: bool, own: bool, width: usize) {
    let marker = if selected { "\u{25BA} " } else { "  " };
    let name_style = if own {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    };
    let mut header = vec![
        Span::styled(marker, Style::default().fg(Color::Yellow)),
        Span::styled(msg.sender_name.clone(), name_style),
        Span::styled(
            format!("  {}", short_time(&msg.timestamp)),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    match msg.delivery {
        Delivery::Confirmed => {}
        Delivery::Sending => header.push(Span::styled(
            "  sending...",
            Style::default().fg(Color::DarkGray),
        )),
        Delivery::Sent => header.push(Span::styled("  sent", Style::default().fg(Color::DarkGray))),
        Delivery::Failed => header.push(Span::styled(
            "  ! not delivered",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
    }
    lines.push(Line::from(header));

    let body_style = if msg.delivery == Delivery::Failed {
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM)
    } else if msg.is_optimistic() {
        Style::default().fg(Color::Gray)
    } else {
        Style::default()
    };
    for text in wrap_text(msg.text(), width.saturating_sub(4)) {
        lines.push(Line::from(Span::styled(format!("    {}", text), body_style)));
    }

    for (i, att) in msg.attachments.iter().enumerate() {
        let kind = AttachmentKind::of(&att.media_type);
        let color = if kind.has_preview() {
            Color::Magenta
        } else {
            Color::Cyan
        };
        lines.push(Line::from(Span::styled(
            format!(
                "    [{}] {} ({}){}",
                kind.label(),
                att.name,
                attachments::human_size(att.size),
                match (selected && i == 0, kind.has_preview()) {
                    (true, true) => "  s: save  v: view",
                    (true, false) => "  s: save",
                    _ => "",
                }
            ),
            Style::default().fg(color),
        )));
    }
}

/// `HH:MM` for RFC 3339 timestamps from today, else the date and time.
fn short_time(timestamp: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(t) => {
            let local = t.with_timezone(&chrono::Local);
            if local.date_naive() == chrono::Local::now().date_naive() {
                local.format("%H:%M").to_string()
            } else {
                local.format("%b %d %H:%M").to_string()
            }
        }
        Err(_) => timestamp.to_string(),
    }
}

/// Split on newlines, then word-wrap long lines.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![];
    }
    let mut out = Vec::new();
    for line in text.lines() {
        if line.chars().count() <= max_width {
            out.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.chars().count() + 1 + word.chars().count() <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                out.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

/// Scroll offset that keeps the selected message on screen.
fn scroll_to_show(ranges: &[(usize, usize)], selected: usize, height: usize, total: usize) -> usize {
    let Some(&(start, end)) = ranges.get(selected) else {
        return total.saturating_sub(height);
    };
    if total <= height {
        return 0;
    }
    let scroll = if end - start >= height || end <= height {
        start.min(end.saturating_sub(height))
    } else {
        end - height
    };
    scroll.min(total - height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("short", 10), vec!["short"]);
        assert_eq!(
            wrap_text("the walk-in is at 3 degrees", 10),
            vec!["the", "walk-in is", "at 3", "degrees"]
        );
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert!(wrap_text("anything", 0).is_empty());
    }

    #[test]
    fn test_follow_and_manual_selection() {
        let mut state = MessagesState::default();
        state.sync_len(5);
        assert_eq!(state.selected, 4);

        state.select_previous();
        assert!(!state.follow);
        state.sync_len(6);
        assert_eq!(state.selected, 3);

        state.select_next(6);
        state.select_next(6);
        assert!(state.follow);
        state.sync_len(7);
        assert_eq!(state.selected, 6);
    }

    #[test]
    fn test_scroll_to_show() {
        let ranges = [(0, 4), (4, 8), (8, 12)];
        assert_eq!(scroll_to_show(&ranges, 0, 6, 12), 0);
        assert_eq!(scroll_to_show(&ranges, 2, 6, 12), 6);
        assert_eq!(scroll_to_show(&ranges, 0, 20, 12), 0);
    }

    #[test]
    fn test_short_time_passthrough() {
        assert_eq!(short_time("yesterday-ish"), "yesterday-ish");
    }
}
