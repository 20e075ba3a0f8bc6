//! Compose box: multi-line text input plus the pending attachment list.

use std::path::Path;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::messaging::attachments::{self, SelectedFile};
use crate::messaging::composer::Draft;

/// What a key press in the compose box asks the app to do.
#[derive(Debug, PartialEq, Eq)]
pub enum ComposeAction {
    None,
    /// Enter without modifiers: send the draft.
    Submit,
    /// Esc: leave the conversation.
    Leave,
}

/// State for the compose box.
#[derive(Default)]
pub struct ComposeState {
    /// Current input text.
    pub input: String,
    /// Cursor position (character offset into `input`).
    pub cursor_pos: usize,
    /// Files selected for the next send.
    pub files: Vec<SelectedFile>,
}

impl ComposeState {
    /// Apply an editing key.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposeAction {
        match key.code {
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.insert_char('\n');
            }
            KeyCode::Enter => return ComposeAction::Submit,
            KeyCode::Esc => return ComposeAction::Leave,
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => self.clear(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(c)
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor_pos = 0,
            KeyCode::End => self.cursor_pos = self.input.chars().count(),
            _ => {}
        }
        ComposeAction::None
    }

    fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor_pos);
        self.input.insert(byte_pos, c);
        self.cursor_pos += 1;
    }

    fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            let end = self.char_to_byte(self.cursor_pos);
            let start = self.char_to_byte(self.cursor_pos - 1);
            self.input.drain(start..end);
            self.cursor_pos -= 1;
        }
    }

    fn delete(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            let start = self.char_to_byte(self.cursor_pos);
            let end = self.char_to_byte(self.cursor_pos + 1);
            self.input.drain(start..end);
        }
    }

    fn move_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            self.cursor_pos += 1;
        }
    }

    /// Clear the text (Ctrl+U). Attachments stay.
    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    /// Read a file from disk and queue it for the next send.
    pub fn attach(&mut self, path: &Path) -> Result<&SelectedFile> {
        let file = SelectedFile::from_path(path)?;
        self.files.push(file);
        Ok(&self.files[self.files.len() - 1])
    }

    /// Take text and attachments for sending, leaving the box empty.
    /// Returns `None` (and keeps the input) when there is nothing to send.
    pub fn take_draft(&mut self) -> Option<Draft> {
        let draft = Draft {
            text: self.input.clone(),
            files: std::mem::take(&mut self.files),
        };
        if !draft.is_sendable() {
            self.files = draft.files;
            return None;
        }
        self.clear();
        Some(draft)
    }

    /// Convert a char-based cursor position to a byte offset.
    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Height of the compose box: border + attachment line + input line + border.
pub const COMPOSE_HEIGHT: u16 = 4;

/// Render the compose box. Takes the `Frame` so it can place the cursor.
pub fn render(
    area: Rect,
    frame: &mut Frame,
    state: &ComposeState,
    recipient: Option<&str>,
    focused: bool,
) {
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
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let files_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_files(files_area, frame.buffer_mut(), state, focused);

    if inner.height >= 2 {
        let input_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
        let display = display_text(&state.input, state.cursor_pos, input_area.width as usize);
        render_input(input_area, frame.buffer_mut(), state, &display, recipient);
        if focused && recipient.is_some() {
            frame.set_cursor_position((
                input_area.x + 1 + display.cursor_offset as u16,
                input_area.y,
            ));
        }
    }
}

/// Attachment line: queued files, or a hint on how to add one.
fn render_files(area: Rect, buf: &mut Buffer, state: &ComposeState, focused: bool) {
    let line = if state.files.is_empty() {
        let style = if focused {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Line::from(Span::styled(
            " /attach <path> adds a file  Shift+Enter: newline  C-u: clear",
            style,
        ))
    } else {
        let mut spans = vec![Span::styled(
            " Attached: ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )];
        for (i, f) in state.files.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(", "));
            }
            spans.push(Span::styled(
                format!("{} ({})", f.name, attachments::human_size(f.size())),
                Style::default().fg(Color::Cyan),
            ));
        }
        spans.push(Span::styled(
            "  /detach",
            Style::default().fg(Color::DarkGray),
        ));
        Line::from(spans)
    };
    Paragraph::new(line).render(area, buf);
}

fn render_input(
    area: Rect,
    buf: &mut Buffer,
    state: &ComposeState,
    display: &DisplayText,
    recipient: Option<&str>,
) {
    let w = area.width as usize;
    let line = match recipient {
        None => Line::from(Span::styled(
            " Select a conversation to start messaging",
            Style::default().fg(Color::DarkGray),
        )),
        Some(name) if state.input.is_empty() => {
            let placeholder: String = format!(" Type a message to {}...", name)
                .chars()
                .take(w)
                .collect();
            Line::from(Span::styled(placeholder, Style::default().fg(Color::DarkGray)))
        }
        Some(_) => Line::from(Span::styled(
            format!(" {}", display.visible),
            Style::default().fg(Color::White),
        )),
    };
    Paragraph::new(line).render(area, buf);
}

/// Visible slice of the input and the cursor column within it.
struct DisplayText {
    visible: String,
    cursor_offset: usize,
}

/// Flatten newlines to " | " on the single display line and scroll
/// horizontally so the cursor stays visible.
fn display_text(input: &str, cursor_pos: usize, width: usize) -> DisplayText {
    let flat: Vec<char> = input.replace('\n', " | ").chars().collect();
    let flat_cursor: usize = input
        .chars()
        .take(cursor_pos)
        .map(|c| if c == '\n' { 3 } else { 1 })
        .sum();

    // One column is the leading space.
    let avail = width.saturating_sub(1);
    if avail == 0 {
        return DisplayText {
            visible: String::new(),
            cursor_offset: 0,
        };
    }

    let start = if flat_cursor < avail {
        0
    } else {
        flat_cursor + 1 - avail
    };
    let end = (start + avail).min(flat.len());
    // Wide glyphs take two cells, so the cursor column is a display width.
    let cursor_offset = flat[start.min(flat.len())..flat_cursor.min(flat.len())]
        .iter()
        .map(|c| c.width().unwrap_or(0))
        .sum::<usize>()
        + flat_cursor.saturating_sub(flat.len());
    DisplayText {
        visible: flat[start.min(end)..end].iter().collect(),
        cursor_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(state: &mut ComposeState, s: &str) {
        for c in s.chars() {
            state.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_enter_submits_and_shift_enter_breaks_line() {
        let mut state = ComposeState::default();
        type_str(&mut state, "line one");
        let action = state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        assert_eq!(action, ComposeAction::None);
        state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        type_str(&mut state, "two");
        assert_eq!(state.input, "line one\n\ntwo");

        assert_eq!(state.handle_key(key(KeyCode::Enter)), ComposeAction::Submit);
    }

    #[test]
    fn test_ctrl_u_clears() {
        let mut state = ComposeState::default();
        type_str(&mut state, "draft");
        state.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(state.input.is_empty());
        assert_eq!(state.cursor_pos, 0);
    }

    #[test]
    fn test_editing_multibyte() {
        let mut state = ComposeState::default();
        type_str(&mut state, "café");
        state.handle_key(key(KeyCode::Left));
        state.handle_key(key(KeyCode::Backspace));
        assert_eq!(state.input, "caé");
        state.handle_key(key(KeyCode::Delete));
        assert_eq!(state.input, "ca");
        state.handle_key(key(KeyCode::Home));
        type_str(&mut state, "¡");
        assert_eq!(state.input, "¡ca");
    }

    #[test]
    fn test_take_draft() {
        let mut state = ComposeState::default();
        type_str(&mut state, "   ");
        assert!(state.take_draft().is_none());
        assert_eq!(state.input, "   ");

        state.clear();
        state
            .files
            .push(SelectedFile::new("menu.pdf", "application/pdf", vec![1, 2, 3]));
        let draft = state.take_draft().unwrap();
        assert_eq!(draft.files.len(), 1);
        assert!(state.files.is_empty());
    }

    #[test]
    fn test_attach_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(&path, "name,shift\nSam,am\n").unwrap();

        let mut state = ComposeState::default();
        let file = state.attach(&path).unwrap();
        assert_eq!(file.media_type, "text/csv");
        assert!(state.attach(&dir.path().join("missing.png")).is_err());
        assert_eq!(state.files.len(), 1);
    }

    #[test]
    fn test_display_text_scrolls_to_cursor() {
        let d = display_text("hello\nworld", 11, 40);
        assert_eq!(d.visible, "hello | world");
        assert_eq!(d.cursor_offset, 13);

        let d = display_text("abcdefghij", 10, 5);
        assert_eq!(d.visible, "hij");
        assert_eq!(d.cursor_offset, 3);
    }
}
