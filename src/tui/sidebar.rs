//! Sidebar widget: employee and group conversations, or one combined list when narrow.

use std::collections::BTreeSet;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::Conversation;

/// Below this terminal width the sidebar shows a single list sorted by recency.
pub const COMPACT_WIDTH: u16 = 90;

/// One row in the sidebar's flat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarItem {
    /// "EMPLOYEES" header (not selectable)
    EmployeesHeader,
    /// Index into the employee conversations
    Employee(usize),
    /// "GROUPS" separator (not selectable)
    GroupsHeader,
    /// Index into the group conversations
    Group(usize),
    /// Index into the combined list (compact layout)
    Combined(usize),
}

impl SidebarItem {
    fn is_header(&self) -> bool {
        matches!(self, SidebarItem::EmployeesHeader | SidebarItem::GroupsHeader)
    }
}

/// Conversation lists as currently filtered, borrowed from the messenger.
pub struct SidebarLists<'a> {
    pub employees: Vec<&'a Conversation>,
    pub groups: Vec<&'a Conversation>,
    pub combined: Vec<&'a Conversation>,
}

impl<'a> SidebarLists<'a> {
    /// Rows in display order.
    pub fn flat_items(&self, compact: bool) -> Vec<SidebarItem> {
        if compact {
            return (0..self.combined.len()).map(SidebarItem::Combined).collect();
        }
        let mut items = vec![SidebarItem::EmployeesHeader];
        items.extend((0..self.employees.len()).map(SidebarItem::Employee));
        items.push(SidebarItem::GroupsHeader);
        items.extend((0..self.groups.len()).map(SidebarItem::Group));
        items
    }

    pub fn conversation(&self, item: SidebarItem) -> Option<&'a Conversation> {
        match item {
            SidebarItem::Employee(i) => self.employees.get(i).copied(),
            SidebarItem::Group(i) => self.groups.get(i).copied(),
            SidebarItem::Combined(i) => self.combined.get(i).copied(),
            _ => None,
        }
    }
}

/// Navigation and filter-input state.
#[derive(Default)]
pub struct SidebarState {
    /// Index into the flat item list
    pub selected: usize,
    /// Single combined list instead of two sections
    pub compact: bool,
    /// Typing goes to the search box
    pub searching: bool,
    pub unread_only: bool,
    /// Employees picked as members of the next group
    pub marked: BTreeSet<String>,
}

impl SidebarState {
    /// Move selection by `delta` rows, skipping headers.
    pub fn step(&mut self, items: &[SidebarItem], delta: isize) {
        if items.is_empty() {
            self.selected = 0;
            return;
        }
        let mut idx = self.selected.min(items.len() - 1) as isize;
        loop {
            let next = idx + delta;
            if next < 0 || next >= items.len() as isize {
                break;
            }
            idx = next;
            if !items[idx as usize].is_header() {
                self.selected = idx as usize;
                return;
            }
        }
        self.clamp(items);
    }

    /// Keep the selection on a real row after the lists change.
    pub fn clamp(&mut self, items: &[SidebarItem]) {
        if items.is_empty() {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.min(items.len() - 1);
        if items[self.selected].is_header() {
            if let Some(i) = (self.selected..items.len()).find(|&i| !items[i].is_header()) {
                self.selected = i;
            } else if let Some(i) = (0..self.selected).rev().find(|&i| !items[i].is_header()) {
                self.selected = i;
            }
        }
    }

    pub fn selected_item(&self, items: &[SidebarItem]) -> Option<SidebarItem> {
        items.get(self.selected).copied().filter(|i| !i.is_header())
    }

    /// Mark or unmark a private conversation's employee for group creation.
    /// Returns whether the employee is now marked.
    pub fn toggle_mark(&mut self, conversation: &Conversation) -> bool {
        let Some(pid) = conversation.participant_ref.as_ref().filter(|_| !conversation.is_group())
        else {
            return false;
        };
        if self.marked.remove(pid) {
            false
        } else {
            self.marked.insert(pid.clone());
            true
        }
    }

    fn is_marked(&self, conversation: &Conversation) -> bool {
        conversation
            .participant_ref
            .as_ref()
            .map_or(false, |pid| !conversation.is_group() && self.marked.contains(pid))
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the sidebar into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &SidebarState,
    lists: &SidebarLists<'_>,
    search_input: &str,
    open: Option<&Conversation>,
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

    let mut title = String::from(" Chats ");
    if state.unread_only {
        title.push_str("[unread] ");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(Span::styled(title, Style::default().fg(Color::Cyan)));

    let inner = block.inner(area);
    block.render(area, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // Search line.
    let search_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let search_line = if state.searching || !search_input.is_empty() {
        Line::from(vec![
            Span::styled(" / ", Style::default().fg(Color::Yellow)),
            Span::styled(search_input.to_string(), Style::default().fg(Color::White)),
            Span::styled(
                if state.searching { "_" } else { "" },
                Style::default().fg(Color::Yellow),
            ),
        ])
    } else {
        Line::from(Span::styled(
            " / search  u unread",
            Style::default().fg(Color::DarkGray),
        ))
    };
    Paragraph::new(search_line).render(search_area, buf);

    let list_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    let items = lists.flat_items(state.compact);
    let height = list_area.height as usize;
    if height == 0 {
        return;
    }

    let offset = scroll_offset(state.selected, height, items.len());
    for (row, idx) in (offset..items.len()).take(height).enumerate() {
        let row_area = Rect::new(list_area.x, list_area.y + row as u16, list_area.width, 1);
        let item = items[idx];
        let selected = idx == state.selected && focused;
        match item {
            SidebarItem::EmployeesHeader => {
                let style = Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD);
                let label = if lists.employees.is_empty() {
                    " EMPLOYEES (none)"
                } else {
                    " EMPLOYEES"
                };
                render_row(buf, row_area, label, "", style, style);
            }
            SidebarItem::GroupsHeader => {
                let prefix = " -- GROUPS ";
                let dashes = (list_area.width as usize).saturating_sub(prefix.len());
                let label = format!("{}{}", prefix, "-".repeat(dashes));
                let style = Style::default().fg(Color::DarkGray);
                render_row(buf, row_area, &label, "", style, style);
            }
            _ => {
                if let Some(conv) = lists.conversation(item) {
                    let is_open = open.map_or(false, |o| o.id == conv.id);
                    let marked = state.is_marked(conv);
                    render_conversation(buf, row_area, conv, selected, is_open, marked);
                }
            }
        }
    }
}

fn render_conversation(
    buf: &mut Buffer,
    area: Rect,
    conv: &Conversation,
    selected: bool,
    is_open: bool,
    marked: bool,
) {
    let icon = if marked {
        "x"
    } else if conv.is_group() {
        "+"
    } else if conv.id.is_virtual() {
        "o"
    } else {
        "*"
    };
    let cursor = if selected || is_open { "\u{25BA}" } else { " " };
    let label = format!("{}{} {}", cursor, icon, conv.display_name);
    let unread = conv.unread_count > 0;
    let badge = if unread {
        conv.unread_count.to_string()
    } else {
        String::new()
    };

    let style = if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else if unread || is_open {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let badge_style = if unread {
        style.fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        style
    };
    render_row(buf, area, &label, &badge, style, badge_style);
}

/// Keep the selected row visible.
fn scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    (selected + 1 - height).min(total - height)
}

/// Left-aligned text with an optional right-aligned badge.
fn render_row(buf: &mut Buffer, area: Rect, left: &str, badge: &str, text: Style, badge_style: Style) {
    let width = area.width as usize;
    if width == 0 {
        return;
    }
    let badge_len = badge.chars().count();
    let max_left = if badge_len > 0 {
        width.saturating_sub(badge_len + 1)
    } else {
        width
    };
    let left: String = left.chars().take(max_left).collect();
    let pad = width.saturating_sub(left.chars().count() + badge_len);

    let line = Line::from(vec![
        Span::styled(left, text),
        Span::styled(" ".repeat(pad), text),
        Span::styled(badge.to_string(), badge_style),
    ]);
    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Employee;
    use serde_json::json;

    fn conv(id: u64, name: &str) -> Conversation {
        let e: Employee = serde_json::from_value(json!({"id": id, "name": name})).unwrap();
        Conversation::placeholder(&e)
    }

    #[test]
    fn test_sections_and_header_skipping() {
        let a = conv(1, "Ana");
        let b = conv(2, "Ben");
        let g = conv(3, "Kitchen");
        let lists = SidebarLists {
            employees: vec![&a, &b],
            groups: vec![&g],
            combined: vec![],
        };
        let items = lists.flat_items(false);
        assert_eq!(
            items,
            vec![
                SidebarItem::EmployeesHeader,
                SidebarItem::Employee(0),
                SidebarItem::Employee(1),
                SidebarItem::GroupsHeader,
                SidebarItem::Group(0),
            ]
        );

        let mut state = SidebarState::default();
        state.clamp(&items);
        assert_eq!(state.selected, 1);
        state.step(&items, 1);
        state.step(&items, 1);
        assert_eq!(state.selected_item(&items), Some(SidebarItem::Group(0)));
        assert_eq!(
            lists.conversation(SidebarItem::Group(0)).unwrap().display_name,
            "Kitchen"
        );
        // Past the end stays put; back up skips the separator.
        state.step(&items, 1);
        assert_eq!(state.selected, 4);
        state.step(&items, -1);
        assert_eq!(state.selected, 2);
        state.step(&items, -5);
        assert_eq!(state.selected, 2);
    }

    #[test]
    fn test_compact_uses_combined_list() {
        let a = conv(1, "Ana");
        let lists = SidebarLists {
            employees: vec![&a],
            groups: vec![],
            combined: vec![&a],
        };
        let items = lists.flat_items(true);
        assert_eq!(items, vec![SidebarItem::Combined(0)]);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let lists = SidebarLists {
            employees: vec![],
            groups: vec![],
            combined: vec![],
        };
        let items = lists.flat_items(false);
        let mut state = SidebarState {
            selected: 7,
            ..Default::default()
        };
        state.clamp(&items);
        assert!(state.selected_item(&items).is_none());
    }

    #[test]
    fn test_marking_skips_groups() {
        let a = conv(1, "Ana");
        let mut group = conv(9, "Kitchen");
        group.kind = crate::models::ConversationKind::Group;

        let mut state = SidebarState::default();
        assert!(state.toggle_mark(&a));
        assert!(state.is_marked(&a));
        assert!(!state.toggle_mark(&group));
        assert_eq!(state.marked.len(), 1);
        assert!(!state.toggle_mark(&a));
        assert!(state.marked.is_empty());
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(scroll_offset(3, 10, 5), 0);
        assert_eq!(scroll_offset(12, 10, 20), 3);
        assert_eq!(scroll_offset(19, 10, 20), 10);
    }
}
