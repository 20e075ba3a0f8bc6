//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

use super::app::{App, GroupPrompt, Pane};
use super::compose;
use super::debug_log;
use super::messages::{self, MessagesView};
use super::sidebar;
use crate::api::ChatBackend;

/// Sidebar width in the two-section layout.
const SIDEBAR_WIDTH: u16 = 32;
/// Sidebar width when the combined list is shown.
const COMPACT_SIDEBAR_WIDTH: u16 = 24;

/// Main render function
pub fn render<B: ChatBackend + 'static>(frame: &mut Frame, app: &App<B>) {
    let area = frame.area();

    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);

    // Debug log takes the lower third when shown.
    let (main_area, log_area) = if app.debug_log.visible {
        let [top, bottom] =
            Layout::vertical([Constraint::Fill(2), Constraint::Fill(1)]).areas(main_area);
        (top, Some(bottom))
    } else {
        (main_area, None)
    };

    let sidebar_width = if app.sidebar.compact {
        COMPACT_SIDEBAR_WIDTH
    } else {
        SIDEBAR_WIDTH
    };
    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(sidebar_width), Constraint::Fill(1)])
            .areas(main_area);

    let current = app.messenger.current();
    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.sidebar,
        &app.sidebar_lists(),
        app.messenger.directory().search_input(),
        current,
        app.active_pane == Pane::Sidebar,
    );

    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);

    let view = MessagesView {
        conversation: current,
        messages: app.messenger.messages(),
        loading: app.messenger.is_loading(),
        has_unread: app.messenger.has_unread(),
        own_id: &app.messenger.operator().id,
    };
    messages::render(
        messages_area,
        frame.buffer_mut(),
        &app.messages,
        &view,
        app.active_pane == Pane::Messages,
    );

    compose::render(
        compose_area,
        frame,
        &app.compose,
        current.map(|c| c.display_name.as_str()),
        app.active_pane == Pane::Compose,
    );

    if let Some(log_area) = log_area {
        debug_log::render(log_area, frame.buffer_mut(), &app.debug_log);
    }

    render_status(status_area, frame.buffer_mut(), app);

    if let Some(prompt) = &app.group_prompt {
        render_group_prompt(frame, prompt, app.sidebar.marked.len());
    }

    // Blocking alert on top of everything.
    if let Some(alert) = app.alerts.front() {
        render_alert(frame, alert);
    }
}

fn render_header<B: ChatBackend + 'static>(area: Rect, buf: &mut Buffer, app: &App<B>) {
    let title = " Staff Chat";
    let operator = app.messenger.operator();
    let right = format!(" {} ({}) ", operator.name, operator.role.as_str());
    let padding = (area.width as usize).saturating_sub(title.len() + right.chars().count());

    let line = Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(padding)),
        Span::styled(right, Style::default().fg(Color::Cyan)),
    ]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_status<B: ChatBackend + 'static>(area: Rect, buf: &mut Buffer, app: &App<B>) {
    if let Some(ref msg) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(Color::Red).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green).bg(Color::DarkGray)
        };
        Paragraph::new(Line::from(Span::styled(format!(" {} ", msg), style)))
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
        return;
    }

    let hints = match app.active_pane {
        Pane::Sidebar => "Enter: open  /: search  u: unread  Space: mark  n: new group  q: quit",
        Pane::Messages => "Up/Down: select  s: save  v: view image  i: write  Esc: back",
        Pane::Compose => "Enter: send  Shift+Enter: newline  C-u: clear  Esc: back",
    };
    let sep = Style::default().fg(Color::Gray);
    let line = Line::from(vec![
        Span::styled(
            format!(" Tab: {} ", app.active_pane.as_str()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled("| ", sep),
        Span::styled(hints, Style::default().fg(Color::Gray)),
        Span::styled(" | F12: log", sep),
    ]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Centered box of the given height, 60% of the screen wide.
fn modal_area(frame: &Frame, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(frame.area());
    let [area] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(row);
    area
}

fn render_group_prompt(frame: &mut Frame, prompt: &GroupPrompt, members: usize) {
    let area = modal_area(frame, 6);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " New group ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let status = if prompt.pending {
        "Creating...".to_string()
    } else {
        format!("{} member(s) marked  Enter: create  Esc: cancel", members)
    };
    let body = vec![
        Line::from(vec![
            Span::styled("Name: ", Style::default().fg(Color::Gray)),
            Span::styled(prompt.name.clone(), Style::default().fg(Color::White)),
            Span::styled("_", Style::default().fg(Color::Yellow)),
        ]),
        Line::from(""),
        Line::from(Span::styled(status, Style::default().fg(Color::DarkGray))),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(body).block(block), area);
}

fn render_alert(frame: &mut Frame, text: &str) {
    let area = modal_area(frame, 7);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            " Alert ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    let body = vec![
        Line::from(Span::styled(text.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
