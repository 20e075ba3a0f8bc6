//! TUI application state and main event loop

use std::collections::VecDeque;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{FutureExt, StreamExt};
use ratatui::DefaultTerminal;
use tokio::process;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::compose::{ComposeAction, ComposeState};
use super::debug_log::DebugLogState;
use super::log_capture::LogBuffer;
use super::messages::MessagesState;
use super::sidebar::{SidebarLists, SidebarState, COMPACT_WIDTH};
use super::ui;
use crate::api::{ChatBackend, HttpBackend};
use crate::config::Config;
use crate::messaging::attachments::{self, AttachmentError, AttachmentKind};
use crate::messaging::{Messenger, MessengerEvent, Notice, Update};
use crate::models::Conversation;

/// Target frame rate for UI updates (~30 fps)
const FRAME_DURATION_MS: u64 = 33;

/// Active pane in the TUI
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "conversations",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }
}

/// New-group modal. Stays open until the backend accepts the group.
#[derive(Debug, Default)]
pub struct GroupPrompt {
    pub name: String,
    /// A create request is in flight
    pub pending: bool,
}

/// Application state
pub struct App<B: ChatBackend + 'static> {
    pub messenger: Messenger<B>,
    pub should_exit: bool,
    pub active_pane: Pane,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub debug_log: DebugLogState,
    /// Transient line in the status bar
    pub status_message: Option<String>,
    pub status_is_error: bool,
    /// Blocking alerts; the front one is shown until dismissed
    pub alerts: VecDeque<String>,
    pub group_prompt: Option<GroupPrompt>,
    download_dir: PathBuf,
}

impl<B: ChatBackend + 'static> App<B> {
    pub fn new(messenger: Messenger<B>, log_buffer: LogBuffer, download_dir: PathBuf) -> Self {
        Self {
            messenger,
            should_exit: false,
            active_pane: Pane::default(),
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            debug_log: DebugLogState::new(log_buffer),
            status_message: None,
            status_is_error: false,
            alerts: VecDeque::new(),
            group_prompt: None,
            download_dir,
        }
    }

    pub fn sidebar_lists(&self) -> SidebarLists<'_> {
        SidebarLists {
            employees: self.messenger.employee_conversations(),
            groups: self.messenger.group_conversations(),
            combined: self.messenger.combined_conversations(),
        }
    }

    fn set_status(&mut self, msg: impl Into<String>, is_error: bool) {
        self.status_message = Some(msg.into());
        self.status_is_error = is_error;
    }

    // ---- Messenger --------------------------------------------------------

    pub fn on_messenger_event(&mut self, event: MessengerEvent) {
        let group_outcome = match &event {
            MessengerEvent::GroupCreated(result) => Some(result.is_ok()),
            _ => None,
        };
        let update = self.messenger.handle(event);
        match group_outcome {
            Some(true) => {
                self.group_prompt = None;
                self.sidebar.marked.clear();
            }
            Some(false) => {
                if let Some(prompt) = self.group_prompt.as_mut() {
                    prompt.pending = false;
                }
            }
            None => {}
        }
        self.apply_update(update);
    }

    /// Pull notices and re-anchor the views after a messenger state change.
    fn apply_update(&mut self, update: Update) {
        for notice in self.messenger.take_notices() {
            match notice {
                Notice::Alert(msg) => self.alerts.push_back(msg),
                Notice::Info(msg) => self.set_status(msg, false),
            }
        }
        if !update.changed {
            return;
        }
        let count = self.messenger.message_count();
        if update.scroll_to_latest {
            self.messages.scroll_to_latest(count);
        } else {
            self.messages.sync_len(count);
        }
        let items = self.sidebar_lists().flat_items(self.sidebar.compact);
        self.sidebar.clamp(&items);
    }

    // ---- Input ------------------------------------------------------------

    pub fn handle_terminal_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(width, _) => {
                self.sidebar.compact = width < COMPACT_WIDTH;
                let items = self.sidebar_lists().flat_items(self.sidebar.compact);
                self.sidebar.clamp(&items);
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if !self.alerts.is_empty() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.alerts.pop_front();
            }
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_exit = true;
            return;
        }
        match key.code {
            KeyCode::F(12) => {
                self.debug_log.toggle();
                return;
            }
            KeyCode::PageUp if self.debug_log.visible => {
                self.debug_log.scroll_up(10);
                return;
            }
            KeyCode::PageDown if self.debug_log.visible => {
                self.debug_log.scroll_down(10);
                return;
            }
            KeyCode::Tab => {
                self.cycle_pane();
                return;
            }
            _ => {}
        }

        self.status_message = None;
        if self.group_prompt.is_some() {
            self.handle_group_prompt_key(key);
            return;
        }
        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => match self.compose.handle_key(key) {
                ComposeAction::Submit => self.submit(),
                ComposeAction::Leave => self.leave_conversation(),
                ComposeAction::None => {}
            },
        }
    }

    fn cycle_pane(&mut self) {
        self.active_pane = match (self.active_pane, self.messenger.current().is_some()) {
            (Pane::Sidebar, true) => Pane::Messages,
            (Pane::Messages, _) => Pane::Compose,
            _ => Pane::Sidebar,
        };
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        if self.sidebar.searching {
            let mut term = self.messenger.directory().search_input().to_string();
            match key.code {
                KeyCode::Esc => {
                    self.sidebar.searching = false;
                    term.clear();
                }
                KeyCode::Enter => {
                    self.sidebar.searching = false;
                    return;
                }
                KeyCode::Backspace => {
                    term.pop();
                }
                KeyCode::Char(c) => term.push(c),
                _ => return,
            }
            self.messenger.set_search(term);
            return;
        }

        let items = self.sidebar_lists().flat_items(self.sidebar.compact);
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.step(&items, -1),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.step(&items, 1),
            KeyCode::Enter | KeyCode::Right => self.open_selected(),
            KeyCode::Char('/') => self.sidebar.searching = true,
            KeyCode::Char(' ') => self.mark_selected(),
            KeyCode::Char('n') => self.group_prompt = Some(GroupPrompt::default()),
            KeyCode::Char('u') => {
                self.sidebar.unread_only = !self.messenger.directory().filter().unread_only;
                self.messenger.set_unread_only(self.sidebar.unread_only);
                let items = self.sidebar_lists().flat_items(self.sidebar.compact);
                self.sidebar.clamp(&items);
            }
            KeyCode::Char('r') => {
                self.messenger.load_directory();
                self.set_status("Refreshing...", false);
            }
            _ => {}
        }
    }

    fn handle_group_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.group_prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.group_prompt = None,
            KeyCode::Enter if !prompt.pending => {
                prompt.pending = true;
                let name = prompt.name.trim().to_string();
                let members = self.sidebar.marked.iter().cloned().collect();
                self.messenger.create_group(name, members);
            }
            KeyCode::Backspace => {
                prompt.name.pop();
            }
            KeyCode::Char(c) if !prompt.pending => prompt.name.push(c),
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        let count = self.messenger.message_count();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.messages.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.messages.select_next(count),
            KeyCode::End | KeyCode::Char('G') => self.messages.scroll_to_latest(count),
            KeyCode::Char('s') => self.save_selected_attachments(),
            KeyCode::Char('v') => self.view_selected_image(),
            KeyCode::Char('i') | KeyCode::Enter => self.active_pane = Pane::Compose,
            KeyCode::Esc => self.leave_conversation(),
            _ => {}
        }
    }

    // ---- Actions ----------------------------------------------------------

    fn open_selected(&mut self) {
        let Some(conversation) = self.selected_conversation() else {
            return;
        };
        self.messages = MessagesState::default();
        let update = self.messenger.select_conversation(conversation);
        self.apply_update(update);
        self.active_pane = Pane::Compose;
    }

    fn selected_conversation(&self) -> Option<Conversation> {
        let lists = self.sidebar_lists();
        let items = lists.flat_items(self.sidebar.compact);
        self.sidebar
            .selected_item(&items)
            .and_then(|item| lists.conversation(item))
            .cloned()
    }

    fn mark_selected(&mut self) {
        let Some(conversation) = self.selected_conversation() else {
            return;
        };
        if conversation.is_group() {
            self.set_status("Only employees can be added to a group", true);
            return;
        }
        self.sidebar.toggle_mark(&conversation);
        let n = self.sidebar.marked.len();
        self.set_status(format!("{} member(s) marked, n: new group", n), false);
    }

    fn leave_conversation(&mut self) {
        self.messenger.back_to_list();
        self.messages = MessagesState::default();
        self.active_pane = Pane::Sidebar;
    }

    /// Enter in the compose box: run a `/` command or send the draft.
    fn submit(&mut self) {
        let input = self.compose.input.trim().to_string();
        if let Some(path) = input.strip_prefix("/attach ") {
            self.attach_file(Path::new(path.trim()));
            self.compose.clear();
            return;
        }
        if input == "/detach" {
            self.compose.files.clear();
            self.compose.clear();
            self.set_status("Attachments removed", false);
            return;
        }

        if self.messenger.current().is_none() {
            return;
        }
        if let Some(draft) = self.compose.take_draft() {
            let update = self.messenger.send_message(draft);
            self.apply_update(update);
        }
    }

    /// Queue a file for sending. Oversized files raise an alert; disallowed
    /// types are refused.
    fn attach_file(&mut self, path: &Path) {
        let result = self
            .compose
            .attach(path)
            .map(|f| (f.name.clone(), attachments::check(f)));
        match result {
            Ok((name, Ok(()))) => self.set_status(format!("Attached {}", name), false),
            Ok((_, Err(e))) => {
                self.compose.files.pop();
                match e {
                    AttachmentError::TooLarge { .. } => self.alerts.push_back(e.to_string()),
                    _ => self.set_status(e.to_string(), true),
                }
            }
            Err(e) => self.set_status(format!("{:#}", e), true),
        }
    }

    fn save_selected_attachments(&mut self) {
        let saved: Result<Vec<PathBuf>> = {
            let messages = self.messenger.messages();
            match messages.get(self.messages.selected) {
                Some(msg) if !msg.attachments.is_empty() => msg
                    .attachments
                    .iter()
                    .map(|a| attachments::save(a, &self.download_dir))
                    .collect(),
                _ => Ok(Vec::new()),
            }
        };
        match saved {
            Ok(paths) if paths.is_empty() => self.set_status("No attachments on this message", true),
            Ok(paths) => self.set_status(
                format!("Saved {} file(s) to {}", paths.len(), self.download_dir.display()),
                false,
            ),
            Err(e) => self.set_status(format!("Save failed: {:#}", e), true),
        }
    }
}

impl<B: ChatBackend + 'static> App<B> {
    /// Show the selected message's first image at full size in the
    /// platform image viewer.
    fn view_selected_image(&mut self) {
        let saved = {
            let messages = self.messenger.messages();
            let image = messages.get(self.messages.selected).and_then(|m| {
                m.attachments
                    .iter()
                    .find(|a| AttachmentKind::of(&a.media_type).has_preview())
            });
            match image {
                Some(a) => attachments::save(a, &Config::preview_dir()).map(Some),
                None => Ok(None),
            }
        };
        match saved {
            Ok(Some(path)) => match open_in_viewer(&path) {
                Ok(()) => self.set_status(format!("Opened {}", path.display()), false),
                Err(e) => self.set_status(format!("Failed to open viewer: {}", e), true),
            },
            Ok(None) => self.set_status("No image on this message", true),
            Err(e) => self.set_status(format!("Preview failed: {:#}", e), true),
        }
    }
}

fn open_in_viewer(path: &Path) -> io::Result<()> {
    spawn_reaped(viewer_command(path)?).map(|_| ())
}

#[cfg(target_os = "windows")]
fn viewer_command(path: &Path) -> io::Result<process::Command> {
    let mut cmd = process::Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(path);
    Ok(cmd)
}

#[cfg(target_os = "macos")]
fn viewer_command(path: &Path) -> io::Result<process::Command> {
    let mut cmd = process::Command::new("open");
    cmd.arg(path);
    Ok(cmd)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn viewer_command(path: &Path) -> io::Result<process::Command> {
    let mut cmd = process::Command::new("xdg-open");
    cmd.arg(path);
    Ok(cmd)
}

#[cfg(not(any(unix, windows)))]
fn viewer_command(_: &Path) -> io::Result<process::Command> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "no image viewer known for this platform",
    ))
}

/// Spawn with null stdio and wait on the child in the background.
fn spawn_reaped(mut cmd: process::Command) -> io::Result<JoinHandle<()>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => tracing::warn!("Viewer exited with {}", status),
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to wait for viewer: {}", e),
        }
    }))
}

/// Run the TUI with panic-safe terminal restore.
pub async fn run(log_buffer: LogBuffer) -> Result<()> {
    let config = Config::load()?;
    let operator = config.operator()?.clone();
    let backend = HttpBackend::from_config(&config)?;
    let messenger = Messenger::new(backend, operator, config.timing.clone());
    let app = App::new(messenger, log_buffer, Config::download_dir());

    let mut terminal = ratatui::init();
    let result = AssertUnwindSafe(run_app(&mut terminal, app))
        .catch_unwind()
        .await;
    ratatui::restore();

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

async fn run_app<B: ChatBackend + 'static>(
    terminal: &mut DefaultTerminal,
    mut app: App<B>,
) -> Result<()> {
    let (width, _) = crossterm::terminal::size()?;
    app.sidebar.compact = width < COMPACT_WIDTH;
    app.messenger.load_directory();
    tracing::info!("Signed in as {}", app.messenger.operator().name);

    let mut input = EventStream::new();
    // The list refreshes on the read-receipt cadence so unread badges stay current.
    let mut directory_refresh = time::interval(app.messenger.timing().read_interval());
    directory_refresh.tick().await;
    let mut frame = time::interval(Duration::from_millis(FRAME_DURATION_MS));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !app.should_exit {
        app.debug_log.refresh();
        terminal.draw(|f| ui::render(f, &app))?;

        tokio::select! {
            Some(event) = app.messenger.next_event() => app.on_messenger_event(event),
            maybe = input.next() => match maybe {
                Some(Ok(event)) => app.handle_terminal_event(event),
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = directory_refresh.tick() => app.messenger.refresh_conversations(),
            _ = frame.tick() => {}
        }
    }

    app.messenger.back_to_list();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::Timing;
    use crate::messaging::attachments::{encode, SelectedFile, MAX_ATTACHMENT_BYTES};
    use crate::messaging::testing::{Call, MemoryBackend};
    use crate::models::{ConversationKind, ConversationRecord, Operator, RecordId, Role};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(app: &mut App<MemoryBackend>, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    async fn app_with(backend: &Arc<MemoryBackend>, dir: &Path) -> App<MemoryBackend> {
        let operator = Operator {
            id: "1".into(),
            name: "Maria".into(),
            role: Role::Admin,
        };
        let mut messenger = Messenger::new(Arc::clone(backend), operator, Timing::default());
        messenger.load_directory_now().await.unwrap();
        App::new(messenger, LogBuffer::new(), dir.to_path_buf())
    }

    async fn settle(app: &mut App<MemoryBackend>) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
            while let Some(ev) = app.messenger.try_next_event() {
                app.on_messenger_event(ev);
            }
        }
    }

    fn roster(backend: &MemoryBackend) {
        backend.state().employees =
            vec![serde_json::from_value(json!({"id": 42, "name": "Chef Luis"})).unwrap()];
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_and_send_from_keyboard() {
        let backend = Arc::new(MemoryBackend::default());
        roster(&backend);
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&backend, dir.path()).await;

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.active_pane, Pane::Compose);
        assert_eq!(app.messenger.current().unwrap().display_name, "Chef Luis");

        type_str(&mut app, "Welcome!");
        app.handle_key(key(KeyCode::Enter));
        assert!(app.compose.input.is_empty());
        assert_eq!(app.messenger.messages().len(), 1);

        settle(&mut app).await;
        assert!(backend.calls().contains(&Call::SendPrivate("42".into())));
        assert!(!app.messenger.current().unwrap().id.is_virtual());
        assert_eq!(app.messages.selected, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_attach_raises_blocking_alert() {
        let backend = Arc::new(MemoryBackend::default());
        roster(&backend);
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("scan.pdf");
        std::fs::write(&big, vec![0u8; MAX_ATTACHMENT_BYTES as usize + 1]).unwrap();
        let ok = dir.path().join("menu.png");
        std::fs::write(&ok, vec![0u8; 64]).unwrap();

        let mut app = app_with(&backend, dir.path()).await;
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));

        type_str(&mut app, &format!("/attach {}", big.display()));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.compose.files.is_empty());
        assert_eq!(app.alerts.len(), 1);

        // Keys are swallowed until the alert is dismissed.
        type_str(&mut app, "x");
        assert!(app.compose.input.is_empty());
        app.handle_key(key(KeyCode::Enter));
        assert!(app.alerts.is_empty());

        type_str(&mut app, &format!("/attach {}", ok.display()));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.compose.files.len(), 1);
        assert!(app.compose.input.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_attachment_from_messages_pane() {
        let backend = Arc::new(MemoryBackend::default());
        roster(&backend);
        {
            let mut s = backend.state();
            s.conversations = vec![ConversationRecord {
                id: "c9".into(),
                kind: ConversationKind::Private,
                participant_ids: Some(vec![RecordId::from("1"), RecordId::from("42")]),
                ..Default::default()
            }];
            s.push_message("c9", "42", Role::Employee, "invoice attached");
            let file = SelectedFile::new("invoice.pdf", "application/pdf", b"%PDF-1.4".to_vec());
            let msg = s.messages.get_mut("c9").unwrap().last_mut().unwrap();
            msg.attachments = vec![encode(&file)];
            msg.has_attachments = true;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&backend, dir.path()).await;

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app).await;
        assert_eq!(app.messenger.messages().len(), 1);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_pane, Pane::Sidebar);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_pane, Pane::Messages);
        app.handle_key(key(KeyCode::Char('s')));
        assert!(!app.status_is_error);
        let saved = tokio_test::assert_ok!(std::fs::read(dir.path().join("invoice.pdf")));
        assert_eq!(saved, b"%PDF-1.4");

        // Only images open in the viewer.
        app.handle_key(key(KeyCode::Char('v')));
        assert!(app.status_is_error);

        app.handle_key(key(KeyCode::Esc));
        assert!(app.messenger.current().is_none());
        assert_eq!(app.active_pane, Pane::Sidebar);
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_modal_stays_open_until_created() {
        let backend = Arc::new(MemoryBackend::default());
        roster(&backend);
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&backend, dir.path()).await;

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.sidebar.marked.contains("42"));
        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.group_prompt.is_some());

        // Blank name: the backend refuses, the modal stays for a retry.
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app).await;
        assert_eq!(app.alerts.len(), 1);
        assert!(!app.group_prompt.as_ref().unwrap().pending);
        app.handle_key(key(KeyCode::Enter));

        type_str(&mut app, "Line cooks");
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app).await;
        assert!(app.group_prompt.is_none());
        assert!(app.sidebar.marked.is_empty());
        assert_eq!(app.status_message.as_deref(), Some("Created group 'Line cooks'"));

        let state = backend.state();
        assert_eq!(state.groups[0].member_ids, vec![RecordId::from("42")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_typing_filters_after_debounce() {
        let backend = Arc::new(MemoryBackend::default());
        backend.state().employees = vec![
            serde_json::from_value(json!({"id": 2, "name": "Sam"})).unwrap(),
            serde_json::from_value(json!({"id": 3, "name": "Ana"})).unwrap(),
        ];
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&backend, dir.path()).await;

        app.handle_key(key(KeyCode::Char('/')));
        type_str(&mut app, "an");
        assert_eq!(app.messenger.directory().search_input(), "an");
        assert_eq!(app.messenger.employee_conversations().len(), 2);

        time::advance(Duration::from_millis(250)).await;
        settle(&mut app).await;
        assert_eq!(app.messenger.employee_conversations().len(), 1);

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.sidebar.searching);
        time::advance(Duration::from_millis(250)).await;
        settle(&mut app).await;
        assert_eq!(app.messenger.employee_conversations().len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_viewer_child_is_awaited() {
        let waiter = spawn_reaped(process::Command::new("true")).unwrap();
        waiter.await.unwrap();

        let missing = spawn_reaped(process::Command::new("staff-chat-no-such-viewer"));
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_viewer_command_passes_path() {
        let cmd = viewer_command(Path::new("/tmp/menu.png")).unwrap();
        assert_eq!(cmd.as_std().get_program(), "xdg-open");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, vec![std::ffi::OsStr::new("/tmp/menu.png")]);
    }
}
