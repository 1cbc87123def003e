//! Interactive terminal chat

use anyhow::Result;
use concierge_client::{ChatEndpoint, ChatError, Concierge, PendingRequest};
use concierge_core::session::Role;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

pub const PENDING_TEXT: &str = "🔮 Consulting the time streams...";
pub const EMPTY_HINT: &str = "Ask me anything about history, the future, or imaginary journeys.";
pub const INPUT_EXAMPLE: &str = "E.g., 'Take me to Ancient Rome'";

type Completion = (PendingRequest, Result<String, ChatError>);

struct TuiApp {
    concierge: Concierge,
    input: String,
    scroll: u16,
    /// Largest useful `scroll`, from the wrapped height of the last frame
    bottom: u16,
    /// Thread rows visible in the last frame
    page: u16,
    follow: bool,
    should_quit: bool,
}

impl TuiApp {
    fn new(concierge: Concierge) -> Self {
        Self {
            concierge,
            input: String::new(),
            scroll: 0,
            bottom: 0,
            page: 1,
            follow: true,
            should_quit: false,
        }
    }

    fn new_journey(&mut self) {
        self.concierge.create_session();
        self.follow = true;
    }

    fn scroll_up(&mut self, rows: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(rows);
    }

    /// Scrolling back down to the last row resumes following new messages
    fn scroll_down(&mut self, rows: u16) {
        self.scroll = self.scroll.saturating_add(rows).min(self.bottom);
        if self.scroll >= self.bottom {
            self.follow = true;
        }
    }

    /// Move the active pointer through the sidebar; `step` is +1 (older) or -1 (newer)
    fn cycle_session(&mut self, step: isize) {
        let store = self.concierge.store();
        let len = store.len() as isize;
        if len == 0 {
            return;
        }
        let current = store
            .active_id()
            .and_then(|id| store.position(id))
            .map(|i| i as isize)
            .unwrap_or(-step);
        let next = (current + step).rem_euclid(len) as usize;
        let id = store.sessions()[next].id.clone();
        self.concierge.select_session(&id);
        self.follow = true;
    }

    /// Handle one key press, returning a request that must be dispatched
    fn handle_key(&mut self, key: KeyEvent) -> Option<PendingRequest> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.new_journey();
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.cycle_session(1),
            KeyCode::BackTab => self.cycle_session(-1),
            KeyCode::Up => self.scroll_up(1),
            KeyCode::PageUp => self.scroll_up(self.page),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageDown => self.scroll_down(self.page),
            KeyCode::Enter => return self.submit_input(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(ch);
            }
            _ => {}
        }
        None
    }

    fn submit_input(&mut self) -> Option<PendingRequest> {
        let content = std::mem::take(&mut self.input);
        match content.trim() {
            "" => None,
            "/quit" => {
                self.should_quit = true;
                None
            }
            "/new" => {
                self.new_journey();
                None
            }
            _ => {
                let session_id = match self.concierge.store().active_id() {
                    Some(id) => id.clone(),
                    None => self.concierge.create_session(),
                };
                self.follow = true;
                self.concierge.submit(&session_id, &content)
            }
        }
    }

    fn apply_completion(&mut self, completion: Completion) -> Option<PendingRequest> {
        let (request, outcome) = completion;
        self.follow = true;
        self.concierge.complete(request, outcome)
    }

    fn thread_lines(&self) -> Vec<Line<'static>> {
        let store = self.concierge.store();
        let messages = store.displayed();
        if messages.is_empty() {
            return vec![
                Line::from(""),
                Line::from(Span::styled(
                    EMPTY_HINT,
                    Style::default().add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center),
                Line::from(Span::styled(
                    INPUT_EXAMPLE,
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(Alignment::Center),
            ];
        }

        let mut lines = Vec::new();
        for msg in messages {
            let line = match msg.role {
                Role::User => Line::from(vec![
                    Span::raw(msg.text.clone()),
                    Span::styled(" [you]", Style::default().fg(Color::Green)),
                ])
                .alignment(Alignment::Right),
                Role::Assistant => Line::from(vec![
                    Span::styled("[concierge] ", Style::default().fg(Color::Yellow)),
                    Span::raw(msg.text.clone()),
                ]),
            };
            lines.push(line);
        }

        let active_pending = store
            .active_id()
            .is_some_and(|id| self.concierge.is_session_loading(id));
        if active_pending {
            lines.push(Line::from(Span::styled(
                PENDING_TEXT,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    }
}

fn draw(frame: &mut Frame, app: &mut TuiApp) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(frame.area());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(columns[1]);

    let store = app.concierge.store();
    let items: Vec<ListItem> = store
        .sessions()
        .iter()
        .map(|session| {
            let mut label = session.title.clone();
            if app.concierge.is_session_loading(&session.id) {
                label.push_str(" …");
            }
            let style = if store.active_id() == Some(&session.id) {
                Style::default().bg(Color::Rgb(139, 94, 60)).fg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        })
        .collect();
    frame.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("➕ New Journey (Ctrl+N)"),
        ),
        columns[0],
    );

    let status = if app.concierge.is_loading() {
        "traveling"
    } else {
        "idle"
    };
    frame.render_widget(
        Paragraph::new(format!(
            "journeys: {} | status: {} | Tab switch journey, Esc quit",
            store.len(),
            status
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Time Travel Concierge"),
        ),
        rows[0],
    );

    let lines = app.thread_lines();
    let wrapped = Paragraph::new(lines.clone())
        .wrap(Wrap { trim: false })
        .line_count(rows[1].width.saturating_sub(2));
    let visible = rows[1].height.saturating_sub(2);
    app.page = visible.max(1);
    app.bottom = u16::try_from(wrapped)
        .unwrap_or(u16::MAX)
        .saturating_sub(visible);
    if app.follow || app.scroll > app.bottom {
        app.scroll = app.bottom;
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false })
            .scroll((app.scroll, 0)),
        rows[1],
    );

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            INPUT_EXAMPLE,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(app.input.clone())
    };
    frame.render_widget(
        input.block(
            Block::default()
                .borders(Borders::ALL)
                .title("🚀 Travel (Enter)"),
        ),
        rows[2],
    );
    frame.set_cursor_position((
        rows[2].x + 1 + app.input.chars().count() as u16,
        rows[2].y + 1,
    ));
}

fn dispatch(
    endpoint: Arc<dyn ChatEndpoint>,
    request: PendingRequest,
    done_tx: mpsc::UnboundedSender<Completion>,
) {
    debug!(ticket = request.ticket, "Dispatching chat request");
    tokio::spawn(async move {
        let outcome = endpoint.send(&request.message).await;
        let _ = done_tx.send((request, outcome));
    });
}

/// Run the chat UI until the user quits
pub async fn run_tui(concierge: Concierge) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, TuiApp::new(concierge)).await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: TuiApp,
) -> Result<()> {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

    loop {
        while let Ok(completion) = done_rx.try_recv() {
            if let Some(next) = app.apply_completion(completion) {
                dispatch(app.concierge.endpoint(), next, done_tx.clone());
            }
        }

        terminal.draw(|frame| draw(frame, &mut app))?;

        if event::poll(Duration::from_millis(60))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(request) = app.handle_key(key) {
                    dispatch(app.concierge.endpoint(), request, done_tx.clone());
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_client::HttpChatEndpoint;
    use concierge_core::session::Message;
    use ratatui::backend::TestBackend;

    fn app() -> TuiApp {
        // Never contacted: these tests only exercise local state.
        let endpoint = Arc::new(HttpChatEndpoint::new("http://127.0.0.1:1"));
        TuiApp::new(Concierge::new(endpoint))
    }

    fn press(app: &mut TuiApp, code: KeyCode) -> Option<PendingRequest> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn render(app: &mut TuiApp, terminal: &mut Terminal<TestBackend>) -> String {
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    /// One session whose reply wraps far past a 60x16 window
    fn app_with_long_reply() -> TuiApp {
        let mut app = app();
        let request = type_text(&mut app, "hi").unwrap();
        let reply = format!("{} ENDMARK", "word ".repeat(120));
        app.apply_completion((request, Ok(reply)));
        app
    }

    fn type_text(app: &mut TuiApp, text: &str) -> Option<PendingRequest> {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
        press(app, KeyCode::Enter)
    }

    #[test]
    fn test_first_message_creates_a_journey() {
        let mut app = app();
        let request = type_text(&mut app, "Take me to Ancient Rome").unwrap();

        let store = app.concierge.store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_id(), Some(&request.session_id));
        assert_eq!(store.displayed(), &[Message::user("Take me to Ancient Rome")]);
        assert!(app.input.is_empty());
        assert!(app.concierge.is_loading());
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut app = app();
        assert!(type_text(&mut app, "   ").is_none());
        assert!(app.concierge.store().is_empty());
    }

    #[test]
    fn test_completion_appends_reply_and_clears_pending() {
        let mut app = app();
        let request = type_text(&mut app, "Take me to Ancient Rome").unwrap();

        let next = app.apply_completion((request, Ok("You arrive in 44 BC.".to_string())));
        assert!(next.is_none());
        assert_eq!(
            app.concierge.store().displayed(),
            &[
                Message::user("Take me to Ancient Rome"),
                Message::assistant("You arrive in 44 BC."),
            ]
        );
        assert!(!app.concierge.is_loading());
    }

    #[test]
    fn test_commands_and_quit_keys() {
        let mut app = app();
        assert!(type_text(&mut app, "/new").is_none());
        assert_eq!(app.concierge.store().len(), 1);

        app.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(app.concierge.store().len(), 2);

        type_text(&mut app, "/quit");
        assert!(app.should_quit);
    }

    #[test]
    fn test_tab_cycles_through_sessions() {
        let mut app = app();
        let oldest = app.concierge.create_session();
        let newest = app.concierge.create_session();

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.concierge.store().active_id(), Some(&oldest));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.concierge.store().active_id(), Some(&newest));
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.concierge.store().active_id(), Some(&oldest));
    }

    #[test]
    fn test_empty_thread_shows_hint_and_pending_shows_indicator() {
        let mut app = app();
        let hint: Vec<String> = app.thread_lines().iter().map(|l| l.to_string()).collect();
        assert!(hint.iter().any(|l| l == EMPTY_HINT));

        type_text(&mut app, "Show me the future");
        let lines: Vec<String> = app.thread_lines().iter().map(|l| l.to_string()).collect();
        assert_eq!(lines.last().map(String::as_str), Some(PENDING_TEXT));
    }

    #[test]
    fn test_control_chords_do_not_type() {
        let mut app = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert!(app.input.is_empty());

        app.handle_key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert_eq!(app.input, "A");
    }

    #[test]
    fn test_follow_shows_tail_of_wrapped_reply() {
        let mut app = app_with_long_reply();
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();

        let screen = render(&mut app, &mut terminal);
        assert!(app.bottom > 0);
        assert_eq!(app.scroll, app.bottom);
        assert!(screen.contains("ENDMARK"));
    }

    #[test]
    fn test_scrolling_back_down_reaches_wrapped_tail() {
        let mut app = app_with_long_reply();
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        render(&mut app, &mut terminal);

        for _ in 0..100 {
            press(&mut app, KeyCode::Up);
        }
        assert_eq!(app.scroll, 0);
        assert!(!app.follow);
        assert!(!render(&mut app, &mut terminal).contains("ENDMARK"));

        for _ in 0..100 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.scroll, app.bottom);
        assert!(app.follow);
        assert!(render(&mut app, &mut terminal).contains("ENDMARK"));
    }

    #[test]
    fn test_page_keys_move_by_visible_rows() {
        let mut app = app_with_long_reply();
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        render(&mut app, &mut terminal);
        let bottom = app.bottom;
        assert_eq!(app.page, 8);
        assert!(bottom > app.page);

        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.scroll, bottom - 8);
        assert!(!app.follow);

        press(&mut app, KeyCode::Down);
        assert_eq!(app.scroll, bottom - 7);
        assert!(!app.follow);

        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.scroll, bottom);
        assert!(app.follow);
    }
}
