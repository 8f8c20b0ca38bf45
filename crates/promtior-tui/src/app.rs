use ratatui::layout::Rect;
use promtior_core::{
    ChatBackend, ChatRole, ChatView, PendingSend, RagClient, Row, SendError, SendState,
    Transcript, TYPING_TEXT,
};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::tui::AppEvent;
use crate::ui;

pub const GREETING_TEXT: &str = "Hola, soy el asistente de Promtior. Podés preguntarme por servicios, enfoque de la empresa u otra información basada en su contenido.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Everything the chat screen shows: the transcript, the input box and the
/// error banner.
pub struct ChatPane {
    pub transcript: Transcript,
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub input_enabled: bool,
    pub input_mode: InputMode,
    pub error: String,

    pub scroll: u16,
    pub height: u16, // Inner height of the chat area, updated during render
    pub width: u16,  // Inner width the transcript wraps at

    /// Stick to the newest row until the user scrolls away from it
    pub follow: bool,

    pub animation_frame: u8, // 0-2 for the typing ellipsis
}

impl ChatPane {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            input: String::new(),
            cursor: 0,
            input_enabled: true,
            input_mode: InputMode::Editing,
            error: String::new(),
            scroll: 0,
            height: 0,
            width: 0,
            follow: true,
            animation_frame: 0,
        }
    }

    pub fn typing_text(&self) -> String {
        format!("{}{}", TYPING_TEXT, ".".repeat(self.animation_frame as usize + 1))
    }

    pub fn tick_animation(&mut self) {
        if self.transcript.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Number of rendered lines at the current inner width, counted with the
    /// same word wrapper the chat paragraph is drawn with.
    fn total_lines(&self) -> u16 {
        let wrap_width = if self.width > 0 { self.width } else { 50 };
        let count = ui::chat_paragraph(self).line_count(wrap_width);
        count.min(u16::MAX as usize) as u16
    }

    pub fn max_scroll(&self) -> u16 {
        let visible_height = if self.height > 0 { self.height } else { 20 };
        self.total_lines().saturating_sub(visible_height)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
        self.follow = true;
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.follow = self.max_scroll() == 0;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(lines).min(max);
        self.follow = self.scroll == max;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow = self.scroll == self.max_scroll();
    }

    /// Re-apply the scroll position after the pane size may have changed.
    pub fn keep_in_view(&mut self) {
        if self.follow {
            self.scroll_to_bottom();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    /// Record the inner size of the chat area, called on every render.
    pub fn fit_to_area(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.keep_in_view();
    }

    pub fn half_page(&self) -> u16 {
        (self.height / 2).max(1)
    }
}

impl Default for ChatPane {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for ChatPane {
    fn append_message(&mut self, role: ChatRole, text: &str) {
        self.transcript.append_message(role, text);
        self.scroll_to_bottom();
    }

    fn set_typing(&mut self, typing: bool) {
        self.transcript.set_typing(typing);
        self.animation_frame = 0;
        self.scroll_to_bottom();
    }

    fn set_error(&mut self, text: &str) {
        self.error = text.to_string();
    }

    fn clear_error(&mut self) {
        self.error.clear();
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn focus_input(&mut self) {
        self.input_mode = InputMode::Editing;
        self.cursor = self.input.chars().count();
    }
}

pub struct App {
    pub should_quit: bool,
    pub chat: ChatPane,

    // Send pipeline state
    pub send_state: SendState,
    pub pending: Option<PendingSend>,
    pub client: RagClient,
    events: UnboundedSender<AppEvent>,

    // Chat area for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(client: RagClient, events: UnboundedSender<AppEvent>) -> Self {
        let mut chat = ChatPane::new();
        chat.append_message(ChatRole::Bot, GREETING_TEXT);

        Self {
            should_quit: false,
            chat,
            send_state: SendState::Idle,
            pending: None,
            client,
            events,
            chat_area: None,
        }
    }

    /// Submit whatever is in the input box.
    pub fn submit(&mut self) {
        let text = self.chat.input.clone();
        match self.send_state.begin(&mut self.chat, &text) {
            Ok(pending) => self.dispatch(pending),
            Err(err) => debug!(error = %err, "submission ignored"),
        }
    }

    /// Run the request in the background; the result comes back through the
    /// event channel as [`AppEvent::SendFinished`].
    fn dispatch(&mut self, pending: PendingSend) {
        let client = self.client.clone();
        let input = pending.input().to_string();
        let events = self.events.clone();

        let request = tokio::spawn(async move { client.invoke(&input).await });
        tokio::spawn(async move {
            let result = match request.await {
                Ok(result) => result,
                Err(join_err) => Err(SendError::Task(join_err.to_string())),
            };
            if events.send(AppEvent::SendFinished(result)).is_err() {
                debug!("UI loop gone before the reply arrived");
            }
        });

        self.pending = Some(pending);
    }

    pub fn on_send_finished(&mut self, result: Result<Value, SendError>) {
        let Some(pending) = self.pending.take() else {
            warn!("reply arrived with no send in flight");
            return;
        };
        // Failures are logged and shown as the banner by the pipeline
        let _ = self.send_state.finish(&mut self.chat, pending, result);
    }

    pub fn is_sending(&self) -> bool {
        self.send_state.is_sending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promtior_core::{ERROR_BANNER_TEXT, INVOKE_PATH};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn next_reply(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Result<Value, SendError> {
        match rx.recv().await {
            Some(AppEvent::SendFinished(result)) => result,
            other => panic!("expected SendFinished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_app_greets() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let app = App::new(RagClient::new("http://localhost:8000"), tx);

        let greeting = app.chat.transcript.last_message().unwrap();
        assert_eq!(greeting.role, ChatRole::Bot);
        assert_eq!(greeting.content, GREETING_TEXT);
        assert_eq!(app.chat.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn test_whitespace_submit_does_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(RagClient::new("http://127.0.0.1:9"), tx);
        app.chat.input = "   ".into();

        app.submit();

        assert!(!app.is_sending());
        assert!(app.pending.is_none());
        assert_eq!(app.chat.transcript.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_renders_reply() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": {"content": [{"text": "a"}, {"text": "b"}]}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(RagClient::new(&mock_server.uri()), tx);
        app.chat.input = "¿Qué hace Promtior?".into();

        app.submit();

        assert!(app.is_sending());
        assert!(!app.chat.input_enabled);
        assert!(app.chat.input.is_empty());
        assert!(app.chat.transcript.is_typing());

        let result = next_reply(&mut rx).await;
        app.on_send_finished(result);

        let reply = app.chat.transcript.last_message().unwrap();
        assert_eq!(reply.role, ChatRole::Bot);
        assert_eq!(reply.content, "a\nb");
        assert!(!app.chat.transcript.is_typing());
        assert!(app.chat.input_enabled);
        assert_eq!(app.chat.input_mode, InputMode::Editing);
        assert!(!app.is_sending());
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_dropped() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": "hola"}))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(RagClient::new(&mock_server.uri()), tx);

        app.chat.input = "primera".into();
        app.submit();
        app.chat.input = "segunda".into();
        app.submit();

        // Greeting + first user message + typing row
        assert_eq!(app.chat.transcript.len(), 3);
        assert_eq!(app.chat.input, "segunda");

        let result = next_reply(&mut rx).await;
        app.on_send_finished(result);
        assert_eq!(app.chat.transcript.last_message().unwrap().content, "hola");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_server_error_shows_banner() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(RagClient::new(&mock_server.uri()), tx);
        app.chat.input = "hola".into();

        app.submit();
        let result = next_reply(&mut rx).await;
        app.on_send_finished(result);

        assert_eq!(app.chat.error, ERROR_BANNER_TEXT);
        let last = app.chat.transcript.last_message().unwrap();
        assert_eq!(last.role, ChatRole::User);
        assert!(!app.chat.transcript.is_typing());
        assert!(app.chat.input_enabled);
        assert_eq!(app.chat.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_scroll_follows_new_messages() {
        let mut chat = ChatPane::new();
        chat.height = 4;
        chat.width = 20;

        for i in 0..5 {
            chat.append_message(ChatRole::User, &format!("mensaje {i}"));
        }

        // 5 messages x (label + text + blank) = 15 lines, 4 visible
        assert_eq!(chat.scroll, 11);
        chat.scroll_down(10);
        assert_eq!(chat.scroll, 11);
        chat.scroll_up(20);
        assert_eq!(chat.scroll, 0);
        assert!(!chat.follow);

        // Scrolled away: a new message does not yank the view back
        chat.fit_to_area(20, 4);
        assert_eq!(chat.scroll, 0);
        chat.scroll_down(100);
        assert!(chat.follow);
    }

    #[test]
    fn test_wrapped_words_count_as_extra_lines() {
        let mut chat = ChatPane::new();
        chat.fit_to_area(22, 4);

        // Each 11 char word plus its space overflows a 22 column row
        chat.append_message(ChatRole::Bot, "aaaaaaaaaaa bbbbbbbbbbb ccccccccccc ddddddddddd");

        // label + 4 wrapped rows + blank
        assert_eq!(chat.total_lines(), 6);
        assert_eq!(chat.scroll, 2);
    }

    #[test]
    fn test_typing_animation_only_while_typing() {
        let mut chat = ChatPane::new();
        chat.tick_animation();
        assert_eq!(chat.animation_frame, 0);

        chat.set_typing(true);
        chat.tick_animation();
        chat.tick_animation();
        assert_eq!(chat.typing_text(), format!("{TYPING_TEXT}..."));
        chat.tick_animation();
        assert_eq!(chat.typing_text(), format!("{TYPING_TEXT}."));
    }
}
