use fasker_core::{ChatError, ChatSession, CredentialSource};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,
    pub credential_source: CredentialSource,
    pub model: String,

    // Input state (the text itself lives in the conversation state)
    pub input_cursor: usize, // cursor position in chars

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16,      // Visible rows inside the chat border
    pub total_chat_lines: u16, // Wrapped rows of the last render
    pub follow_tail: bool,     // Keep the newest message in view

    // The one in-flight request, if any
    pub request_task: Option<JoinHandle<Result<String, ChatError>>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub input_area: Option<Rect>,
    pub send_area: Option<Rect>,
    pub new_chat_area: Option<Rect>,
}

impl App {
    pub fn new(session: ChatSession, credential_source: CredentialSource) -> Self {
        let model = session.generator().model().to_string();

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session,
            credential_source,
            model,

            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            total_chat_lines: 0,
            follow_tail: true,

            request_task: None,

            animation_frame: 0,

            chat_area: None,
            input_area: None,
            send_area: None,
            new_chat_area: None,
        }
    }

    pub fn input(&self) -> &str {
        self.session.state().input()
    }

    pub fn is_loading(&self) -> bool {
        self.session.state().is_awaiting_response()
    }

    /// Send the input box contents, running the request on a background task.
    pub fn submit_input(&mut self) {
        if self.request_task.is_some() {
            return;
        }

        let text = self.input().to_string();
        let before = self.session.state().messages().len();
        let submission = self.session.begin_submit(&text);

        if self.session.state().messages().len() != before {
            self.follow_tail = true;
        }

        if let Some(submission) = submission {
            self.input_cursor = 0;
            let generator = self.session.generator();
            self.request_task = Some(tokio::spawn(async move {
                generator
                    .generate(&submission.credential, &submission.prompt)
                    .await
            }));
        }
    }

    /// Apply the result of the background request once it has completed.
    pub async fn poll_request(&mut self) {
        let finished = self
            .request_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.request_task.take() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(error = %err, "request task did not complete");
                    Err(ChatError::Transport(format!("request task failed: {}", err)))
                }
            };
            self.session.finish(outcome);
            self.follow_tail = true;
        }
    }

    pub fn new_chat(&mut self) {
        self.session.reset_conversation();
        self.chat_scroll = 0;
        self.follow_tail = true;
    }

    pub fn toggle_sidebar(&mut self) {
        self.session.state_mut().toggle_sidebar();
    }

    pub fn sidebar_open(&self) -> bool {
        self.session.state().sidebar_open()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let input = self.session.state_mut().input_mut();
        let byte_pos = char_to_byte_index(input, self.input_cursor);
        input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    /// Insert pasted text; the input box is a single line.
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\r' => {}
                '\n' | '\t' => self.insert_char(' '),
                c => self.insert_char(c),
            }
        }
    }

    pub fn delete_before_cursor(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let input = self.session.state_mut().input_mut();
            let byte_pos = char_to_byte_index(input, self.input_cursor);
            input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        let input = self.session.state_mut().input_mut();
        if self.input_cursor < input.chars().count() {
            let byte_pos = char_to_byte_index(input, self.input_cursor);
            input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input().chars().count();
    }

    // Chat scrolling

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(rows).min(self.max_scroll());
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(rows);
        self.follow_tail = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.chat_scroll = self.max_scroll();
    }

    /// Record the wrapped height of the last render and pin to the bottom if
    /// following new messages.
    pub fn update_chat_metrics(&mut self, total_lines: u16, visible_height: u16) {
        self.total_chat_lines = total_lines;
        self.chat_height = visible_height;
        if self.follow_tail {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }
}
