use std::path::{Path, PathBuf};

use ratatui::widgets::ListState;
use sppu_core::{
    AnswerError, AnswerService, Assistant, Config, FileBlobStore, GeminiClient, ImageAttachment,
    SaveOutcome, SendError, SendTicket, SingleQnA,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::tui::AppEvent;

pub const PYQ_LINK: &str =
    "https://mysppu.com/question-papers-savitribai-phule-pune-sppu-all-departments/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Main,
    Sidebar,
}

/// Config is read once at startup, so configuration failures need a restart.
pub const RESTART_HINT: &str = "Fix the API key configuration and restart to try again.";

/// An image picked with `/attach`, waiting to go out with the next message.
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    pub file_name: String,
    pub image: ImageAttachment,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    pub assistant: Assistant<FileBlobStore, GeminiClient>,

    // Input line
    pub input: String,
    pub input_cursor: usize, // cursor position in chars
    pub attachment: Option<PendingAttachment>,

    // One-line feedback shown above the footer
    pub status: Option<String>,

    // Chat view
    pub selected_qna: Option<usize>, // index into all QnAs of the conversation
    pub chat_scroll: u16,
    pub chat_follow: bool, // keep the newest message in view
    pub reveal_selection: bool, // scroll the selected QnA into view on next draw
    pub animation_frame: u8,

    // Sidebar
    pub notes_state: ListState,

    // Note view
    pub note_scroll: u16,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let notes_dir = config.notes_dir().unwrap_or_else(|| {
            warn!(target: "app", "No data directory available, storing notes in ./.sppu-assistant");
            PathBuf::from(".sppu-assistant")
        });
        let client = GeminiClient::from_config(config);
        Self::with_assistant(Assistant::new(FileBlobStore::new(notes_dir), client))
    }

    pub fn with_assistant(assistant: Assistant<FileBlobStore, GeminiClient>) -> Self {
        let status = if assistant.service().has_api_key() {
            None
        } else {
            Some("No API key configured. Set GEMINI_API_KEY before asking a question.".to_string())
        };

        let mut notes_state = ListState::default();
        if !assistant.notes().is_empty() {
            notes_state.select(Some(0));
        }

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Main,
            assistant,
            input: String::new(),
            input_cursor: 0,
            attachment: None,
            status,
            selected_qna: None,
            chat_scroll: 0,
            chat_follow: true,
            reveal_selection: false,
            animation_frame: 0,
            notes_state,
            note_scroll: 0,
        }
    }

    pub fn is_chat_view(&self) -> bool {
        self.assistant.router().is_chat()
    }

    /// Every QnA in the conversation, in display order.
    pub fn all_qnas(&self) -> Vec<&SingleQnA> {
        self.assistant
            .session()
            .messages()
            .iter()
            .flat_map(|msg| msg.qnas())
            .collect()
    }

    pub fn selected_qna(&self) -> Option<&SingleQnA> {
        self.selected_qna
            .and_then(|idx| self.all_qnas().get(idx).copied())
    }

    pub fn qna_nav_down(&mut self) {
        let len = self.all_qnas().len();
        if len > 0 {
            let next = self.selected_qna.map_or(0, |i| (i + 1).min(len - 1));
            self.selected_qna = Some(next);
            self.chat_follow = false;
            self.reveal_selection = true;
        }
    }

    pub fn qna_nav_up(&mut self) {
        let len = self.all_qnas().len();
        if len > 0 {
            let prev = self.selected_qna.map_or(len - 1, |i| i.saturating_sub(1));
            self.selected_qna = Some(prev);
            self.chat_follow = false;
            self.reveal_selection = true;
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_follow = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_follow = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn save_selected_qna(&mut self) {
        let Some(qna) = self.selected_qna().cloned() else {
            self.status = Some("Select an answer with j/k first.".to_string());
            return;
        };

        let outcome = self.assistant.save_qna(&qna);
        self.status = Some(match outcome {
            SaveOutcome::Saved(_) => format!("Saved note: {}", qna.question),
            SaveOutcome::AlreadySaved(_) => "Already saved.".to_string(),
        });

        // Newest note is first in the list
        if outcome.is_new() {
            self.notes_state.select(Some(0));
        }
    }

    pub fn is_saved(&self, qna: &SingleQnA) -> bool {
        self.assistant.notes().is_saved(&qna.question, &qna.answer)
    }

    pub fn notes_nav_down(&mut self) {
        let len = self.assistant.notes().len();
        if len > 0 {
            let i = self.notes_state.selected().unwrap_or(0);
            self.notes_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn notes_nav_up(&mut self) {
        let i = self.notes_state.selected().unwrap_or(0);
        self.notes_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_selected_note(&mut self) {
        let id = self
            .notes_state
            .selected()
            .and_then(|i| self.assistant.notes().notes().get(i))
            .map(|note| note.id.clone());

        if let Some(id) = id {
            if self.assistant.select_note(&id) {
                self.note_scroll = 0;
                self.input_mode = InputMode::Normal;
            }
        }
    }

    pub fn new_chat(&mut self) {
        self.assistant.new_chat();
        self.selected_qna = None;
        self.chat_scroll = 0;
        self.chat_follow = true;
        self.focus = FocusPane::Main;
        self.input_mode = InputMode::Editing;
        self.status = None;
    }

    pub fn attach(&mut self, path: &str) {
        let path = Path::new(path.trim());
        match ImageAttachment::from_path(path) {
            Ok(image) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.status = Some(format!("Attached {}", file_name));
                self.attachment = Some(PendingAttachment { file_name, image });
            }
            Err(e) => {
                warn!(target: "app", "Attachment failed: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    pub fn detach(&mut self) {
        if self.attachment.take().is_some() {
            self.status = Some("Attachment removed.".to_string());
        }
    }

    /// Handle Enter on the input line: a command, or a message to send.
    pub fn submit_input(&mut self, events: &mpsc::UnboundedSender<AppEvent>) {
        let input = self.input.trim().to_string();

        if let Some(path) = input.strip_prefix("/attach ") {
            self.attach(path);
            self.clear_input();
            return;
        }
        if input == "/detach" {
            self.detach();
            self.clear_input();
            return;
        }

        if self.assistant.session().is_loading() {
            self.status = Some("Still waiting for the previous answer...".to_string());
            return;
        }
        if input.is_empty() && self.attachment.is_none() {
            return;
        }

        let image = self.attachment.as_ref().map(|a| a.image.clone());
        match self.assistant.begin_send(&input, image) {
            Ok(pending) => {
                self.clear_input();
                self.attachment = None;
                self.status = None;
                self.chat_follow = true;
                self.spawn_answer(pending.prompt, pending.image, pending.ticket, events.clone());
            }
            Err(SendError::Busy) => {
                self.status = Some("Still waiting for the previous answer...".to_string());
            }
            Err(SendError::EmptyMessage) => {}
        }
    }

    fn spawn_answer(
        &self,
        prompt: String,
        image: Option<ImageAttachment>,
        ticket: SendTicket,
        events: mpsc::UnboundedSender<AppEvent>,
    ) {
        let client = self.assistant.service().clone();
        let task = tokio::spawn(async move { client.answer(&prompt, image.as_ref()).await });

        // Report every settlement, including a panicked task
        tokio::spawn(async move {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(AnswerError::Transport(format!("answer task failed: {}", e))),
            };
            let _ = events.send(AppEvent::Answer { ticket, outcome });
        });
    }

    pub fn on_answer(&mut self, ticket: SendTicket, outcome: Result<Vec<SingleQnA>, AnswerError>) {
        match &outcome {
            Ok(qnas) => info!(target: "app", "Answer received with {} entries", qnas.len()),
            Err(e) if !e.is_recoverable() => {
                warn!(target: "app", "Answer failed: {}", e);
                self.status = Some(RESTART_HINT.to_string());
            }
            Err(e) => warn!(target: "app", "Answer failed: {}", e),
        }
        self.assistant.finish_send(ticket, outcome);
        self.chat_follow = true;
    }

    pub fn tick_animation(&mut self) {
        if self.assistant.session().is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.input_cursor = 0;
    }
}
