use crate::notes::SavedNote;

/// What the main pane shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Chat,
    /// A saved note, referenced by id. The note itself stays in the store.
    NoteDetail { note_id: String },
}

/// Tracks the active view. Leaving `NoteDetail` for `Chat` only happens
/// through a new chat.
#[derive(Debug, Clone, Default)]
pub struct ViewRouter {
    view: View,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn is_chat(&self) -> bool {
        self.view == View::Chat
    }

    pub fn select_note(&mut self, note: &SavedNote) {
        self.view = View::NoteDetail {
            note_id: note.id.clone(),
        };
    }

    pub fn reset(&mut self) {
        self.view = View::Chat;
    }

    pub fn active_note_id(&self) -> Option<&str> {
        match &self.view {
            View::Chat => None,
            View::NoteDetail { note_id } => Some(note_id),
        }
    }
}
