//! The user-level actions of the app: new chat, open note, save note, send.

use tracing::info;

use crate::blob::BlobStore;
use crate::error::{AnswerError, SendError};
use crate::notes::{NoteStore, SaveOutcome, SavedNote};
use crate::provider::AnswerService;
use crate::router::{View, ViewRouter};
use crate::session::{ChatSession, PendingSend, SendTicket};
use crate::state::{ImageAttachment, SingleQnA};

pub struct Assistant<B: BlobStore, S: AnswerService> {
    notes: NoteStore<B>,
    session: ChatSession,
    router: ViewRouter,
    service: S,
}

impl<B: BlobStore, S: AnswerService> Assistant<B, S> {
    /// Load saved notes from `blobs` and start a fresh chat.
    pub fn new(blobs: B, service: S) -> Self {
        Self {
            notes: NoteStore::load(blobs),
            session: ChatSession::new(),
            router: ViewRouter::new(),
            service,
        }
    }

    pub fn notes(&self) -> &NoteStore<B> {
        &self.notes
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    pub fn view(&self) -> &View {
        self.router.view()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The note shown in `NoteDetail`, if any.
    pub fn active_note(&self) -> Option<&SavedNote> {
        self.router
            .active_note_id()
            .and_then(|id| self.notes.get(id))
    }

    pub fn new_chat(&mut self) {
        self.router.reset();
        self.session.start_new_session();
    }

    /// Open a saved note. Returns false for an unknown id.
    pub fn select_note(&mut self, id: &str) -> bool {
        match self.notes.get(id) {
            Some(note) => {
                self.router.select_note(note);
                true
            }
            None => false,
        }
    }

    pub fn save_note(&mut self, question: &str, answer: &str) -> SaveOutcome {
        let outcome = self.notes.save(question, answer);
        if outcome.is_new() {
            info!(target: "assistant", "Saved note {}", outcome.id());
        }
        outcome
    }

    pub fn save_qna(&mut self, qna: &SingleQnA) -> SaveOutcome {
        self.save_note(&qna.question, &qna.answer)
    }

    pub fn begin_send(
        &mut self,
        message: &str,
        image: Option<ImageAttachment>,
    ) -> Result<PendingSend, SendError> {
        self.session.begin_send(message, image)
    }

    pub fn finish_send(
        &mut self,
        ticket: SendTicket,
        outcome: Result<Vec<SingleQnA>, AnswerError>,
    ) {
        self.session.finish_send(ticket, outcome);
    }

    pub async fn send(
        &mut self,
        message: &str,
        image: Option<ImageAttachment>,
    ) -> Result<(), SendError> {
        self.session.send(&self.service, message, image).await
    }
}
