use std::collections::VecDeque;
use std::sync::Mutex;

use sppu_core::error::TRANSPORT_ERROR_MESSAGE;
use sppu_core::notes::NOTES_KEY;
use sppu_core::session::{GREETING, NO_ANSWER_MESSAGE};
use sppu_core::{
    AnswerError, AnswerService, Assistant, ChatMessage, ChatPart, ChatRole, FileBlobStore,
    ImageAttachment, MemoryBlobStore, SendError, SingleQnA, View,
};

/// Plays back queued replies in order.
#[derive(Default)]
struct ScriptedService {
    replies: Mutex<VecDeque<Result<Vec<SingleQnA>, AnswerError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn with_replies(replies: Vec<Result<Vec<SingleQnA>, AnswerError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl AnswerService for ScriptedService {
    async fn answer(
        &self,
        prompt: &str,
        _image: Option<&ImageAttachment>,
    ) -> Result<Vec<SingleQnA>, AnswerError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn osi() -> SingleQnA {
    SingleQnA::new(
        "Explain OSI layers",
        "**OSI** has seven layers: physical, data link, network, transport, session, presentation, application. 📚",
    )
}

#[tokio::test]
async fn test_ask_save_and_open_note() {
    let blobs = MemoryBlobStore::new();
    let service = ScriptedService::with_replies(vec![Ok(vec![osi()])]);
    let mut assistant = Assistant::new(blobs.clone(), service);

    assistant.send("Explain OSI layers", None).await.unwrap();

    let last = assistant.session().messages().last().unwrap().clone();
    assert_eq!(last.role, ChatRole::Model);
    assert_eq!(last.parts, vec![ChatPart::multi(vec![osi()])]);

    let qna = last.qnas().next().unwrap().clone();
    let outcome = assistant.save_qna(&qna);
    assert!(outcome.is_new());
    assert!(blobs.get(NOTES_KEY).is_some());

    assert!(assistant.select_note(outcome.id()));
    assert_eq!(
        assistant.view(),
        &View::NoteDetail {
            note_id: outcome.id().to_string()
        }
    );
    assert_eq!(assistant.active_note().unwrap().question, "Explain OSI layers");

    // History is untouched while a note is open
    assert_eq!(assistant.session().messages().len(), 3);
}

#[tokio::test]
async fn test_select_note_then_new_chat() {
    let service = ScriptedService::with_replies(vec![Ok(vec![osi()])]);
    let mut assistant = Assistant::new(MemoryBlobStore::new(), service);

    assistant.send("Explain OSI layers", None).await.unwrap();
    let id = assistant.save_qna(&osi()).id().to_string();
    assistant.select_note(&id);

    assistant.new_chat();

    assert_eq!(assistant.view(), &View::Chat);
    assert!(assistant.router().active_note_id().is_none());
    assert!(assistant.active_note().is_none());
    assert_eq!(
        assistant.session().messages(),
        &[ChatMessage::model_text(GREETING)]
    );
    assert!(assistant.session().error().is_none());
    // Notes survive a new chat
    assert_eq!(assistant.notes().len(), 1);
}

#[tokio::test]
async fn test_failed_turn_can_be_retried() {
    let service = ScriptedService::with_replies(vec![
        Err(AnswerError::Transport("timeout".to_string())),
        Ok(vec![SingleQnA::new("Define IPC", "Inter-process communication.")]),
    ]);
    let mut assistant = Assistant::new(MemoryBlobStore::new(), service);

    assistant.send("Define IPC", None).await.unwrap();
    assert_eq!(assistant.session().error(), Some(TRANSPORT_ERROR_MESSAGE));
    assert_eq!(assistant.session().messages().len(), 2);
    assert!(!assistant.session().is_loading());

    assistant.send("Define IPC", None).await.unwrap();
    let messages = assistant.session().messages();
    assert!(assistant.session().error().is_none());
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[2].role, ChatRole::User);
    assert_eq!(messages[3].role, ChatRole::Model);

    let prompts = assistant.service().prompts.lock().unwrap();
    assert_eq!(*prompts, vec!["Define IPC", "Define IPC"]);
}

#[tokio::test]
async fn test_empty_result_message() {
    let service = ScriptedService::with_replies(vec![Ok(Vec::new())]);
    let mut assistant = Assistant::new(MemoryBlobStore::new(), service);

    assistant.send("asdf", None).await.unwrap();

    let last = assistant.session().messages().last().unwrap();
    assert_eq!(last, &ChatMessage::model_text(NO_ANSWER_MESSAGE));
    assert!(!assistant.session().is_loading());
}

#[test]
fn test_concurrent_send_is_rejected() {
    let mut assistant = Assistant::new(MemoryBlobStore::new(), ScriptedService::default());

    let pending = assistant.begin_send("first", None).unwrap();
    assert_eq!(
        assistant.begin_send("second", None).unwrap_err(),
        SendError::Busy
    );

    assistant.finish_send(pending.ticket, Ok(vec![osi()]));
    assert!(!assistant.session().is_loading());
    assert_eq!(assistant.session().messages().len(), 3);
}

#[test]
fn test_select_unknown_note_keeps_view() {
    let mut assistant = Assistant::new(MemoryBlobStore::new(), ScriptedService::default());
    assert!(!assistant.select_note("2025-01-01T00:00:00.000Z"));
    assert_eq!(assistant.view(), &View::Chat);
}

#[test]
fn test_selecting_another_note_stays_in_detail() {
    let mut assistant = Assistant::new(MemoryBlobStore::new(), ScriptedService::default());
    let first = assistant.save_note("Q1", "A1").id().to_string();
    let second = assistant.save_note("Q2", "A2").id().to_string();

    assistant.select_note(&first);
    assistant.select_note(&second);
    assert_eq!(assistant.active_note().unwrap().question, "Q2");
}

#[test]
fn test_duplicate_save_returns_existing_id() {
    let mut assistant = Assistant::new(MemoryBlobStore::new(), ScriptedService::default());
    let first = assistant.save_note("Q", "A");
    let second = assistant.save_note("Q", "A");

    assert!(first.is_new());
    assert!(!second.is_new());
    assert_eq!(first.id(), second.id());
    assert_eq!(assistant.notes().len(), 1);
}

#[test]
fn test_notes_survive_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();

    let saved = {
        let mut assistant =
            Assistant::new(FileBlobStore::new(dir.path()), ScriptedService::default());
        assistant.save_note("Q1", "A1");
        assistant.save_note("Q2", "A2");
        assistant.notes().notes().to_vec()
    };

    let assistant = Assistant::new(FileBlobStore::new(dir.path()), ScriptedService::default());
    assert_eq!(assistant.notes().notes(), saved.as_slice());
}

#[test]
fn test_corrupted_notes_start_empty() {
    let blobs = MemoryBlobStore::with_entry(NOTES_KEY, "{not json");
    let assistant = Assistant::new(blobs, ScriptedService::default());
    assert!(assistant.notes().is_empty());
}
