//! Saved notes and their durable persistence.
//!
//! The in-memory list is authoritative for the running session. Every
//! mutation rewrites the whole list to the blob store; a failed write is
//! logged and otherwise ignored.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::blob::BlobStore;

/// Blob-store key holding the serialized note list.
pub const NOTES_KEY: &str = "sppu-ai-notes";

/// A QnA pair the user chose to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNote {
    /// Creation timestamp, ISO-8601 UTC with milliseconds.
    pub id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(String),
    /// An identical note exists; the list was left unchanged.
    AlreadySaved(String),
}

impl SaveOutcome {
    pub fn id(&self) -> &str {
        match self {
            SaveOutcome::Saved(id) | SaveOutcome::AlreadySaved(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

pub struct NoteStore<B: BlobStore> {
    blobs: B,
    notes: Vec<SavedNote>,
}

impl<B: BlobStore> NoteStore<B> {
    /// Read the persisted list. Absent, empty or malformed data yields an
    /// empty store.
    pub fn load(blobs: B) -> Self {
        let notes = match blobs.read(NOTES_KEY) {
            Ok(Some(raw)) if raw.trim().is_empty() => Vec::new(),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SavedNote>>(&raw) {
                Ok(notes) => notes,
                Err(e) => {
                    warn!(target: "notes::load", "Failed to parse saved notes, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(target: "notes::load", "Failed to read saved notes, starting empty: {}", e);
                Vec::new()
            }
        };

        debug!(target: "notes::load", "Loaded {} saved notes", notes.len());
        Self { blobs, notes }
    }

    /// Most recently saved first.
    pub fn notes(&self) -> &[SavedNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SavedNote> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn is_saved(&self, question: &str, answer: &str) -> bool {
        self.find(question, answer).is_some()
    }

    /// Save a QnA pair. Exact duplicates are a no-op.
    pub fn save(&mut self, question: &str, answer: &str) -> SaveOutcome {
        if let Some(existing) = self.find(question, answer) {
            return SaveOutcome::AlreadySaved(existing.id.clone());
        }

        let id = self.next_id(Utc::now());
        self.notes.insert(
            0,
            SavedNote {
                id: id.clone(),
                question: question.to_string(),
                answer: answer.to_string(),
            },
        );
        self.persist();
        SaveOutcome::Saved(id)
    }

    fn find(&self, question: &str, answer: &str) -> Option<&SavedNote> {
        self.notes
            .iter()
            .find(|note| note.question == question && note.answer == answer)
    }

    /// Timestamp id, bumped a millisecond at a time past any existing id.
    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut at = now;
        loop {
            let id = at.to_rfc3339_opts(SecondsFormat::Millis, true);
            if self.get(&id).is_none() {
                return id;
            }
            at += Duration::milliseconds(1);
        }
    }

    fn persist(&mut self) {
        let serialized = match serde_json::to_string(&self.notes) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!(target: "notes::persist", "Failed to serialize notes: {}", e);
                return;
            }
        };

        if let Err(e) = self.blobs.write(NOTES_KEY, &serialized) {
            error!(target: "notes::persist", "Failed to save notes: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{FileBlobStore, MemoryBlobStore};
    use crate::error::PersistenceError;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};

    struct FailingBlobStore;

    impl BlobStore for FailingBlobStore {
        fn read(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn write(&mut self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn test_load_absent_is_empty() {
        let store = NoteStore::load(MemoryBlobStore::new());
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupted_is_empty() {
        for raw in ["not json at all", "", "   ", "{\"id\": 1}", "[{\"id\":\"x\"}]"] {
            let store = NoteStore::load(MemoryBlobStore::with_entry(NOTES_KEY, raw));
            assert!(store.is_empty(), "expected empty store for {:?}", raw);
        }
    }

    #[test]
    fn test_load_unreadable_is_empty() {
        let store = NoteStore::load(FailingBlobStore);
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_prepends() {
        let mut store = NoteStore::load(MemoryBlobStore::new());
        store.save("Q1", "A1");
        store.save("Q2", "A2");

        let questions: Vec<&str> = store.notes().iter().map(|n| n.question.as_str()).collect();
        assert_eq!(questions, vec!["Q2", "Q1"]);
    }

    #[test]
    fn test_duplicate_save_is_noop() {
        let blobs = MemoryBlobStore::new();
        let mut store = NoteStore::load(blobs.clone());

        let first = store.save("What is TCP?", "A transport protocol.");
        assert!(first.is_new());
        let persisted = blobs.get(NOTES_KEY);

        let second = store.save("What is TCP?", "A transport protocol.");
        assert_eq!(second, SaveOutcome::AlreadySaved(first.id().to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.notes()[0].id, first.id());
        assert_eq!(blobs.get(NOTES_KEY), persisted);
    }

    #[test]
    fn test_no_normalization_in_dedup() {
        let mut store = NoteStore::load(MemoryBlobStore::new());
        store.save("Q", "A");
        store.save("Q ", "A");
        store.save("q", "A");
        store.save("Q", "A\n");
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_same_question_different_answer_is_distinct() {
        let mut store = NoteStore::load(MemoryBlobStore::new());
        store.save("Q", "A1");
        store.save("Q", "A2");
        assert_eq!(store.len(), 2);
        assert!(store.is_saved("Q", "A1"));
        assert!(store.is_saved("Q", "A2"));
        assert!(!store.is_saved("Q", "A3"));
    }

    #[test]
    fn test_length_equals_distinct_pairs() {
        let pairs = [
            ("a", "1"),
            ("b", "2"),
            ("a", "1"),
            ("a", "2"),
            ("b", "2"),
            ("c", "3"),
            ("a", "1"),
        ];
        let mut store = NoteStore::load(MemoryBlobStore::new());
        for (q, a) in pairs {
            store.save(q, a);
        }

        assert_eq!(store.len(), 4);
        let mut seen = std::collections::HashSet::new();
        for note in store.notes() {
            assert!(seen.insert((note.question.clone(), note.answer.clone())));
        }
    }

    fn arb_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("[ab]{1,2}", "[xy]{0,1}"), 0..40)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_saves_keep_pairs_distinct(pairs in arb_pairs()) {
            let mut store = NoteStore::load(MemoryBlobStore::new());
            let mut first_ids: HashMap<(String, String), String> = HashMap::new();

            for (q, a) in &pairs {
                let outcome = store.save(q, a);
                let key = (q.clone(), a.clone());
                match first_ids.get(&key) {
                    Some(id) => {
                        prop_assert!(!outcome.is_new());
                        prop_assert_eq!(outcome.id(), id.as_str());
                    }
                    None => {
                        prop_assert!(outcome.is_new());
                        first_ids.insert(key, outcome.id().to_string());
                    }
                }
            }

            let listed: HashSet<(String, String)> = store
                .notes()
                .iter()
                .map(|n| (n.question.clone(), n.answer.clone()))
                .collect();
            prop_assert_eq!(listed.len(), store.len());
            prop_assert_eq!(store.len(), first_ids.len());

            let ids: HashSet<&str> = store.notes().iter().map(|n| n.id.as_str()).collect();
            prop_assert_eq!(ids.len(), store.len());
        }
    }

    #[test]
    fn test_rapid_saves_get_unique_ids() {
        let mut store = NoteStore::load(MemoryBlobStore::new());
        for i in 0..50 {
            store.save(&format!("Q{}", i), "A");
        }
        let ids: std::collections::HashSet<&str> =
            store.notes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_next_id_skips_taken_timestamps() {
        let mut store = NoteStore::load(MemoryBlobStore::new());
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 10, 15, 30).unwrap();
        store.notes.push(SavedNote {
            id: "2025-01-31T10:15:30.000Z".to_string(),
            question: "Q".to_string(),
            answer: "A".to_string(),
        });

        assert_eq!(store.next_id(now), "2025-01-31T10:15:30.001Z");
    }

    #[test]
    fn test_round_trip_through_fresh_load() {
        let blobs = MemoryBlobStore::new();
        let mut store = NoteStore::load(blobs.clone());
        store.save("Explain OSI layers", "**Seven** layers 📚");
        store.save("Define IPC", "Inter-process communication.\n\n- pipes\n- sockets");
        store.save("Q with \"quotes\"", "A");

        let reloaded = NoteStore::load(blobs);
        assert_eq!(reloaded.notes(), store.notes());
    }

    #[test]
    fn test_round_trip_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NoteStore::load(FileBlobStore::new(dir.path()));
        store.save("Q1", "A1");
        store.save("Q2", "A2");

        let reloaded = NoteStore::load(FileBlobStore::new(dir.path()));
        assert_eq!(reloaded.notes(), store.notes());
    }

    #[test]
    fn test_persisted_layout() {
        let blobs = MemoryBlobStore::new();
        let mut store = NoteStore::load(blobs.clone());
        store.save("Q", "A");

        let raw = blobs.get(NOTES_KEY).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value[0];
        assert_eq!(entry["question"], "Q");
        assert_eq!(entry["answer"], "A");
        assert!(entry["id"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let mut store = NoteStore::load(FailingBlobStore);
        let outcome = store.save("Q", "A");
        assert!(outcome.is_new());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(outcome.id()).unwrap().answer, "A");
    }
}
