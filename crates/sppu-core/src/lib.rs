pub mod ai;
pub mod assistant;
pub mod blob;
pub mod config;
pub mod error;
pub mod notes;
pub mod provider;
pub mod router;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::GeminiClient;
pub use assistant::Assistant;
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use config::Config;
pub use error::{AnswerError, PersistenceError, SendError};
pub use notes::{NoteStore, SaveOutcome, SavedNote};
pub use provider::AnswerService;
pub use router::{View, ViewRouter};
pub use session::{ChatSession, PendingSend, SendTicket, SessionState};
pub use state::{AttachmentError, ChatMessage, ChatPart, ChatRole, ImageAttachment, SingleQnA};
