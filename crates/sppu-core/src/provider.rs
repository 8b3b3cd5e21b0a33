use std::future::Future;

use crate::error::AnswerError;
use crate::state::{ImageAttachment, SingleQnA};

/// A remote model that turns a prompt (and optional image) into QnA pairs.
///
/// One request, one response: no streaming, no partial results and no
/// internal retry. An empty vector is a successful "no question found".
pub trait AnswerService {
    fn answer(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> impl Future<Output = Result<Vec<SingleQnA>, AnswerError>> + Send;
}
