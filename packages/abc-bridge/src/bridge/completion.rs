//! Continuation-to-future bridging.
//!
//! Every facade operation takes a continuation. Async callers can wrap one
//! with [`resolve`] instead:
//!
//! ```ignore
//! let account = resolve("passwordLogin", |done| {
//!     context.login_with_password("alice", "pw", None, CallbackSet::new(), done)
//! })
//! .await?;
//! ```

use tokio::sync::oneshot;

use super::adapter::{CallResult, Completion};
use crate::error::Error;

/// Start an operation and await its continuation.
///
/// If the native layer drops the completion without calling it, the future
/// resolves to a generic error instead of hanging.
pub async fn resolve<T, S>(operation: &str, start: S) -> CallResult<T>
where
    T: Send + 'static,
    S: FnOnce(Completion<T>),
{
    let (tx, rx) = oneshot::channel();
    start(Box::new(move |result: CallResult<T>| {
        let _ = tx.send(result);
    }));
    match rx.await {
        Ok(result) => result,
        Err(_) => Err(Error::CompletionDropped(operation.to_string()).into()),
    }
}
