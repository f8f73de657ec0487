//! Merging a caller's cancellation signal into a request context.
//!
//! A caller may attach its own [`CancellationToken`] to a request through
//! [`RequestOptions::signal`](crate::RequestOptions::signal). [`merge_signal`]
//! registers a listener on that token: when it fires, the context's internal
//! controller is cancelled, a diagnostic event carrying the context id is
//! emitted, and the caller's callback runs. All three happen at most once.
//!
//! The listener lives until the caller's token fires, the request settles
//! (the controller is cancelled by other means), or the returned
//! [`AbortListener`] is released or dropped.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clients::context::{ContextId, RequestContext};

/// Handle to a registered abort listener.
///
/// Dropping the handle detaches the listener.
#[derive(Debug)]
#[must_use = "dropping the listener detaches it immediately"]
pub struct AbortListener {
    id: ContextId,
    task: Option<JoinHandle<bool>>,
}

impl AbortListener {
    /// Returns the id of the context this listener is attached to.
    pub const fn context_id(&self) -> ContextId {
        self.id
    }

    /// Detaches the listener without waiting for it.
    ///
    /// Called once the request has settled; a later cancellation of the
    /// caller's token then has no effect on the context.
    pub fn release(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Waits for the listener to finish.
    ///
    /// Returns `true` if the listener aborted the context, `false` if it
    /// exited because the context was already settled or it was detached.
    pub async fn join(mut self) -> bool {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(false),
            None => false,
        }
    }
}

impl Drop for AbortListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Links `user` to the controller of `ctx`.
///
/// When `user` is `None` this is a no-op: nothing is registered, `on_abort`
/// is never called, and `None` is returned.
///
/// Otherwise a listener task is spawned on the current Tokio runtime. If the
/// caller's token is cancelled while the controller is still live, the
/// controller is cancelled, a `debug` event with the context id is emitted,
/// and `on_abort` is invoked with that id. If the controller is cancelled
/// first, the listener exits silently.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime when `user` is `Some`.
///
/// # Example
///
/// ```rust,ignore
/// let user = CancellationToken::new();
/// let listener = merge_signal(Some(&user), &ctx, |id| eprintln!("{id} aborted"));
/// user.cancel();
/// assert!(listener.unwrap().join().await);
/// assert!(ctx.is_aborted());
/// ```
pub fn merge_signal<F>(
    user: Option<&CancellationToken>,
    ctx: &RequestContext,
    on_abort: F,
) -> Option<AbortListener>
where
    F: FnOnce(&ContextId) + Send + 'static,
{
    let user = user?.clone();
    let controller = ctx.controller.clone();
    let id = ctx.id();

    let task = tokio::spawn(async move {
        tokio::select! {
            biased;
            () = controller.cancelled() => false,
            () = user.cancelled() => {
                if controller.is_cancelled() {
                    return false;
                }
                controller.cancel();
                tracing::debug!(context_id = %id, "request aborted by caller signal");
                on_abort(&id);
                true
            }
        }
    });

    Some(AbortListener {
        id,
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::context::ContextIdGenerator;
    use crate::clients::http_request::{HttpMethod, HttpRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the `context_id` field of every event it sees.
    #[derive(Clone, Default)]
    struct ContextIdRecorder {
        ids: Arc<Mutex<Vec<String>>>,
    }

    struct ContextIdVisitor(Option<String>);

    impl Visit for ContextIdVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "context_id" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for ContextIdRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = ContextIdVisitor(None);
            event.record(&mut visitor);
            if let Some(id) = visitor.0 {
                self.ids.lock().unwrap().push(id);
            }
        }
    }

    fn recorded(recorder: &ContextIdRecorder) -> Vec<String> {
        recorder.ids.lock().unwrap().clone()
    }

    fn new_context(ids: &ContextIdGenerator) -> RequestContext {
        let request = HttpRequest::builder(HttpMethod::Get, "users").build().unwrap();
        RequestContext::new(request, ids)
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce(&ContextId) + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&count);
        (count, move |_: &ContextId| {
            clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_no_user_signal_is_noop() {
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let (count, on_abort) = counter();

        let listener = merge_signal(None, &ctx, on_abort);

        assert!(listener.is_none());
        assert!(!ctx.is_aborted());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_user_abort_cancels_controller_once() {
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let user = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let listener = merge_signal(Some(&user), &ctx, move |id| {
            sink.lock().unwrap().push(*id);
        })
        .unwrap();
        assert_eq!(listener.context_id(), ctx.id());

        user.cancel();
        user.cancel();

        assert!(listener.join().await);
        assert!(ctx.is_aborted());
        assert_eq!(*seen.lock().unwrap(), vec![ctx.id()]);
    }

    #[tokio::test]
    async fn test_settled_context_does_not_emit() {
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let user = CancellationToken::new();
        let (count, on_abort) = counter();

        let listener = merge_signal(Some(&user), &ctx, on_abort).unwrap();
        ctx.abort();
        user.cancel();

        assert!(!listener.join().await);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_released_listener_ignores_later_abort() {
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let user = CancellationToken::new();
        let (count, on_abort) = counter();

        let listener = merge_signal(Some(&user), &ctx, on_abort).unwrap();
        listener.release();
        user.cancel();
        tokio::task::yield_now().await;

        assert!(!ctx.is_aborted());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_user_signal_aborts_immediately() {
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let user = CancellationToken::new();
        user.cancel();
        let (count, on_abort) = counter();

        let listener = merge_signal(Some(&user), &ctx, on_abort).unwrap();

        assert!(listener.join().await);
        assert!(ctx.is_aborted());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_user_signal_is_not_cancelled_by_request() {
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let user = CancellationToken::new();
        let (_count, on_abort) = counter();

        let listener = merge_signal(Some(&user), &ctx, on_abort).unwrap();
        ctx.abort();

        assert!(!listener.join().await);
        assert!(!user.is_cancelled());
    }

    #[tokio::test]
    async fn test_double_cancel_emits_one_event_with_context_id() {
        let recorder = ContextIdRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let user = CancellationToken::new();
        let (_count, on_abort) = counter();

        let listener = merge_signal(Some(&user), &ctx, on_abort).unwrap();
        user.cancel();
        user.cancel();

        assert!(listener.join().await);
        assert_eq!(recorded(&recorder), vec![ctx.id().to_string()]);
    }

    #[tokio::test]
    async fn test_no_user_signal_emits_no_event() {
        let recorder = ContextIdRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let (_count, on_abort) = counter();

        assert!(merge_signal(None, &ctx, on_abort).is_none());
        tokio::task::yield_now().await;

        assert!(recorded(&recorder).is_empty());
    }

    #[tokio::test]
    async fn test_settled_context_emits_no_event() {
        let recorder = ContextIdRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));
        let ids = ContextIdGenerator::new();
        let ctx = new_context(&ids);
        let user = CancellationToken::new();
        let (_count, on_abort) = counter();

        let listener = merge_signal(Some(&user), &ctx, on_abort).unwrap();
        ctx.abort();
        user.cancel();

        assert!(!listener.join().await);
        assert!(recorded(&recorder).is_empty());
    }
}
