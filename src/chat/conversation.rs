//! Conversation state — transcript, turn sequencing, single-flight guard.
//!
//! One controller per chat panel. The panel calls [`ConversationController::submit`]
//! on user action and re-reads [`ConversationController::snapshot`] to render;
//! every sequencing rule lives here, behind one lock.
//!
//! Submissions made while a request is outstanding are dropped, not queued,
//! and a request that never resolves leaves the panel busy for good — there
//! is no timeout. Both are deliberate (see DESIGN.md).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::transport::{ChatError, ChatResponse, ChatTransport};

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message in the transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Mutable conversation state. The transcript is append-only: nothing
/// outside this module can reach it except through a cloned snapshot.
#[derive(Debug, Default)]
struct ConversationState {
    transcript: Vec<Turn>,
    draft_prompt: String,
    in_flight: bool,
}

/// Read-only copy of the conversation for rendering.
#[derive(Debug, Clone, Default)]
pub struct ConversationSnapshot {
    pub transcript: Vec<Turn>,
    pub draft_prompt: String,
    pub in_flight: bool,
}

/// Owns the transcript, the draft prompt, and the single-flight rule.
pub struct ConversationController {
    transport: Arc<dyn ChatTransport>,
    state: Arc<Mutex<ConversationState>>,
}

// A poisoned lock means a panic mid-append; the state itself is still
// well-formed (Vec push is not observable half-done), so keep going.
fn lock(state: &Mutex<ConversationState>) -> MutexGuard<'_, ConversationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConversationController {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(ConversationState::default())),
        }
    }

    /// Replace the draft prompt. Mirrors the input field as the user types.
    pub fn set_draft(&self, text: impl Into<String>) {
        lock(&self.state).draft_prompt = text.into();
    }

    /// Clone the current conversation for rendering.
    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = lock(&self.state);
        ConversationSnapshot {
            transcript: state.transcript.clone(),
            draft_prompt: state.draft_prompt.clone(),
            in_flight: state.in_flight,
        }
    }

    /// Submit a prompt and run the exchange to completion.
    ///
    /// No-op when the trimmed text is empty or a request is already
    /// outstanding. Otherwise: draft cleared, user turn appended, transport
    /// called, outcome turn appended (reply on success, translated error
    /// message on failure), busy flag released last.
    pub async fn submit(&self, raw_text: &str) {
        let Some(permit) = self.begin(raw_text) else {
            return;
        };
        let outcome = self.transport.send(permit.prompt()).await;
        permit.finish(outcome);
    }

    /// Check-then-set under one lock acquisition: there is no await point
    /// between observing `in_flight` and raising it, so two racing
    /// submissions can never both pass the gate.
    fn begin(&self, raw_text: &str) -> Option<SendPermit> {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut state = lock(&self.state);
        if state.in_flight {
            debug!("submission dropped: a request is already in flight");
            return None;
        }
        state.draft_prompt.clear();
        state.transcript.push(Turn::user(trimmed));
        state.in_flight = true;

        Some(SendPermit {
            state: Arc::clone(&self.state),
            prompt: trimmed.to_string(),
        })
    }
}

/// Exclusive right to the single outstanding request.
///
/// Releasing `in_flight` is bound to `Drop`, so every exit path — including
/// a panicking transport — leaves the conversation submittable again.
struct SendPermit {
    state: Arc<Mutex<ConversationState>>,
    prompt: String,
}

impl SendPermit {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Append the outcome turn. The busy flag is released when `self`
    /// drops, after the turn is visible.
    fn finish(self, outcome: Result<ChatResponse, ChatError>) {
        let text = match outcome {
            Ok(response) => {
                debug!(deployment = %response.deployment, "chat reply received");
                response.reply
            }
            Err(error) => {
                warn!(%error, "chat request failed");
                error.user_message()
            }
        };
        lock(&self.state).transcript.push(Turn::assistant(text));
    }
}

impl Drop for SendPermit {
    fn drop(&mut self) {
        lock(&self.state).in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::chat::transport::FALLBACK_ERROR_MESSAGE;

    fn reply(text: &str) -> Result<ChatResponse, ChatError> {
        Ok(ChatResponse {
            reply: text.into(),
            deployment: "test".into(),
        })
    }

    /// Transport that answers from a fixed script and counts calls.
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<ChatResponse, ChatError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn replying(text: &str) -> Self {
            Self::with(vec![reply(text)])
        }

        fn failing(status: u16, detail: Option<&str>) -> Self {
            Self::with(vec![Err(ChatError::Api {
                status,
                detail: detail.map(str::to_string),
            })])
        }

        fn with(outcomes: Vec<Result<ChatResponse, ChatError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, _prompt: &str) -> Result<ChatResponse, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more than scripted")
        }
    }

    /// Transport that holds the request open until released.
    struct GatedTransport {
        release: Arc<Notify>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ChatTransport for GatedTransport {
        async fn send(&self, _prompt: &str) -> Result<ChatResponse, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(ChatResponse {
                reply: "done".into(),
                deployment: "test".into(),
            })
        }
    }

    struct PanickingTransport;

    #[async_trait::async_trait]
    impl ChatTransport for PanickingTransport {
        async fn send(&self, _prompt: &str) -> Result<ChatResponse, ChatError> {
            panic!("transport blew up");
        }
    }

    fn controller_with(transport: impl ChatTransport + 'static) -> ConversationController {
        ConversationController::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn successful_submit_appends_both_turns_in_order() {
        let controller = controller_with(ScriptedTransport::replying("hi"));
        controller.submit("  hello  ").await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.transcript.len(), 2);
        assert_eq!(snapshot.transcript[0], Turn::user("hello"));
        assert_eq!(snapshot.transcript[1], Turn::assistant("hi"));
        assert!(!snapshot.in_flight);
    }

    #[tokio::test]
    async fn failing_submit_shows_backend_detail() {
        let controller = controller_with(ScriptedTransport::failing(429, Some("rate limited")));
        controller.submit("test").await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.transcript.len(), 2);
        assert_eq!(snapshot.transcript[0], Turn::user("test"));
        assert_eq!(snapshot.transcript[1], Turn::assistant("rate limited"));
        assert!(!snapshot.in_flight);
    }

    #[tokio::test]
    async fn failing_submit_without_detail_shows_fallback() {
        let controller = controller_with(ScriptedTransport::failing(502, None));
        controller.submit("test").await;

        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot.transcript[1],
            Turn::assistant(FALLBACK_ERROR_MESSAGE)
        );
    }

    #[tokio::test]
    async fn empty_submit_is_a_no_op() {
        let transport = ScriptedTransport::replying("never");
        let controller = controller_with(transport);
        controller.set_draft("   ");

        controller.submit("").await;
        controller.submit("   ").await;

        let snapshot = controller.snapshot();
        assert!(snapshot.transcript.is_empty());
        assert!(!snapshot.in_flight);
        // A rejected submission changes nothing, the draft included.
        assert_eq!(snapshot.draft_prompt, "   ");
    }

    #[tokio::test]
    async fn accepted_submit_clears_draft() {
        let controller = controller_with(ScriptedTransport::replying("hi"));
        controller.set_draft("hello");
        controller.submit("hello").await;
        assert_eq!(controller.snapshot().draft_prompt, "");
    }

    #[tokio::test]
    async fn busy_submission_is_dropped_not_queued() {
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = Arc::new(controller_with(GatedTransport {
            release: Arc::clone(&release),
            calls: Arc::clone(&calls),
        }));

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit("a").await }
        });

        // Let the first submission reach the transport.
        while !controller.snapshot().in_flight {
            tokio::task::yield_now().await;
        }

        controller.submit("b").await;

        // "b" never reached the transport and left no turn behind.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.snapshot().transcript, vec![Turn::user("a")]);

        release.notify_one();
        first.await.unwrap();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.transcript.len(), 2);
        assert_eq!(snapshot.transcript[1], Turn::assistant("done"));
        assert!(!snapshot.in_flight);
    }

    #[tokio::test]
    async fn user_turn_visible_while_request_is_in_flight() {
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = Arc::new(controller_with(GatedTransport {
            release: Arc::clone(&release),
            calls: Arc::clone(&calls),
        }));

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit("thinking?").await }
        });

        while !controller.snapshot().in_flight {
            tokio::task::yield_now().await;
        }
        assert_eq!(controller.snapshot().transcript, vec![Turn::user("thinking?")]);

        release.notify_one();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn busy_flag_released_even_when_transport_panics() {
        let controller = Arc::new(controller_with(PanickingTransport));

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit("boom").await }
        });
        assert!(task.await.is_err());

        let snapshot = controller.snapshot();
        assert!(!snapshot.in_flight);
        // The user turn stays; no outcome turn was appended.
        assert_eq!(snapshot.transcript, vec![Turn::user("boom")]);

        // And the panel is submittable again.
        // (A fresh transport call would be needed for a real reply; here we
        // only care that the gate reopened.)
        assert!(controller.begin("again").is_some());
    }

    #[tokio::test]
    async fn sequential_submissions_stay_in_causal_order() {
        let controller =
            controller_with(ScriptedTransport::with(vec![reply("first"), reply("second")]));
        controller.submit("one").await;
        controller.submit("two").await;

        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot.transcript,
            vec![
                Turn::user("one"),
                Turn::assistant("first"),
                Turn::user("two"),
                Turn::assistant("second"),
            ]
        );
        assert!(!snapshot.in_flight);
    }
}
