//! Conversation state and the submit/resolve lifecycle.
//!
//! This module is UI-agnostic: it owns the message log, the input buffer,
//! and the pending-request flag, and it talks to the QA service through
//! the `QaService` trait. The rendering shell only reads state and calls
//! the methods here.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{Answer, QaService};

/// Seed message shown before the user has asked anything.
pub const GREETING: &str =
    "Hello! I can answer questions about our company based on our website content. How can I help you today?";

/// Shown in place of an answer when the round trip fails for any reason.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// A single entry in the conversation. Immutable once appended.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub sources: Vec<String>,
}

/// Notification sent to subscribers whenever the conversation changes,
/// so a shell can redraw without polling the whole state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEvent {
    MessageAppended,
    PendingChanged(bool),
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct ChatController {
    messages: Vec<Message>,
    input: String,
    cursor: usize, // cursor position in input, in chars
    pending: bool,
    task: Option<JoinHandle<Result<Answer>>>,
    service: Arc<dyn QaService>,
    subscribers: Vec<mpsc::UnboundedSender<ChatEvent>>,
}

impl ChatController {
    pub fn new(service: Arc<dyn QaService>) -> Self {
        Self {
            messages: vec![Message {
                role: Role::Bot,
                text: GREETING.to_string(),
                sources: Vec::new(),
            }],
            input: String::new(),
            cursor: 0,
            pending: false,
            task: None,
            service,
            subscribers: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Register a listener for conversation changes. Dropped receivers are
    /// pruned on the next emit.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: ChatEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    // --- Input buffer editing (called by the shell on keystrokes) ---

    pub fn insert_char(&mut self, c: char) {
        let idx = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(idx, c);
        self.cursor += 1;
    }

    pub fn delete_char_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(idx);
        }
    }

    pub fn delete_char_at_cursor(&mut self) {
        if self.cursor < self.input.chars().count() {
            let idx = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(idx);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // --- Submission lifecycle ---

    /// Submit the current input buffer as a question.
    ///
    /// A whitespace-only buffer is a no-op. A submission while a round trip
    /// is already outstanding is rejected; only one request may be in
    /// flight at a time. On acceptance the user message is appended and the
    /// buffer cleared before the request task is spawned, so the shell
    /// never observes a submitted question still sitting in the input box.
    pub fn submit(&mut self) {
        let question = self.input.trim().to_string();
        if question.is_empty() {
            return;
        }
        if self.pending || self.task.is_some() {
            log::debug!("submit rejected: a request is already in flight");
            return;
        }

        self.messages.push(Message {
            role: Role::User,
            text: question.clone(),
            sources: Vec::new(),
        });
        self.input.clear();
        self.cursor = 0;
        self.pending = true;

        let service = Arc::clone(&self.service);
        self.task = Some(tokio::spawn(
            async move { service.ask(&question).await },
        ));

        self.emit(ChatEvent::MessageAppended);
        self.emit(ChatEvent::PendingChanged(true));
    }

    /// Check whether the in-flight request has finished and, if so, fold
    /// its outcome into the conversation. Called from the shell's tick
    /// loop; returns immediately while the request is still running.
    ///
    /// Every failure (transport, HTTP status, undecodable body, task
    /// panic) collapses into the same apology message; the cause only
    /// goes to the log. The pending flag is cleared in both branches.
    pub async fn poll_response(&mut self) {
        let finished = self.task.as_ref().map(|t| t.is_finished()).unwrap_or(false);
        if !finished {
            return;
        }
        let Some(task) = self.task.take() else {
            return;
        };

        let reply = match task.await {
            Ok(Ok(answer)) => Message {
                role: Role::Bot,
                text: answer.answer,
                sources: answer.sources,
            },
            Ok(Err(err)) => {
                log::error!("query failed: {err:#}");
                Message {
                    role: Role::Bot,
                    text: APOLOGY.to_string(),
                    sources: Vec::new(),
                }
            }
            Err(err) => {
                log::error!("query task aborted: {err}");
                Message {
                    role: Role::Bot,
                    text: APOLOGY.to_string(),
                    sources: Vec::new(),
                }
            }
        };

        self.messages.push(reply);
        self.pending = false;
        self.emit(ChatEvent::MessageAppended);
        self.emit(ChatEvent::PendingChanged(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedService {
        answer: String,
        sources: Vec<String>,
    }

    #[async_trait]
    impl QaService for FixedService {
        async fn ask(&self, _question: &str) -> Result<Answer> {
            Ok(Answer {
                answer: self.answer.clone(),
                sources: self.sources.clone(),
            })
        }
    }

    struct FailingService;

    #[async_trait]
    impl QaService for FailingService {
        async fn ask(&self, _question: &str) -> Result<Answer> {
            Err(anyhow!("connection refused"))
        }
    }

    struct SlowService {
        delay: Duration,
    }

    #[async_trait]
    impl QaService for SlowService {
        async fn ask(&self, _question: &str) -> Result<Answer> {
            tokio::time::sleep(self.delay).await;
            Ok(Answer {
                answer: "done".to_string(),
                sources: Vec::new(),
            })
        }
    }

    fn controller_with(service: impl QaService + 'static) -> ChatController {
        ChatController::new(Arc::new(service))
    }

    fn type_input(controller: &mut ChatController, text: &str) {
        for c in text.chars() {
            controller.insert_char(c);
        }
    }

    /// Drive the controller until the outstanding round trip resolves.
    async fn resolve(controller: &mut ChatController) {
        for _ in 0..1000 {
            controller.poll_response().await;
            if !controller.is_pending() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("request never resolved");
    }

    #[test]
    fn conversation_starts_with_greeting() {
        let controller = controller_with(FailingService);
        assert_eq!(controller.messages().len(), 1);
        let seed = &controller.messages()[0];
        assert_eq!(seed.role, Role::Bot);
        assert_eq!(seed.text, GREETING);
        assert!(seed.sources.is_empty());
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn empty_or_whitespace_submit_is_a_noop() {
        let mut controller = controller_with(FailingService);

        controller.submit();
        assert_eq!(controller.messages().len(), 1);
        assert!(!controller.is_pending());

        type_input(&mut controller, "   \t  ");
        controller.submit();
        assert_eq!(controller.messages().len(), 1);
        assert!(!controller.is_pending());
        assert_eq!(controller.input(), "   \t  ");
    }

    #[tokio::test]
    async fn submit_trims_question_and_clears_buffer() {
        let mut controller = controller_with(FixedService {
            answer: "30 days".to_string(),
            sources: Vec::new(),
        });

        type_input(&mut controller, "  what is the refund policy?  ");
        controller.submit();

        assert_eq!(controller.input(), "");
        assert_eq!(controller.cursor(), 0);
        let user = &controller.messages()[1];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text, "what is the refund policy?");
        assert!(user.sources.is_empty());

        resolve(&mut controller).await;
    }

    #[tokio::test]
    async fn answer_is_appended_directly_after_the_question() {
        let mut controller = controller_with(FixedService {
            answer: "30 days".to_string(),
            sources: vec!["faq.html".to_string()],
        });

        type_input(&mut controller, "refund policy?");
        controller.submit();
        resolve(&mut controller).await;

        let messages = controller.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Bot);
        assert_eq!(messages[2].text, "30 days");
        assert_eq!(messages[2].sources, vec!["faq.html".to_string()]);
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn pending_flag_tracks_the_round_trip() {
        let mut controller = controller_with(FixedService {
            answer: "yes".to_string(),
            sources: Vec::new(),
        });

        assert!(!controller.is_pending());
        type_input(&mut controller, "hello?");
        controller.submit();
        assert!(controller.is_pending());
        resolve(&mut controller).await;
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn failure_collapses_to_the_apology_message() {
        let mut controller = controller_with(FailingService);

        type_input(&mut controller, "anything");
        controller.submit();
        resolve(&mut controller).await;

        let last = controller.messages().last().expect("bot reply");
        assert_eq!(last.role, Role::Bot);
        assert_eq!(last.text, APOLOGY);
        assert!(last.sources.is_empty());
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn second_submit_is_rejected_while_pending() {
        let mut controller = controller_with(SlowService {
            delay: Duration::from_millis(50),
        });

        type_input(&mut controller, "first");
        controller.submit();
        assert!(controller.is_pending());
        assert_eq!(controller.messages().len(), 2);

        type_input(&mut controller, "second");
        controller.submit();
        // Rejected: no new user message, input left alone for later.
        assert_eq!(controller.messages().len(), 2);
        assert_eq!(controller.input(), "second");

        resolve(&mut controller).await;
        assert_eq!(controller.messages().len(), 3);

        // Back to idle: the held-over input can now be submitted.
        controller.submit();
        assert!(controller.is_pending());
        assert_eq!(controller.messages()[3].text, "second");
        resolve(&mut controller).await;
    }

    #[tokio::test]
    async fn subscribers_see_the_full_lifecycle() {
        let mut controller = controller_with(FixedService {
            answer: "ok".to_string(),
            sources: Vec::new(),
        });
        let mut events = controller.subscribe();

        type_input(&mut controller, "ping");
        controller.submit();
        resolve(&mut controller).await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                ChatEvent::MessageAppended,
                ChatEvent::PendingChanged(true),
                ChatEvent::MessageAppended,
                ChatEvent::PendingChanged(false),
            ]
        );
    }

    #[test]
    fn input_editing_is_utf8_safe() {
        let mut controller = controller_with(FailingService);

        type_input(&mut controller, "café");
        assert_eq!(controller.input(), "café");
        assert_eq!(controller.cursor(), 4);

        controller.delete_char_before_cursor();
        assert_eq!(controller.input(), "caf");

        controller.move_cursor_left();
        controller.move_cursor_left();
        controller.insert_char('n');
        assert_eq!(controller.input(), "cnaf");

        controller.move_cursor_home();
        assert_eq!(controller.cursor(), 0);
        controller.delete_char_before_cursor();
        assert_eq!(controller.input(), "cnaf");

        controller.move_cursor_end();
        assert_eq!(controller.cursor(), 4);
        controller.move_cursor_right();
        assert_eq!(controller.cursor(), 4);

        // Forward delete removes the char under the cursor and stays put
        controller.move_cursor_home();
        controller.delete_char_at_cursor();
        assert_eq!(controller.input(), "naf");
        assert_eq!(controller.cursor(), 0);

        controller.move_cursor_end();
        controller.delete_char_at_cursor();
        assert_eq!(controller.input(), "naf");
    }
}
