//! Routes incoming chat messages to commands or the comparison pipeline.
//!
//! Messages are handled concurrently across users but strictly in arrival
//! order for any one user, from download through the session append, so
//! the first document sent is always the reference.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tdcompare_core::{
    ChatId, CompareResult, ComparisonPipeline, DocumentFormat, UploadOutcome, UserId,
};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::telegram::{Document, Message};

/// Fetches uploaded file content by its platform file id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn download(&self, file_id: &str) -> CompareResult<Vec<u8>>;
}

/// Cloneable trigger for a graceful stop.
///
/// Receivers observe `true` once [`ShutdownHandle::trigger`] has been called.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

type Tails = HashMap<UserId, (u64, oneshot::Receiver<()>)>;

/// Hands out per-user turns in the order messages are received.
///
/// Each turn waits for the previous turn of the same user to be dropped.
/// Taking a turn is synchronous, so the caller fixes the order before any
/// task is spawned.
#[derive(Debug, Default)]
pub struct UserSequencer {
    tails: Arc<Mutex<Tails>>,
    next: AtomicU64,
}

impl UserSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue up behind `user`'s latest turn.
    pub fn enter(&self, user: UserId) -> Turn {
        let (done, released) = oneshot::channel();
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let previous = lock(&self.tails)
            .insert(user, (seq, released))
            .map(|(_, rx)| rx);
        Turn {
            user,
            seq,
            previous,
            _done: done,
            tails: self.tails.clone(),
        }
    }

    /// Users with a turn still outstanding.
    pub fn active_users(&self) -> usize {
        lock(&self.tails).len()
    }
}

fn lock(tails: &Mutex<Tails>) -> std::sync::MutexGuard<'_, Tails> {
    tails.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A user's place in line. Dropping it lets the next turn proceed.
#[derive(Debug)]
pub struct Turn {
    user: UserId,
    seq: u64,
    previous: Option<oneshot::Receiver<()>>,
    _done: oneshot::Sender<()>,
    tails: Arc<Mutex<Tails>>,
}

impl Turn {
    /// Wait until every earlier turn of this user has finished.
    /// Cancel-safe: the wait resumes if `ready` is called again.
    pub async fn ready(&mut self) {
        if let Some(previous) = self.previous.as_mut() {
            // Err only means the sender was dropped, which is the release signal.
            let _ = previous.await;
            self.previous = None;
        }
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        let mut tails = lock(&self.tails);
        if tails.get(&self.user).is_some_and(|(seq, _)| *seq == self.seq) {
            tails.remove(&self.user);
        }
    }
}

/// Bot commands. Anything else starting with `/` is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Stop,
    Unknown,
}

impl Command {
    /// Parse the leading `/command` of a message, ignoring a `@botname` suffix.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _)| name);

        Some(match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "stop" => Self::Stop,
            _ => Self::Unknown,
        })
    }
}

/// What the dispatcher did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Greeted,
    Stopping,
    StopDenied,
    Upload(UploadOutcome),
    DownloadFailed,
    Hinted,
    Ignored,
}

pub struct Dispatcher {
    pipeline: Arc<ComparisonPipeline>,
    files: Arc<dyn FileSource>,
    admin_id: UserId,
    shutdown: ShutdownHandle,
    sequencer: UserSequencer,
}

impl Dispatcher {
    pub fn new(
        pipeline: Arc<ComparisonPipeline>,
        files: Arc<dyn FileSource>,
        admin_id: UserId,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            pipeline,
            files,
            admin_id,
            shutdown,
            sequencer: UserSequencer::new(),
        }
    }

    pub fn pipeline(&self) -> &Arc<ComparisonPipeline> {
        &self.pipeline
    }

    pub fn sequencer(&self) -> &UserSequencer {
        &self.sequencer
    }

    /// Take the sender's turn now and return a future that handles
    /// `message` once the sender's earlier messages are done.
    ///
    /// Call in arrival order; the returned future may be spawned freely.
    pub fn handle_in_order(
        self: &Arc<Self>,
        message: Message,
    ) -> impl Future<Output = Dispatch> + Send + 'static {
        let turn = message
            .from
            .as_ref()
            .map(|user| self.sequencer.enter(UserId(user.id)));
        let dispatcher = Arc::clone(self);
        async move {
            let mut turn = turn;
            if let Some(turn) = turn.as_mut() {
                turn.ready().await;
            }
            let dispatch = dispatcher.handle(message).await;
            drop(turn);
            dispatch
        }
    }

    pub async fn handle(&self, message: Message) -> Dispatch {
        let chat = ChatId(message.chat.id);
        let sender = message.from.as_ref().filter(|u| !u.is_bot);
        let Some(user) = sender.map(|u| UserId(u.id)) else {
            debug!(
                chat_id = %chat,
                message_id = message.message_id,
                "Ignoring message without a human sender"
            );
            return Dispatch::Ignored;
        };

        if let Some(document) = message.document {
            return self.handle_document(user, chat, document).await;
        }

        let locale = self.pipeline.default_locale();
        match message.text.as_deref().and_then(Command::parse) {
            Some(Command::Start | Command::Help) => {
                self.pipeline.reply(chat, &locale.greeting()).await;
                Dispatch::Greeted
            }
            Some(Command::Stop) => self.handle_stop(user, chat).await,
            Some(Command::Unknown) | None if message.text.is_some() => {
                self.pipeline.reply(chat, &locale.text_hint()).await;
                Dispatch::Hinted
            }
            _ => Dispatch::Ignored,
        }
    }

    /// Only the configured admin may stop the bot.
    async fn handle_stop(&self, user: UserId, chat: ChatId) -> Dispatch {
        let locale = self.pipeline.default_locale();
        if user != self.admin_id {
            warn!(user_id = %user, "Unauthorized stop request");
            self.pipeline.reply(chat, &locale.stop_denied()).await;
            return Dispatch::StopDenied;
        }

        info!(user_id = %user, "Stop requested by admin");
        self.pipeline.reply(chat, &locale.stopping()).await;
        self.shutdown.trigger();
        Dispatch::Stopping
    }

    async fn handle_document(&self, user: UserId, chat: ChatId, document: Document) -> Dispatch {
        let file_name = document.file_name.unwrap_or_default();

        // Unsupported files are rejected by the pipeline before it looks at
        // the content, so skip the download.
        if DocumentFormat::from_file_name(&file_name).is_err() {
            return Dispatch::Upload(
                self.pipeline
                    .handle_upload(user, chat, &file_name, &[])
                    .await,
            );
        }

        let bytes = match self.files.download(&document.file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(user_id = %user, file_name, error = %e, "Download failed");
                let locale = self.pipeline.default_locale();
                self.pipeline.reply(chat, &locale.download_failed()).await;
                return Dispatch::DownloadFailed;
            }
        };

        Dispatch::Upload(
            self.pipeline
                .handle_upload(user, chat, &file_name, &bytes)
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::User;
    use crate::testing::{document, harness, text, SlowFiles, ADMIN};
    use std::time::Duration;
    use tdcompare_core::{CompareError, Locale, OutputFormat};

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help extra words"), Some(Command::Help));
        assert_eq!(Command::parse("/stop@tdcompare_bot"), Some(Command::Stop));
        assert_eq!(Command::parse("/STOP"), Some(Command::Stop));
        assert_eq!(Command::parse("/unknown"), Some(Command::Unknown));
        assert_eq!(Command::parse("stop"), None);
        assert_eq!(Command::parse("   "), None);
    }

    #[tokio::test]
    async fn test_stop_denied_for_non_admin() {
        let h = harness(MockFileSource::new());
        let rx = h.shutdown.subscribe();

        assert_eq!(h.dispatcher.handle(text(ADMIN + 1, "/stop")).await, Dispatch::StopDenied);
        assert!(!h.shutdown.is_triggered());
        assert!(!*rx.borrow());
        assert_eq!(h.messenger.last_text(), Locale::Russian.stop_denied());
    }

    #[tokio::test]
    async fn test_stop_by_admin_triggers_shutdown() {
        let h = harness(MockFileSource::new());
        let mut rx = h.shutdown.subscribe();

        assert_eq!(h.dispatcher.handle(text(ADMIN, "/stop")).await, Dispatch::Stopping);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert_eq!(h.messenger.last_text(), Locale::Russian.stopping());
    }

    #[tokio::test]
    async fn test_greeting_and_hint() {
        let h = harness(MockFileSource::new());

        assert_eq!(h.dispatcher.handle(text(5, "/start")).await, Dispatch::Greeted);
        assert_eq!(h.messenger.last_text(), Locale::Russian.greeting());
        assert_eq!(h.dispatcher.handle(text(5, "/help")).await, Dispatch::Greeted);

        assert_eq!(h.dispatcher.handle(text(5, "hello")).await, Dispatch::Hinted);
        assert_eq!(h.messenger.last_text(), Locale::Russian.text_hint());
        assert_eq!(h.dispatcher.handle(text(5, "/frobnicate")).await, Dispatch::Hinted);
    }

    #[tokio::test]
    async fn test_bots_and_anonymous_senders_ignored() {
        let h = harness(MockFileSource::new());

        let mut from_bot = text(ADMIN, "/stop");
        from_bot.from = Some(User {
            id: ADMIN,
            is_bot: true,
            username: None,
        });
        assert_eq!(h.dispatcher.handle(from_bot).await, Dispatch::Ignored);

        let mut anonymous = text(5, "/start");
        anonymous.from = None;
        assert_eq!(h.dispatcher.handle_in_order(anonymous).await, Dispatch::Ignored);
        assert!(h.messenger.texts.lock().unwrap().is_empty());
        assert_eq!(h.dispatcher.sequencer().active_users(), 0);
    }

    #[tokio::test]
    async fn test_two_documents_produce_report() {
        let mut files = MockFileSource::new();
        files
            .expect_download()
            .withf(|id| id == "f1")
            .times(1)
            .returning(|_| Ok("Номинальное напряжение питания: 5 В".as_bytes().to_vec()));
        files
            .expect_download()
            .withf(|id| id == "f2")
            .times(1)
            .returning(|_| Ok("Номинальное напряжение питания: 5 В".as_bytes().to_vec()));
        let h = harness(files);

        assert_eq!(
            h.dispatcher.handle(document(7, "f1", "ref.txt")).await,
            Dispatch::Upload(UploadOutcome::Pending { count: 1 })
        );
        assert_eq!(
            h.dispatcher.handle(document(7, "f2", "test.txt")).await,
            Dispatch::Upload(UploadOutcome::Compared {
                delivered: vec![OutputFormat::Txt]
            })
        );
        assert_eq!(
            h.messenger.documents.lock().unwrap().as_slice(),
            &[(ChatId(7), "Сравнение_ИИ.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_slow_reference_download_keeps_arrival_order() {
        let files = SlowFiles {
            delays: HashMap::from([("ref", Duration::from_millis(200))]),
            content: HashMap::from([
                ("ref", "Эталон: номинальное напряжение питания 5 В"),
                ("test", "Проверка: номинальное напряжение питания 12 В"),
            ]),
        };
        let h = harness(files);

        // Spawned the way the poller does: one task per update, in order.
        let first = tokio::spawn(h.dispatcher.handle_in_order(document(7, "ref", "ref.txt")));
        let second = tokio::spawn(h.dispatcher.handle_in_order(document(7, "test", "test.txt")));

        assert_eq!(
            first.await.unwrap(),
            Dispatch::Upload(UploadOutcome::Pending { count: 1 })
        );
        assert!(matches!(
            second.await.unwrap(),
            Dispatch::Upload(UploadOutcome::Compared { .. })
        ));

        let prompts = h.llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        let reference = prompts[0].find("Эталон").unwrap();
        let test = prompts[0].find("Проверка").unwrap();
        assert!(reference < test, "reference placed after test: {}", prompts[0]);
        drop(prompts);
        assert_eq!(h.dispatcher.sequencer().active_users(), 0);
    }

    #[tokio::test]
    async fn test_slow_user_does_not_block_others() {
        let files = SlowFiles {
            delays: HashMap::from([("slow", Duration::from_secs(30))]),
            content: HashMap::from([
                ("slow", "Эталон"),
                ("fast", "Номинальное напряжение питания: 5 В"),
            ]),
        };
        let h = harness(files);

        let _slow = tokio::spawn(h.dispatcher.handle_in_order(document(7, "slow", "ref.txt")));
        let fast = tokio::time::timeout(
            Duration::from_secs(5),
            h.dispatcher.handle_in_order(document(8, "fast", "ref.txt")),
        )
        .await
        .expect("other users proceed");
        assert_eq!(fast, Dispatch::Upload(UploadOutcome::Pending { count: 1 }));
    }

    #[tokio::test]
    async fn test_sequencer_releases_in_order() {
        let sequencer = UserSequencer::new();
        let mut first = sequencer.enter(UserId(1));
        let mut second = sequencer.enter(UserId(1));
        let mut other = sequencer.enter(UserId(2));

        first.ready().await;
        other.ready().await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), second.ready()).await;
        assert!(blocked.is_err());
        // Still waiting after the timed-out attempt.
        let blocked = tokio::time::timeout(Duration::from_millis(50), second.ready()).await;
        assert!(blocked.is_err());

        drop(first);
        second.ready().await;
        assert_eq!(sequencer.active_users(), 2);
        drop(second);
        drop(other);
        assert_eq!(sequencer.active_users(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_document_is_not_downloaded() {
        let mut files = MockFileSource::new();
        files.expect_download().never();
        let h = harness(files);

        assert_eq!(
            h.dispatcher.handle(document(7, "img", "photo.png")).await,
            Dispatch::Upload(UploadOutcome::Rejected)
        );
        assert_eq!(h.messenger.last_text(), Locale::Russian.unsupported_format());
        assert_eq!(h.dispatcher.pipeline().sessions().pending(UserId(7)).await, 0);
    }

    #[tokio::test]
    async fn test_download_failure_leaves_session_untouched() {
        let mut files = MockFileSource::new();
        files
            .expect_download()
            .returning(|_| Err(CompareError::download("file is too big")));
        let h = harness(files);

        assert_eq!(
            h.dispatcher.handle(document(7, "big", "ref.pdf")).await,
            Dispatch::DownloadFailed
        );
        assert_eq!(h.messenger.last_text(), Locale::Russian.download_failed());
        assert_eq!(h.dispatcher.pipeline().sessions().pending(UserId(7)).await, 0);
    }
}
