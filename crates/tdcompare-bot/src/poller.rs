//! Long-polling loop feeding updates to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::BotResult;
use crate::telegram::Update;

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Where updates come from; `getUpdates` semantics.
///
/// Passing `offset` confirms every update below it. A `timeout_secs` of 0
/// returns immediately.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn updates(&self, offset: Option<i64>, timeout_secs: u32) -> BotResult<Vec<Update>>;
}

/// Pulls updates and handles each one on its own task, in arrival order
/// per sender.
pub struct Poller {
    source: Arc<dyn UpdateSource>,
    dispatcher: Arc<Dispatcher>,
    timeout_secs: u32,
}

impl Poller {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        dispatcher: Arc<Dispatcher>,
        timeout_secs: u32,
    ) -> Self {
        Self {
            source,
            dispatcher,
            timeout_secs,
        }
    }

    /// Poll until `shutdown` turns true, then wait for in-flight updates.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut offset: Option<i64> = None;
        let mut tasks = JoinSet::new();

        info!(timeout_secs = self.timeout_secs, "Polling for updates");
        while !*shutdown.borrow_and_update() {
            let polled = tokio::select! {
                _ = shutdown.changed() => break,
                polled = self.source.updates(offset, self.timeout_secs) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let Some(message) = update.message else {
                            debug!(update_id = update.update_id, "Skipping non-message update");
                            continue;
                        };
                        tasks.spawn(self.dispatcher.handle_in_order(message));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, backing off");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
        }

        info!(in_flight = tasks.len(), "Polling stopped");
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }

        // Confirm the last batch so a restart does not replay it, /stop included.
        if let Some(offset) = offset {
            if let Err(e) = self.source.updates(Some(offset), 0).await {
                warn!(error = %e, offset, "Failed to confirm final offset");
            }
        }
    }
}

fn log_join(joined: Result<Dispatch, tokio::task::JoinError>) {
    match joined {
        Ok(dispatch) => debug!(?dispatch, "Update handled"),
        Err(e) => error!(error = %e, "Update handler panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::MockFileSource;
    use crate::error::BotError;
    use crate::testing::{document, harness, text, SlowFiles, ADMIN};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tdcompare_core::{Locale, UserId};

    /// Replays scripted batches, then idles with empty polls.
    #[derive(Default)]
    struct ScriptedUpdates {
        batches: Mutex<VecDeque<BotResult<Vec<Update>>>>,
        calls: Mutex<Vec<(Option<i64>, u32)>>,
    }

    impl ScriptedUpdates {
        fn new(batches: Vec<BotResult<Vec<Update>>>) -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(batches.into()),
                calls: Mutex::default(),
            })
        }

        fn calls(&self) -> Vec<(Option<i64>, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpdateSource for ScriptedUpdates {
        async fn updates(&self, offset: Option<i64>, timeout_secs: u32) -> BotResult<Vec<Update>> {
            self.calls.lock().unwrap().push((offset, timeout_secs));
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => {
                    if timeout_secs > 0 {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    Ok(Vec::new())
                }
            }
        }
    }

    fn update(update_id: i64, message: Option<crate::telegram::Message>) -> Update {
        Update { update_id, message }
    }

    fn bad_gateway() -> BotError {
        BotError::Api {
            method: "getUpdates",
            status: Some(502),
            description: "Bad Gateway".to_string(),
            retry_after: None,
        }
    }

    #[tokio::test]
    async fn test_stop_drains_and_confirms_offset() {
        let h = harness(MockFileSource::new());
        let source = ScriptedUpdates::new(vec![Ok(vec![
            update(10, Some(text(5, "/start"))),
            update(11, None),
            update(12, Some(text(ADMIN, "/stop"))),
        ])]);
        let poller = Poller::new(source.clone(), h.dispatcher.clone(), 30);

        tokio::time::timeout(Duration::from_secs(5), poller.run(h.shutdown.subscribe()))
            .await
            .expect("poller stops after /stop");

        let calls = source.calls();
        assert_eq!(calls.first(), Some(&(None, 30)));
        assert_eq!(calls.last(), Some(&(Some(13), 0)));
        assert!(calls[1..calls.len() - 1].iter().all(|c| *c == (Some(13), 30)));

        let texts = h.messenger.texts.lock().unwrap();
        assert!(texts.iter().any(|(_, t)| *t == Locale::Russian.greeting()));
        assert!(texts.iter().any(|(_, t)| *t == Locale::Russian.stopping()));
    }

    #[tokio::test]
    async fn test_in_flight_upload_finishes_before_exit() {
        let files = SlowFiles {
            delays: HashMap::from([("ref", Duration::from_millis(200))]),
            content: HashMap::from([("ref", "Эталон: номинальное напряжение питания 5 В")]),
        };
        let h = harness(files);
        let source = ScriptedUpdates::new(vec![Ok(vec![
            update(1, Some(document(7, "ref", "ref.txt"))),
            update(2, Some(text(ADMIN, "/stop"))),
        ])]);
        let poller = Poller::new(source.clone(), h.dispatcher.clone(), 30);

        tokio::time::timeout(Duration::from_secs(5), poller.run(h.shutdown.subscribe()))
            .await
            .expect("poller stops after /stop");

        assert_eq!(h.dispatcher.pipeline().sessions().pending(UserId(7)).await, 1);
        assert_eq!(source.calls().last(), Some(&(Some(3), 0)));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_error_backoff() {
        let h = harness(MockFileSource::new());
        let source = ScriptedUpdates::new(vec![Err(bad_gateway())]);
        let poller = Poller::new(source.clone(), h.dispatcher.clone(), 30);

        let shutdown = h.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            shutdown.trigger();
        });

        tokio::time::timeout(ERROR_BACKOFF / 2, poller.run(h.shutdown.subscribe()))
            .await
            .expect("shutdown cuts the backoff short");

        // Nothing was received, so there is no offset to confirm.
        assert_eq!(source.calls(), vec![(None, 30)]);
    }

    #[tokio::test]
    async fn test_already_stopped_never_polls() {
        let h = harness(MockFileSource::new());
        let mut source = MockUpdateSource::new();
        source.expect_updates().never();
        h.shutdown.trigger();

        Poller::new(Arc::new(source), h.dispatcher.clone(), 30)
            .run(h.shutdown.subscribe())
            .await;
    }
}
