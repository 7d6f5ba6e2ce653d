//! Per-user upload sessions and their idle expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::types::{Upload, UserId};

/// Uploads a session holds before a comparison is triggered.
pub const PAIR_SIZE: usize = 2;

/// Pending uploads for one user. Holds at most [`PAIR_SIZE`] entries.
#[derive(Debug)]
pub struct Session {
    uploads: Vec<Upload>,
    last_activity: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            uploads: Vec::with_capacity(PAIR_SIZE),
            last_activity: Instant::now(),
        }
    }
}

impl Session {
    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.uploads.len() == PAIR_SIZE
    }

    /// Append an upload and return the new count.
    ///
    /// A session still holding a full pair starts over with this upload, so
    /// the count never exceeds [`PAIR_SIZE`].
    pub fn push(&mut self, upload: Upload) -> usize {
        if self.is_complete() {
            warn!(user_id = %upload.user, "Discarding stale pair before new upload");
            self.uploads.clear();
        }
        self.uploads.push(upload);
        self.last_activity = Instant::now();
        self.uploads.len()
    }

    /// Take both uploads if the pair is complete, leaving the session empty.
    pub fn take_pair(&mut self) -> Option<(Upload, Upload)> {
        if !self.is_complete() {
            return None;
        }
        let mut drained = self.uploads.drain(..);
        let pair = drained.next().zip(drained.next());
        drop(drained);
        self.last_activity = Instant::now();
        pair
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Process-wide session map guarded per user.
///
/// The outer lock is held only to look up or insert a handle. Work on a
/// session happens under that user's async mutex, so a slow comparison for
/// one user never blocks another.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle for `user`, created empty on first use.
    pub fn session(&self, user: UserId) -> SessionHandle {
        self.map().entry(user).or_default().clone()
    }

    /// Pending upload count for `user`; 0 when no session exists.
    pub async fn pending(&self, user: UserId) -> usize {
        let handle = self.map().get(&user).cloned();
        match handle {
            Some(session) => session.lock().await.len(),
            None => 0,
        }
    }

    /// Number of tracked users.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Remove sessions idle longer than `ttl`.
    ///
    /// A session is only removed when nobody else holds its handle and its
    /// lock is free; busy sessions are left for the next sweep.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|user, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(session) if session.idle_for() > ttl => {
                    debug!(user_id = %user, pending = session.len(), "Evicting idle session");
                    false
                }
                _ => true,
            }
        });
        before - map.len()
    }
}

/// Periodic eviction of idle sessions.
///
/// Wraps tokio-cron-scheduler to run [`SessionStore::evict_idle`] at a
/// fixed interval.
pub struct SessionSweeper {
    scheduler: JobScheduler,
    store: Arc<SessionStore>,
    config: SessionConfig,
}

impl SessionSweeper {
    /// Create a sweeper. Call `start()` to begin periodic execution.
    pub async fn new(
        store: Arc<SessionStore>,
        config: SessionConfig,
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            store,
            config,
        })
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        let store = self.store.clone();
        let ttl = Duration::from_secs(self.config.idle_ttl_secs);
        let interval = Duration::from_secs(self.config.sweep_interval_secs.max(1));

        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let store = store.clone();
            Box::pin(async move {
                let evicted = store.evict_idle(ttl);
                if evicted > 0 {
                    info!(evicted, remaining = store.len(), "Evicted idle sessions");
                } else {
                    debug!(remaining = store.len(), "Session sweep found nothing idle");
                }
            })
        })?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(
            idle_ttl_secs = self.config.idle_ttl_secs,
            sweep_interval_secs = self.config.sweep_interval_secs,
            "Session sweeper started"
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        info!("Shutting down session sweeper");
        self.scheduler.shutdown().await
    }
}
