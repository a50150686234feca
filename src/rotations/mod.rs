pub mod feed;
pub mod node;
pub mod render;
pub mod time_period;

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, error, info, warn};

use crate::database::Database;
use crate::error::Result;

pub use feed::FeedClient;
pub use node::{CurrentFest, FestState, Rotation, RotationKind};
pub use time_period::{PoppingTimePeriodCollection, TimePeriod, TimePeriodCollection, Timed};

/// Floor for the refresh timer. Reached when a boundary fetch failed and the
/// in-memory window already ended; acts as the retry cadence without letting
/// the loop spin hot.
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(60);
/// Used when no entry is active at all and there is no boundary to aim for.
const FALLBACK_REFRESH_DELAY: Duration = Duration::from_secs(600);

/// A change-notification callback. Hook errors are opaque to the engine;
/// they are reported, never matched on.
pub type Hook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Everything one fetch cycle produces: the ten per-category collections,
/// the festival singleton, and the window boundaries.
#[derive(Debug)]
pub struct RotationSet {
    pub turf_war: PoppingTimePeriodCollection<Rotation>,
    pub ranked_series: PoppingTimePeriodCollection<Rotation>,
    pub ranked_open: PoppingTimePeriodCollection<Rotation>,
    pub x_battle: PoppingTimePeriodCollection<Rotation>,
    pub splatfest_open: PoppingTimePeriodCollection<Rotation>,
    pub splatfest_pro: PoppingTimePeriodCollection<Rotation>,
    pub challenge: PoppingTimePeriodCollection<Rotation>,
    pub salmon_run: PoppingTimePeriodCollection<Rotation>,
    pub big_run: PoppingTimePeriodCollection<Rotation>,
    pub eggstra_work: PoppingTimePeriodCollection<Rotation>,
    pub current_fest: Option<CurrentFest>,
    /// Min start across the active regular-track entries (turf war and both
    /// splatfest variants).
    pub start_time: Option<DateTime<Utc>>,
    /// Min end across the same entries; when the next refresh is due.
    pub end_time: Option<DateTime<Utc>>,
    pub salmon_start_time: Option<DateTime<Utc>>,
    pub salmon_end_time: Option<DateTime<Utc>>,
}

pub struct FetchedRotations {
    pub set: RotationSet,
    /// The persisted snapshot was fresh enough to skip the network call.
    pub was_cached: bool,
    /// The feed's salmon end boundary differs from the last persisted one,
    /// which is how a missed salmon transition is detected even across a
    /// process restart.
    pub salmon_run_changed: bool,
}

/// The rotation tracker. Fetches and caches the upstream schedule feed,
/// serves the per-category collections to command handlers, and notifies
/// registered hooks whenever a boundary refresh lands.
///
/// Readers take the read lock and read whatever fields they need within a
/// single synchronous span; the only writer replaces the whole
/// [`RotationSet`] at once, so a reader can never observe fields from two
/// different fetch cycles.
pub struct Rotations {
    state: RwLock<RotationSet>,
    hooks: Mutex<Vec<Hook>>,
    salmon_hooks: Mutex<Vec<Hook>>,
    /// True from construction until the first boundary refresh. While set,
    /// newly registered hooks fire immediately: this process instance came
    /// up after a transition its subscribers have not been told about.
    catching_up: AtomicBool,
    catching_up_salmon: AtomicBool,
    db: Arc<Database>,
    client: FeedClient,
}

impl Rotations {
    /// Initial cache-aware fetch plus engine construction. The refresh loop
    /// itself is driven by [`crate::tasks::rotation_refresh`].
    pub async fn new(db: Arc<Database>) -> Result<Arc<Self>> {
        let client = FeedClient::new();
        let fetched = Self::fetch_with(&client, &db, false).await?;
        info!(
            was_cached = fetched.was_cached,
            salmon_run_changed = fetched.salmon_run_changed,
            "rotation schedule loaded"
        );
        Ok(Self::from_fetched(client, db, fetched))
    }

    pub(crate) fn from_fetched(
        client: FeedClient,
        db: Arc<Database>,
        fetched: FetchedRotations,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(fetched.set),
            hooks: Mutex::new(Vec::new()),
            salmon_hooks: Mutex::new(Vec::new()),
            catching_up: AtomicBool::new(!fetched.was_cached),
            catching_up_salmon: AtomicBool::new(fetched.salmon_run_changed),
            db,
            client,
        })
    }

    /// One fetch cycle: cache check, network call, validation, classification,
    /// salmon-change detection, persistence.
    async fn fetch_with(
        client: &FeedClient,
        db: &Database,
        ignore_cache: bool,
    ) -> Result<FetchedRotations> {
        let mut was_cached = false;
        let cached = if ignore_cache { None } else { db.cached_feed() };
        let raw = match cached {
            Some(cached) if cached.expiry > Utc::now() => {
                info!("using cached schedule feed");
                was_cached = true;
                cached.snapshot
            }
            _ => client.fetch_raw().await?,
        };

        if let Err(err) = feed::validate(&raw) {
            warn!("schedule feed failed validation, interpreting anyway: {err}");
        }

        let set = feed::interpret(&raw)?;
        debug!(
            turf_slots = set.turf_war.len(),
            salmon_slots = set.salmon_run.len(),
            start = ?set.start_time,
            end = ?set.end_time,
            salmon_start = ?set.salmon_start_time,
            salmon_end = ?set.salmon_end_time,
            "classified schedule feed"
        );
        let salmon_run_changed = set.salmon_end_time != db.last_salmon_end_time();

        if !was_cached {
            if let Some(expiry) = set.end_time {
                db.set_cached_feed(raw, expiry)?;
            }
            if let Some(salmon_end) = set.salmon_end_time {
                db.set_last_salmon_end_time(salmon_end)?;
            }
        }

        Ok(FetchedRotations {
            set,
            was_cached,
            salmon_run_changed,
        })
    }

    /// Boundary refresh: forced fetch, wholesale state replacement, then the
    /// notification fan-out. Salmon hooks only run when the salmon boundary
    /// actually moved; the regular set runs every cycle.
    pub async fn refresh_and_notify(&self) -> Result<()> {
        let fetched = Self::fetch_with(&self.client, &self.db, true).await?;
        let salmon_run_changed = fetched.salmon_run_changed;
        self.apply(fetched.set).await;
        self.catching_up.store(false, Ordering::SeqCst);
        self.catching_up_salmon.store(false, Ordering::SeqCst);
        self.notify_changed().await;
        if salmon_run_changed {
            self.notify_salmon_changed().await;
        }
        Ok(())
    }

    /// Administrative refresh: corrects the queryable state for subsequent
    /// reads without re-notifying subscribers or touching the refresh timer.
    pub async fn force_update(&self) -> Result<()> {
        let fetched = Self::fetch_with(&self.client, &self.db, true).await?;
        self.apply(fetched.set).await;
        Ok(())
    }

    pub(crate) async fn apply(&self, set: RotationSet) {
        *self.state.write().await = set;
    }

    pub async fn state(&self) -> RwLockReadGuard<'_, RotationSet> {
        self.state.read().await
    }

    pub fn catching_up(&self) -> bool {
        self.catching_up.load(Ordering::SeqCst)
    }

    pub fn catching_up_salmon(&self) -> bool {
        self.catching_up_salmon.load(Ordering::SeqCst)
    }

    /// How long until the next boundary refresh is due, recomputed from the
    /// current window end each cycle. Never a fixed interval: rotation
    /// periods are not evenly spaced.
    pub async fn next_refresh_delay(&self) -> Duration {
        let end_time = self.state.read().await.end_time;
        match end_time {
            Some(end) => match (end - Utc::now()).to_std() {
                Ok(delay) if delay >= MIN_REFRESH_DELAY => delay,
                _ => MIN_REFRESH_DELAY,
            },
            None => FALLBACK_REFRESH_DELAY,
        }
    }

    /// Register a rotation-change hook. If the engine is still catching up,
    /// the callback also fires immediately (fire-and-forget) so a subscriber
    /// that initialized after a transition still gets its one notification.
    pub fn hook(&self, callback: Hook) {
        if self.catching_up() {
            Self::fire_now("rotation", callback.clone());
        }
        self.hooks.lock().push(callback);
    }

    pub fn hook_salmon(&self, callback: Hook) {
        if self.catching_up_salmon() {
            Self::fire_now("salmon", callback.clone());
        }
        self.salmon_hooks.lock().push(callback);
    }

    fn fire_now(which: &'static str, callback: Hook) {
        tokio::spawn(async move {
            if let Err(err) = callback().await {
                error!("{which} hook failed during catch-up: {err:#}");
            }
        });
    }

    pub async fn notify_changed(&self) {
        let hooks = self.hooks.lock().clone();
        Self::run_hooks("rotation", hooks).await;
    }

    pub async fn notify_salmon_changed(&self) {
        let hooks = self.salmon_hooks.lock().clone();
        Self::run_hooks("salmon", hooks).await;
    }

    /// Start every hook together and wait for all of them to finish. A
    /// failing hook is reported individually and never aborts its siblings.
    async fn run_hooks(which: &'static str, hooks: Vec<Hook>) {
        let results = join_all(hooks.iter().map(|hook| hook())).await;
        for (index, result) in results.into_iter().enumerate() {
            if let Err(err) = result {
                error!("{which} hook {index} failed: {err:#}");
            }
        }
    }
}
