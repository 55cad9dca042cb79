//! Key/value cache with per-entry expiry.
//!
//! Expiry is enforced twice: lazily, when a read finds an expired entry, and
//! actively, by a background task that sweeps the map on a fixed interval so
//! that entries nobody reads again do not accumulate.
//!
//! Each cache holds a single value type. Callers that cache different shapes
//! use one `TtlCache` per shape.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cache timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied by [`TtlCache::set`].
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// How often the background sweep runs.
    #[serde(with = "duration_secs")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Debug)]
struct Shared<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V> Shared<V> {
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

/// A string-keyed cache whose entries expire after a TTL.
///
/// Values are cloned out on read. Dropping the cache (or calling
/// [`TtlCache::stop`]) ends the background sweep; reads and writes keep
/// working afterwards, with expiry enforced lazily only.
#[derive(Debug)]
pub struct TtlCache<V> {
    shared: Arc<Shared<V>>,
    sweeper: CancellationToken,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates the cache and, when called inside a tokio runtime, spawns its
    /// sweep task.
    pub fn new(config: CacheConfig) -> Self {
        let shared = Arc::new(Shared {
            entries: RwLock::new(HashMap::new()),
            default_ttl: config.default_ttl,
        });
        let sweeper = CancellationToken::new();

        let first_sweep = Instant::now().checked_add(config.sweep_interval);
        match tokio::runtime::Handle::try_current() {
            Ok(_) if config.sweep_interval.is_zero() => {
                warn!("cache sweep interval is zero, entries will only expire on read")
            }
            Ok(handle) => match first_sweep {
                Some(first_sweep) => {
                    handle.spawn(run_sweep_loop(
                        Arc::downgrade(&shared),
                        first_sweep,
                        config.sweep_interval,
                        sweeper.clone(),
                    ));
                }
                None => {
                    warn!("cache sweep interval is out of range, entries will only expire on read")
                }
            },
            Err(_) => warn!("no tokio runtime, cache entries will only expire on read"),
        }

        Self { shared, sweeper }
    }

    /// Stores `value` under `key` with the default TTL, replacing any
    /// existing entry and its TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.shared.default_ttl);
    }

    /// Stores `value` under `key` for `ttl`. A TTL too large to represent
    /// never expires.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.shared.entries.write().insert(key.into(), entry);
    }

    /// Returns the live value for `key`, if any. An expired entry is removed
    /// and reported as missing even if the sweep has not reached it yet.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.shared.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.shared.entries.write();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        None
    }

    pub fn delete(&self, key: &str) {
        self.shared.entries.write().remove(key);
    }

    pub fn clear(&self) {
        self.shared.entries.write().clear();
    }

    /// Number of stored entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of live entries only.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.shared
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Removes every expired entry now. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.shared.sweep()
    }

    /// Ends the background sweep.
    pub fn stop(&self) {
        self.sweeper.cancel();
    }

    pub fn is_sweeping(&self) -> bool {
        !self.sweeper.is_cancelled()
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        self.sweeper.cancel();
    }
}

async fn run_sweep_loop<V>(
    shared: Weak<Shared<V>>,
    first_sweep: Instant,
    sweep_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(first_sweep, sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cache sweep stopped");
                break;
            }
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let removed = shared.sweep();
                if removed > 0 {
                    debug!(removed, "swept expired cache entries");
                }
            }
        }
    }
}
