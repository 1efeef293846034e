//! Per-client token bucket rate limiter.
//!
//! Every client identity gets its own bucket holding up to `burst` tokens,
//! refilled continuously at `rate_per_second`. An admission consumes one token.
//! Buckets idle for longer than `idle_ttl` are evicted by a background sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Tokens added per second.
    pub rate_per_second: f64,
    /// Bucket capacity, and the number of tokens a new client starts with.
    pub burst: u32,
    pub sweep_interval: Duration,
    pub idle_ttl: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 10.0,
            burst: 5,
            sweep_interval: Duration::from_secs(300),
            idle_ttl: Duration::from_secs(1800),
        }
    }
}

#[derive(Debug)]
struct Visitor {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Token bucket limiter keyed by opaque client identity.
///
/// A single mutex guards the whole map, so an admission and a sweep never
/// interleave. The lock is never held across an `.await`.
pub struct RateLimiter {
    visitors: Mutex<HashMap<String, Visitor>>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            visitors: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Decides whether `client` may proceed, consuming a token if so.
    ///
    /// Never blocks on I/O and never fails; a poisoned lock is recovered.
    pub fn admit(&self, client: &str) -> bool {
        let now = Instant::now();
        let burst = f64::from(self.config.burst);

        let mut visitors = self.lock();
        let tracked_before = visitors.len();

        let visitor = visitors
            .entry(client.to_string())
            .or_insert_with(|| Visitor {
                tokens: burst,
                last_refill: now,
                last_seen: now,
            });

        let elapsed = now.saturating_duration_since(visitor.last_refill);
        visitor.tokens = (visitor.tokens + elapsed.as_secs_f64() * self.config.rate_per_second)
            .min(burst);
        visitor.last_refill = now;
        visitor.last_seen = now;

        let admitted = visitor.tokens >= 1.0;
        if admitted {
            visitor.tokens -= 1.0;
        }

        if visitors.len() != tracked_before {
            metrics::gauge!("rate_limit_tracked_clients").set(visitors.len() as f64);
        }
        drop(visitors);

        if admitted {
            metrics::counter!("rate_limit_admitted_total").increment(1);
        } else {
            metrics::counter!("rate_limit_denied_total").increment(1);
            tracing::debug!(client, "Rate limit exceeded");
        }

        admitted
    }

    /// Removes clients idle for longer than `idle_ttl`. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle_ttl = self.config.idle_ttl;

        let mut visitors = self.lock();
        let before = visitors.len();
        visitors.retain(|_, v| now.saturating_duration_since(v.last_seen) <= idle_ttl);
        let removed = before - visitors.len();

        metrics::gauge!("rate_limit_tracked_clients").set(visitors.len() as f64);

        removed
    }

    /// Number of client identities currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Spawns the periodic sweeper.
    ///
    /// Call [`SweeperHandle::shutdown`] to stop the task. Dropping the handle
    /// stops it as well, without waiting.
    pub fn start_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let limiter = Arc::clone(self);
        let period = self.config.sweep_interval;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                remaining = limiter.tracked_clients(),
                                "Evicted idle rate limit entries"
                            );
                        }
                    }
                }
            }

            tracing::debug!("Rate limit sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Visitor>> {
        self.visitors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the background sweeper task.
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Rate limit sweeper ended abnormally: {}", e);
        }
    }
}
