//! Fixed-window rate limiting with named policy classes.
//!
//! Each policy keeps one counter per bucket key. The first hit in a window
//! opens a fresh bucket; later hits increment it and are denied once the
//! count passes the quota. Denied hits still count against the window.
//!
//! Buckets are reset lazily on their next hit and never swept.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

pub use crate::config::BucketKey;
use crate::config::{PolicyConfig, RateLimitConfig};
use crate::observability::metrics;
use crate::security::identity::Identity;

/// A named fixed-window policy class.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub name: String,
    pub window: Duration,
    pub max_requests: u32,
    pub key: BucketKey,
    pub message: String,
}

impl RateLimitPolicy {
    pub fn new(name: impl Into<String>, window: Duration, max_requests: u32) -> Self {
        Self {
            name: name.into(),
            window,
            max_requests,
            key: BucketKey::default(),
            message: "Too many requests, please try again later".to_string(),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &PolicyConfig) -> Self {
        Self {
            message: config.message.clone(),
            key: config.key,
            ..Self::new(name, Duration::from_secs(config.window_secs), config.max_requests)
        }
    }

    /// Map a caller to the bucket this policy counts it in.
    pub fn bucket_key(&self, identity: Option<&Identity>, origin: &str) -> String {
        match (self.key, identity) {
            (BucketKey::IdentityOrOrigin, Some(identity)) => format!("id:{}", identity.id),
            _ => format!("origin:{origin}"),
        }
    }
}

/// The two classes every deployment carries.
#[derive(Debug, Clone)]
pub struct PolicySet {
    pub general: RateLimitPolicy,
    pub ai_call: RateLimitPolicy,
}

impl PolicySet {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            general: RateLimitPolicy::from_config("general", &config.general),
            ai_call: RateLimitPolicy::from_config("ai-call", &config.ai_call),
        }
    }
}

/// Counter state after a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u32,
    pub window_start: Instant,
}

/// Storage for window counters.
///
/// `hit` must be atomic per `(scope, key)`: two concurrent hits never observe
/// the same post-increment count. The in-memory store covers a single
/// process; a fleet needs a shared implementation behind this trait.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn hit(&self, scope: &str, key: &str, window: Duration, now: Instant) -> WindowCount;
}

#[derive(Debug)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

/// Process-local counter store.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    buckets: DashMap<(String, String), Bucket>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets currently held.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn hit(&self, scope: &str, key: &str, window: Duration, now: Instant) -> WindowCount {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut bucket = self
            .buckets
            .entry((scope.to_string(), key.to_string()))
            .or_insert_with(|| Bucket {
                window_start: now,
                count: 0,
            });

        if now.saturating_duration_since(bucket.window_start) >= window {
            bucket.window_start = now;
            bucket.count = 0;
        }
        bucket.count = bucket.count.saturating_add(1);

        WindowCount {
            count: bucket.count,
            window_start: bucket.window_start,
        }
    }
}

/// Quota snapshot for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

/// Result of a single policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(RateLimitStatus),
    Denied { retry_after: Duration },
}

/// A policy in a chain refused the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub policy: String,
    pub message: String,
    pub retry_after: Duration,
}

/// Admits or rejects requests against policy classes.
pub struct RateGovernor {
    store: Arc<dyn CounterStore>,
    enabled: bool,
}

impl RateGovernor {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            enabled: true,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCounterStore::new()))
    }

    /// A governor that admits everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::in_memory()
        }
    }

    /// Count one request against `policy` for `key`.
    pub async fn admit(&self, policy: &RateLimitPolicy, key: &str) -> Admission {
        if !self.enabled {
            return Admission::Admitted(RateLimitStatus {
                limit: policy.max_requests,
                remaining: policy.max_requests,
                reset_after: policy.window,
            });
        }

        let now = Instant::now();
        let hit = self.store.hit(&policy.name, key, policy.window, now).await;
        let reset_after = (hit.window_start + policy.window).saturating_duration_since(now);

        if hit.count > policy.max_requests {
            return Admission::Denied {
                retry_after: reset_after,
            };
        }

        Admission::Admitted(RateLimitStatus {
            limit: policy.max_requests,
            remaining: policy.max_requests - hit.count,
            reset_after,
        })
    }

    /// Run policies in order, stopping at the first denial.
    ///
    /// On success returns the status with the fewest remaining requests.
    pub async fn admit_chain(
        &self,
        policies: &[&RateLimitPolicy],
        identity: Option<&Identity>,
        origin: &str,
    ) -> Result<Option<RateLimitStatus>, Denial> {
        let mut tightest: Option<RateLimitStatus> = None;

        for policy in policies {
            let key = policy.bucket_key(identity, origin);
            match self.admit(policy, &key).await {
                Admission::Admitted(status) => {
                    if tightest.map_or(true, |t| status.remaining < t.remaining) {
                        tightest = Some(status);
                    }
                }
                Admission::Denied { retry_after } => {
                    tracing::warn!(
                        policy = %policy.name,
                        client = %key,
                        retry_after_secs = retry_after.as_secs(),
                        "Rate limit exceeded"
                    );
                    metrics::record_rate_limited(&policy.name);
                    return Err(Denial {
                        policy: policy.name.clone(),
                        message: policy.message.clone(),
                        retry_after,
                    });
                }
            }
        }

        Ok(tightest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max: u32) -> RateLimitPolicy {
        RateLimitPolicy::new("ai-call", Duration::from_secs(60), max)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_window_quota() {
        let governor = RateGovernor::in_memory();
        let policy = policy(10);

        for i in 0..10 {
            assert!(
                matches!(governor.admit(&policy, "id:u1").await, Admission::Admitted(_)),
                "request {i} should be admitted"
            );
        }
        for _ in 0..5 {
            assert!(matches!(
                governor.admit(&policy, "id:u1").await,
                Admission::Denied { .. }
            ));
        }

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(matches!(
            governor.admit(&policy, "id:u1").await,
            Admission::Admitted(RateLimitStatus { remaining: 9, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_counts_down_to_window_end() {
        let governor = RateGovernor::in_memory();
        let policy = policy(1);

        governor.admit(&policy, "k").await;
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(
            governor.admit(&policy, "k").await,
            Admission::Denied {
                retry_after: Duration::from_secs(45)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_attempts_are_not_rolled_back() {
        let store = Arc::new(InMemoryCounterStore::new());
        let governor = RateGovernor::new(store.clone());
        let policy = policy(2);

        for _ in 0..5 {
            governor.admit(&policy, "k").await;
        }

        let hit = store.hit("ai-call", "k", policy.window, Instant::now()).await;
        assert_eq!(hit.count, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_and_policies_are_independent() {
        let governor = RateGovernor::in_memory();
        let narrow = policy(1);
        let broad = RateLimitPolicy::new("general", Duration::from_secs(900), 100);

        assert!(matches!(governor.admit(&narrow, "a").await, Admission::Admitted(_)));
        assert!(matches!(governor.admit(&narrow, "b").await, Admission::Admitted(_)));
        assert!(matches!(governor.admit(&broad, "a").await, Admission::Admitted(_)));
        assert!(matches!(governor.admit(&narrow, "a").await, Admission::Denied { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_hits_never_over_admit() {
        let governor = Arc::new(RateGovernor::in_memory());
        let policy = Arc::new(policy(10));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..200 {
            let governor = governor.clone();
            let policy = policy.clone();
            tasks.spawn(async move { governor.admit(&policy, "shared").await });
        }

        let mut admitted = 0;
        while let Some(result) = tasks.join_next().await {
            if matches!(result.unwrap(), Admission::Admitted(_)) {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_denial() {
        let governor = RateGovernor::in_memory();
        let general = RateLimitPolicy::new("general", Duration::from_secs(60), 1);
        let ai = policy(5);
        let identity = Identity {
            id: "u1".into(),
            principal_name: "demo".into(),
            role: "user".into(),
        };

        let first = governor
            .admit_chain(&[&general, &ai], Some(&identity), "10.0.0.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.remaining, 0);

        let denial = governor
            .admit_chain(&[&general, &ai], Some(&identity), "10.0.0.1")
            .await
            .unwrap_err();
        assert_eq!(denial.policy, "general");

        // The ai-call bucket only saw the first request.
        let status = governor
            .admit_chain(&[&ai], Some(&identity), "10.0.0.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.remaining, 3);
    }

    #[test]
    fn test_bucket_key_falls_back_to_origin() {
        let policy = policy(1);
        let identity = Identity {
            id: "u1".into(),
            principal_name: "demo".into(),
            role: "user".into(),
        };
        assert_eq!(policy.bucket_key(Some(&identity), "1.2.3.4"), "id:u1");
        assert_eq!(policy.bucket_key(None, "1.2.3.4"), "origin:1.2.3.4");

        let by_origin = RateLimitPolicy::from_config(
            "login",
            &PolicyConfig {
                window_secs: 60,
                max_requests: 5,
                message: "slow down".into(),
                key: BucketKey::Origin,
            },
        );
        assert_eq!(by_origin.bucket_key(Some(&identity), "1.2.3.4"), "origin:1.2.3.4");
    }

    #[tokio::test]
    async fn test_disabled_governor_admits_everything() {
        let governor = RateGovernor::disabled();
        let policy = policy(1);
        for _ in 0..5 {
            assert!(matches!(governor.admit(&policy, "k").await, Admission::Admitted(_)));
        }
    }
}
