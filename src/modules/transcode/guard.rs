use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::error::GuardError;
use super::job::JobIdentity;
use super::ports::JobGuard;
use crate::infrastructure::redis::client::RedisService;

const REDIS_KEY_PREFIX: &str = "transcode:job:";

/// No duplicate detection: every delivered trigger is processed from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopJobGuard;

#[async_trait]
impl JobGuard for NoopJobGuard {
    async fn acquire(&self, _identity: &JobIdentity) -> Result<bool, GuardError> {
        Ok(true)
    }

    async fn release(&self, _identity: &JobIdentity) -> Result<(), GuardError> {
        Ok(())
    }
}

/// Process-local guard. Only dedupes triggers delivered to this instance; claims expire
/// after `ttl` like the Redis keys do.
#[derive(Debug)]
pub struct InMemoryJobGuard {
    held: Mutex<HashMap<JobIdentity, Instant>>,
    ttl: Duration,
}

impl InMemoryJobGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn held(&self) -> std::sync::MutexGuard<'_, HashMap<JobIdentity, Instant>> {
        // a poisoned map is still a valid map
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl JobGuard for InMemoryJobGuard {
    async fn acquire(&self, identity: &JobIdentity) -> Result<bool, GuardError> {
        let now = Instant::now();
        let mut held = self.held();
        held.retain(|_, expires_at| *expires_at > now);

        if held.contains_key(identity) {
            return Ok(false);
        }
        held.insert(identity.clone(), now + self.ttl);
        Ok(true)
    }

    async fn release(&self, identity: &JobIdentity) -> Result<(), GuardError> {
        self.held().remove(identity);
        Ok(())
    }
}

/// Cross-instance guard using `SET NX EX`; completed identities expire after `ttl`.
#[derive(Clone)]
pub struct RedisJobGuard {
    redis: RedisService,
    ttl: Duration,
}

impl RedisJobGuard {
    pub fn new(redis: RedisService, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    fn key(identity: &JobIdentity) -> String {
        format!("{}{}", REDIS_KEY_PREFIX, identity)
    }
}

#[async_trait]
impl JobGuard for RedisJobGuard {
    async fn acquire(&self, identity: &JobIdentity) -> Result<bool, GuardError> {
        let mut conn = self.redis.get_conn().await?;
        let acquired: Option<String> = redis::cmd("SET")
            .arg(Self::key(identity))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(acquired.is_some())
    }

    async fn release(&self, identity: &JobIdentity) -> Result<(), GuardError> {
        let mut conn = self.redis.get_conn().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(Self::key(identity))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
