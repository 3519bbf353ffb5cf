/*
[INPUT]:  Challenge messages submitted with wallet signatures, server clock
[OUTPUT]: Freshness verdicts and single-use consumption of challenges
[POS]:    Auth layer - server-side challenge registry
[UPDATE]: When challenge lifetime or replay rules change
*/

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use littlefish_adapter::{Challenge, ChallengeGenerator};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ChallengeConfig;

/// Source of "now"; swapped out in tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("message is not a challenge issued by this service")]
    Malformed,

    #[error("challenge expired")]
    Expired,

    #[error("challenge is dated in the future")]
    FromFuture,

    #[error("challenge was already used")]
    Replayed,
}

/// Tracks which challenges are fresh and which were already used.
///
/// A challenge is used up per signing address, so two wallets that happen to
/// sign the same timestamp do not collide. Consumed entries are kept only
/// until they would have expired anyway.
pub struct ChallengeRegistry {
    generator: ChallengeGenerator,
    ttl: TimeDelta,
    max_skew: TimeDelta,
    clock: Clock,
    consumed: Mutex<HashMap<(String, String), DateTime<Utc>>>,
}

impl ChallengeRegistry {
    pub fn new(service_name: &str, config: &ChallengeConfig) -> Self {
        Self {
            generator: ChallengeGenerator::new(service_name),
            ttl: TimeDelta::seconds(config.ttl_secs as i64),
            max_skew: TimeDelta::seconds(config.max_clock_skew_secs as i64),
            clock: system_clock(),
            consumed: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn service_name(&self) -> &str {
        self.generator.service_name()
    }

    /// Issue a challenge stamped with the server clock
    pub fn issue(&self) -> Challenge {
        self.generator.generate_at(self.now())
    }

    /// Check that `message` is a well-formed, unexpired challenge.
    ///
    /// Does not consume it.
    pub fn check(&self, message: &str) -> Result<Challenge, ChallengeError> {
        let challenge = Challenge::parse(message, self.service_name())
            .ok_or(ChallengeError::Malformed)?;
        let now = self.now();
        if challenge.issued_at > now + self.max_skew {
            return Err(ChallengeError::FromFuture);
        }
        if now - challenge.issued_at > self.ttl {
            return Err(ChallengeError::Expired);
        }
        Ok(challenge)
    }

    /// Check and mark `message` used by `address`; a second call for the
    /// same pair fails with `Replayed`
    pub async fn consume(
        &self,
        address: &str,
        message: &str,
    ) -> Result<Challenge, ChallengeError> {
        let challenge = self.check(message)?;
        let horizon = self.now() - self.ttl - self.max_skew;

        let mut consumed = self.consumed.lock().await;
        consumed.retain(|_, issued_at| *issued_at >= horizon);
        let key = (address.to_string(), message.to_string());
        if consumed.contains_key(&key) {
            return Err(ChallengeError::Replayed);
        }
        consumed.insert(key, challenge.issued_at);
        Ok(challenge)
    }

    /// Hand back a consumed challenge when the link it guarded was not written
    pub async fn release(&self, address: &str, message: &str) {
        self.consumed
            .lock()
            .await
            .remove(&(address.to_string(), message.to_string()));
    }

    pub async fn consumed_count(&self) -> usize {
        self.consumed.lock().await.len()
    }
}

impl fmt::Debug for ChallengeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeRegistry")
            .field("service_name", &self.service_name())
            .field("ttl", &self.ttl)
            .field("max_skew", &self.max_skew)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::sync::atomic::{AtomicI64, Ordering};

    const NEW_YEAR: &str = "Authenticate with Littlefish Foundation: 2024-01-01T00:00:00.000Z";

    /// Clock that can be moved forward from inside the test
    fn manual_clock(start: DateTime<Utc>) -> (Clock, Arc<AtomicI64>) {
        let millis = Arc::new(AtomicI64::new(start.timestamp_millis()));
        let handle = millis.clone();
        let clock: Clock = Arc::new(move || {
            Utc.timestamp_millis_opt(handle.load(Ordering::SeqCst))
                .single()
                .unwrap_or_else(Utc::now)
        });
        (clock, millis)
    }

    fn registry_at(now: DateTime<Utc>) -> (ChallengeRegistry, Arc<AtomicI64>) {
        let (clock, handle) = manual_clock(now);
        let registry = ChallengeRegistry::new("Littlefish Foundation", &ChallengeConfig::default())
            .with_clock(clock);
        (registry, handle)
    }

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[rstest]
    #[case::just_issued(0, Ok(()))]
    #[case::within_ttl(299, Ok(()))]
    #[case::at_ttl(300, Ok(()))]
    #[case::expired(301, Err(ChallengeError::Expired))]
    #[case::small_skew(-30, Ok(()))]
    #[case::too_far_ahead(-61, Err(ChallengeError::FromFuture))]
    fn test_freshness_window(#[case] age_secs: i64, #[case] expected: Result<(), ChallengeError>) {
        let (registry, _) = registry_at(new_year() + TimeDelta::seconds(age_secs));
        assert_eq!(registry.check(NEW_YEAR).map(|_| ()), expected);
    }

    #[test]
    fn test_rejects_foreign_messages() {
        let (registry, _) = registry_at(new_year());
        assert_eq!(
            registry.check("please sign this").unwrap_err(),
            ChallengeError::Malformed
        );
        assert_eq!(
            registry
                .check("Authenticate with Evil Corp: 2024-01-01T00:00:00.000Z")
                .unwrap_err(),
            ChallengeError::Malformed
        );
    }

    #[tokio::test]
    async fn test_single_use() {
        let (registry, _) = registry_at(new_year() + TimeDelta::seconds(30));
        assert!(registry.consume("addr1alice", NEW_YEAR).await.is_ok());
        assert_eq!(
            registry.consume("addr1alice", NEW_YEAR).await.unwrap_err(),
            ChallengeError::Replayed
        );
        // Checking alone never consumes
        assert!(registry.check(NEW_YEAR).is_ok());
    }

    #[tokio::test]
    async fn test_same_timestamp_for_different_wallets() {
        let (registry, _) = registry_at(new_year() + TimeDelta::seconds(30));
        assert!(registry.consume("addr1alice", NEW_YEAR).await.is_ok());
        assert!(registry.consume("addr1bob", NEW_YEAR).await.is_ok());
        assert_eq!(registry.consumed_count().await, 2);
    }

    #[tokio::test]
    async fn test_release_allows_reuse() {
        let (registry, _) = registry_at(new_year() + TimeDelta::seconds(30));
        registry.consume("addr1alice", NEW_YEAR).await.unwrap();
        registry.release("addr1alice", NEW_YEAR).await;
        assert_eq!(registry.consumed_count().await, 0);
        assert!(registry.consume("addr1alice", NEW_YEAR).await.is_ok());
    }

    #[tokio::test]
    async fn test_consumed_entries_are_pruned() {
        let (registry, clock) = registry_at(new_year());
        registry.consume("addr1a", NEW_YEAR).await.unwrap();
        assert_eq!(registry.consumed_count().await, 1);

        clock.fetch_add(200_000, Ordering::SeqCst);
        let later = registry.issue();
        registry.consume("addr1a", &later.message).await.unwrap();
        assert_eq!(registry.consumed_count().await, 2);

        clock.fetch_add(300_000, Ordering::SeqCst);
        let latest = registry.issue();
        registry.consume("addr1a", &latest.message).await.unwrap();
        assert_eq!(registry.consumed_count().await, 2);
    }

    #[test]
    fn test_issue_uses_injected_clock() {
        let (registry, _) = registry_at(new_year());
        assert_eq!(registry.issue().message, NEW_YEAR);
    }
}
