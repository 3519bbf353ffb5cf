/*
[INPUT]:  Service name and the current time
[OUTPUT]: Human-readable, time-bound authentication challenges
[POS]:    Auth layer - challenge issuance and parsing
[UPDATE]: When the challenge message format changes
*/

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

pub const DEFAULT_SERVICE_NAME: &str = "Littlefish Foundation";

const CHALLENGE_PREFIX: &str = "Authenticate with ";

/// A single authentication challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

impl Challenge {
    /// Build the challenge text for `service_name` at `issued_at`.
    ///
    /// Format: `Authenticate with <service>: <ISO-8601 with millis>Z`
    pub fn new(service_name: &str, issued_at: DateTime<Utc>) -> Self {
        let timestamp = issued_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            message: format!("{CHALLENGE_PREFIX}{service_name}: {timestamp}"),
            issued_at,
        }
    }

    /// Parse a challenge message issued for `service_name`.
    ///
    /// Returns `None` when the text does not follow the challenge format.
    pub fn parse(message: &str, service_name: &str) -> Option<Self> {
        let rest = message.strip_prefix(CHALLENGE_PREFIX)?;
        let (service, timestamp) = rest.rsplit_once(": ")?;
        if service != service_name {
            return None;
        }
        let issued_at = DateTime::parse_from_rfc3339(timestamp)
            .ok()?
            .with_timezone(&Utc);
        Some(Self {
            message: message.to_string(),
            issued_at,
        })
    }
}

/// Issues challenges that are unique per generator.
///
/// Two calls within the same millisecond are pushed one millisecond apart
/// so no two attempts ever sign identical text.
#[derive(Debug)]
pub struct ChallengeGenerator {
    service_name: String,
    last_issued_ms: AtomicI64,
}

impl ChallengeGenerator {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            last_issued_ms: AtomicI64::new(i64::MIN),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Generate a challenge stamped with the current time
    pub fn generate(&self) -> Challenge {
        self.generate_at(Utc::now())
    }

    /// Generate a challenge stamped no earlier than `now`
    pub fn generate_at(&self, now: DateTime<Utc>) -> Challenge {
        let wanted = now.timestamp_millis();
        let mut previous = self.last_issued_ms.load(Ordering::Relaxed);
        let issued_ms = loop {
            let candidate = if wanted > previous { wanted } else { previous + 1 };
            match self.last_issued_ms.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break candidate,
                Err(actual) => previous = actual,
            }
        };
        let issued_at = Utc
            .timestamp_millis_opt(issued_ms)
            .single()
            .unwrap_or(now);
        Challenge::new(&self.service_name, issued_at)
    }
}

impl Default for ChallengeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}
