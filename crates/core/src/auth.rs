// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Authenticator decision rules, decoupled from header extraction and
//! counter persistence (both live in `gateway-storage`/`gateway-server`).

use crate::credential::Credential;
use crate::error::{Denial, DenialKind};
use chrono::{DateTime, Utc};

/// Outcome of looking up a presented key.
pub enum KeyLookup<'a> {
    Missing,
    Unknown,
    Found(&'a Credential),
}

/// The per-key rate-limit window state needed to decide allow/deny.
pub struct UsageSnapshot {
    pub count: u64,
}

pub enum AuthOutcome {
    Allow { remaining: u64 },
    Deny(Denial, Option<RateLimitHeaders>),
}

/// Headers required on a 429 response.
pub struct RateLimitHeaders {
    pub limit: u64,
    pub remaining: u64,
    pub reset: DateTime<Utc>,
}

/// Fixed decision order: missing -> unknown -> revoked -> rate limit.
pub fn authenticate(lookup: KeyLookup<'_>, usage: UsageSnapshot, now: DateTime<Utc>) -> AuthOutcome {
    let credential = match lookup {
        KeyLookup::Missing => {
            return AuthOutcome::Deny(
                Denial::new(DenialKind::AuthMissing, "Missing x-api-key header"),
                None,
            )
        }
        KeyLookup::Unknown => {
            return AuthOutcome::Deny(Denial::new(DenialKind::AuthInvalid, "Invalid API key"), None)
        }
        KeyLookup::Found(c) => c,
    };

    if !credential.active {
        return AuthOutcome::Deny(
            Denial::new(DenialKind::AuthRevoked, "API key has been revoked"),
            None,
        );
    }

    if usage.count >= credential.daily_limit {
        let reset = next_utc_midnight(now);
        return AuthOutcome::Deny(
            Denial::new(DenialKind::RateLimited, "Daily request limit exceeded"),
            Some(RateLimitHeaders { limit: credential.daily_limit, remaining: 0, reset }),
        );
    }

    let remaining = credential.daily_limit.saturating_sub(usage.count + 1);
    AuthOutcome::Allow { remaining }
}

/// Midnight UTC of the day after `now`, for the `X-RateLimit-Reset` header.
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive().succ_opt().unwrap_or(now.date_naive());
    tomorrow
        .and_hms_opt(0, 0, 0)
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Tier;
    use chrono::TimeZone;

    fn cred(active: bool, daily_limit: u64) -> Credential {
        Credential {
            name: "agent-1".into(),
            tier: Tier::Worker,
            tunnel: None,
            daily_limit,
            active,
            created_at: Utc::now(),
            created_by: "orchestrator-1".into(),
        }
    }

    #[test]
    fn missing_header_denies_401() {
        let outcome = authenticate(KeyLookup::Missing, UsageSnapshot { count: 0 }, Utc::now());
        match outcome {
            AuthOutcome::Deny(d, None) => assert_eq!(d.kind, crate::error::DenialKind::AuthMissing),
            _ => panic!("expected deny"),
        }
    }

    #[test]
    fn unknown_key_denies_401() {
        let outcome = authenticate(KeyLookup::Unknown, UsageSnapshot { count: 0 }, Utc::now());
        match outcome {
            AuthOutcome::Deny(d, None) => assert_eq!(d.kind, crate::error::DenialKind::AuthInvalid),
            _ => panic!("expected deny"),
        }
    }

    #[test]
    fn revoked_key_denies_401() {
        let c = cred(false, 100);
        let outcome = authenticate(KeyLookup::Found(&c), UsageSnapshot { count: 0 }, Utc::now());
        match outcome {
            AuthOutcome::Deny(d, None) => assert_eq!(d.kind, crate::error::DenialKind::AuthRevoked),
            _ => panic!("expected deny"),
        }
    }

    #[test]
    fn at_cap_denies_429_with_headers() {
        let c = cred(true, 5);
        let outcome = authenticate(KeyLookup::Found(&c), UsageSnapshot { count: 5 }, Utc::now());
        match outcome {
            AuthOutcome::Deny(d, Some(headers)) => {
                assert_eq!(d.kind, crate::error::DenialKind::RateLimited);
                assert_eq!(headers.remaining, 0);
                assert_eq!(headers.limit, 5);
            }
            _ => panic!("expected rate-limited deny"),
        }
    }

    #[test]
    fn under_cap_allows_and_reports_remaining() {
        let c = cred(true, 5);
        let outcome = authenticate(KeyLookup::Found(&c), UsageSnapshot { count: 2 }, Utc::now());
        match outcome {
            AuthOutcome::Allow { remaining } => assert_eq!(remaining, 2),
            _ => panic!("expected allow"),
        }
    }

    #[test]
    fn next_midnight_is_start_of_following_day() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 15, 30, 0).unwrap();
        let reset = next_utc_midnight(now);
        assert_eq!(reset.date_naive(), Utc.with_ymd_and_hms(2026, 7, 29, 0, 0, 0).unwrap().date_naive());
        assert_eq!(reset.format("%H:%M:%S").to_string(), "00:00:00");
    }
}
