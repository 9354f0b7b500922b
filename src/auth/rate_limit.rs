//! In-memory sliding-window rate limiting keyed by (client, route).
//!
//! Counters live in this process only. Running several instances behind a
//! load balancer multiplies the effective limit by the instance count.

use axum::http::HeaderMap;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::RateLimitRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

impl RateDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Observable state of one (client, route) counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Idle,
    Counting(u32),
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RateKey {
    client: String,
    route: &'static str,
}

#[derive(Debug)]
struct SlidingLog {
    hits: VecDeque<Instant>,
    window: Duration,
}

impl SlidingLog {
    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<RateKey, SlidingLog>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, client: &str, route: &'static str, rule: RateLimitRule) -> RateDecision {
        self.check_at(client, route, rule, Instant::now())
    }

    /// Checks and, when admitted, records a request at `now`.
    ///
    /// The map entry stays locked for the whole check so concurrent requests
    /// cannot both take the last slot. Denied requests are not recorded.
    pub fn check_at(
        &self,
        client: &str,
        route: &'static str,
        rule: RateLimitRule,
        now: Instant,
    ) -> RateDecision {
        let window = rule.window();
        let key = RateKey {
            client: client.to_string(),
            route,
        };

        let mut entry = self.windows.entry(key).or_insert_with(|| SlidingLog {
            hits: VecDeque::new(),
            window,
        });
        let log = entry.value_mut();
        log.window = window;
        log.evict(now);

        let limit = rule.limit as usize;
        if log.hits.len() >= limit {
            let retry_after = log.hits.front().map_or(window, |&oldest| {
                window.saturating_sub(now.saturating_duration_since(oldest))
            });
            return RateDecision::Denied {
                retry_after: round_up_to_secs(retry_after),
            };
        }

        log.hits.push_back(now);
        let remaining = u32::try_from(limit - log.hits.len()).unwrap_or(0);
        RateDecision::Allowed { remaining }
    }

    #[must_use]
    pub fn state_at(
        &self,
        client: &str,
        route: &'static str,
        rule: RateLimitRule,
        now: Instant,
    ) -> WindowState {
        let key = RateKey {
            client: client.to_string(),
            route,
        };

        let Some(log) = self.windows.get(&key) else {
            return WindowState::Idle;
        };

        let live = log
            .hits
            .iter()
            .filter(|&&hit| now.saturating_duration_since(hit) < rule.window())
            .count();

        match u32::try_from(live).unwrap_or(u32::MAX) {
            0 => WindowState::Idle,
            n if n >= rule.limit => WindowState::Exhausted,
            n => WindowState::Counting(n),
        }
    }

    /// Drops counters whose every hit has left the window. Returns how many
    /// were removed.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, log| {
            log.evict(now);
            !log.hits.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Periodically purges idle counters so memory stays bounded by active
    /// clients.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = self.purge_idle(Instant::now());
                if removed > 0 {
                    tracing::debug!(removed, "Purged idle rate-limit counters");
                }
            }
        })
    }
}

fn round_up_to_secs(duration: Duration) -> Duration {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    Duration::from_secs(secs.max(1))
}

/// Identifies the client for rate limiting.
///
/// `X-Forwarded-For` is only believed when the socket peer is a trusted proxy;
/// otherwise any client could rotate the header to dodge its limit.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = peer else {
        return "unknown".to_string();
    };

    if trusted_proxies.contains(&peer)
        && let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .and_then(|v| v.parse::<IpAddr>().ok())
    {
        return forwarded.to_string();
    }

    peer.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const LOGIN: RateLimitRule = RateLimitRule::per_minute(5);

    #[test]
    fn test_admits_exactly_limit_then_denies() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..5 {
            let decision = limiter.check_at("1.2.3.4", "login", LOGIN, start);
            assert_eq!(decision, RateDecision::Allowed { remaining: 4 - i });
        }

        let decision = limiter.check_at("1.2.3.4", "login", LOGIN, start);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_retry_after_is_remaining_window() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for _ in 0..5 {
            limiter.check_at("1.2.3.4", "login", LOGIN, start);
        }

        let later = start + Duration::from_millis(20_500);
        match limiter.check_at("1.2.3.4", "login", LOGIN, later) {
            RateDecision::Denied { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(40));
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        let rule = RateLimitRule {
            limit: 1,
            window_seconds: 1,
        };

        limiter.check_at("a", "login", rule, start);
        match limiter.check_at("a", "login", rule, start + Duration::from_millis(999)) {
            RateDecision::Denied { retry_after } => assert_eq!(retry_after, Duration::from_secs(1)),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..5 {
            limiter.check_at("c", "login", LOGIN, start + Duration::from_secs(i * 10));
        }
        assert!(
            !limiter
                .check_at("c", "login", LOGIN, start + Duration::from_secs(59))
                .is_allowed()
        );

        // The first hit leaves the window at t=60, freeing exactly one slot.
        assert!(
            limiter
                .check_at("c", "login", LOGIN, start + Duration::from_secs(60))
                .is_allowed()
        );
        assert!(
            !limiter
                .check_at("c", "login", LOGIN, start + Duration::from_secs(61))
                .is_allowed()
        );
    }

    #[test]
    fn test_resets_after_full_window() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for _ in 0..6 {
            limiter.check_at("c", "login", LOGIN, start);
        }

        let after = start + LOGIN.window();
        assert_eq!(
            limiter.check_at("c", "login", LOGIN, after),
            RateDecision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn test_denied_requests_are_not_recorded() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        let rule = RateLimitRule {
            limit: 1,
            window_seconds: 10,
        };

        limiter.check_at("c", "login", rule, start);
        for s in 1..10 {
            limiter.check_at("c", "login", rule, start + Duration::from_secs(s));
        }

        // Had the denials counted, the client would still be locked out here.
        assert!(
            limiter
                .check_at("c", "login", rule, start + Duration::from_secs(10))
                .is_allowed()
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..5 {
            limiter.check_at("a", "login", LOGIN, now);
        }

        assert!(!limiter.check_at("a", "login", LOGIN, now).is_allowed());
        assert!(limiter.check_at("b", "login", LOGIN, now).is_allowed());
        assert!(limiter.check_at("a", "register", LOGIN, now).is_allowed());
    }

    #[test]
    fn test_state_transitions() {
        let limiter = RateLimiter::new();
        let rule = RateLimitRule {
            limit: 2,
            window_seconds: 60,
        };
        let start = Instant::now();

        assert_eq!(limiter.state_at("c", "login", rule, start), WindowState::Idle);

        limiter.check_at("c", "login", rule, start);
        assert_eq!(
            limiter.state_at("c", "login", rule, start),
            WindowState::Counting(1)
        );

        limiter.check_at("c", "login", rule, start);
        assert_eq!(
            limiter.state_at("c", "login", rule, start),
            WindowState::Exhausted
        );

        let later = start + Duration::from_secs(60);
        assert_eq!(limiter.state_at("c", "login", rule, later), WindowState::Idle);
    }

    #[test]
    fn test_purge_idle() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        limiter.check_at("old", "login", LOGIN, start);
        limiter.check_at("fresh", "login", LOGIN, start + Duration::from_secs(50));
        assert_eq!(limiter.tracked_keys(), 2);

        let removed = limiter.purge_idle(start + Duration::from_secs(70));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_concurrent_checks_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new());
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .filter(|_| limiter.check_at("c", "login", LOGIN, now).is_allowed())
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 5);
    }

    #[test]
    fn test_client_key_ignores_untrusted_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        let peer: IpAddr = "10.0.0.1".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer), &[]), "10.0.0.1");
        assert_eq!(client_key(&headers, Some(peer), &[peer]), "9.9.9.9");
        assert_eq!(client_key(&headers, None, &[peer]), "unknown");
    }

    #[test]
    fn test_client_key_uses_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();

        assert_eq!(client_key(&headers, Some(proxy), &[proxy]), "203.0.113.7");
    }
}
