// Dungeon Oracle — Per-user Admission Control
//
// Sliding window: each user keeps the timestamps of their admitted requests
// from the last `window_secs`. A request is admitted while fewer than
// `max_requests` remain after eviction. Rejections leave the bucket untouched.
// Purely in-memory: a restart readmits everyone.

use crate::atoms::constants::RATE_SWEEP_THRESHOLD;
use crate::atoms::types::UserId;
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

pub struct RateLimiter {
    /// user → admitted timestamps, oldest first
    buckets: Mutex<HashMap<UserId, VecDeque<i64>>>,
    window_secs: i64,
    max_requests: usize,
}

impl RateLimiter {
    pub fn new(window_secs: i64, max_requests: usize) -> Self {
        RateLimiter {
            buckets: Mutex::new(HashMap::new()),
            window_secs,
            max_requests,
        }
    }

    /// Returns true if the request is admitted, false if rate-limited.
    /// Eviction, check and append happen under one lock acquisition, so
    /// concurrent calls for the same user can never overshoot the limit.
    pub fn admit(&self, user_id: UserId, now: i64) -> bool {
        let cutoff = now - self.window_secs;
        let mut map = self.buckets.lock();

        if map.len() > RATE_SWEEP_THRESHOLD {
            map.retain(|_, bucket| bucket.back().is_some_and(|&ts| ts >= cutoff));
        }

        let bucket = map.entry(user_id).or_default();
        while bucket.front().is_some_and(|&ts| ts < cutoff) {
            bucket.pop_front();
        }

        if bucket.len() >= self.max_requests {
            debug!("[ratelimit] user {} rejected ({} in window)", user_id, bucket.len());
            return false;
        }
        bucket.push_back(now);
        true
    }

    /// Number of users currently holding a bucket.
    pub fn tracked_users(&self) -> usize {
        self.buckets.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn allows_within_limit() {
        let rl = RateLimiter::new(60, 3);
        assert!(rl.admit(UserId(1), 0));
        assert!(rl.admit(UserId(1), 1));
        assert!(rl.admit(UserId(1), 2));
        assert!(!rl.admit(UserId(1), 3)); // 4th request blocked
    }

    #[test]
    fn separate_users() {
        let rl = RateLimiter::new(60, 2);
        assert!(rl.admit(UserId(1), 0));
        assert!(rl.admit(UserId(1), 0));
        assert!(!rl.admit(UserId(1), 0));
        assert!(rl.admit(UserId(2), 0));
        assert!(rl.admit(UserId(2), 0));
        assert!(!rl.admit(UserId(2), 0));
    }

    #[test]
    fn readmits_once_oldest_ages_out() {
        let rl = RateLimiter::new(10, 2);
        assert!(rl.admit(UserId(1), 100));
        assert!(rl.admit(UserId(1), 105));
        assert!(!rl.admit(UserId(1), 110)); // 100 is exactly W old: still counted
        assert!(rl.admit(UserId(1), 111)); // 100 evicted
        assert!(!rl.admit(UserId(1), 112));
    }

    #[test]
    fn rejection_does_not_extend_window() {
        let rl = RateLimiter::new(10, 1);
        assert!(rl.admit(UserId(1), 0));
        for t in 1..=10 {
            assert!(!rl.admit(UserId(1), t));
        }
        assert!(rl.admit(UserId(1), 11));
    }

    #[test]
    fn never_more_than_max_in_any_window() {
        let (w, m) = (5, 3);
        let rl = RateLimiter::new(w, m);
        let mut admitted = Vec::new();
        for t in 0..60 {
            // bursts of four calls per second
            for _ in 0..4 {
                if rl.admit(UserId(9), t) {
                    admitted.push(t);
                }
            }
        }
        for &start in &admitted {
            let in_window = admitted.iter().filter(|&&t| t >= start && t <= start + w).count();
            assert!(in_window <= m, "window at {} holds {}", start, in_window);
        }
    }

    #[test]
    fn concurrent_same_user_never_exceeds_limit() {
        let rl = Arc::new(RateLimiter::new(60, 5));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let rl = rl.clone();
                std::thread::spawn(move || rl.admit(UserId(1), 1_000))
            })
            .collect();
        let admitted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(admitted, 5);
    }

    #[test]
    fn idle_buckets_are_swept() {
        let rl = RateLimiter::new(10, 1);
        for uid in 0..(RATE_SWEEP_THRESHOLD as i64 + 1) {
            assert!(rl.admit(UserId(uid), 0));
        }
        assert!(rl.admit(UserId(-1), 1_000));
        assert_eq!(rl.tracked_users(), 1);
    }
}
