// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user sliding window rate limiting for ingestion.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use hookrelay_core::types::User;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Sliding window limiter keyed by user id.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Arc<DashMap<i64, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests as usize,
            window,
            hits: Arc::new(DashMap::new()),
        }
    }

    /// `max_requests` per second.
    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    /// Record a request from `user_id`. Returns false if it exceeds the limit;
    /// rejected requests do not count against the window.
    pub fn check(&self, user_id: i64) -> bool {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&self, user_id: i64, now: Instant) -> bool {
        let mut hits = self.hits.entry(user_id).or_default();
        while let Some(&oldest) = hits.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            hits.pop_front();
        }
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Drop users with no hits inside the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|&last| now.duration_since(last) < self.window)
        });
    }

    pub fn tracked_users(&self) -> usize {
        self.hits.len()
    }
}

/// Must run after [`require_session`](crate::auth::require_session).
pub async fn limit_per_user(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(user_id) = request.extensions().get::<User>().map(|u| u.id) else {
        return Err(ApiError::Unauthenticated);
    };
    if !state.rate_limiter.check(user_id) {
        tracing::warn!(user_id, "ingestion rate limit exceeded");
        hookrelay_prometheus::record_rejection("rate_limited");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_within_window() {
        let limiter = RateLimiter::per_second(5);
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.check_at(1, now));
        }
        assert!(!limiter.check_at(1, now));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::per_second(2);
        let start = Instant::now();
        assert!(limiter.check_at(1, start));
        assert!(limiter.check_at(1, start + Duration::from_millis(500)));
        assert!(!limiter.check_at(1, start + Duration::from_millis(900)));
        // First hit has aged out.
        assert!(limiter.check_at(1, start + Duration::from_millis(1000)));
        assert!(!limiter.check_at(1, start + Duration::from_millis(1100)));
    }

    #[test]
    fn users_are_limited_independently() {
        let limiter = RateLimiter::per_second(1);
        let now = Instant::now();
        assert!(limiter.check_at(1, now));
        assert!(!limiter.check_at(1, now));
        assert!(limiter.check_at(2, now));
    }

    #[test]
    fn cleanup_drops_idle_users() {
        let limiter = RateLimiter::new(3, Duration::from_millis(1));
        let past = Instant::now();
        assert!(limiter.check_at(7, past));
        std::thread::sleep(Duration::from_millis(5));
        limiter.cleanup();
        assert_eq!(limiter.tracked_users(), 0);
    }
}
