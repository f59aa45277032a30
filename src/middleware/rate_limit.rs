//! Per-client rate limiting for the send route.
//!
//! Sliding window counter keyed by client address. The limiter is a trait
//! object so a shared backend can replace the in-memory one.

use std::{
  collections::{HashMap, VecDeque},
  net::SocketAddr,
  sync::{Arc, Mutex},
  time::Duration,
};

use axum::{
  body::Body,
  extract::{ConnectInfo, State},
  http::{
    header::{HeaderName, RETRY_AFTER},
    HeaderMap, HeaderValue, Request, StatusCode,
  },
  middleware::Next,
  response::{IntoResponse, Response},
};
use tokio::time::Instant;
use tracing::warn;

pub const DEFAULT_REJECTION_MESSAGE: &str = "You have exceeded the 5 requests per day limit.";

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Maximum number of admitted requests per client within `window`.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
  pub max_requests: u64,
  pub window: Duration,
  pub message: String,
}

impl Default for RateLimitPolicy {
  fn default() -> Self {
    Self {
      max_requests: 5,
      window: Duration::from_secs(24 * 60 * 60),
      message: DEFAULT_REJECTION_MESSAGE.to_string(),
    }
  }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
  pub allowed: bool,
  pub limit: u64,
  pub remaining: u64,
  /// Time until the oldest counted request leaves the window.
  pub reset_after: Duration,
}

pub trait RateLimiter: Send + Sync {
  /// Check `client_key` and count the request if it is allowed.
  fn admit(&self, client_key: &str) -> Admission;
}

pub struct InMemoryRateLimiter {
  max_requests: u64,
  window: Duration,
  buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl InMemoryRateLimiter {
  pub fn new(max_requests: u64, window: Duration) -> Self {
    Self {
      max_requests,
      window,
      buckets: Mutex::new(HashMap::new()),
    }
  }

  pub fn from_policy(policy: &RateLimitPolicy) -> Self {
    Self::new(policy.max_requests, policy.window)
  }

  fn admit_at(&self, client_key: &str, now: Instant) -> Admission {
    let window = self.window;
    let in_window = |ts: &Instant| now.saturating_duration_since(*ts) < window;

    let mut buckets = self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let timestamps = buckets.entry(client_key.to_string()).or_default();

    while timestamps.front().is_some_and(|ts| !in_window(ts)) {
      timestamps.pop_front();
    }

    let allowed = (timestamps.len() as u64) < self.max_requests;
    if allowed {
      timestamps.push_back(now);
    }

    let reset_after = timestamps
      .front()
      .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
      .unwrap_or(window);

    let admission = Admission {
      allowed,
      limit: self.max_requests,
      remaining: self.max_requests.saturating_sub(timestamps.len() as u64),
      reset_after,
    };

    if buckets.len() > 10_000 {
      buckets.retain(|_, v| {
        v.retain(|ts| in_window(ts));
        !v.is_empty()
      });
    }

    admission
  }
}

impl RateLimiter for InMemoryRateLimiter {
  fn admit(&self, client_key: &str) -> Admission {
    self.admit_at(client_key, Instant::now())
  }
}

#[derive(Clone)]
pub struct RateLimitState {
  limiter: Arc<dyn RateLimiter>,
  rejection_message: Arc<str>,
  trust_proxy: bool,
}

impl RateLimitState {
  pub fn new(limiter: Arc<dyn RateLimiter>, rejection_message: impl Into<Arc<str>>, trust_proxy: bool) -> Self {
    Self {
      limiter,
      rejection_message: rejection_message.into(),
      trust_proxy,
    }
  }

  pub fn in_memory(policy: &RateLimitPolicy, trust_proxy: bool) -> Self {
    Self::new(
      Arc::new(InMemoryRateLimiter::from_policy(policy)),
      policy.message.as_str(),
      trust_proxy,
    )
  }
}

/// Client address used as the limiter key. Proxy headers are only honoured
/// when the service is configured to trust them.
pub fn client_key(request: &Request<Body>, trust_proxy: bool) -> String {
  let forwarded = trust_proxy
    .then(|| {
      request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
          request
            .headers()
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
        })
    })
    .flatten();

  forwarded
    .or_else(|| {
      request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
    .unwrap_or_else(|| "unknown".to_string())
}

fn ceil_secs(duration: Duration) -> u64 {
  duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, admission: &Admission) {
  headers.insert(RATELIMIT_LIMIT, HeaderValue::from(admission.limit));
  headers.insert(RATELIMIT_REMAINING, HeaderValue::from(admission.remaining));
  headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(admission.reset_after)));
}

/// Rejects requests over the limit with 429 and a plain-text message.
pub async fn rate_limit_middleware(
  State(rate_limit): State<RateLimitState>,
  request: Request<Body>,
  next: Next,
) -> Response {
  let key = client_key(&request, rate_limit.trust_proxy);
  let admission = rate_limit.limiter.admit(&key);

  if !admission.allowed {
    warn!(client = %key, "Rate limit exceeded");

    let mut response = (StatusCode::TOO_MANY_REQUESTS, rate_limit.rejection_message.to_string()).into_response();
    insert_rate_limit_headers(response.headers_mut(), &admission);
    response
      .headers_mut()
      .insert(RETRY_AFTER, HeaderValue::from(ceil_secs(admission.reset_after)));
    return response;
  }

  let mut response = next.run(request).await;
  insert_rate_limit_headers(response.headers_mut(), &admission);
  response
}
