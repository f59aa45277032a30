use std::sync::Arc;

use axum::{
  body::{Body, Bytes},
  http::{Request, StatusCode},
  Router,
};
use serde::Serialize;
use tower::ServiceExt;

use crate::{
  app::create_app,
  domains::contact::service::MockContactService,
  email::{Envelope, SendReceipt},
  middleware::rate_limit::{RateLimitPolicy, RateLimitState},
  state::SharedAppState,
};

pub fn app_with_service(service: MockContactService) -> Router {
  let rate_limit = RateLimitState::in_memory(&RateLimitPolicy::default(), false);
  create_app(SharedAppState::new(Arc::new(service), rate_limit))
}

pub fn sample_receipt() -> SendReceipt {
  SendReceipt {
    message_id: "<0f8c3a52@example.com>".to_string(),
    accepted: vec!["inbox@example.com".to_string()],
    rejected: vec![],
    envelope: Envelope {
      from: "owner@example.com".to_string(),
      to: vec!["inbox@example.com".to_string()],
    },
    response: "250 2.0.0 OK".to_string(),
  }
}

pub async fn post_json<T: Serialize>(app: Router, uri: &str, body: &T) -> (StatusCode, Bytes) {
  let body = serde_json::to_vec(body).expect("serialize request body");
  post_raw(app, uri, Some("application/json"), body).await
}

pub async fn post_raw(
  app: Router,
  uri: &str,
  content_type: Option<&str>,
  body: impl Into<Body>,
) -> (StatusCode, Bytes) {
  let mut request = Request::builder().method("POST").uri(uri);
  if let Some(content_type) = content_type {
    request = request.header("content-type", content_type);
  }
  let request = request.body(body.into()).expect("build request");

  let response = app.oneshot(request).await.expect("handle request");
  let status = response.status();
  let body = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .expect("read response body");
  (status, body)
}
