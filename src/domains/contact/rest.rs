use axum::{
  extract::{rejection::JsonRejection, Json, State},
  middleware::from_fn_with_state,
  response::Json as JsonResponse,
  routing::{post, Router},
};
use tracing::error;

use super::model::{SendEmailRequest, SendEmailResponse, MISSING_FIELDS_MESSAGE, SENT_MESSAGE};
use crate::{
  middleware::rate_limit::rate_limit_middleware,
  state::{AppState, SharedAppState},
  AppError,
};

pub fn contact_routes(state: &SharedAppState) -> Router<SharedAppState> {
  Router::new()
    .route("/send-email", post(send_email_handler))
    .route_layer(from_fn_with_state(state.rate_limit.clone(), rate_limit_middleware))
}

pub async fn send_email_handler(
  State(state): State<SharedAppState>,
  payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<JsonResponse<SendEmailResponse>, AppError> {
  let payload = match payload {
    Ok(Json(payload)) => payload,
    Err(JsonRejection::MissingJsonContentType(_)) => SendEmailRequest::default(),
    Err(rejection) => return Err(rejection.into()),
  };

  let submission = payload
    .into_submission()
    .ok_or_else(|| AppError::bad_request(MISSING_FIELDS_MESSAGE))?;

  match state.send_contact_email(submission).await {
    Ok(result) => Ok(JsonResponse(SendEmailResponse {
      message: SENT_MESSAGE.to_string(),
      result,
    })),
    Err(e) => {
      error!("Failed to send email: {:?}", e);
      Err(AppError::internal_server_error("Failed to send email").with_details(e.to_string()))
    }
  }
}
