use crate::api::AppState;
use crate::api::extract::ApiJson;
use crate::api::middleware::ApiAuth;
use crate::api::schemas::mail::{CreateUserRequest, SendMailRequest, SubmitResponse};
use crate::error::Result;
use axum::{Json, extract::State};

/// Unauthenticated root route.
pub async fn root() -> &'static str {
    "OK"
}

/// Queues caller-authored mail.
///
/// # Errors
/// Returns `AppError::BadRequest` for a malformed body or invalid input.
/// Returns `AppError::Store` if the message could not be queued.
pub async fn send_mail(
    _auth: ApiAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendMailRequest>,
) -> Result<Json<SubmitResponse>> {
    let token = state
        .submission_service
        .send_mail(
            &request.from,
            &request.to,
            request.name.as_deref(),
            &request.subject,
            &request.text,
            request.key,
        )
        .await?;

    Ok(Json(SubmitResponse { verify: token, message: None }))
}

/// Queues the verification mail for a new account.
///
/// # Errors
/// Returns `AppError::BadRequest` for a malformed body or invalid input.
/// Returns `AppError::Store` if the message could not be queued.
pub async fn create_user(
    _auth: ApiAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<Json<SubmitResponse>> {
    let token = state.submission_service.create_user(&request.to, &request.name).await?;

    Ok(Json(SubmitResponse { verify: token, message: None }))
}

/// Queues a test mail to the support address.
///
/// # Errors
/// Returns `AppError::Store` if the message could not be queued.
pub async fn test_mail(_auth: ApiAuth, State(state): State<AppState>) -> Result<Json<SubmitResponse>> {
    let token = state.submission_service.test_mail().await?;

    Ok(Json(SubmitResponse { verify: token, message: Some("Sending mail".to_string()) }))
}
