use crate::api::AppState;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

pub const API_KEY_HEADER: &str = "api_key";

/// Proof that the request carried the shared bearer secret and API key.
#[derive(Debug)]
pub struct ApiAuth;

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequestParts<AppState> for ApiAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts.headers.get(header::AUTHORIZATION).ok_or(AppError::AuthError)?;
        let auth_str = auth_header.to_str().map_err(|_| AppError::AuthError)?;
        let token = auth_str.strip_prefix("Bearer ").ok_or(AppError::AuthError)?;

        if !constant_time_eq(token.as_bytes(), state.config.auth.app_secret.as_bytes()) {
            return Err(AppError::AuthError);
        }

        let api_key = parts.headers.get(API_KEY_HEADER).ok_or(AppError::AuthError)?;
        if !constant_time_eq(api_key.as_bytes(), state.config.auth.api_key.as_bytes()) {
            return Err(AppError::AuthError);
        }

        Ok(Self)
    }
}
