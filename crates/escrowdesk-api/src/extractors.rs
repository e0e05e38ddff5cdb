//! Custom Axum Extractors

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use escrowdesk_types::PartyId;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;

/// Header naming the account a request acts for
pub const CALLER_HEADER: &str = "x-caller-address";

// =============================================================================
// Caller Extractor
// =============================================================================

/// Account performing the request
///
/// Taken from `x-caller-address`, or the configured operator when the
/// header is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub PartyId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(CALLER_HEADER) else {
            return Ok(Self(state.operator));
        };
        let text = value
            .to_str()
            .map_err(|_| ApiError::InvalidCaller("header is not ASCII".to_string()))?;
        let party =
            PartyId::parse(text.trim()).map_err(|e| ApiError::InvalidCaller(e.to_string()))?;
        Ok(Self(party))
    }
}

// =============================================================================
// JSON Body Extractor
// =============================================================================

/// `Json<T>` whose rejections render as [`ApiError`]
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidRequestBody(rejection.body_text()))?;
        Ok(Self(value))
    }
}
