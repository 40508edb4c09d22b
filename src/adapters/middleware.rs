use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRef, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::{
    application::{error::ApplicationError, repositories::api_key_repository::ApiKeyRepository},
    domain::config::settings::Settings,
};

/// Middleware to validate the X-ADMIN-SECRET header
pub async fn validate_admin_secret(
    State(settings): State<Arc<Settings>>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Response {
    match headers.get("X-ADMIN-SECRET") {
        Some(header_value) => match header_value.to_str() {
            Ok(provided_secret) if provided_secret == settings.secrets.cleanup_secret => {
                next.run(request).await
            }
            Ok(_) => {
                warn!("Invalid secret provided in X-ADMIN-SECRET header");
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            Err(_) => {
                warn!("X-ADMIN-SECRET header contains invalid UTF-8");
                (StatusCode::BAD_REQUEST, "Bad request").into_response()
            }
        },
        None => {
            warn!("X-ADMIN-SECRET header is missing");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

/// Tenant the bearer API key resolves to. Rejects before the handler body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedTenant(pub Uuid);

impl<S> FromRequestParts<S> for AuthorizedTenant
where
    Arc<dyn ApiKeyRepository>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApplicationError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                warn!("Missing or malformed bearer API key");
                ApplicationError::Unauthorized
            })?;

        let api_keys = Arc::<dyn ApiKeyRepository>::from_ref(state);
        let tenant_id = api_keys.resolve_tenant(api_key).await?;
        Ok(AuthorizedTenant(tenant_id))
    }
}

/// `Json<T>` whose rejection is an [`ApplicationError`], so bad bodies keep the API error shape.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApplicationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state).await?;
        Ok(ValidatedJson(inner))
    }
}
