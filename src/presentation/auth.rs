// Operator session extracted from the auth collaborator's headers
use crate::errors::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const USER_TOKEN_HEADER: &str = "user-token";
pub const OPERATOR_DATA_HEADER: &str = "operator_data";

/// Present only when a `user-token` header is set. The token is not verified here.
#[derive(Debug, Clone)]
pub struct OperatorSession {
    pub operator: Option<String>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for OperatorSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if header(USER_TOKEN_HEADER).is_none() {
            tracing::info!("Rejecting {} without user token", parts.uri.path());
            return Err(ApiError::Unauthorized);
        }

        Ok(Self {
            operator: header(OPERATOR_DATA_HEADER),
        })
    }
}
