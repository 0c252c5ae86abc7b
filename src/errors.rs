//! Typed errors for the data-channel bridge and the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("robot {serial} already has an active data channel")]
    AlreadyConnected { serial: String },

    #[error("data channel for robot {serial} is closed")]
    ChannelClosed { serial: String },

    #[error("outbound buffer for robot {serial} is full")]
    ChannelFull { serial: String },

    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "redirect": "/login" }),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            ApiError::Bridge(BridgeError::AlreadyConnected { .. }) => {
                (StatusCode::CONFLICT, json!({ "error": self.to_string() }))
            }
            ApiError::Bridge(_) => (StatusCode::BAD_GATEWAY, json!({ "error": self.to_string() })),
            ApiError::Other(e) => {
                tracing::error!("Request failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
