//! JSON envelope shared by every API route.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use super::metrics::record_provider_error;
use crate::social::SocialError;
use crate::spotify::SpotifyAccessError;
use crate::user::UserError;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const PROVIDER_ERROR_MESSAGE: &str =
    "Spotify request failed. Try again or reconnect your Spotify account";

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    with_status(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> Response {
    with_status(StatusCode::CREATED, data)
}

pub fn with_status<T: Serialize>(status: StatusCode, data: T) -> Response {
    let envelope = Envelope {
        success: true,
        data: Some(data),
        message: None,
    };
    (status, Json(envelope)).into_response()
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult = Result<Response, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        error!("Internal error: {:#}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }

    /// A failed call to Spotify. The details only go to the log.
    pub fn provider(operation: &str, err: anyhow::Error) -> Self {
        error!("Spotify {} failed: {:#}", operation, err);
        record_provider_error(operation);
        Self::new(StatusCode::BAD_GATEWAY, PROVIDER_ERROR_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope: Envelope<()> = Envelope {
            success: false,
            data: None,
            message: Some(self.message),
        };
        (self.status, Json(envelope)).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        let status = match &err {
            UserError::InvalidHandle
            | UserError::InvalidEmail
            | UserError::PasswordTooShort
            | UserError::PasswordMismatch
            | UserError::InvalidTopPickPosition => StatusCode::BAD_REQUEST,
            UserError::HandleTaken(_) | UserError::EmailTaken | UserError::ProviderAccountTaken => {
                StatusCode::CONFLICT
            }
            UserError::InvalidCredentials => StatusCode::FORBIDDEN,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match err {
            UserError::Store(err) => ApiError::internal(err),
            other => ApiError::new(status, other.to_string()),
        }
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        let status = match &err {
            SocialError::InvalidInput(_) | SocialError::SelfFollow => StatusCode::BAD_REQUEST,
            SocialError::DuplicatePost => StatusCode::CONFLICT,
            SocialError::PostNotFound | SocialError::CommentNotFound | SocialError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            SocialError::NotAllowed => StatusCode::FORBIDDEN,
            SocialError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match err {
            SocialError::Store(err) => ApiError::internal(err),
            other => ApiError::new(status, other.to_string()),
        }
    }
}

impl From<SpotifyAccessError> for ApiError {
    fn from(err: SpotifyAccessError) -> Self {
        let message = err.to_string();
        match err {
            SpotifyAccessError::NotConnected => ApiError::bad_request(message),
            SpotifyAccessError::ReconnectRequired => ApiError::forbidden(message),
            SpotifyAccessError::User(err) => err.into(),
            SpotifyAccessError::Provider(err) => ApiError::provider("authorization", err),
        }
    }
}
