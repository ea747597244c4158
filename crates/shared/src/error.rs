use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    Internal,
}

/// Typed error produced at the REST collaborator boundary. Downstream code
/// matches on [`ErrorKind`] instead of probing a loosely-typed error body.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Structured error body the server attaches to failed requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "errorKey")]
    pub error_key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Decode the HTTP status plus the optional structured body into a
    /// tagged error. Duplicate-name style `errorKey`s on 400 responses are
    /// classified as conflicts so callers can recover them as field-level
    /// validation errors.
    pub fn from_status_body(status: u16, body: Option<ErrorBody>) -> Self {
        let body = body.unwrap_or_default();
        let message = body
            .message
            .or(body.title)
            .unwrap_or_else(|| format!("request failed with status {status}"));

        let kind = match status {
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            400 => match body.error_key.as_deref() {
                Some(key) if is_conflict_key(key) => ErrorKind::Conflict,
                _ => ErrorKind::Validation,
            },
            _ => ErrorKind::Internal,
        };

        Self::new(kind, message)
    }

    /// Validation conflicts (e.g. a short name already taken) are recovered
    /// locally as field-level errors, never raised as global alerts.
    pub fn is_validation_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}

fn is_conflict_key(error_key: &str) -> bool {
    let key = error_key.to_ascii_lowercase();
    key.contains("duplicate") || key.contains("taken") || key.contains("exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_to_kinds() {
        assert_eq!(
            ApiError::from_status_body(403, None).kind,
            ErrorKind::Forbidden
        );
        assert_eq!(
            ApiError::from_status_body(404, None).kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            ApiError::from_status_body(429, None).kind,
            ErrorKind::RateLimited
        );
        assert_eq!(
            ApiError::from_status_body(500, None).kind,
            ErrorKind::Internal
        );
    }

    #[test]
    fn duplicate_error_key_is_a_conflict() {
        let body = ErrorBody {
            error_key: Some("channelNameDuplicate".into()),
            title: None,
            message: Some("name already in use".into()),
        };
        let err = ApiError::from_status_body(400, Some(body));
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.is_validation_conflict());
        assert_eq!(err.message, "name already in use");
    }

    #[test]
    fn plain_bad_request_stays_validation() {
        let err = ApiError::from_status_body(400, Some(ErrorBody::default()));
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("400"));
    }
}
