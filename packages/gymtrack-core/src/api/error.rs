use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the request with a reason meant for the user.
    #[error("{message}")]
    Application { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body the server sends with known failures
#[derive(Debug, Deserialize)]
struct AppErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.chars().count() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", head, body.len())
        }
    }

    /// Classify a non-success response.
    ///
    /// A JSON body carrying a non-empty `message` is an application error;
    /// anything else is reported as an unexpected status.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        if let Ok(AppErrorBody {
            message: Some(message),
        }) = serde_json::from_str::<AppErrorBody>(body)
            && !message.trim().is_empty()
        {
            return ApiError::Application {
                status: status.as_u16(),
                message,
            };
        }

        ApiError::UnexpectedStatus {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// Whether the server supplied a message meant for the user.
    pub fn is_application(&self) -> bool {
        matches!(self, ApiError::Application { .. })
    }

    /// Message to show the user: the server's own text when there is one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Application { message, .. } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_is_application_error() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"status":"error","message":"E-mail e/ou senha incorreta."}"#,
        );
        assert!(err.is_application());
        assert_eq!(err.user_message("fallback"), "E-mail e/ou senha incorreta.");
    }

    #[test]
    fn test_other_bodies_use_fallback() {
        let html = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(!html.is_application());
        assert_eq!(html.user_message("try later"), "try later");

        let blank = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"  "}"#);
        assert!(!blank.is_application());
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(MAX_ERROR_BODY_LENGTH + 10);
        match ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ApiError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("truncated"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
