use crate::api::ApiError;
use crate::store::StoreError;
use thiserror::Error;

/// Fallback shown when a sign-in fails without a server message
pub const SIGN_IN_FALLBACK: &str = "Unable to sign in. Please try again later.";

/// Fallback shown when a profile update fails without a server message
pub const PROFILE_UPDATE_FALLBACK: &str = "Unable to update your profile.";

/// Fallback shown when registration fails without a server message
pub const SIGN_UP_FALLBACK: &str = "Unable to create your account. Please try again later.";

#[derive(Debug, Error)]
pub enum SessionError {
    /// Remote call failed (application or transport error).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A success response lacked a required field.
    #[error("Sign-in response is missing the {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Input rejected before reaching the server.
    #[error("{0}")]
    Validation(String),

    #[error("No active session")]
    NotAuthenticated,
}

impl SessionError {
    /// Message for the user: server or validation text verbatim, otherwise
    /// `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            SessionError::Api(e) => e.user_message(fallback),
            SessionError::Validation(message) => message.clone(),
            SessionError::NotAuthenticated => "Sign in first.".to_string(),
            SessionError::MissingField(_) | SessionError::Storage(_) => fallback.to_string(),
        }
    }
}
