//! Session and identity for GymTrack clients.
//!
//! Provides the session manager plus the profile and token types it hands out.

mod error;
mod profile;
mod session;

pub use error::{PROFILE_UPDATE_FALLBACK, SIGN_IN_FALLBACK, SIGN_UP_FALLBACK, SessionError};
pub(crate) use profile::MIN_PASSWORD_LEN;
pub use profile::{ProfileUpdate, SessionToken, UserProfile};
pub use session::{SessionManager, SessionPhase, SessionState};
