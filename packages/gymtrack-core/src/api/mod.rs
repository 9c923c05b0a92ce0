//! REST API client for the GymTrack service.
//!
//! `ApiClient` owns the default header map shared by every request. The
//! bearer token is written there by the session manager after sign-in or
//! restoration, so endpoint calls need no per-call auth wiring.

mod client;
mod error;

pub use client::{ApiClient, ExerciseSummary, SignInResponse, SignUpRequest};
pub use error::ApiError;
