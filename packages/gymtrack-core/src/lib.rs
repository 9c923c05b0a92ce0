//! GymTrack Core Library
//!
//! This crate provides the session core shared by GymTrack clients:
//! - Session management (sign-in, sign-out, startup restoration)
//! - Credential storage (keyring with file fallback)
//! - API client (authorization header, auth/profile/catalogue endpoints)
//!
//! # Features
//!
//! - `keyring-storage` (default): Use platform keyring for credential storage
//! - `file-storage`: Use file-based credential storage (for headless Linux)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gymtrack_core::{api::ApiClient, config, store, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = config::load_client_config();
//!     let api = ApiClient::from_config(&config)?;
//!     let session = Arc::new(SessionManager::new(store::open_store(&config)?, api));
//!
//!     // Pick up credentials persisted by a previous run
//!     session.restore().await;
//!
//!     if session.current_user().is_none() {
//!         session.sign_in("lucass.mark@gmail.com", "123456").await?;
//!     }
//!
//!     let groups = session.api().groups().await?;
//!     println!("{} muscle groups", groups.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod store;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, ExerciseSummary};
pub use auth::{
    ProfileUpdate, SessionError, SessionManager, SessionPhase, SessionState, SessionToken,
    UserProfile,
};
pub use config::{ClientConfig, ConfigSource, StorageBackend};
pub use store::{CredentialStore, StoreError, StoreKey};
