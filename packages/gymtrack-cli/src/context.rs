//! Session setup shared by every command.

use anyhow::{Context as _, Result};
use gymtrack_core::{ApiClient, ClientConfig, SessionManager, config, store};
use std::sync::Arc;

pub struct Context {
    pub config: ClientConfig,
    pub session: Arc<SessionManager>,
}

/// Load configuration, open the credential store and restore the session.
pub async fn open() -> Result<Context> {
    let config = config::load_client_config();
    let store = store::open_store(&config).context("Failed to open credential storage")?;
    let api = ApiClient::from_config(&config).context("Failed to create API client")?;
    let session = Arc::new(SessionManager::new(store, api));

    watch_transitions(&session);
    session.restore().await;

    Ok(Context { config, session })
}

/// Log every session transition until the manager goes away.
fn watch_transitions(session: &Arc<SessionManager>) {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            match &state.user {
                Some(user) => tracing::debug!("Session {:?}: {}", state.phase(), user.email),
                None => tracing::debug!("Session {:?}", state.phase()),
            }
        }
    });
}
