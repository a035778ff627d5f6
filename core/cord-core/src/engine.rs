//! PresenceEngine - The entry point for editor hosts.
//!
//! The engine owns at most one presence session plus the context that
//! outlives it. Every method is synchronous and returns immediately; socket
//! work happens on the session's worker thread.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use cord_core::{DisplayTemplates, PresenceEngine};
//!
//! let engine = PresenceEngine::new();
//! if let Some(err) = engine.initialize("neovim".into(), None, DisplayTemplates::default()) {
//!     eprintln!("{err}");
//! }
//! engine.set_working_directory("cord.nvim".into());
//! engine.request_update("init.lua".into(), "lua".into(), false);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::composer::ActivityEvent;
use crate::config::PresenceConfig;
use crate::context::{DisplayTemplates, SessionContext};
use crate::error::CordFfiError;
use crate::profile::resolve_profile;
use crate::session::{PresenceSession, SessionConfig, SessionState};
use crate::transport::{Connector, IpcConnector};

/// The presence engine exposed to hosts.
///
/// Safe to share across threads; every field carries its own synchronization.
#[derive(uniffi::Object)]
pub struct PresenceEngine {
    config: PresenceConfig,
    connector: Arc<dyn Connector>,
    context: Arc<SessionContext>,
    session: Mutex<Option<PresenceSession>>,
}

impl PresenceEngine {
    /// Creates an engine that talks to the real presence socket using the
    /// given configuration.
    pub fn with_config(config: PresenceConfig) -> Self {
        let connector = Arc::new(IpcConnector::from_config(&config));
        Self::with_connector(config, connector)
    }

    /// Creates an engine over a custom connector.
    ///
    /// Used by tests with a scripted transport. Not exposed to FFI.
    pub fn with_connector(config: PresenceConfig, connector: Arc<dyn Connector>) -> Self {
        let context = Arc::new(SessionContext::new(config.asset_base_url.clone()));
        Self {
            config,
            connector,
            context,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    fn session(&self) -> MutexGuard<'_, Option<PresenceSession>> {
        // Recover from poisoning - the handle stays usable
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl PresenceEngine {
    /// Creates an engine configured from `CORD_*` environment variables.
    #[uniffi::constructor]
    pub fn new() -> Self {
        Self::with_config(PresenceConfig::from_env())
    }

    /// Resolves the profile and starts connecting in the background.
    ///
    /// Returns `None` on success or the error message for the host to show.
    /// An invalid profile leaves any existing session untouched.
    pub fn initialize(
        &self,
        profile: String,
        icon_override: Option<String>,
        templates: DisplayTemplates,
    ) -> Option<String> {
        let profile = match resolve_profile(&profile, icon_override.as_deref()) {
            Ok(profile) => profile,
            Err(err) => return Some(err.to_string()),
        };

        let mut session = self.session();
        if let Some(mut previous) = session.take() {
            debug!(
                client_id = previous.profile().client_id,
                "Replacing existing presence session"
            );
            previous.disconnect();
        }

        self.context.configure(templates, profile.icon_key.clone());

        let name = profile.name.clone();
        match PresenceSession::start(
            profile,
            Arc::clone(&self.context),
            Arc::clone(&self.connector),
            SessionConfig {
                connect_timeout: self.config.connect_timeout,
            },
        ) {
            Ok(started) => {
                info!(profile = %name, "Presence initialized");
                *session = Some(started);
                None
            }
            Err(err) => Some(err.to_string()),
        }
    }

    /// Returns the application id a profile would connect with.
    pub fn resolve_client_id(&self, profile: String) -> Result<u64, CordFfiError> {
        resolve_profile(&profile, None)
            .map(|profile| profile.client_id)
            .map_err(CordFfiError::from)
    }

    /// Queues an update for the given buffer. `false` unless the session is
    /// ready.
    pub fn request_update(&self, filename: String, filetype: String, read_only: bool) -> bool {
        match self.session().as_ref() {
            Some(session) => {
                session.request_update(ActivityEvent::new(filename, filetype, read_only))
            }
            None => false,
        }
    }

    /// Clears the displayed activity and resets the start time. The
    /// connection stays open.
    pub fn clear_activity(&self) {
        self.context.reset_activity_start();
        if let Some(session) = self.session().as_ref() {
            session.clear_activity();
        }
    }

    /// Tears down the session. Safe to call in any state.
    pub fn disconnect(&self) {
        self.context.reset_activity_start();
        if let Some(session) = self.session().as_mut() {
            session.disconnect();
        }
    }

    pub fn set_working_directory(&self, value: String) {
        self.context.set_working_directory(value);
    }

    pub fn set_repository_url(&self, value: String) {
        self.context.set_repository_url(value);
    }

    /// Records now as the start of the current activity.
    pub fn mark_activity_start(&self) {
        self.context.mark_activity_start();
    }

    pub fn state(&self) -> SessionState {
        self.session()
            .as_ref()
            .map(PresenceSession::state)
            .unwrap_or(SessionState::Disconnected)
    }
}

impl Default for PresenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PresenceEngine {
    fn drop(&mut self) {
        if let Some(mut session) = self.session().take() {
            session.disconnect();
        }
    }
}
