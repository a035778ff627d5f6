//! # cord-core
//!
//! Presence bridge for text editors: turns editor activity into rich
//! presence updates for the locally running Discord client.
//!
//! ## Layers
//!
//! - **mappings**: static file type → (icon, label) tables
//! - **composer**: pure (context, event) → activity composition
//! - **session**: connection state machine plus its background worker
//! - **transport**: frame protocol over the local IPC socket
//! - **engine**: the host-facing facade (UniFFI), also wrapped by the C ABI in `ffi`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cord_core::{DisplayTemplates, PresenceEngine};
//!
//! let engine = PresenceEngine::new();
//! engine.initialize("neovim".into(), None, DisplayTemplates::default());
//! engine.request_update("main.rs".into(), "rust".into(), false);
//! ```

// UniFFI scaffolding for Swift/Kotlin/Python bindings
uniffi::setup_scaffolding!();

pub mod composer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod mappings;
pub mod profile;
pub mod session;
pub mod transport;

pub use composer::{compose, ActivityEvent, Composition, Suppression};
pub use config::PresenceConfig;
pub use context::{ContextSnapshot, DisplayTemplates, SessionContext};
pub use engine::PresenceEngine;
pub use error::{CordError, CordFfiError, Result, TransportError};
pub use logging::init_file_logging;
pub use mappings::{Classification, MappingDomain};
pub use profile::{resolve_profile, ClientProfile, KNOWN_PROFILES};
pub use session::SessionState;

pub use cord_ipc_protocol::Activity;
