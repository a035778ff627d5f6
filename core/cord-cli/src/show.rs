//! Live commands: `show` and `clear` drive a real session end to end.

use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use cord_core::{DisplayTemplates, PresenceConfig, PresenceEngine, SessionState};

const POLL: Duration = Duration::from_millis(50);
/// Time allowed for queued jobs to flush before the session is torn down.
const FLUSH_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Profile(String),

    #[error("Failed to read templates from {path}: {source}")]
    TemplatesRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid templates JSON in {path}: {source}")]
    TemplatesParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Presence service not reachable (state: {0:?})")]
    NotReady(SessionState),

    #[error("Update was not accepted by the session")]
    UpdateRejected,
}

pub struct ShowArgs {
    pub profile: String,
    pub icon: Option<String>,
    pub filename: String,
    pub filetype: String,
    pub read_only: bool,
    pub cwd: Option<String>,
    pub repository: Option<String>,
    pub templates: Option<PathBuf>,
    pub hold: Duration,
}

pub fn load_templates(path: Option<&Path>) -> Result<DisplayTemplates, CliError> {
    let Some(path) = path else {
        return Ok(DisplayTemplates::default());
    };
    let raw = fs_err::read_to_string(path).map_err(|source| CliError::TemplatesRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::TemplatesParse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn show(args: ShowArgs) -> Result<(), CliError> {
    let templates = load_templates(args.templates.as_deref())?;
    let engine = PresenceEngine::with_config(PresenceConfig::from_env());

    if let Some(cwd) = args.cwd {
        engine.set_working_directory(cwd);
    }
    if let Some(repository) = args.repository {
        engine.set_repository_url(repository);
    }
    engine.mark_activity_start();

    connect(&engine, args.profile, args.icon, templates)?;

    if !engine.request_update(args.filename.clone(), args.filetype.clone(), args.read_only) {
        engine.disconnect();
        return Err(CliError::UpdateRejected);
    }
    tracing::info!(
        filename = %args.filename,
        filetype = %args.filetype,
        hold_secs = args.hold.as_secs(),
        "Activity sent"
    );

    sleep(args.hold.max(FLUSH_GRACE));
    finish(&engine);
    Ok(())
}

pub fn clear(profile: String) -> Result<(), CliError> {
    let engine = PresenceEngine::with_config(PresenceConfig::from_env());
    connect(&engine, profile, None, DisplayTemplates::default())?;

    engine.clear_activity();
    sleep(FLUSH_GRACE);
    finish(&engine);
    tracing::info!("Activity cleared");
    Ok(())
}

fn connect(
    engine: &PresenceEngine,
    profile: String,
    icon: Option<String>,
    templates: DisplayTemplates,
) -> Result<(), CliError> {
    let client_id = engine
        .resolve_client_id(profile.clone())
        .map_err(|err| CliError::Profile(err.to_string()))?;
    if let Some(message) = engine.initialize(profile, icon, templates) {
        return Err(CliError::Profile(message));
    }
    tracing::info!(client_id, "Connecting to presence service");

    let deadline = Instant::now() + engine.config().connect_timeout + POLL;
    let state = wait_until_settled(engine, deadline);
    if state != SessionState::Ready {
        engine.disconnect();
        return Err(CliError::NotReady(state));
    }
    Ok(())
}

/// Polls until the session leaves its connecting states or `deadline`
/// passes.
fn wait_until_settled(engine: &PresenceEngine, deadline: Instant) -> SessionState {
    loop {
        let state = engine.state();
        let pending = matches!(
            state,
            SessionState::Connecting | SessionState::Handshaking
        );
        if !pending || Instant::now() >= deadline {
            return state;
        }
        sleep(POLL);
    }
}

fn finish(engine: &PresenceEngine) {
    engine.disconnect();
    let deadline = Instant::now() + Duration::from_secs(2);
    while engine.state() != SessionState::Disconnected && Instant::now() < deadline {
        sleep(POLL);
    }
}
