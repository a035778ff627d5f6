//! Session context: templates and host-provided facts shared between the
//! foreground entry points and the background worker.
//!
//! Setters run on the host's thread while compositions run on the worker,
//! so all fields live behind one `RwLock`. The worker never holds the lock
//! while doing I/O; it clones a `ContextSnapshot` and composes from that.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// User-facing text templates. `$s` marks where the dynamic value goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct DisplayTemplates {
    pub small_text: String,
    pub idle_text: String,
    pub viewing_text: String,
    pub editing_text: String,
    pub file_browser_text: String,
    pub plugin_manager_text: String,
    pub workspace_text: String,
}

impl Default for DisplayTemplates {
    fn default() -> Self {
        Self {
            small_text: "The One True Text Editor".to_string(),
            idle_text: "Idle".to_string(),
            viewing_text: "Viewing $s".to_string(),
            editing_text: "Editing $s".to_string(),
            file_browser_text: "Browsing files in $s".to_string(),
            plugin_manager_text: "Managing plugins in $s".to_string(),
            workspace_text: "In $s".to_string(),
        }
    }
}

/// Point-in-time copy of the context, the composer's only input besides the
/// event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub working_directory: String,
    /// Epoch milliseconds.
    pub activity_start: Option<i64>,
    pub repository_url: Option<String>,
    pub client_icon_key: Option<String>,
    pub asset_base_url: String,
    pub templates: DisplayTemplates,
}

impl ContextSnapshot {
    pub fn new(asset_base_url: impl Into<String>) -> Self {
        Self {
            working_directory: String::new(),
            activity_start: None,
            repository_url: None,
            client_icon_key: None,
            asset_base_url: asset_base_url.into(),
            templates: DisplayTemplates::default(),
        }
    }
}

#[derive(Debug)]
pub struct SessionContext {
    inner: RwLock<ContextSnapshot>,
}

impl SessionContext {
    pub fn new(asset_base_url: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(ContextSnapshot::new(asset_base_url)),
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        // Recover from poisoning - every field is valid on its own
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Installs the templates and icon chosen at initialize.
    pub fn configure(&self, templates: DisplayTemplates, client_icon_key: Option<String>) {
        self.write(|ctx| {
            ctx.templates = templates;
            ctx.client_icon_key = client_icon_key;
        });
    }

    pub fn set_working_directory(&self, value: impl Into<String>) {
        let value = value.into();
        self.write(|ctx| ctx.working_directory = value);
    }

    pub fn set_repository_url(&self, value: impl Into<String>) {
        let value = value.into();
        self.write(|ctx| ctx.repository_url = Some(value));
    }

    pub fn mark_activity_start(&self) {
        self.mark_activity_start_at(Utc::now().timestamp_millis());
    }

    pub fn mark_activity_start_at(&self, epoch_millis: i64) {
        self.write(|ctx| ctx.activity_start = Some(epoch_millis));
    }

    pub fn reset_activity_start(&self) {
        self.write(|ctx| ctx.activity_start = None);
    }

    fn write<F>(&self, apply: F)
    where
        F: FnOnce(&mut ContextSnapshot),
    {
        let mut ctx = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_no_optional_facts() {
        let context = SessionContext::new("https://assets.test");
        let snapshot = context.snapshot();
        assert!(snapshot.activity_start.is_none());
        assert!(snapshot.repository_url.is_none());
        assert!(snapshot.client_icon_key.is_none());
        assert_eq!(snapshot.working_directory, "");
    }

    #[test]
    fn empty_repository_url_is_recorded_not_absent() {
        let context = SessionContext::new("https://assets.test");
        context.set_repository_url("");
        assert_eq!(context.snapshot().repository_url.as_deref(), Some(""));
    }

    #[test]
    fn reset_only_clears_start_time() {
        let context = SessionContext::new("https://assets.test");
        context.set_working_directory("/repo");
        context.set_repository_url("https://github.com/o/r");
        context.mark_activity_start_at(1_700_000_000_000);
        context.reset_activity_start();

        let snapshot = context.snapshot();
        assert!(snapshot.activity_start.is_none());
        assert_eq!(snapshot.working_directory, "/repo");
        assert_eq!(
            snapshot.repository_url.as_deref(),
            Some("https://github.com/o/r")
        );
    }

    #[test]
    fn mark_activity_start_records_current_time() {
        let context = SessionContext::new("https://assets.test");
        let before = Utc::now().timestamp_millis();
        context.mark_activity_start();
        let recorded = context.snapshot().activity_start.unwrap();
        assert!(recorded >= before);
    }

    #[test]
    fn templates_deserialize_with_partial_fields() {
        let templates: DisplayTemplates =
            serde_json::from_str(r#"{"editing_text": "Hacking on $s"}"#).unwrap();
        assert_eq!(templates.editing_text, "Hacking on $s");
        assert_eq!(templates.idle_text, "Idle");
    }
}
