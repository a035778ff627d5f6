//! Payload composition: (context snapshot, editor event) → activity.
//!
//! Pure: no I/O, no clock, no shared state. Identical inputs always yield
//! identical output, which is what lets the worker compose off a snapshot.
//!
//! ## Decision order on the event's file type
//!
//! ```text
//! cord.idle        → idle text              (suppressed when blank)
//! file browser     → file browser text      (suppressed when blank or unmapped)
//! plugin manager   → plugin manager text    (suppressed when blank or unmapped)
//! no name, no type → viewing/editing "a new file"
//! no name, typed   → suppressed
//! otherwise        → viewing/editing filename, language icon
//! ```

use cord_ipc_protocol::{
    Activity, ActivityAssets, ActivityButton, ActivityTimestamps,
};

use crate::context::ContextSnapshot;
use crate::mappings::{self, MappingDomain, FALLBACK_LANGUAGE_ICON, IDLE_FILETYPE};

pub const PLACEHOLDER: &str = "$s";
pub const NEW_FILE_PHRASE: &str = "a new file";
pub const NEW_BUFFER_LABEL: &str = "New buffer";
pub const IDLE_LABEL: &str = "💤";
pub const REPOSITORY_BUTTON_LABEL: &str = "View Repository";

/// What the host reported about its current buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub filename: String,
    pub filetype: String,
    pub read_only: bool,
}

impl ActivityEvent {
    pub fn new(filename: impl Into<String>, filetype: impl Into<String>, read_only: bool) -> Self {
        Self {
            filename: filename.into(),
            filetype: filetype.into(),
            read_only,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    IdleTextBlank,
    FileBrowserTextBlank,
    UnknownFileBrowser,
    PluginManagerTextBlank,
    UnknownPluginManager,
    UnnamedTypedBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Activity(Activity),
    Suppressed(Suppression),
}

/// Replaces the first `$s` in `template`. Templates without the marker are
/// returned unchanged.
pub fn substitute(template: &str, value: &str) -> String {
    template.replacen(PLACEHOLDER, value, 1)
}

pub fn compose(context: &ContextSnapshot, event: &ActivityEvent) -> Composition {
    let primary = match primary_fields(context, event) {
        Ok(primary) => primary,
        Err(reason) => return Composition::Suppressed(reason),
    };

    let templates = &context.templates;
    let state = (!is_blank(&context.working_directory) && !is_blank(&templates.workspace_text))
        .then(|| substitute(&templates.workspace_text, &context.working_directory));

    let small_image = context
        .client_icon_key
        .as_deref()
        .map(|icon| editor_icon_url(&context.asset_base_url, icon));
    let small_text = small_image
        .as_ref()
        .and_then(|_| (!is_blank(&templates.small_text)).then(|| templates.small_text.clone()));

    let buttons = context
        .repository_url
        .as_deref()
        .filter(|url| !is_blank(url))
        .map(|url| {
            vec![ActivityButton {
                label: REPOSITORY_BUTTON_LABEL.to_string(),
                url: url.to_string(),
            }]
        });

    Composition::Activity(Activity {
        details: primary.details,
        state,
        assets: ActivityAssets {
            large_image: primary.large_image,
            large_text: primary.large_text,
            small_image,
            small_text,
        },
        timestamps: context
            .activity_start
            .map(|start| ActivityTimestamps { start }),
        buttons,
    })
}

struct PrimaryFields {
    details: String,
    large_image: String,
    large_text: String,
}

fn primary_fields(
    context: &ContextSnapshot,
    event: &ActivityEvent,
) -> Result<PrimaryFields, Suppression> {
    let templates = &context.templates;
    let base = context.asset_base_url.as_str();
    let filetype = event.filetype.as_str();

    if filetype == IDLE_FILETYPE {
        if is_blank(&templates.idle_text) {
            return Err(Suppression::IdleTextBlank);
        }
        return Ok(PrimaryFields {
            details: templates.idle_text.clone(),
            large_image: format!("{}/editor/idle.png", base),
            large_text: IDLE_LABEL.to_string(),
        });
    }

    if mappings::is_file_browser(filetype) {
        return tool_fields(
            base,
            MappingDomain::FileBrowser,
            filetype,
            &templates.file_browser_text,
            Suppression::FileBrowserTextBlank,
            Suppression::UnknownFileBrowser,
        );
    }

    if mappings::is_plugin_manager(filetype) {
        return tool_fields(
            base,
            MappingDomain::PluginManager,
            filetype,
            &templates.plugin_manager_text,
            Suppression::PluginManagerTextBlank,
            Suppression::UnknownPluginManager,
        );
    }

    let template = if event.read_only {
        &templates.viewing_text
    } else {
        &templates.editing_text
    };

    if is_blank(&event.filename) {
        if !is_blank(filetype) {
            return Err(Suppression::UnnamedTypedBuffer);
        }
        return Ok(PrimaryFields {
            details: substitute(template, NEW_FILE_PHRASE),
            large_image: asset_url(base, MappingDomain::Language, FALLBACK_LANGUAGE_ICON),
            large_text: NEW_BUFFER_LABEL.to_string(),
        });
    }

    let language = mappings::language(filetype);
    Ok(PrimaryFields {
        details: substitute(template, &event.filename),
        large_image: asset_url(base, MappingDomain::Language, language.icon_key),
        large_text: language.label.to_string(),
    })
}

fn tool_fields(
    base: &str,
    domain: MappingDomain,
    filetype: &str,
    template: &str,
    blank_template: Suppression,
    unmapped: Suppression,
) -> Result<PrimaryFields, Suppression> {
    if is_blank(template) {
        return Err(blank_template);
    }
    let tool = mappings::lookup(domain, filetype).ok_or(unmapped)?;
    Ok(PrimaryFields {
        details: substitute(template, tool.label),
        large_image: asset_url(base, domain, tool.icon_key),
        large_text: tool.label.to_string(),
    })
}

fn asset_url(base: &str, domain: MappingDomain, icon_key: &str) -> String {
    format!("{}/{}/{}.png", base, domain.asset_dir(), icon_key)
}

/// Custom icons may already be full URLs; bundled ones are editor asset keys.
fn editor_icon_url(base: &str, icon: &str) -> String {
    if icon.starts_with("https://") || icon.starts_with("http://") {
        icon.to_string()
    } else {
        format!("{}/editor/{}.png", base, icon)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DisplayTemplates;

    const BASE: &str = "https://assets.test";

    fn context() -> ContextSnapshot {
        let mut ctx = ContextSnapshot::new(BASE);
        ctx.templates = DisplayTemplates::default();
        ctx.client_icon_key = Some("neovim".to_string());
        ctx
    }

    fn activity(composition: Composition) -> Activity {
        match composition {
            Composition::Activity(activity) => activity,
            Composition::Suppressed(reason) => panic!("unexpected suppression: {:?}", reason),
        }
    }

    #[test]
    fn substitute_replaces_only_first_marker() {
        assert_eq!(substitute("fixing $s and $s", "bug"), "fixing bug and $s");
        assert_eq!(substitute("no marker", "bug"), "no marker");
    }

    #[test]
    fn compose_is_deterministic() {
        let mut ctx = context();
        ctx.working_directory = "/repo".to_string();
        ctx.activity_start = Some(1_700_000_000_000);
        ctx.repository_url = Some("https://github.com/o/r".to_string());
        let event = ActivityEvent::new("main.rs", "rust", false);

        assert_eq!(compose(&ctx, &event), compose(&ctx, &event));
    }

    #[test]
    fn known_language_uses_its_icon() {
        let activity = activity(compose(&context(), &ActivityEvent::new("main.rs", "rust", false)));
        assert_eq!(activity.details, "Editing main.rs");
        assert_eq!(activity.assets.large_image, format!("{}/language/rust.png", BASE));
        assert_eq!(activity.assets.large_text, "Rust");
    }

    #[test]
    fn unknown_language_falls_back_to_text_icon() {
        let activity = activity(compose(&context(), &ActivityEvent::new("x.foo", "foobar", false)));
        assert_eq!(activity.assets.large_text, "foobar");
        assert!(activity.assets.large_image.ends_with("text.png"));
    }

    #[test]
    fn read_only_uses_viewing_template() {
        let activity = activity(compose(&context(), &ActivityEvent::new("notes.md", "markdown", true)));
        assert_eq!(activity.details, "Viewing notes.md");
    }

    #[test]
    fn unnamed_untyped_buffer_is_a_new_file() {
        let activity = activity(compose(&context(), &ActivityEvent::new("", "", false)));
        assert_eq!(activity.details, "Editing a new file");
        assert_eq!(activity.assets.large_text, NEW_BUFFER_LABEL);
        assert!(activity.assets.large_image.ends_with("/language/text.png"));
    }

    #[test]
    fn unnamed_typed_buffer_is_suppressed() {
        assert_eq!(
            compose(&context(), &ActivityEvent::new("", "help", false)),
            Composition::Suppressed(Suppression::UnnamedTypedBuffer)
        );
    }

    #[test]
    fn idle_marker_uses_idle_text() {
        let activity = activity(compose(&context(), &ActivityEvent::new("main.rs", IDLE_FILETYPE, false)));
        assert_eq!(activity.details, "Idle");
        assert_eq!(activity.assets.large_image, format!("{}/editor/idle.png", BASE));
        assert_eq!(activity.assets.large_text, IDLE_LABEL);
    }

    #[test]
    fn idle_marker_with_blank_text_is_suppressed() {
        let mut ctx = context();
        ctx.templates.idle_text = String::new();
        assert_eq!(
            compose(&ctx, &ActivityEvent::new("", IDLE_FILETYPE, false)),
            Composition::Suppressed(Suppression::IdleTextBlank)
        );
    }

    #[test]
    fn file_browser_substitutes_label() {
        let activity = activity(compose(&context(), &ActivityEvent::new("", "TelescopePrompt", false)));
        assert_eq!(activity.details, "Browsing files in Telescope");
        assert_eq!(
            activity.assets.large_image,
            format!("{}/file_browser/telescope.png", BASE)
        );
        assert_eq!(activity.assets.large_text, "Telescope");
    }

    #[test]
    fn file_browser_with_blank_text_is_suppressed() {
        let mut ctx = context();
        ctx.templates.file_browser_text = String::new();
        assert_eq!(
            compose(&ctx, &ActivityEvent::new("", "netrw", false)),
            Composition::Suppressed(Suppression::FileBrowserTextBlank)
        );
    }

    #[test]
    fn plugin_manager_substitutes_label() {
        let activity = activity(compose(&context(), &ActivityEvent::new("", "lazy", false)));
        assert_eq!(activity.details, "Managing plugins in Lazy");
        assert_eq!(
            activity.assets.large_image,
            format!("{}/plugin_manager/lazy.png", BASE)
        );
    }

    #[test]
    fn plugin_manager_with_blank_text_is_suppressed() {
        let mut ctx = context();
        ctx.templates.plugin_manager_text = "  ".to_string();
        assert_eq!(
            compose(&ctx, &ActivityEvent::new("", "packer", false)),
            Composition::Suppressed(Suppression::PluginManagerTextBlank)
        );
    }

    #[test]
    fn workspace_state_requires_directory_and_template() {
        let mut ctx = context();
        ctx.templates.workspace_text = "in $s".to_string();
        ctx.working_directory = "/repo".to_string();
        let event = ActivityEvent::new("main.rs", "rust", false);
        assert_eq!(activity(compose(&ctx, &event)).state.as_deref(), Some("in /repo"));

        ctx.working_directory = String::new();
        assert!(activity(compose(&ctx, &event)).state.is_none());

        ctx.working_directory = "/repo".to_string();
        ctx.templates.workspace_text = String::new();
        assert!(activity(compose(&ctx, &event)).state.is_none());
    }

    #[test]
    fn timestamp_present_only_when_recorded() {
        let mut ctx = context();
        let event = ActivityEvent::new("main.rs", "rust", false);
        assert!(activity(compose(&ctx, &event)).timestamps.is_none());

        ctx.activity_start = Some(42);
        assert_eq!(
            activity(compose(&ctx, &event)).timestamps,
            Some(ActivityTimestamps { start: 42 })
        );
    }

    #[test]
    fn repository_button_requires_non_blank_url() {
        let mut ctx = context();
        let event = ActivityEvent::new("main.rs", "rust", false);

        ctx.repository_url = Some(" ".to_string());
        assert!(activity(compose(&ctx, &event)).buttons.is_none());

        ctx.repository_url = Some("https://github.com/o/r".to_string());
        let buttons = activity(compose(&ctx, &event)).buttons.unwrap();
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, REPOSITORY_BUTTON_LABEL);
        assert_eq!(buttons[0].url, "https://github.com/o/r");
    }

    #[test]
    fn small_image_follows_client_icon() {
        let mut ctx = context();
        let event = ActivityEvent::new("main.rs", "rust", false);
        let with_icon = activity(compose(&ctx, &event));
        assert_eq!(
            with_icon.assets.small_image.as_deref(),
            Some("https://assets.test/editor/neovim.png")
        );
        assert_eq!(
            with_icon.assets.small_text.as_deref(),
            Some("The One True Text Editor")
        );

        ctx.client_icon_key = Some("https://cdn.test/helix.png".to_string());
        assert_eq!(
            activity(compose(&ctx, &event)).assets.small_image.as_deref(),
            Some("https://cdn.test/helix.png")
        );

        ctx.client_icon_key = None;
        let without_icon = activity(compose(&ctx, &event));
        assert!(without_icon.assets.small_image.is_none());
        assert!(without_icon.assets.small_text.is_none());
    }
}
