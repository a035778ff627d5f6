//! Read-only table queries: `profiles` and `lookup`.

use cord_core::mappings::{self, Classification, MappingDomain};
use cord_core::KNOWN_PROFILES;
use serde_json::{json, Value};

pub fn profiles() -> Value {
    Value::Array(
        KNOWN_PROFILES
            .iter()
            .map(|(name, client_id)| json!({"name": name, "client_id": client_id.to_string()}))
            .collect(),
    )
}

/// Classifies a file type against every table the composer consults.
pub fn classify(filetype: &str) -> Value {
    let language = mappings::language(filetype);
    let language_hit = mappings::lookup(MappingDomain::Language, filetype).is_some();

    json!({
        "filetype": filetype,
        "idle": filetype == mappings::IDLE_FILETYPE,
        "language": describe(MappingDomain::Language, Some(language), !language_hit),
        "file_browser": describe(
            MappingDomain::FileBrowser,
            mappings::lookup(MappingDomain::FileBrowser, filetype),
            false,
        ),
        "plugin_manager": describe(
            MappingDomain::PluginManager,
            mappings::lookup(MappingDomain::PluginManager, filetype),
            false,
        ),
    })
}

fn describe(domain: MappingDomain, hit: Option<Classification<'_>>, fallback: bool) -> Value {
    match hit {
        Some(class) => json!({
            "icon": format!("{}/{}", domain.asset_dir(), class.icon_key),
            "label": class.label,
            "fallback": fallback,
        }),
        None => Value::Null,
    }
}
