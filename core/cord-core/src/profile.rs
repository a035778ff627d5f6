//! Client profiles: which presence application the bridge identifies as.

use crate::error::{CordError, Result};

/// Named profiles shipped with the bridge and their application ids.
pub const KNOWN_PROFILES: [(&str, u64); 4] = [
    ("vim", 1219918645770059796),
    ("neovim", 1219918880005165137),
    ("lunarvim", 1220295374087000104),
    ("nvchad", 1220296082861326378),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProfile {
    pub name: String,
    pub client_id: u64,
    /// Icon shown as the small image; `None` hides it.
    pub icon_key: Option<String>,
}

/// Resolves a profile name or a raw numeric client id.
///
/// Named profiles carry their own icon. A raw id has no bundled icon, so the
/// override is used when it is non-blank.
pub fn resolve_profile(profile: &str, icon_override: Option<&str>) -> Result<ClientProfile> {
    let profile = profile.trim();

    if let Some((name, client_id)) = KNOWN_PROFILES.iter().find(|(name, _)| *name == profile) {
        return Ok(ClientProfile {
            name: name.to_string(),
            client_id: *client_id,
            icon_key: Some(name.to_string()),
        });
    }

    match profile.parse::<u64>() {
        Ok(client_id) if client_id > 0 => Ok(ClientProfile {
            name: profile.to_string(),
            client_id,
            icon_key: icon_override
                .map(str::trim)
                .filter(|icon| !icon.is_empty())
                .map(str::to_string),
        }),
        _ => Err(CordError::InvalidProfile {
            value: profile.to_string(),
            known: KNOWN_PROFILES
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}
