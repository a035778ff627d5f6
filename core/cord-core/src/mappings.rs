//! Static classification tables: editor file type → (icon key, display label).
//!
//! Built once on first use and never mutated afterwards. Icon keys name the
//! asset files under `{asset_base}/{domain}/`.
//! Add entries here when new assets are published.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Marker file type the host sends when the editor goes idle.
pub const IDLE_FILETYPE: &str = "cord.idle";
/// Icon used for unrecognized languages and unnamed buffers.
pub const FALLBACK_LANGUAGE_ICON: &str = "text";

type Table = HashMap<&'static str, (&'static str, &'static str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingDomain {
    Language,
    FileBrowser,
    PluginManager,
}

impl MappingDomain {
    /// Asset directory holding this domain's icons.
    pub fn asset_dir(self) -> &'static str {
        match self {
            MappingDomain::Language => "language",
            MappingDomain::FileBrowser => "file_browser",
            MappingDomain::PluginManager => "plugin_manager",
        }
    }

    fn table(self) -> &'static Table {
        match self {
            MappingDomain::Language => &LANGUAGES,
            MappingDomain::FileBrowser => &FILE_BROWSERS,
            MappingDomain::PluginManager => &PLUGIN_MANAGERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub icon_key: &'a str,
    pub label: &'a str,
}

pub fn lookup(domain: MappingDomain, key: &str) -> Option<Classification<'static>> {
    domain
        .table()
        .get(key)
        .map(|&(icon_key, label)| Classification { icon_key, label })
}

/// Language lookup that never misses: unknown types are shown with the
/// generic text icon, labeled by the type string itself.
pub fn language(key: &str) -> Classification<'_> {
    lookup(MappingDomain::Language, key).unwrap_or(Classification {
        icon_key: FALLBACK_LANGUAGE_ICON,
        label: key,
    })
}

pub fn is_file_browser(key: &str) -> bool {
    FILE_BROWSERS.contains_key(key)
}

pub fn is_plugin_manager(key: &str) -> bool {
    PLUGIN_MANAGERS.contains_key(key)
}

// ═══════════════════════════════════════════════════════════════════════════════
// File Browsers
// ═══════════════════════════════════════════════════════════════════════════════

static FILE_BROWSERS: Lazy<Table> = Lazy::new(|| {
    HashMap::from([
        ("netrw", ("netrw", "Netrw")),
        ("dirvish", ("dirvish", "Dirvish")),
        ("TelescopePrompt", ("telescope", "Telescope")),
        ("NvimTree", ("nvimtree", "nvim-tree")),
        ("neo-tree", ("neotree", "Neo-Tree")),
        ("oil", ("oil", "Oil")),
    ])
});

// ═══════════════════════════════════════════════════════════════════════════════
// Plugin Managers
// ═══════════════════════════════════════════════════════════════════════════════

static PLUGIN_MANAGERS: Lazy<Table> = Lazy::new(|| {
    HashMap::from([
        ("lazy", ("lazy", "Lazy")),
        ("packer", ("packer", "Packer")),
    ])
});

// ═══════════════════════════════════════════════════════════════════════════════
// Languages
// ═══════════════════════════════════════════════════════════════════════════════

static LANGUAGES: Lazy<Table> = Lazy::new(|| {
    HashMap::from([
        ("autohotkey", ("ahk", "AutoHotkey")),
        ("asm", ("assembly", "Assembly")),
        ("astro", ("astro", "Astro")),
        ("sh", ("shell", "Shell script")),
        ("bash", ("shell", "Bash")),
        ("zsh", ("shell", "Zsh")),
        ("fish", ("shell", "Fish")),
        ("c", ("c", "C")),
        ("cpp", ("cpp", "C++")),
        ("cs", ("csharp", "C#")),
        ("clojure", ("clojure", "Clojure")),
        ("cmake", ("cmake", "CMake")),
        ("css", ("css", "CSS")),
        ("scss", ("scss", "SCSS")),
        ("sass", ("sass", "Sass")),
        ("less", ("less", "Less")),
        ("dart", ("dart", "Dart")),
        ("dockerfile", ("docker", "Dockerfile")),
        ("elixir", ("elixir", "Elixir")),
        ("erlang", ("erlang", "Erlang")),
        ("fsharp", ("fsharp", "F#")),
        ("gitcommit", ("git", "Git")),
        ("gitconfig", ("git", "Git")),
        ("gitignore", ("git", "Git")),
        ("go", ("go", "Go")),
        ("gomod", ("go", "Go module")),
        ("graphql", ("graphql", "GraphQL")),
        ("haskell", ("haskell", "Haskell")),
        ("html", ("html", "HTML")),
        ("java", ("java", "Java")),
        ("javascript", ("javascript", "JavaScript")),
        ("javascriptreact", ("react", "JSX")),
        ("json", ("json", "JSON")),
        ("jsonc", ("json", "JSON with comments")),
        ("julia", ("julia", "Julia")),
        ("kotlin", ("kotlin", "Kotlin")),
        ("lua", ("lua", "Lua")),
        ("make", ("makefile", "Makefile")),
        ("markdown", ("markdown", "Markdown")),
        ("nix", ("nix", "Nix")),
        ("ocaml", ("ocaml", "OCaml")),
        ("perl", ("perl", "Perl")),
        ("php", ("php", "PHP")),
        ("python", ("python", "Python")),
        ("r", ("r", "R")),
        ("ruby", ("ruby", "Ruby")),
        ("rust", ("rust", "Rust")),
        ("scala", ("scala", "Scala")),
        ("sql", ("database", "SQL")),
        ("svelte", ("svelte", "Svelte")),
        ("swift", ("swift", "Swift")),
        ("terraform", ("terraform", "Terraform")),
        ("tex", ("tex", "LaTeX")),
        ("text", ("text", "Plain text")),
        ("toml", ("toml", "TOML")),
        ("typescript", ("typescript", "TypeScript")),
        ("typescriptreact", ("react", "TSX")),
        ("vim", ("vim", "Vimscript")),
        ("vue", ("vue", "Vue")),
        ("xml", ("xml", "XML")),
        ("yaml", ("yaml", "YAML")),
        ("zig", ("zig", "Zig")),
    ])
});
