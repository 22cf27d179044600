use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The meowrch directory tree, anchored at the user's home directory.
///
/// Everything the theming core touches on disk hangs off these paths:
/// the persisted config document, the per-theme directories, the shared
/// assets, the managed wallpapers folder and the thumbnail caches.
/// Tests construct the tree under a temporary home with [`Paths::with_home`].
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
    /// `~/.config/meowrch`
    pub meowrch_dir: PathBuf,
    /// The persisted YAML document.
    pub config_file: PathBuf,
    /// Per-theme directories (`<themes_dir>/<name>/`).
    pub themes_dir: PathBuf,
    /// Shared icons (default theme icon, random/add entries).
    pub assets_dir: PathBuf,
    /// Managed folder that imported wallpapers are copied into.
    pub wallpapers_dir: PathBuf,
    /// Thumbnail cache for wallpaper picker entries.
    pub wallpapers_cache_dir: PathBuf,
    /// Thumbnail cache for theme picker entries.
    pub themes_cache_dir: PathBuf,
    /// rasi stylesheet handed to the picker.
    pub rofi_selecting_theme: PathBuf,
    /// Stable symlink to whatever wallpaper is currently applied.
    pub wallpaper_symlink: PathBuf,
}

impl Paths {
    /// Resolve the tree under the real home directory.
    pub fn resolve() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Validation("unable to determine the home directory".into()))?;
        Ok(Self::with_home(home))
    }

    /// Resolve the tree under an explicit home directory.
    pub fn with_home(home: PathBuf) -> Self {
        let meowrch_dir = home.join(".config").join("meowrch");
        let cache_dir = home.join(".cache").join("meowrch");
        Self {
            config_file: meowrch_dir.join("config.yaml"),
            themes_dir: meowrch_dir.join("themes"),
            assets_dir: meowrch_dir.join("assets"),
            wallpapers_dir: meowrch_dir.join("wallpapers"),
            wallpapers_cache_dir: cache_dir.join("wallpapers"),
            themes_cache_dir: cache_dir.join("themes"),
            rofi_selecting_theme: meowrch_dir.join("rofi").join("selecting.rasi"),
            wallpaper_symlink: meowrch_dir.join("current_wallpaper"),
            meowrch_dir,
            home,
        }
    }

    pub fn default_theme_icon(&self) -> PathBuf {
        self.assets_dir.join("default-theme-icon.png")
    }

    pub fn random_icon(&self) -> PathBuf {
        self.assets_dir.join("random.png")
    }

    pub fn add_icon(&self) -> PathBuf {
        self.assets_dir.join("add.png")
    }

    /// Icon a theme ships for itself, `<themes_dir>/<name>/<name>.png`.
    pub fn theme_icon(&self, theme: &str) -> PathBuf {
        self.themes_dir.join(theme).join(format!("{theme}.png"))
    }

    /// Expand a raw path string from the config document: environment
    /// variables first, then a leading `~`.
    pub fn expand(&self, raw: &str) -> PathBuf {
        let expanded = expand_env_vars(raw.trim());
        if expanded == "~" {
            return self.home.clone();
        }
        if let Some(rest) = expanded.strip_prefix("~/") {
            return self.home.join(rest);
        }
        PathBuf::from(expanded)
    }

    /// Make a user-supplied path absolute without touching symlinks:
    /// expand `~`/`$VAR`, then anchor relative paths at the current
    /// working directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        let expanded = match path.to_str() {
            Some(raw) => self.expand(raw),
            None => path.to_path_buf(),
        };
        if expanded.is_absolute() {
            return expanded;
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(_) => expanded,
        }
    }

    /// Contract a path for persistence: under the home directory it is
    /// stored as `~/...`, anywhere else as-is.
    pub fn contract(&self, path: &Path) -> String {
        match path.strip_prefix(&self.home) {
            Ok(rel) => format!("~/{}", rel.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Expand `$NAME` and `${NAME}` occurrences from the process
/// environment. Unknown variables are kept literally.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        if consumed == 0 || name.is_empty() {
            out.push('$');
            rest = after;
            continue;
        }
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => {
                out.push('$');
                out.push_str(&after[..consumed]);
            }
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}
