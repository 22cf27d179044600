use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::paths::Paths;
use crate::session::SessionMode;

/// The persisted config document, read and written wholesale.
///
/// The `themes` mapping keeps insertion order because the catalog and
/// the picker present themes in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(
        rename = "current-xtheme",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_xtheme: Option<String>,
    #[serde(
        rename = "current-wtheme",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_wtheme: Option<String>,
    #[serde(
        rename = "current-xwallpaper",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_xwallpaper: Option<String>,
    #[serde(
        rename = "current-wwallpaper",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_wwallpaper: Option<String>,
    #[serde(
        rename = "custom-wallpapers",
        default,
        deserialize_with = "null_default"
    )]
    pub custom_wallpapers: Vec<String>,
    #[serde(default, deserialize_with = "themes_null_default")]
    pub themes: IndexMap<String, ThemeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeEntry {
    #[serde(default, deserialize_with = "null_default")]
    pub available_wallpapers: Vec<String>,
}

/// Hand-edited documents leave keys empty; treat an explicit null the
/// same as an absent key.
fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn themes_null_default<'de, D>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, ThemeEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Option<ThemeEntry>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, entry)| (name, entry.unwrap_or_default()))
        .collect())
}

/// Access to the persisted document.
///
/// Every operation is a wholesale read-modify-write of the YAML file;
/// callers serialize access themselves. The store never creates the
/// document, so a missing file is an error on both load and save.
pub struct ConfigStore {
    path: PathBuf,
    session: SessionMode,
    paths: Paths,
}

impl ConfigStore {
    pub fn new(paths: Paths, session: SessionMode) -> Self {
        Self {
            path: paths.config_file.clone(),
            session,
            paths,
        }
    }

    pub fn session(&self) -> SessionMode {
        self.session
    }

    pub fn load(&self) -> Result<Document> {
        if !self.path.exists() {
            return Err(Error::ConfigMissing {
                path: self.path.clone(),
            });
        }
        let contents = fs::read_to_string(&self.path)?;
        serde_yaml::from_str(&contents).map_err(|source| Error::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, document: &Document) -> Result<()> {
        if !self.path.exists() {
            return Err(Error::ConfigMissing {
                path: self.path.clone(),
            });
        }
        let contents = serde_yaml::to_string(document).map_err(|source| Error::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// The session's current-theme pointer, if any.
    pub fn current_theme(&self) -> Result<Option<String>> {
        let document = self.load()?;
        Ok(match self.session {
            SessionMode::X11 => document.current_xtheme,
            SessionMode::Wayland => document.current_wtheme,
        })
    }

    pub fn set_current_theme(&self, name: &str) -> Result<()> {
        let mut document = self.load()?;
        match self.session {
            SessionMode::X11 => document.current_xtheme = Some(name.to_string()),
            SessionMode::Wayland => document.current_wtheme = Some(name.to_string()),
        }
        self.save(&document)
    }

    /// The session's current-wallpaper pointer, expanded to an
    /// absolute path.
    pub fn current_wallpaper(&self) -> Result<Option<PathBuf>> {
        let document = self.load()?;
        let raw = match self.session {
            SessionMode::X11 => document.current_xwallpaper,
            SessionMode::Wayland => document.current_wwallpaper,
        };
        Ok(raw.map(|wallpaper| self.paths.expand(&wallpaper)))
    }

    /// Persist the current-wallpaper pointer and refresh the stable
    /// `current_wallpaper` symlink other tools read.
    pub fn set_current_wallpaper(&self, wallpaper: &Path) -> Result<()> {
        let mut document = self.load()?;
        let stored = self.paths.contract(wallpaper);
        match self.session {
            SessionMode::X11 => document.current_xwallpaper = Some(stored),
            SessionMode::Wayland => document.current_wwallpaper = Some(stored),
        }
        self.refresh_symlink(wallpaper);
        self.save(&document)
    }

    fn refresh_symlink(&self, wallpaper: &Path) {
        let link = &self.paths.wallpaper_symlink;
        if fs::symlink_metadata(link).is_ok() {
            let _ = fs::remove_file(link);
        }
        match std::os::unix::fs::symlink(wallpaper, link) {
            Ok(()) => log::debug!(
                "Symlink for wallpaper created: {} -> {}",
                link.display(),
                wallpaper.display()
            ),
            Err(e) => log::error!(
                "Failed to create symlink for wallpaper '{}': {e}",
                wallpaper.display()
            ),
        }
    }

    /// Add a wallpaper to a theme's list. Idempotent: an already
    /// present path leaves the document untouched.
    pub fn add_wallpaper_to_theme(&self, theme: &str, wallpaper: &Path) -> Result<()> {
        let mut document = self.load()?;
        let entry = document
            .themes
            .get_mut(theme)
            .ok_or_else(|| Error::UnknownTheme {
                name: theme.to_string(),
            })?;
        let stored = self.paths.contract(wallpaper);
        if entry.available_wallpapers.contains(&stored) {
            return Ok(());
        }
        entry.available_wallpapers.push(stored);
        self.save(&document)
    }

    /// Remove a wallpaper from a theme's list and from the global
    /// custom-wallpapers list. A path absent from both is a no-op, not
    /// an error.
    pub fn remove_wallpaper_from_theme(&self, theme: &str, wallpaper: &Path) -> Result<()> {
        let mut document = self.load()?;
        let target = self.paths.absolute(wallpaper);
        let mut changed = false;

        if let Some(entry) = document.themes.get_mut(theme) {
            let before = entry.available_wallpapers.len();
            entry
                .available_wallpapers
                .retain(|stored| self.paths.expand(stored) != target);
            changed |= entry.available_wallpapers.len() != before;
        }

        let before = document.custom_wallpapers.len();
        document
            .custom_wallpapers
            .retain(|stored| self.paths.expand(stored) != target);
        changed |= document.custom_wallpapers.len() != before;

        if changed {
            self.save(&document)
        } else {
            Ok(())
        }
    }
}
