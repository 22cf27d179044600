use std::path::{Path, PathBuf};

use crate::paths::Paths;
use crate::store::Document;

/// File extensions accepted as wallpapers.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "gif"];

/// Whether a path carries a recognized image extension.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// A theme that survived filesystem validation: it always has at least
/// one wallpaper that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub available_wallpapers: Vec<PathBuf>,
    pub icon: PathBuf,
}

impl Theme {
    pub fn has_wallpaper(&self, wallpaper: &Path) -> bool {
        self.available_wallpapers
            .iter()
            .any(|candidate| candidate == wallpaper)
    }
}

/// Derive the set of valid themes from the persisted document.
///
/// Wallpapers are the global custom list first, then the theme's own
/// list, both in document order, filtered to files that exist. Themes
/// left with nothing are dropped with a logged error rather than
/// failing the build. The icon check happens here, on every build.
pub fn build_catalog(document: &Document, paths: &Paths) -> Vec<Theme> {
    let custom: Vec<PathBuf> = document
        .custom_wallpapers
        .iter()
        .map(|raw| paths.expand(raw))
        .collect();

    let mut catalog = Vec::new();
    for (name, entry) in &document.themes {
        let mut wallpapers = custom.clone();
        wallpapers.extend(entry.available_wallpapers.iter().map(|raw| paths.expand(raw)));
        wallpapers.retain(|wallpaper| wallpaper.is_file());

        if wallpapers.is_empty() {
            log::error!("No available wallpapers for theme {name}");
            continue;
        }

        let theme_icon = paths.theme_icon(name);
        let icon = if theme_icon.exists() {
            theme_icon
        } else {
            paths.default_theme_icon()
        };

        catalog.push(Theme {
            name: name.clone(),
            available_wallpapers: wallpapers,
            icon,
        });
    }
    catalog
}
