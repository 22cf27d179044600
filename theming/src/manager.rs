use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::catalog::{self, Theme, build_catalog};
use crate::error::{Error, Result};
use crate::notify::Notify;
use crate::paths::Paths;
use crate::selector::{Selection, Selector};
use crate::session::SessionMode;
use crate::store::ConfigStore;
use crate::thumbs;
use crate::wallpaper::WallpaperBackend;

/// Orchestrates the theme/wallpaper lifecycle: catalog loading,
/// reconciliation of the persisted pointers against the filesystem,
/// theme and wallpaper switching, and the wallpaper add/remove flows.
///
/// All state is owned by the instance; nothing global. The wallpaper
/// backend and the notifier are injected so the state machine can be
/// exercised without a running compositor.
pub struct ThemeManager {
    store: ConfigStore,
    paths: Paths,
    session: SessionMode,
    catalog: Vec<Theme>,
    current: usize,
    options: Vec<Box<dyn crate::options::ThemeOption>>,
    backend: Box<dyn WallpaperBackend>,
    notifier: Box<dyn Notify>,
}

impl ThemeManager {
    /// Build the catalog and reconcile the persisted pointers.
    ///
    /// A current-theme pointer naming a catalog entry is adopted; its
    /// wallpaper pointer is then validated against the theme's list
    /// and the filesystem, falling back to a random wallpaper. A
    /// pointer naming nothing falls back to a random theme. An empty
    /// catalog is fatal.
    pub fn new(
        store: ConfigStore,
        paths: Paths,
        options: Vec<Box<dyn crate::options::ThemeOption>>,
        backend: Box<dyn WallpaperBackend>,
        notifier: Box<dyn Notify>,
    ) -> Result<Self> {
        let document = store.load()?;
        let catalog = build_catalog(&document, &paths);
        let session = store.session();
        if catalog.is_empty() {
            notifier.send(
                "Critical error!",
                &format!("There are no themes available to install for session \"{session}\""),
                true,
            );
            return Err(Error::NoThemesAvailable);
        }

        let pointer = store.current_theme()?;
        let adopted = pointer
            .as_deref()
            .and_then(|name| catalog.iter().position(|theme| theme.name == name));

        let mut manager = Self {
            store,
            paths,
            session,
            catalog,
            current: adopted.unwrap_or(0),
            options,
            backend,
            notifier,
        };

        match adopted {
            Some(_) => {
                let wallpaper = manager.store.current_wallpaper()?;
                let valid = wallpaper
                    .as_ref()
                    .is_some_and(|w| w.exists() && manager.current_theme().has_wallpaper(w));
                if !valid {
                    log::warn!(
                        "Theme \"{}\" does not support the wallpaper that is set, picking a random one",
                        manager.current_theme().name
                    );
                    manager.set_random_wallpaper();
                }
            }
            None => {
                if let Some(name) = pointer {
                    log::warn!(
                        "The installed theme \"{name}\" is not in the list of themes in the config"
                    );
                }
                manager.set_random_theme()?;
            }
        }
        Ok(manager)
    }

    pub fn catalog(&self) -> &[Theme] {
        &self.catalog
    }

    pub fn current_theme(&self) -> &Theme {
        &self.catalog[self.current]
    }

    /// Install a theme by name. An unknown name is reported and leaves
    /// the state untouched.
    pub fn set_theme(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.catalog.iter().position(|theme| theme.name == name) else {
            log::error!("Theme named \"{name}\" not found");
            self.notifier
                .send("Error", &format!("Theme '{name}' not found"), true);
            return Ok(());
        };
        self.apply_theme(index)
    }

    /// Re-apply the persisted theme, options and wallpaper included.
    pub fn set_current_theme(&mut self) -> Result<()> {
        self.apply_theme(self.current)
    }

    fn apply_theme(&mut self, index: usize) -> Result<()> {
        let name = self.catalog[index].name.clone();
        log::debug!("The process of installing the \"{name}\" theme has begun");

        for option in &self.options {
            if let Err(e) = option.apply(&name) {
                log::error!(
                    "Applying the \"{}\" option for theme \"{name}\" failed: {e}",
                    option.id()
                );
            }
        }

        self.store.set_current_theme(&name)?;
        self.current = index;

        let wallpaper = self.store.current_wallpaper()?;
        let valid = wallpaper
            .as_ref()
            .is_some_and(|w| w.exists() && self.current_theme().has_wallpaper(w));
        if !valid {
            self.set_random_wallpaper();
        }

        log::debug!("The theme has been successfully installed: {name}");
        Ok(())
    }

    pub fn set_random_theme(&mut self) -> Result<()> {
        let Some(index) = non_empty_choice(self.catalog.len()) else {
            self.notifier.send(
                "Critical error!",
                &format!(
                    "There are no themes available to install for session \"{}\"",
                    self.session
                ),
                true,
            );
            return Err(Error::NoThemesAvailable);
        };
        self.apply_theme(index)
    }

    /// Apply a wallpaper through the session's tool and persist the
    /// pointer. Tool failure aborts without persisting.
    pub fn set_wallpaper(&mut self, wallpaper: &Path) -> Result<()> {
        log::debug!(
            "The process of setting the wallpaper \"{}\" has begun",
            wallpaper.display()
        );
        self.backend.apply(self.session, wallpaper)?;
        self.store.set_current_wallpaper(wallpaper)?;
        Ok(())
    }

    /// Re-apply the persisted wallpaper if it is still valid for the
    /// current theme, a random one otherwise.
    pub fn set_current_wallpaper(&mut self) -> Result<()> {
        if let Some(wallpaper) = self.store.current_wallpaper()? {
            if wallpaper.exists() && self.current_theme().has_wallpaper(&wallpaper) {
                return self.set_wallpaper(&wallpaper);
            }
        }
        self.set_random_wallpaper();
        Ok(())
    }

    /// Pick a uniformly random wallpaper of the current theme and
    /// apply it. Failures are reported, never propagated: callers use
    /// this as a fallback and must not be derailed by it.
    pub fn set_random_wallpaper(&mut self) {
        let choice = self
            .current_theme()
            .available_wallpapers
            .choose(&mut rand::thread_rng())
            .cloned();
        let Some(wallpaper) = choice else {
            log::error!("There are no wallpapers available...");
            self.notifier.send(
                "Error",
                &format!(
                    "There are no wallpapers available for \"{}\"",
                    self.current_theme().name
                ),
                true,
            );
            return;
        };
        if let Err(e) = self.set_wallpaper(&wallpaper) {
            log::error!("Failed to set wallpaper '{}': {e}", wallpaper.display());
        }
    }

    /// Add a wallpaper to a theme (the current one by default).
    ///
    /// Returns whether the wallpaper ended up in the theme. An already
    /// present wallpaper is a success without writes. On persistence
    /// failure the in-memory append is rolled back so catalog state
    /// never diverges from disk.
    pub fn add_wallpaper(&mut self, wallpaper: &Path, theme_name: Option<&str>) -> bool {
        let theme_name = theme_name
            .unwrap_or(&self.current_theme().name)
            .to_string();
        let path = self.paths.absolute(wallpaper);

        if !self.validate_wallpaper_file(&path) {
            return false;
        }
        let Some(index) = self.theme_index_or_report(&theme_name) else {
            return false;
        };

        if self.catalog[index].has_wallpaper(&path) {
            log::warn!(
                "Wallpaper already exists in theme '{theme_name}': {}",
                path.display()
            );
            self.notifier.send(
                "Info",
                &format!("Wallpaper already in theme '{theme_name}'"),
                false,
            );
            return true;
        }

        self.catalog[index].available_wallpapers.push(path.clone());
        if let Err(e) = self.store.add_wallpaper_to_theme(&theme_name, &path) {
            log::error!("Failed to update config: {e}");
            self.catalog[index].available_wallpapers.pop();
            self.notifier
                .send("Error", "Failed to update configuration", true);
            return false;
        }

        log::info!(
            "Successfully added wallpaper to theme '{theme_name}': {}",
            path.display()
        );
        self.notifier.send(
            "Success",
            &format!("Wallpaper added to theme '{theme_name}'"),
            false,
        );
        true
    }

    /// Remove a wallpaper from a theme (the current one by default).
    ///
    /// Refuses to remove the last wallpaper: a theme must never be
    /// left empty. Removing the active wallpaper triggers a random
    /// replacement.
    pub fn remove_wallpaper(&mut self, wallpaper: &Path, theme_name: Option<&str>) -> bool {
        let theme_name = theme_name
            .unwrap_or(&self.current_theme().name)
            .to_string();
        let path = self.paths.absolute(wallpaper);

        let Some(index) = self.theme_index_or_report(&theme_name) else {
            return false;
        };

        let Some(position) = self.catalog[index]
            .available_wallpapers
            .iter()
            .position(|candidate| candidate == &path)
        else {
            log::warn!(
                "Wallpaper not found in theme '{theme_name}': {}",
                path.display()
            );
            self.notifier.send(
                "Warning",
                &format!("Wallpaper not found in theme '{theme_name}'"),
                false,
            );
            return false;
        };

        if self.catalog[index].available_wallpapers.len() <= 1 {
            log::warn!("Cannot remove the last wallpaper from theme '{theme_name}'");
            self.notifier.send(
                "Warning",
                "Cannot remove the last wallpaper from theme",
                true,
            );
            return false;
        }

        let removed = self.catalog[index].available_wallpapers.remove(position);

        let thumbnail = thumbs::thumbnail_path(&self.paths.wallpapers_cache_dir, &removed);
        if thumbnail.exists() {
            match fs::remove_file(&thumbnail) {
                Ok(()) => log::debug!("Removed cached thumbnail: {}", thumbnail.display()),
                Err(e) => log::warn!("Failed to remove cached thumbnail: {e}"),
            }
        }

        if let Err(e) = self.store.remove_wallpaper_from_theme(&theme_name, &removed) {
            log::error!("Failed to update config: {e}");
            self.catalog[index]
                .available_wallpapers
                .insert(position, removed);
            self.notifier
                .send("Error", "Failed to update configuration", true);
            return false;
        }

        log::info!(
            "Successfully removed wallpaper from theme '{theme_name}': {}",
            removed.display()
        );
        self.notifier.send(
            "Success",
            &format!("Wallpaper removed from theme '{theme_name}'"),
            false,
        );

        let active = self.store.current_wallpaper().ok().flatten();
        if active.as_deref() == Some(removed.as_path()) {
            self.set_random_wallpaper();
        }
        true
    }

    /// Interactive theme selection.
    pub fn choose_theme(&mut self, selector: &Selector) -> Result<()> {
        log::debug!("The process of selecting a theme through the picker has begun");
        match selector.select_theme(&self.catalog) {
            Ok(Selection::Chosen(theme)) => self.set_theme(&theme.name),
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("An error occurred while selecting a theme: {e}");
                Ok(())
            }
        }
    }

    /// Interactive wallpaper selection. Removal re-shows the updated
    /// list; choosing or adding closes the menu.
    pub fn choose_wallpaper(&mut self, selector: &Selector) -> Result<()> {
        log::debug!("The process of selecting wallpapers through the picker has begun");
        loop {
            let selection = match selector.select_wallpaper(self.current_theme()) {
                Ok(selection) => selection,
                Err(e) => {
                    log::error!("An error occurred while selecting wallpapers: {e}");
                    return Ok(());
                }
            };
            match selection {
                Selection::Chosen(wallpaper) => {
                    if let Err(e) = self.set_wallpaper(&wallpaper) {
                        log::error!("Failed to set wallpaper '{}': {e}", wallpaper.display());
                    }
                    return Ok(());
                }
                Selection::AddRequested => {
                    self.handle_add_wallpaper(selector);
                    return Ok(());
                }
                Selection::RemoveRequested(wallpaper) => {
                    if self.remove_wallpaper(&wallpaper, None) {
                        log::info!("Removed wallpaper: {}", wallpaper.display());
                        continue;
                    }
                    return Ok(());
                }
                Selection::Cancelled => return Ok(()),
            }
        }
    }

    /// The add flow behind the picker's "Add Wallpaper" entry: file
    /// dialog, copy into the managed folder, register, apply.
    fn handle_add_wallpaper(&mut self, selector: &Selector) {
        log::debug!("Starting the add wallpaper process");
        let source = match selector.select_wallpaper_file() {
            Ok(Some(source)) => source,
            Ok(None) => {
                log::debug!("No wallpaper file selected");
                return;
            }
            Err(e) => {
                log::error!("Error during file selection: {e}");
                return;
            }
        };

        let Some(imported) = self.import_wallpaper_file(&source) else {
            return;
        };

        if self.add_wallpaper(&imported, None) {
            if let Err(e) = self.set_wallpaper(&imported) {
                log::error!("Failed to set wallpaper '{}': {e}", imported.display());
                return;
            }
            log::info!("Added and set new wallpaper: {}", imported.display());
            self.notifier.send(
                "Success",
                &format!(
                    "Wallpaper added and applied: {}",
                    imported.file_name().unwrap_or_default().to_string_lossy()
                ),
                false,
            );
        } else {
            log::error!(
                "Failed to add wallpaper to theme: {}",
                imported.display()
            );
        }
    }

    /// Copy a wallpaper into the managed folder, appending a numeric
    /// suffix on a name clash.
    pub fn import_wallpaper_file(&self, source: &Path) -> Option<PathBuf> {
        let source = self.paths.absolute(source);
        if !self.validate_wallpaper_file(&source) {
            return None;
        }

        if let Err(e) = fs::create_dir_all(&self.paths.wallpapers_dir) {
            log::error!("Failed to create the wallpapers folder: {e}");
            return None;
        }

        let file_name = source.file_name()?.to_string_lossy().into_owned();
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = source
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut destination = self.paths.wallpapers_dir.join(&file_name);
        let mut counter = 1;
        while destination.exists() {
            destination = self
                .paths
                .wallpapers_dir
                .join(format!("{stem}_{counter}.{extension}"));
            counter += 1;
        }

        match fs::copy(&source, &destination) {
            Ok(_) => {
                log::info!(
                    "Copied wallpaper from {} to {}",
                    source.display(),
                    destination.display()
                );
                self.notifier.send(
                    "Success",
                    &format!(
                        "Wallpaper copied to: {}",
                        destination.file_name().unwrap_or_default().to_string_lossy()
                    ),
                    false,
                );
                Some(destination)
            }
            Err(e) => {
                log::error!("Failed to copy wallpaper: {e}");
                self.notifier
                    .send("Error", &format!("Failed to copy wallpaper: {e}"), true);
                None
            }
        }
    }

    fn validate_wallpaper_file(&self, path: &Path) -> bool {
        if !path.is_file() {
            log::error!("Wallpaper file does not exist: {}", path.display());
            self.notifier.send(
                "Error",
                &format!("Wallpaper file not found: {}", path.display()),
                true,
            );
            return false;
        }
        if !catalog::has_image_extension(path) {
            log::error!("Invalid wallpaper file format: {}", path.display());
            self.notifier.send(
                "Error",
                &format!("Invalid image format: {}", path.display()),
                true,
            );
            return false;
        }
        true
    }

    fn theme_index_or_report(&self, name: &str) -> Option<usize> {
        let index = self.catalog.iter().position(|theme| theme.name == name);
        if index.is_none() {
            log::error!("Theme '{name}' not found");
            self.notifier
                .send("Error", &format!("Theme '{name}' not found"), true);
        }
        index
    }
}

fn non_empty_choice(len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(rand::thread_rng().gen_range(0..len))
    }
}
