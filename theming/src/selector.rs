use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rand::seq::SliceRandom;

use crate::catalog::{IMAGE_EXTENSIONS, Theme};
use crate::error::{Error, Result};
use crate::paths::Paths;
use crate::thumbs;

const RANDOM_THEME_LABEL: &str = "Random Theme";
const RANDOM_WALLPAPER_LABEL: &str = "Random Wallpaper";
const ADD_WALLPAPER_LABEL: &str = "Add Wallpaper";

/// Exit code rofi reports when the remove keybinding fires.
const REMOVE_EXIT_CODE: i32 = 10;
const REMOVE_KEYBINDING: &str = "Alt+d";

/// What the user did with a picker menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Chosen(T),
    Cancelled,
    AddRequested,
    RemoveRequested(T),
}

/// Raw outcome of one picker invocation.
#[derive(Debug, Clone)]
pub struct PickerResponse {
    pub exit_code: i32,
    pub selected: Option<String>,
}

/// Interactive list selection through the external rofi picker.
///
/// Entries go to the picker's stdin as newline-joined
/// `label\x00icon\x1f<path>` rows; the chosen label comes back on
/// stdout. A non-zero exit code is a cancellation, not an error.
pub struct Selector {
    paths: Paths,
}

impl Selector {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Run the picker over arbitrary pre-built rows. The optional
    /// override is handed to rofi as a `-theme-str` fragment on top of
    /// the stock selection stylesheet.
    pub fn select_from_list(
        &self,
        title: &str,
        items: &[String],
        override_theme: Option<&str>,
    ) -> Result<PickerResponse> {
        self.run_picker(title, items, override_theme, &[])
    }

    fn run_picker(
        &self,
        title: &str,
        entries: &[String],
        override_theme: Option<&str>,
        extra_args: &[&str],
    ) -> Result<PickerResponse> {
        let mut command = Command::new("rofi");
        command
            .args(["-dmenu", "-i", "-p", title, "-theme"])
            .arg(&self.paths.rofi_selecting_theme);
        if let Some(theme_str) = override_theme {
            command.args(["-theme-str", theme_str]);
        }
        command
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|e| Error::ExternalTool {
            tool: "rofi",
            message: e.to_string(),
        })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(entries.join("\n").as_bytes())?;
        }
        let output = child.wait_with_output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let label = stdout
            .trim()
            .split('\x00')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(PickerResponse {
            exit_code: output.status.code().unwrap_or(-1),
            selected: if label.is_empty() { None } else { Some(label) },
        })
    }

    /// Build picker rows for `(label, icon)` elements, generating any
    /// missing thumbnails first. A synthetic random-choice row leads
    /// the list.
    fn picker_entries(
        &self,
        elements: &[(String, PathBuf)],
        cache_dir: &Path,
        random_label: &str,
    ) -> Vec<String> {
        let mut rows = vec![format!(
            "{random_label}\x00icon\x1f{}",
            self.paths.random_icon().display()
        )];

        if let Err(e) = fs::create_dir_all(cache_dir) {
            log::warn!(
                "Failed to create thumbnail cache '{}': {e}",
                cache_dir.display()
            );
            return rows;
        }

        let mut entries = Vec::new();
        for (label, icon) in elements {
            if !icon.is_file() {
                continue;
            }
            let thumbnail = thumbs::thumbnail_path(cache_dir, icon);
            entries.push((label.clone(), icon.clone(), thumbnail));
        }

        let jobs: Vec<(PathBuf, PathBuf)> = entries
            .iter()
            .filter(|(_, _, thumbnail)| !thumbnail.exists())
            .map(|(_, icon, thumbnail)| (icon.clone(), thumbnail.clone()))
            .collect();
        thumbs::generate_missing(jobs);

        for (label, _, thumbnail) in entries {
            if thumbnail.is_file() {
                rows.push(format!("{label}\x00icon\x1f{}", thumbnail.display()));
            }
        }
        rows
    }

    /// Pick a theme from the catalog.
    pub fn select_theme(&self, themes: &[Theme]) -> Result<Selection<Theme>> {
        let elements: Vec<(String, PathBuf)> = themes
            .iter()
            .map(|theme| (theme.name.clone(), theme.icon.clone()))
            .collect();
        let rows = self.picker_entries(&elements, &self.paths.themes_cache_dir, RANDOM_THEME_LABEL);

        let response = self.run_picker("Choose a theme:", &rows, None, &[])?;
        if response.exit_code != 0 {
            log::debug!("Theme selection has been cancelled");
            return Ok(Selection::Cancelled);
        }
        let Some(label) = response.selected else {
            return Ok(Selection::Cancelled);
        };
        Ok(resolve_theme_choice(themes, &label))
    }

    /// Pick a wallpaper of the given theme. The remove keybinding on a
    /// highlighted row asks for that wallpaper's removal instead.
    pub fn select_wallpaper(&self, theme: &Theme) -> Result<Selection<PathBuf>> {
        let elements: Vec<(String, PathBuf)> = theme
            .available_wallpapers
            .iter()
            .map(|wallpaper| (file_label(wallpaper), wallpaper.clone()))
            .collect();

        let mut rows = vec![format!(
            "{ADD_WALLPAPER_LABEL}\x00icon\x1f{}",
            self.paths.add_icon().display()
        )];
        rows.extend(self.picker_entries(
            &elements,
            &self.paths.wallpapers_cache_dir,
            RANDOM_WALLPAPER_LABEL,
        ));

        let response = self.run_picker(
            "Choose a wallpaper:",
            &rows,
            None,
            &["-kb-custom-1", REMOVE_KEYBINDING],
        )?;
        match response.exit_code {
            0 => {}
            REMOVE_EXIT_CODE => {
                if let Some(label) = response.selected {
                    if let Some(wallpaper) = find_wallpaper(theme, &label) {
                        return Ok(Selection::RemoveRequested(wallpaper));
                    }
                }
                return Ok(Selection::Cancelled);
            }
            _ => {
                log::debug!("The wallpaper selection has been cancelled");
                return Ok(Selection::Cancelled);
            }
        }
        let Some(label) = response.selected else {
            return Ok(Selection::Cancelled);
        };
        Ok(resolve_wallpaper_choice(theme, &label))
    }

    /// Ask for an image file through the zenity dialog, falling back
    /// to a free-text picker prompt when zenity is not installed.
    pub fn select_wallpaper_file(&self) -> Result<Option<PathBuf>> {
        let filter = format!(
            "Image files | {}",
            IMAGE_EXTENSIONS
                .iter()
                .map(|ext| format!("*.{ext}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let result = Command::new("zenity")
            .args([
                "--file-selection",
                "--title=Select a wallpaper image",
                &format!("--file-filter={filter}"),
                "--file-filter=All files | *",
            ])
            .output();

        match result {
            Ok(output) => {
                let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if output.status.success() && !chosen.is_empty() {
                    return Ok(Some(PathBuf::from(chosen)));
                }
                log::debug!("File selection was cancelled");
                Ok(None)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("zenity not found, falling back to a picker prompt");
                self.prompt_wallpaper_path()
            }
            Err(e) => {
                log::error!("Error during file selection: {e}");
                Ok(None)
            }
        }
    }

    fn prompt_wallpaper_path(&self) -> Result<Option<PathBuf>> {
        let response = self.run_picker("Enter wallpaper path:", &[], None, &[])?;
        if response.exit_code != 0 {
            log::debug!("Path input was cancelled");
            return Ok(None);
        }
        let Some(raw) = response.selected else {
            return Ok(None);
        };
        let path = self.paths.expand(&raw);
        if path.exists() {
            Ok(Some(path))
        } else {
            log::error!("Selected path does not exist: {}", path.display());
            Ok(None)
        }
    }
}

fn file_label(wallpaper: &Path) -> String {
    wallpaper
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn find_wallpaper(theme: &Theme, label: &str) -> Option<PathBuf> {
    theme
        .available_wallpapers
        .iter()
        .find(|wallpaper| file_label(wallpaper) == label)
        .cloned()
}

fn resolve_theme_choice(themes: &[Theme], label: &str) -> Selection<Theme> {
    if label == RANDOM_THEME_LABEL {
        return match themes.choose(&mut rand::thread_rng()) {
            Some(theme) => Selection::Chosen(theme.clone()),
            None => Selection::Cancelled,
        };
    }
    match themes.iter().find(|theme| theme.name == label) {
        Some(theme) => Selection::Chosen(theme.clone()),
        None => {
            log::debug!("Theme is not selected");
            Selection::Cancelled
        }
    }
}

fn resolve_wallpaper_choice(theme: &Theme, label: &str) -> Selection<PathBuf> {
    if label == RANDOM_WALLPAPER_LABEL {
        return match theme.available_wallpapers.choose(&mut rand::thread_rng()) {
            Some(wallpaper) => Selection::Chosen(wallpaper.clone()),
            None => Selection::Cancelled,
        };
    }
    if label == ADD_WALLPAPER_LABEL {
        return Selection::AddRequested;
    }
    match find_wallpaper(theme, label) {
        Some(wallpaper) => Selection::Chosen(wallpaper),
        None => {
            log::debug!("The wallpaper is not selected");
            Selection::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(wallpapers: &[&str]) -> Theme {
        Theme {
            name: "dark".into(),
            available_wallpapers: wallpapers.iter().map(PathBuf::from).collect(),
            icon: PathBuf::from("/assets/default-theme-icon.png"),
        }
    }

    #[test]
    fn resolves_wallpaper_by_file_name() {
        let theme = theme(&["/walls/a.png", "/walls/b.png"]);
        assert_eq!(
            resolve_wallpaper_choice(&theme, "b.png"),
            Selection::Chosen(PathBuf::from("/walls/b.png"))
        );
    }

    #[test]
    fn unknown_label_is_a_cancellation() {
        let theme = theme(&["/walls/a.png"]);
        assert_eq!(
            resolve_wallpaper_choice(&theme, "ghost.png"),
            Selection::Cancelled
        );
    }

    #[test]
    fn add_label_requests_the_add_flow() {
        let theme = theme(&["/walls/a.png"]);
        assert_eq!(
            resolve_wallpaper_choice(&theme, ADD_WALLPAPER_LABEL),
            Selection::AddRequested
        );
    }

    #[test]
    fn random_wallpaper_over_a_singleton_is_deterministic() {
        let theme = theme(&["/walls/only.png"]);
        assert_eq!(
            resolve_wallpaper_choice(&theme, RANDOM_WALLPAPER_LABEL),
            Selection::Chosen(PathBuf::from("/walls/only.png"))
        );
    }

    #[test]
    fn random_theme_over_a_singleton_is_deterministic() {
        let themes = vec![theme(&["/walls/a.png"])];
        assert_eq!(
            resolve_theme_choice(&themes, RANDOM_THEME_LABEL),
            Selection::Chosen(themes[0].clone())
        );
    }

    #[test]
    fn theme_resolution_matches_by_name() {
        let themes = vec![theme(&["/walls/a.png"])];
        assert_eq!(
            resolve_theme_choice(&themes, "dark"),
            Selection::Chosen(themes[0].clone())
        );
        assert_eq!(resolve_theme_choice(&themes, "nope"), Selection::Cancelled);
    }
}
