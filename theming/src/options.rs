use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};
use crate::paths::Paths;

/// One independent visual subsystem that follows the active theme.
///
/// Appliers run in registration order when a theme is installed; the
/// manager isolates and logs individual failures so one broken option
/// cannot block the rest.
pub trait ThemeOption {
    fn id(&self) -> &str;
    fn apply(&self, theme: &str) -> Result<()>;
}

/// Symlinks a per-theme config fragment into a fixed target path,
/// replacing whatever is there. The subsystem owning the target picks
/// the change up on its next reload.
pub struct ConfigLinkOption {
    id: String,
    themes_dir: PathBuf,
    fragment: String,
    target: PathBuf,
}

impl ConfigLinkOption {
    pub fn new(
        id: impl Into<String>,
        themes_dir: PathBuf,
        fragment: impl Into<String>,
        target: PathBuf,
    ) -> Self {
        Self {
            id: id.into(),
            themes_dir,
            fragment: fragment.into(),
            target,
        }
    }
}

impl ThemeOption for ConfigLinkOption {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, theme: &str) -> Result<()> {
        let source = self.themes_dir.join(theme).join(&self.fragment);
        if !source.exists() {
            return Err(Error::Validation(format!(
                "theme '{theme}' ships no '{}' fragment",
                self.fragment
            )));
        }
        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::symlink_metadata(&self.target).is_ok() {
            fs::remove_file(&self.target)?;
        }
        std::os::unix::fs::symlink(&source, &self.target)?;
        log::debug!(
            "Linked {} -> {} for theme \"{theme}\"",
            self.target.display(),
            source.display()
        );
        Ok(())
    }
}

/// Runs a fixed reload command after the fragments are in place.
pub struct CommandOption {
    id: String,
    program: String,
    args: Vec<String>,
}

impl CommandOption {
    pub fn new(
        id: impl Into<String>,
        program: impl Into<String>,
        args: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

impl ThemeOption for CommandOption {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, _theme: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|e| Error::ExternalTool {
                tool: "theme option command",
                message: format!("{}: {e}", self.program),
            })?;
        if !status.success() {
            return Err(Error::ExternalTool {
                tool: "theme option command",
                message: format!("{} exited with {status}", self.program),
            });
        }
        Ok(())
    }
}

/// The appliers a stock meowrch install registers, in order.
pub fn default_options(paths: &Paths) -> Vec<Box<dyn ThemeOption>> {
    let config_dir = paths.home.join(".config");
    vec![
        Box::new(ConfigLinkOption::new(
            "kitty",
            paths.themes_dir.clone(),
            "kitty.conf",
            config_dir.join("kitty").join("theme.conf"),
        )),
        Box::new(ConfigLinkOption::new(
            "rofi",
            paths.themes_dir.clone(),
            "colors.rasi",
            config_dir.join("rofi").join("colors.rasi"),
        )),
        Box::new(ConfigLinkOption::new(
            "hyprland",
            paths.themes_dir.clone(),
            "hyprland.conf",
            config_dir.join("hypr").join("colors.conf"),
        )),
        Box::new(CommandOption::new(
            "kitty-reload",
            "pkill",
            &["-USR1", "-x", "kitty"],
        )),
    ]
}
