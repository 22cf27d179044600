use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::session::SessionMode;

/// Applies a wallpaper through the session's external tool. The seam
/// exists so the manager can be driven in tests without a compositor.
pub trait WallpaperBackend {
    fn apply(&self, session: SessionMode, wallpaper: &Path) -> Result<()>;
}

/// Production backend: swww on wayland, feh on x11.
pub struct SessionBackend;

const DEFAULT_TRANSITION_FPS: u32 = 60;
const DEFAULT_CURSOR_POS: &str = "0,0";

#[derive(Debug, Deserialize)]
struct OutputInfo {
    #[serde(default)]
    modes: Vec<OutputMode>,
}

#[derive(Debug, Deserialize)]
struct OutputMode {
    #[serde(default)]
    refresh: f64,
    #[serde(default)]
    current: bool,
}

impl SessionBackend {
    /// Refresh rate of the active output, for the swww transition.
    /// Best-effort: any failure falls back to 60.
    fn query_refresh_rate() -> u32 {
        let output = match Command::new("wlr-randr").arg("--json").output() {
            Ok(output) if output.status.success() => output,
            Ok(_) | Err(_) => {
                log::warn!("Couldn't get the screen frequency using wlr-randr");
                return DEFAULT_TRANSITION_FPS;
            }
        };
        match serde_json::from_slice::<Vec<OutputInfo>>(&output.stdout) {
            Ok(outputs) => outputs
                .iter()
                .flat_map(|info| &info.modes)
                .find(|mode| mode.current)
                .map(|mode| mode.refresh.round() as u32)
                .unwrap_or(DEFAULT_TRANSITION_FPS),
            Err(e) => {
                log::warn!("Couldn't parse wlr-randr output: {e}");
                DEFAULT_TRANSITION_FPS
            }
        }
    }

    /// Cursor position used as the transition origin. Best-effort:
    /// falls back to the top-left corner.
    fn query_cursor_pos() -> String {
        match Command::new("hyprctl").arg("cursorpos").output() {
            Ok(output) if output.status.success() => {
                let pos = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if pos.is_empty() {
                    DEFAULT_CURSOR_POS.to_string()
                } else {
                    pos
                }
            }
            Ok(_) | Err(_) => {
                log::warn!("Couldn't get the cursor position");
                DEFAULT_CURSOR_POS.to_string()
            }
        }
    }
}

impl WallpaperBackend for SessionBackend {
    fn apply(&self, session: SessionMode, wallpaper: &Path) -> Result<()> {
        match session {
            SessionMode::Wayland => {
                let fps = Self::query_refresh_rate();
                let cursor_pos = Self::query_cursor_pos();
                let status = Command::new("swww")
                    .arg("img")
                    .arg(wallpaper)
                    .args(["--transition-bezier", ".43,1.19,1,.4"])
                    .args(["--transition-type", "grow"])
                    .args(["--transition-duration", "0.4"])
                    .args(["--transition-fps", &fps.to_string()])
                    .arg("--invert-y")
                    .args(["--transition-pos", &cursor_pos])
                    .status()
                    .map_err(|e| Error::ExternalTool {
                        tool: "swww",
                        message: e.to_string(),
                    })?;
                if !status.success() {
                    return Err(Error::ExternalTool {
                        tool: "swww",
                        message: format!("exited with {status}"),
                    });
                }
            }
            SessionMode::X11 => {
                let status = Command::new("feh")
                    .args(["--no-fehbg", "--bg-fill"])
                    .arg(wallpaper)
                    .status()
                    .map_err(|e| Error::ExternalTool {
                        tool: "feh",
                        message: e.to_string(),
                    })?;
                if !status.success() {
                    return Err(Error::ExternalTool {
                        tool: "feh",
                        message: format!("exited with {status}"),
                    });
                }
            }
        }
        Ok(())
    }
}
