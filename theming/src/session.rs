use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The active display-server family. Exactly one mode is active per
/// process; it decides which persisted pointers are read and written
/// and which wallpaper-setting tool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    X11,
    Wayland,
}

impl SessionMode {
    /// Read the session mode from `XDG_SESSION_TYPE`. An unset or
    /// unrecognized value is fatal.
    pub fn detect() -> Result<Self, Error> {
        std::env::var("XDG_SESSION_TYPE")
            .unwrap_or_default()
            .parse()
    }
}

impl FromStr for SessionMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "x11" => Ok(SessionMode::X11),
            "wayland" => Ok(SessionMode::Wayland),
            other => Err(Error::InvalidSession {
                session: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::X11 => write!(f, "x11"),
            SessionMode::Wayland => write!(f, "wayland"),
        }
    }
}
