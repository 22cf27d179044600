use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the theming core.
///
/// The variants split into fatal conditions that abort the whole run
/// (`ConfigMissing`, `InvalidSession`, `NoThemesAvailable`) and
/// per-operation failures that the caller reports and recovers from
/// (`UnknownTheme`, `ExternalTool`, `Validation`).
#[derive(Debug, Error)]
pub enum Error {
    /// The persisted config document does not exist. The store never
    /// creates it; installation owns that file.
    #[error("Config file '{path}' not found. Run the meowrch installer to create it.")]
    ConfigMissing { path: PathBuf },

    /// The config document exists but is not valid YAML for the
    /// expected shape.
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `XDG_SESSION_TYPE` named something other than x11 or wayland.
    #[error("Unsupported session type '{session}'. Expected 'x11' or 'wayland'.")]
    InvalidSession { session: String },

    /// The catalog came up empty: every declared theme was dropped
    /// during filesystem validation.
    #[error("There are no themes available to install. Check the themes section of the config.")]
    NoThemesAvailable,

    /// A theme name that is not present in the config was requested.
    #[error("Theme '{name}' is not present in the config")]
    UnknownTheme { name: String },

    /// An external collaborator (rofi, swww, feh, ...) could not be
    /// spawned or exited unsuccessfully.
    #[error("{tool} failed: {message}")]
    ExternalTool { tool: &'static str, message: String },

    /// Input validation failed before any state was touched.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the theming crate.
pub type Result<T> = std::result::Result<T, Error>;
