//! # meowrch theming core
//!
//! Theme and wallpaper management for the meowrch desktop. The crate
//! reconciles a YAML-persisted "current theme/wallpaper" pointer
//! against the filesystem, drives the interactive picker with a
//! thumbnail cache, and switches themes and wallpapers through the
//! session's external tools.
//!
//! ## Modules
//!
//! - [`store`] - wholesale load/save of the persisted config document
//! - [`catalog`] - filesystem validation of declared themes
//! - [`selector`] - interactive picker and file dialog front end
//! - [`thumbs`] - picker thumbnail cache
//! - [`manager`] - the theme/wallpaper state machine
//! - [`options`] - per-subsystem theme appliers
//! - [`wallpaper`] - session-specific wallpaper-setting backends
//! - [`notify`] - desktop notifications
//! - [`session`] - x11/wayland session mode
//! - [`paths`] - the meowrch directory tree
//! - [`error`] - the crate-wide error taxonomy

pub mod catalog;
pub mod error;
pub mod manager;
pub mod notify;
pub mod options;
pub mod paths;
pub mod selector;
pub mod session;
pub mod store;
pub mod thumbs;
pub mod wallpaper;

pub use catalog::{Theme, build_catalog};
pub use error::{Error, Result};
pub use manager::ThemeManager;
pub use notify::{DesktopNotifier, Notify};
pub use options::{ThemeOption, default_options};
pub use paths::Paths;
pub use selector::{PickerResponse, Selection, Selector};
pub use session::SessionMode;
pub use store::{ConfigStore, Document};
pub use wallpaper::{SessionBackend, WallpaperBackend};
