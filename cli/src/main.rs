use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use theming::{
    ConfigStore, DesktopNotifier, Notify, Paths, Selector, SessionBackend, SessionMode,
    ThemeManager, default_options,
};

mod logger;
mod postinstall;

#[derive(Parser)]
#[command(
    name = "meowrch",
    version,
    about = "Theme and wallpaper manager for the meowrch desktop"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pick a theme through the interactive picker
    SelectTheme,
    /// Pick a wallpaper of the current theme through the interactive picker
    SelectWallpaper,
    /// Install a theme by name
    SetTheme { name: String },
    /// Apply a specific wallpaper
    SetWallpaper { path: PathBuf },
    /// Install a uniformly random theme
    RandomTheme,
    /// Apply a uniformly random wallpaper of the current theme
    RandomWallpaper,
    /// Re-apply the persisted theme and wallpaper (run at session start)
    Restore {
        /// Only re-apply the wallpaper, leaving theme options alone
        #[arg(long)]
        wallpaper_only: bool,
    },
    /// Register a wallpaper with a theme
    AddWallpaper {
        path: PathBuf,
        /// Target theme; defaults to the current one
        #[arg(long)]
        theme: Option<String>,
    },
    /// Remove a wallpaper from a theme
    RemoveWallpaper {
        path: PathBuf,
        /// Target theme; defaults to the current one
        #[arg(long)]
        theme: Option<String>,
    },
    /// Run the post-install configuration steps
    PostInstall {
        /// Also add the user to the gamemode group
        #[arg(long)]
        gamemode: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logger::setup(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }
    if let Err(e) = run(cli.command) {
        log::error!("{e:#}");
        DesktopNotifier.send("Critical error!", &format!("{e:#}"), true);
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    if let Command::PostInstall { gamemode } = command {
        postinstall::apply(gamemode);
        return Ok(());
    }

    let paths = Paths::resolve()?;
    let session = SessionMode::detect()?;
    let store = ConfigStore::new(paths.clone(), session);
    let mut manager = ThemeManager::new(
        store,
        paths.clone(),
        default_options(&paths),
        Box::new(SessionBackend),
        Box::new(DesktopNotifier),
    )
    .context("failed to initialize the theme manager")?;
    let selector = Selector::new(paths);

    match command {
        Command::SelectTheme => manager.choose_theme(&selector)?,
        Command::SelectWallpaper => manager.choose_wallpaper(&selector)?,
        Command::SetTheme { name } => manager.set_theme(&name)?,
        Command::SetWallpaper { path } => manager.set_wallpaper(&path)?,
        Command::RandomTheme => manager.set_random_theme()?,
        Command::RandomWallpaper => manager.set_random_wallpaper(),
        Command::Restore { wallpaper_only } => {
            if wallpaper_only {
                manager.set_current_wallpaper()?;
            } else {
                manager.set_current_theme()?;
            }
        }
        Command::AddWallpaper { path, theme } => {
            manager.add_wallpaper(&path, theme.as_deref());
        }
        Command::RemoveWallpaper { path, theme } => {
            manager.remove_wallpaper(&path, theme.as_deref());
        }
        Command::PostInstall { .. } => unreachable!("handled before manager construction"),
    }
    Ok(())
}
