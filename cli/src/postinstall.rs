//! One-shot OS configuration run after the meowrch installer: shell,
//! locale, default terminal, status line, auto-update timer. Every
//! step is best-effort and isolated; a failed step is logged and the
//! sequence moves on.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;

pub fn apply(gamemode: bool) {
    log::info!("The post-installation configuration is starting...");
    set_fish_shell();
    if gamemode {
        add_to_gamemode_group();
    }
    set_default_term();
    ensure_en_us_locale();
    configure_mewline();
    install_auto_update_timer();
    log::info!("The post-installation configuration is complete!");
}

fn run_checked(program: &str, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to run {program}"))?;
    anyhow::ensure!(status.success(), "{program} exited with {status}");
    Ok(())
}

fn set_fish_shell() {
    match run_checked("chsh", &["-s", "/usr/bin/fish"]) {
        Ok(()) => log::info!("The shell is changed to fish!"),
        Err(e) => log::error!("Error changing shell: {e:#}"),
    }
}

fn add_to_gamemode_group() {
    let Some(username) = std::env::var("USER")
        .ok()
        .or_else(|| std::env::var("LOGNAME").ok())
    else {
        log::error!("Could not determine the user name for the gamemode group");
        return;
    };
    match run_checked("sudo", &["usermod", "-a", &username, "-G", "gamemode"]) {
        Ok(()) => log::info!("The user is added to the gamemode group!"),
        Err(e) => log::error!("Error adding user to group for gamemode: {e:#}"),
    }
}

fn set_default_term() {
    let result = run_checked(
        "gsettings",
        &[
            "set",
            "org.cinnamon.desktop.default-applications.terminal",
            "exec",
            "kitty",
        ],
    );
    match result {
        Ok(()) => log::info!("The default terminal is set to kitty!"),
        Err(e) => log::error!("Error setting default terminal: {e:#}"),
    }
}

/// Make sure `en_US.UTF-8 UTF-8` is enabled in /etc/locale.gen and
/// regenerate locales. The file is root-owned, so the edited copy is
/// staged in a tempfile and moved into place with sudo.
fn ensure_en_us_locale() {
    const LOCALE_FILE: &str = "/etc/locale.gen";
    const TARGET_LINE: &str = "en_US.UTF-8 UTF-8";
    let commented = format!("#{TARGET_LINE}");

    let contents = match fs::read_to_string(LOCALE_FILE) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("Failed to add a locale. Error: cannot read \"{LOCALE_FILE}\": {e}");
            return;
        }
    };

    let mut found = false;
    let mut modified = false;
    let mut lines: Vec<String> = Vec::with_capacity(contents.lines().count() + 1);
    for line in contents.lines() {
        let stripped = line.trim();
        if stripped == commented {
            lines.push(TARGET_LINE.to_string());
            found = true;
            modified = true;
        } else {
            if stripped == TARGET_LINE {
                found = true;
            }
            lines.push(line.to_string());
        }
    }
    if !found {
        lines.push(TARGET_LINE.to_string());
        modified = true;
    }

    if !modified {
        log::info!("Locale \"{TARGET_LINE}\" is already enabled");
        return;
    }

    let result = (|| -> anyhow::Result<()> {
        let mut staged = tempfile::NamedTempFile::new()?;
        for line in &lines {
            writeln!(staged, "{line}")?;
        }
        staged.flush()?;
        let staged_path = staged.path().display().to_string();
        run_checked("sudo", &["cp", &staged_path, LOCALE_FILE])?;
        log::info!("Applying locale-gen...");
        run_checked("sudo", &["locale-gen"])?;
        Ok(())
    })();
    match result {
        Ok(()) => log::info!("Locale \"{TARGET_LINE}\" successfully added!"),
        Err(e) => log::warn!("Failed to add a locale. Error: {e:#}"),
    }
}

fn configure_mewline() {
    log::info!("Configuring mewline...");
    match Command::new("mewline")
        .arg("--generate-default-config")
        .status()
    {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Mewline not found. It may not have been installed properly.");
            return;
        }
        Err(e) => {
            log::warn!("Error configuring mewline: {e}");
            return;
        }
        Ok(status) if !status.success() => {
            log::warn!("Error configuring mewline: mewline exited with {status}");
            return;
        }
        Ok(_) => log::info!("Generated mewline default config!"),
    }

    update_mewline_config();

    match run_checked("mewline", &["--create-keybindings"]) {
        Ok(()) => log::info!("Generated mewline Hyprland keybindings!"),
        Err(e) => log::warn!("Error configuring mewline: {e:#}"),
    }

    log::info!(
        "Mewline configuration complete! You can edit the config at ~/.config/mewline/config.json"
    );
}

/// Hide the scratchpad workspace (-98) from the mewline workspace
/// module by adding it to the ignored list in config.json.
fn update_mewline_config() {
    let Some(config_path) = dirs::home_dir()
        .map(|home| home.join(".config").join("mewline").join("config.json"))
    else {
        log::warn!("Could not determine the home directory, skipping mewline configuration");
        return;
    };
    if !config_path.exists() {
        log::warn!("Mewline config.json not found, skipping workspace configuration");
        return;
    }

    let result = (|| -> anyhow::Result<()> {
        let contents = fs::read_to_string(&config_path)?;
        let mut config: serde_json::Value = serde_json::from_str(&contents)?;

        let Some(workspaces) = config
            .get_mut("modules")
            .and_then(|modules| modules.get_mut("workspaces"))
            .and_then(serde_json::Value::as_object_mut)
        else {
            log::warn!("Mewline config structure unexpected, skipping workspace configuration");
            return Ok(());
        };

        let ignored = workspaces
            .entry("ignored")
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        let Some(list) = ignored.as_array_mut() else {
            log::warn!("Mewline config structure unexpected, skipping workspace configuration");
            return Ok(());
        };

        let sentinel = serde_json::Value::from(-98);
        if list.contains(&sentinel) {
            log::info!("Workspace -98 already in mewline ignored list");
            return Ok(());
        }
        list.push(sentinel);
        fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
        log::info!("Added workspace -98 to mewline ignored list");
        Ok(())
    })();
    if let Err(e) = result {
        log::warn!("Error updating mewline config: {e:#}");
    }
}

const UPDATE_SERVICE: &str = "\
[Unit]
Description=meowrch auto-update

[Service]
Type=oneshot
ExecStart=/usr/bin/meowrch-update
";

const UPDATE_TIMER: &str = "\
[Unit]
Description=Daily meowrch auto-update

[Timer]
OnCalendar=daily
Persistent=true

[Install]
WantedBy=timers.target
";

/// Install and enable the user-level systemd timer that runs the
/// meowrch updater once a day.
fn install_auto_update_timer() {
    let Some(unit_dir) = dirs::home_dir()
        .map(|home| home.join(".config").join("systemd").join("user"))
    else {
        log::warn!("Could not determine the home directory, skipping the auto-update timer");
        return;
    };

    let result = (|| -> anyhow::Result<()> {
        fs::create_dir_all(&unit_dir)?;
        write_unit(unit_dir.join("meowrch-update.service"), UPDATE_SERVICE)?;
        write_unit(unit_dir.join("meowrch-update.timer"), UPDATE_TIMER)?;
        run_checked("systemctl", &["--user", "daemon-reload"])?;
        run_checked(
            "systemctl",
            &["--user", "enable", "--now", "meowrch-update.timer"],
        )?;
        Ok(())
    })();
    match result {
        Ok(()) => log::info!("The auto-update timer is installed and enabled!"),
        Err(e) => log::warn!("Failed to install the auto-update timer: {e:#}"),
    }
}

fn write_unit(path: PathBuf, contents: &str) -> anyhow::Result<()> {
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}
