use std::process::Command;

/// User-facing notifications. Failures are logged and swallowed: a
/// missing notification daemon must never break a theme switch.
pub trait Notify {
    fn send(&self, summary: &str, body: &str, critical: bool);
}

/// Sends through the desktop notification daemon via notify-send.
pub struct DesktopNotifier;

impl Notify for DesktopNotifier {
    fn send(&self, summary: &str, body: &str, critical: bool) {
        let mut command = Command::new("notify-send");
        if critical {
            command.args(["-u", "critical"]);
        }
        command.arg(summary).arg(body);
        match command.status() {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!("notify-send exited with {status}"),
            Err(e) => log::warn!("Failed to run notify-send: {e}"),
        }
    }
}
