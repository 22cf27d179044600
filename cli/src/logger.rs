use std::fs::OpenOptions;

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Wire the log facade to stderr and, best-effort, to a file under
/// the meowrch cache directory. The binary is usually launched from a
/// keybinding, so the file is what people actually read.
pub fn setup(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let colors = ColoredLevelConfig::new()
        .trace(Color::BrightBlack)
        .debug(Color::BrightBlue)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    let mut dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(cache_dir) = dirs::home_dir().map(|home| home.join(".cache").join("meowrch")) {
        if std::fs::create_dir_all(&cache_dir).is_ok() {
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(cache_dir.join("meowrch.log"))
            {
                Ok(file) => dispatch = dispatch.chain(file),
                Err(e) => eprintln!("Warning: failed to open the log file: {e}"),
            }
        }
    }

    dispatch.apply()
}
