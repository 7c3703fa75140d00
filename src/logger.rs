//! Session logger — one log file per launch in the OS data directory.
//!
//! The file is truncated at startup, so it only ever holds the most recent
//! session. Map generation is usually a one-shot batch run; keeping a single
//! session's trace is enough to diagnose a bad invocation without the log
//! growing without bound.
//!
//! Log location:
//!   Windows:  `%APPDATA%\GlassFE\glassfe.log`
//!   Linux:    `~/.local/share/GlassFE/glassfe.log`
//!   macOS:    `~/Library/Application Support/GlassFE/glassfe.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros anywhere in the
//! crate. Logging never fails loudly: if the file cannot be opened or
//! written, messages are dropped.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Path of the current session log, once `init` has run.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Write a timestamped, level-tagged line to the session log.
pub fn write(level: &str, msg: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "[{}] [{}] {}", timestamp(), level, msg);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*));
    };
}

/// Initialise the session logger: create (or truncate) the log file, write a
/// session header with the full command line, and install a panic hook that
/// mirrors panic messages to the log before the default handler runs.
pub fn init() {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            // No log file — not fatal, generation still runs
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    let args: Vec<String> = std::env::args().collect();
    write(
        "INFO",
        &format!(
            "GlassFE {} session started, argv: {}",
            env!("CARGO_PKG_VERSION"),
            args.join(" ")
        ),
    );

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write("PANIC", &format!("{}", info));
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("GlassFE").join("glassfe.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var("HOME").ok() {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort: current working directory
    PathBuf::from(".")
}

/// HH:MM:SS within the current day — enough precision for a session log.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}
