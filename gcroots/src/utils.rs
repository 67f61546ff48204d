use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use ansi_term::{Color, Style};
use lazy_static::lazy_static;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::error::GcRootsError;

lazy_static! {
    static ref BOLD_RED: Style = Style::new().bold().fg(Color::Red);
    static ref BOLD_GREEN: Style = Style::new().bold().fg(Color::Green);
    static ref BOLD_YELLOW: Style = Style::new().bold().fg(Color::Yellow);
}

/// Terminal logging on stderr, plus a debug log file when asked for.
pub fn init_logger(verbose: bool, log_file: Option<&Path>) -> Result<(), GcRootsError> {
    let term_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        term_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = File::options()
            .write(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| {
                GcRootsError::Config(format!("cannot open log file {}: {e}", path.display()))
            })?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }

    CombinedLogger::init(loggers)
        .map_err(|e| GcRootsError::Config(format!("cannot init logger: {e}")))
}

// status lines go to stderr, stdout is kept for the summary

pub fn info_print(label: &str, msg: &str) {
    eprintln!("{} {msg}", BOLD_GREEN.paint(format!("{label:>12}")));
}

pub fn warn_print(label: &str, msg: &str) {
    eprintln!("{} {msg}", BOLD_YELLOW.paint(format!("{label:>12}")));
}

pub fn error_print(msg: &str) {
    eprintln!("{} {msg}", BOLD_RED.paint("error:"));
}

/// Absolute form of `path` with `.` and `..` folded away, without touching
/// the filesystem. `..` at the root stays at the root.
pub fn expand_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;

    let mut expanded = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if expanded.parent().is_some() {
                    expanded.pop();
                }
            }
            other => expanded.push(other),
        }
    }

    Ok(expanded)
}
