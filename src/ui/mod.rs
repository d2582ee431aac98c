use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

static RENDERER: RwLock<Renderer> = RwLock::new(Renderer {
    format: OutputFormat::Text,
    color: true,
});

// Global debug state
static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
}

pub mod nerd_font;
pub use nerd_font::NerdFont;

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

fn strip_ansi(input: &str) -> String {
    // Remove CSI sequences like \x1b[0m and \x1b[1;32m
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for next in chars.by_ref() {
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn render(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) -> String {
    let r = match RENDERER.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    match r.format {
        OutputFormat::Text => colorize(level, message, r.color),
        OutputFormat::Json => {
            let clean_msg = strip_ansi(message);
            let ev = Event {
                level: level.as_str(),
                code,
                message: &clean_msg,
                data,
            };
            serde_json::to_string(&ev).unwrap_or_else(|_| clean_msg.clone())
        }
    }
}

/// Print one event. Warnings and errors go to stderr, everything else to stdout.
/// Debug events are dropped unless debug mode is on.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if level == Level::Debug && !is_debug_enabled() {
        return;
    }
    let line = render(level, code, message, data);
    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };
    let _ = writeln!(out, "{}", line);
}

pub fn get_output_format() -> OutputFormat {
    match RENDERER.read() {
        Ok(guard) => guard.format,
        Err(poisoned) => poisoned.into_inner().format,
    }
}

pub mod prelude {
    pub use super::{Level, NerdFont, OutputFormat, emit, get_output_format};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\u{1b}[1;32mok\u{1b}[0m"), "ok");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    #[serial]
    fn test_render_json_event() {
        init(OutputFormat::Json, false);
        let line = render(Level::Success, "accounts.create.success", "done", None);
        init(OutputFormat::Text, true);

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "success");
        assert_eq!(value["code"], "accounts.create.success");
        assert_eq!(value["message"], "done");
        assert!(value.get("data").is_none());
    }

    #[test]
    #[serial]
    fn test_render_text_without_color() {
        init(OutputFormat::Text, false);
        let line = render(Level::Error, "x", "plain message", None);
        init(OutputFormat::Text, true);
        assert_eq!(line, "plain message");
    }
}
