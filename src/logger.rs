//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only printed in verbose mode
//! - `Output`, the supervisor's diagnostic stream (reload notices, fault reports)
//!
//! # Example
//!
//! ```ignore
//! log!("reload"; "watching {} units", count);
//!
//! let (mut output, buffer) = Output::buffer();
//! output.line("reload", "updated file main.toml");
//! assert!(buffer.contents().contains("updated file main.toml"));
//! ```

use crossterm::{
    execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{self, BufWriter, IsTerminal, Write, stdout},
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when verbose mode is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "reload" => prefix.bright_green().bold().to_string(),
        "asset" => prefix.bright_blue().bold().to_string(),
        "fault" | "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Output (diagnostic stream)
// ============================================================================

/// The supervisor's diagnostic stream.
///
/// Every line is written as `[module] message`. Multi-line messages (fault
/// reports) keep the prefix on the first line only. With autoflush enabled the
/// underlying writer is flushed after every line, otherwise output stays
/// buffered until [`Output::flush`].
pub struct Output {
    writer: BufWriter<Box<dyn Write>>,
    color: bool,
    autoflush: bool,
}

impl Output {
    /// Diagnostic stream on stderr, colored when stderr is a terminal.
    pub fn stderr() -> Self {
        let color = io::stderr().is_terminal();
        Self {
            writer: BufWriter::new(Box::new(io::stderr())),
            color,
            autoflush: true,
        }
    }

    /// Diagnostic stream on an arbitrary writer (never colored).
    pub fn new(sink: impl Write + 'static) -> Self {
        Self {
            writer: BufWriter::new(Box::new(sink)),
            color: false,
            autoflush: true,
        }
    }

    /// Diagnostic stream into a shared in-memory buffer.
    pub fn buffer() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    pub fn set_autoflush(&mut self, autoflush: bool) {
        self.autoflush = autoflush;
    }

    pub fn autoflush(&self) -> bool {
        self.autoflush
    }

    /// Write one diagnostic entry.
    pub fn line(&mut self, module: &str, message: &str) {
        let prefix = if self.color {
            colorize_prefix(module, &module.to_ascii_lowercase())
        } else {
            format!("[{module}]")
        };

        writeln!(self.writer, "{prefix} {message}").ok();
        if self.autoflush {
            self.writer.flush().ok();
        }
    }

    pub fn flush(&mut self) {
        self.writer.flush().ok();
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::stderr()
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.writer.flush().ok();
    }
}

/// Shared in-memory sink for [`Output::buffer`].
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
