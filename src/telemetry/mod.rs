//! Telemetry formatting and tracing subscriber setup.

use std::io::IsTerminal;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::tracer::EventEnvelope;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta / dark pink
pub const RESET_COLOR: &str = "\x1b[0m";

/// Install the global tracing subscriber with env-filter, fmt output, and
/// the error layer. Safe to call more than once; later calls are no-ops.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(ErrorLayer::default())
        .try_init();
}

/// Formatter color mode for telemetry output.
///
/// - [`FormatterMode::Auto`]: Auto-detects TTY capability via
///   `stderr.is_terminal()`
/// - [`FormatterMode::Colored`]: Always include color codes
/// - [`FormatterMode::Plain`]: Never include color codes (for logs/files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    /// Auto-detect TTY capability (checks `stderr.is_terminal()`)
    #[default]
    Auto,
    /// Always include ANSI color codes
    Colored,
    /// Never include ANSI color codes
    Plain,
}

impl FormatterMode {
    /// Auto-detect formatter mode based on stderr TTY capability.
    pub fn auto_detect() -> Self {
        if std::io::stderr().is_terminal() {
            FormatterMode::Colored
        } else {
            FormatterMode::Plain
        }
    }

    /// Returns true if this mode should use colored output.
    ///
    /// For `Auto` mode, performs TTY detection on each call.
    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Rendered output for a telemetry item that can be consumed by sinks.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_envelope(&self, envelope: &EventEnvelope) -> EventRender;
}

/// Plain text formatter with optional ANSI color codes.
///
/// # Examples
/// ```
/// use weftrun::telemetry::{FormatterMode, PlainFormatter};
///
/// // Auto-detect TTY
/// let formatter = PlainFormatter::new();
///
/// // Force plain output (no colors)
/// let formatter = PlainFormatter::with_mode(FormatterMode::Plain);
/// ```
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    /// Create a new formatter with auto-detected color mode.
    pub fn new() -> Self {
        Self {
            mode: FormatterMode::Auto,
        }
    }

    /// Create a new formatter with explicit color mode.
    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_envelope(&self, envelope: &EventEnvelope) -> EventRender {
        let line = if self.mode.is_colored() {
            format!("{LINE_COLOR}{envelope}{RESET_COLOR}\n")
        } else {
            format!("{envelope}\n")
        };
        EventRender {
            context: Some(envelope.event_type.as_str().to_string()),
            lines: vec![line],
        }
    }
}
