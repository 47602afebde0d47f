use serde::Serialize;
use std::backtrace::Backtrace as RuntimeBacktrace;
use std::collections::BTreeMap;

use crate::record::LogEvent;

/// Placeholder substituted for missing string fields in a frame, so
/// downstream consumers never observe an absent required field.
pub const UNKNOWN: &str = "Unknown";

/// One entry of a stack trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StackFrame {
    pub function: String,
    pub filename: String,
    pub lineno: u32,
    pub abs_path: Option<String>,
    /// Raw argument/variable dump, if the host captured one. May be empty.
    pub vars: BTreeMap<String, String>,
    /// False for frames from the standard library, the async runtime and
    /// registry dependencies.
    pub in_app: bool,
}

impl StackFrame {
    pub fn new(function: impl Into<String>, filename: impl Into<String>, lineno: u32) -> Self {
        StackFrame {
            function: function.into(),
            filename: filename.into(),
            lineno,
            abs_path: None,
            vars: BTreeMap::new(),
            in_app: true,
        }
    }
}

/// Ordered sequence of frames, root cause first.
pub type Backtrace = Vec<StackFrame>;

/// Normalizes the three possible trace sources of an event into one clean
/// [`Backtrace`].
///
/// Source priority is a design decision, not a fallback chain: an
/// explicitly supplied trace always wins, then the exception's own trace,
/// and only then a trace synthesized from the current call stack. Every
/// source is passed through a deny-list filter so the bridge's own
/// plumbing never pollutes the reported stack.
#[derive(Debug, Clone)]
pub struct BacktraceBuilder {
    denied: Vec<String>,
}

/// Bridge-internal entry points removed from every reported trace.
const DENY_LIST: &[&str] = &[
    "tracing_error_bridge::dispatcher",
    "tracing_error_bridge::backtrace",
    "tracing_error_bridge::layer",
    "tracing_core::",
    "tracing_subscriber::",
    "tracing::",
    "std::backtrace",
];

impl Default for BacktraceBuilder {
    fn default() -> Self {
        BacktraceBuilder {
            denied: DENY_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BacktraceBuilder {
    pub fn new() -> Self {
        BacktraceBuilder::default()
    }

    /// Extend the deny list with host-specific entry points (substring
    /// match against the frame's function identifier).
    pub fn with_denied<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Build the normalized backtrace for one event.
    pub fn build(&self, event: &LogEvent) -> Backtrace {
        let frames = if let Some(trace) = &event.context.trace {
            trace.clone()
        } else if let Some(trace) = event
            .context
            .exception
            .as_ref()
            .and_then(|exc| exc.trace.clone())
        {
            trace
        } else {
            self.synthesize(event)
        };

        frames
            .into_iter()
            .filter(|frame| !self.is_denied(frame))
            .map(fill_placeholders)
            .collect()
    }

    fn is_denied(&self, frame: &StackFrame) -> bool {
        self.denied.iter().any(|entry| frame.function.contains(entry))
    }

    /// Capture the current call stack and push a frame for the event's
    /// origin (file/line/module from the record) to the front.
    fn synthesize(&self, event: &LogEvent) -> Vec<StackFrame> {
        let mut frames = parse_runtime_backtrace(&RuntimeBacktrace::force_capture());
        frames.insert(
            0,
            StackFrame::new(
                event.module_path.clone().unwrap_or_default(),
                event.file.clone().unwrap_or_default(),
                event.line.unwrap_or(0),
            ),
        );
        frames
    }
}

/// Substitute placeholders for missing fields. Line numbers cannot carry
/// the placeholder string; a missing one stays `0`.
fn fill_placeholders(mut frame: StackFrame) -> StackFrame {
    if frame.function.is_empty() {
        frame.function = UNKNOWN.to_string();
    }
    if frame.filename.is_empty() {
        frame.filename = UNKNOWN.to_string();
    }
    frame
}

/// Parse the display form of [`std::backtrace::Backtrace`] into frames.
///
/// The format is ` N: symbol` lines, each optionally followed by an
/// `at path:line:col` line for the preceding symbol.
fn parse_runtime_backtrace(bt: &RuntimeBacktrace) -> Vec<StackFrame> {
    let rendered = bt.to_string();
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in rendered.lines() {
        let trimmed = line.trim();
        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (path, lineno) = split_location(location);
                frame.filename = path.to_string();
                frame.abs_path = Some(path.to_string());
                frame.lineno = lineno;
                frame.in_app = is_app_path(path);
            }
        } else if let Some((index, symbol)) = trimmed.split_once(": ") {
            if index.trim().parse::<usize>().is_ok() {
                let function = symbol.trim().to_string();
                let in_app = is_app_function(&function);
                frames.push(StackFrame {
                    in_app,
                    ..StackFrame::new(function, String::new(), 0)
                });
            }
        }
    }

    frames
}

/// Split `path:line:col` (or `path:line`) into path and line number.
fn split_location(location: &str) -> (&str, u32) {
    let mut rest = location;
    let mut line = 0u32;
    // Strip up to two trailing numeric segments (column, then line).
    for _ in 0..2 {
        if let Some((head, tail)) = rest.rsplit_once(':') {
            if let Ok(n) = tail.parse::<u32>() {
                line = n;
                rest = head;
                continue;
            }
        }
        break;
    }
    (rest, line)
}

fn is_app_function(function: &str) -> bool {
    const RUNTIME_PREFIXES: &[&str] = &[
        "std::", "core::", "alloc::", "tokio::", "tracing", "futures", "__rust",
    ];
    !RUNTIME_PREFIXES
        .iter()
        .any(|prefix| function.starts_with(prefix))
}

fn is_app_path(path: &str) -> bool {
    !(path.contains(".cargo/registry")
        || path.contains("/rustc/")
        || path.contains("library/std")
        || path.contains("library/core"))
}
