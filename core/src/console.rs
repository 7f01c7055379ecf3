//! Diagnostic sink.
//!
//! `Logger` writes to an attached `Console` and silently discards messages
//! when none is attached, the same contract an optional browser console has.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Something that can display diagnostic messages.
pub trait Console: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards messages to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn log(&self, message: &str) {
        tracing::info!(target: "helper::console", "{message}");
    }
}

/// Keeps every message in memory. Useful for inspecting diagnostics in tests
/// and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    messages: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Console for MemoryConsole {
    fn log(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

/// Cheap-to-clone handle on an optional console.
#[derive(Clone, Default)]
pub struct Logger {
    console: Option<Arc<dyn Console>>,
}

impl Logger {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self {
            console: Some(console),
        }
    }

    /// A logger with no console; every message is dropped.
    pub fn disabled() -> Self {
        Self { console: None }
    }

    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingConsole))
    }

    pub fn is_enabled(&self) -> bool {
        self.console.is_some()
    }

    pub fn log(&self, message: &str) {
        if let Some(console) = &self.console {
            console.log(message);
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
