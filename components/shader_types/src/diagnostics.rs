//! Caller-supplied diagnostic channel
//!
//! Recoverable runtime conditions (division by zero, out-of-range component
//! reads) and `printf` output flow through a [`DiagnosticSink`]. Reporting
//! never interrupts the batch or point being shaded.

use parking_lot::Mutex;
use std::fmt;

/// A recoverable runtime condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Opcode that raised the condition
    pub op_index: usize,
    /// Opcode name
    pub op_name: String,
    /// Description of the condition
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic for an opcode
    pub fn new(op_index: usize, op_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            op_index,
            op_name: op_name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op {} ({}): {}", self.op_index, self.op_name, self.message)
    }
}

/// Receiver for runtime diagnostics and formatted output
pub trait DiagnosticSink: Send + Sync {
    /// Record a recoverable runtime condition
    fn report(&self, diagnostic: Diagnostic);

    /// Receive formatted `printf` output
    fn print(&self, text: &str);
}

/// Sink that keeps everything it receives
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    diagnostics: Mutex<Vec<Diagnostic>>,
    output: Mutex<String>,
}

impl DiagnosticLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reported diagnostics
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Number of diagnostics reported so far
    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    /// True if nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    /// Everything printed so far
    pub fn output(&self) -> String {
        self.output.lock().clone()
    }

    /// Forget everything collected
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
        self.output.lock().clear();
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }

    fn print(&self, text: &str) {
        self.output.lock().push_str(text);
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: Diagnostic) {}

    fn print(&self, _text: &str) {}
}
