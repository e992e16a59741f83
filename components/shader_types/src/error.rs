//! Configuration error types.
//!
//! Errors in this module are fatal to a layer: specialization or code
//! generation stops and the layer cannot run. Numeric conditions that arise
//! while shading are not errors; they travel through
//! [`DiagnosticSink`](crate::DiagnosticSink) instead.

use std::fmt;
use thiserror::Error;

/// The kind of configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No implementation exists for an opcode's operand types
    UnsupportedTypes,
    /// The code generator has no lowering for an opcode
    UnsupportedOpcode,
    /// Generated code attempted to store into a shading-state field
    GlobalWrite,
    /// A constant index falls outside an array or triple
    IndexOutOfRange,
    /// A format argument is not a compile-time constant string
    NonConstantFormat,
    /// A format argument has a type the formatter cannot print
    UnsupportedFormatArgument,
    /// A closure constructor names an unregistered model
    UnknownClosure,
    /// The layer is structurally invalid (bad indices, jump targets, literals)
    MalformedLayer,
    /// The native backend rejected the function
    Codegen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnsupportedTypes => "unsupported types",
            ErrorKind::UnsupportedOpcode => "unsupported opcode",
            ErrorKind::GlobalWrite => "global write",
            ErrorKind::IndexOutOfRange => "index out of range",
            ErrorKind::NonConstantFormat => "non-constant format",
            ErrorKind::UnsupportedFormatArgument => "unsupported format argument",
            ErrorKind::UnknownClosure => "unknown closure",
            ErrorKind::MalformedLayer => "malformed layer",
            ErrorKind::Codegen => "code generation",
        };
        f.write_str(name)
    }
}

/// A configuration error with the offending opcode, if known.
///
/// # Examples
///
/// ```
/// use shader_types::{ErrorKind, ShadeError};
///
/// let error = ShadeError::new(ErrorKind::GlobalWrite, "cannot assign to global 'P'").at(3);
///
/// assert_eq!(error.kind, ErrorKind::GlobalWrite);
/// assert_eq!(error.op_index, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ShadeError {
    /// The category of error
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Index of the opcode that triggered the error
    pub op_index: Option<usize>,
}

impl ShadeError {
    /// Create an error without an opcode location
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            op_index: None,
        }
    }

    /// Attach the opcode index
    pub fn at(mut self, op_index: usize) -> Self {
        self.op_index = Some(op_index);
        self
    }

    /// Shorthand for a malformed-layer error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedLayer, message)
    }

    /// Shorthand for a native backend failure
    pub fn codegen(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Codegen, message)
    }
}

/// Result alias used throughout the workspace
pub type Result<T> = std::result::Result<T, ShadeError>;
