//! Core types for the shading runtime
//!
//! This crate provides the pieces shared by every other component:
//! - Type descriptors for shading-language values
//! - The fixed-layout shading-state record read by generated code
//! - Configuration errors and the runtime diagnostic channel
//!
//! # Example
//!
//! ```
//! use shader_types::{global_field, TypeSpec, ShaderGlobals};
//!
//! let ty = TypeSpec::color();
//! assert!(ty.is_triple());
//! assert_eq!(ty.components(), 3);
//!
//! // dP/dx lives in field 1 of the state record
//! assert_eq!(global_field("P", 1), Some(1));
//! let sg = ShaderGlobals::new();
//! assert_eq!(sg.u, 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod globals;
pub mod typespec;

// Re-export main types at crate root
pub use config::RuntimeConfig;
pub use diagnostics::{Diagnostic, DiagnosticLog, DiagnosticSink, NullSink};
pub use error::{ErrorKind, Result, ShadeError};
pub use globals::{
    global_field, is_global_name, FieldType, FieldValue, ShaderGlobals, FIELD_OFFSETS,
    FIELD_TYPES, GLOBAL_NAMES, SHADER_GLOBALS_FIELDS,
};
pub use typespec::{Aggregate, BaseType, OperandKind, TypeSpec, VecSemantics};
