//! Batch interpreter for shader layers
//!
//! This crate executes a layer's opcodes directly over a batch of shading
//! points:
//! - Per-batch symbol storage with uniform/varying density and derivative
//!   planes
//! - Runflag masks for divergent control flow
//! - Resolve-then-execute specialization: each opcode binds one monomorphic
//!   handler on first use
//! - Closure construction and algebra on shared trees
//!
//! # Example
//!
//! ```
//! use interpreter::{ExecutableLayer, ShadingExecution};
//! use shader_ir::{ShaderLayer, Symbol};
//! use shader_types::{DiagnosticLog, TypeSpec};
//!
//! let mut layer = ShaderLayer::new("simple");
//! let a = layer.add_int_const(3);
//! let b = layer.add_float_const(2.5);
//! let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
//! layer.emit("add", &[r, a, b]);
//!
//! let layer = ExecutableLayer::new(layer).unwrap();
//! let log = DiagnosticLog::new();
//! let mut exec = ShadingExecution::new(&layer, 4, &log);
//! exec.run(&[true; 4]).unwrap();
//! assert_eq!(exec.float_value(r, 0), Some(5.5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod execution;
pub(crate) mod kernels;
pub mod storage;

// Re-export main types at crate root
pub use dispatch::{specialization_count, OpHandler, Resolved, SpecKey};
pub use execution::{ExecutableLayer, Resolution, ShadingExecution};
pub use storage::{Lane, Storage, SymbolData};
