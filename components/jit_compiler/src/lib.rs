//! Native code generation for shader layers
//!
//! This crate compiles one layer into a single native function that shades
//! one point per call:
//! - Storage: stack slots for locals, constants and parameters; globals are
//!   read from the shading-state record
//! - Blocks: leader discovery and a control-flow plan for structured `if`
//!   and loops
//! - Emission: per-op lowering to Cranelift IR with runtime helpers for
//!   division, modulo, trigonometry, index checks and `printf`
//! - Pipeline: an ordered pass list mapped onto Cranelift's stages
//!
//! # Example
//!
//! ```
//! use jit_compiler::{CodegenConfig, CompileSession};
//! use shader_ir::{ShaderLayer, Symbol};
//! use shader_types::{DiagnosticLog, ShaderGlobals, TypeSpec};
//!
//! let mut layer = ShaderLayer::new("simple");
//! let a = layer.add_int_const(3);
//! let b = layer.add_float_const(2.5);
//! let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
//! let fmt = layer.add_string_const("r=%g\n");
//! layer.emit("add", &[r, a, b]);
//! layer.emit("printf", &[fmt, r]);
//!
//! let session = CompileSession::new(CodegenConfig::debug()).unwrap();
//! let compiled = session.compile_layer(&layer).unwrap();
//! let log = DiagnosticLog::new();
//! compiled.invoke(&mut ShaderGlobals::new(), &log);
//! assert_eq!(log.output(), "r=5.5\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blocks;
pub mod compiled;
pub(crate) mod emit;
pub mod pipeline;
pub(crate) mod runtime;
pub mod session;
pub mod storage;

// Re-export main types at crate root
pub use blocks::{
    discover_leaders, BlockId, BlockPlan, BlockRole, Edge, EdgeKind, PlannedBlock, Terminator,
};
pub use compiled::{CompiledLayer, ShadeFn};
pub use pipeline::{OptPass, OptimizationPipeline};
pub use session::{CodegenConfig, CompileSession, OptLevel};
pub use storage::{classify, classify_layer, ElisionReason, NativeType, StorageClass};
