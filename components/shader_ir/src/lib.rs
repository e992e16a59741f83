//! Intermediate representation of compiled shader layers
//!
//! This crate holds what the external lowering stage hands to the execution
//! core:
//! - Symbols: named, typed storage with uniform/varying and derivative flags
//! - Opcodes: a flat instruction sequence whose control flow is carried by
//!   jump targets
//! - Layers: symbol table plus instructions, with structural validation and
//!   JSON interchange
//! - `printf` format expansion shared by both execution paths
//!
//! # Example
//!
//! ```
//! use shader_ir::{ShaderLayer, Symbol};
//! use shader_types::TypeSpec;
//!
//! let mut layer = ShaderLayer::new("simple");
//! let a = layer.add_int_const(3);
//! let b = layer.add_float_const(2.5);
//! let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
//! layer.emit("add", &[r, a, b]);
//! assert!(layer.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod layer;
pub mod opcode;
pub mod symbol;

// Re-export main types at crate root
pub use format::{
    expand_printf, render_printf, unescape, ArgSlot, Conversion, FormatValue, PrintfFormat,
    Segment, SlotKind,
};
pub use layer::ShaderLayer;
pub use opcode::{ControlFlow, LoopKind, OpIndex, Opcode};
pub use symbol::{ConstValue, Symbol, SymbolId, SymbolKind};
