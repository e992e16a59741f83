//! Opcode implementations
//!
//! Kernels are generic over the operand lane types; the dispatch table
//! instantiates one monomorphic copy per supported type combination.

pub(crate) mod arith;
pub(crate) mod arrays;
pub(crate) mod assign;
pub(crate) mod closure;
pub(crate) mod compare;
pub(crate) mod control;
pub(crate) mod math;
pub(crate) mod printf;
