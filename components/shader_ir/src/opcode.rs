//! Opcode definitions
//!
//! An opcode is an operation name, its argument symbols and, for control-flow
//! operations, a fixed set of jump targets into the layer's flat instruction
//! sequence. Structure is never nested: regions are recovered from targets.

use crate::symbol::SymbolId;
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// Index of an opcode within its layer
pub type OpIndex = usize;

/// Loop flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// `for (init; cond; step) body`
    For,
    /// `while (cond) body`
    While,
    /// `do body while (cond)`
    DoWhile,
}

impl LoopKind {
    /// Opcode name for this loop flavor
    pub fn op_name(self) -> &'static str {
        match self {
            LoopKind::For => "for",
            LoopKind::While => "while",
            LoopKind::DoWhile => "dowhile",
        }
    }
}

/// Region layout of a control-flow opcode at index `op`.
///
/// Regions are half-open instruction ranges:
/// - conditional: then `[op+1, else_start)`, else `[else_start, after)`
/// - loop: init `[op+1, cond_start)`, cond `[cond_start, body_start)`,
///   body `[body_start, step_start)`, step `[step_start, after)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    /// `if` with two targets
    If {
        /// Condition symbol
        cond: SymbolId,
        /// First instruction of the else region
        else_start: OpIndex,
        /// First instruction after the statement
        after: OpIndex,
    },
    /// `for`, `while` or `dowhile` with four targets
    Loop {
        /// Loop flavor
        kind: LoopKind,
        /// Condition symbol, recomputed by the condition region
        cond: SymbolId,
        /// First instruction of the init region (`op + 1`)
        init_start: OpIndex,
        /// First instruction of the condition region
        cond_start: OpIndex,
        /// First instruction of the body
        body_start: OpIndex,
        /// First instruction of the step region
        step_start: OpIndex,
        /// First instruction after the loop
        after: OpIndex,
    },
}

impl ControlFlow {
    /// Index execution continues at once the statement completes
    pub fn after(&self) -> OpIndex {
        match self {
            ControlFlow::If { after, .. } | ControlFlow::Loop { after, .. } => *after,
        }
    }

    /// Condition symbol
    pub fn cond(&self) -> SymbolId {
        match self {
            ControlFlow::If { cond, .. } | ControlFlow::Loop { cond, .. } => *cond,
        }
    }

    /// The statement's regions in instruction order
    pub fn regions(&self, op: OpIndex) -> ArrayVec<(OpIndex, OpIndex), 4> {
        let mut regions = ArrayVec::new();
        match *self {
            ControlFlow::If {
                else_start, after, ..
            } => {
                regions.push((op + 1, else_start));
                regions.push((else_start, after));
            }
            ControlFlow::Loop {
                init_start,
                cond_start,
                body_start,
                step_start,
                after,
                ..
            } => {
                regions.push((init_start, cond_start));
                regions.push((cond_start, body_start));
                regions.push((body_start, step_start));
                regions.push((step_start, after));
            }
        }
        regions
    }
}

/// A single instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opcode {
    /// Operation name (`add`, `if`, `printf`, ...)
    pub name: String,
    /// Argument symbols; the destination comes first for value-producing ops
    pub args: Vec<SymbolId>,
    /// Jump targets of control-flow ops
    #[serde(default)]
    pub jumps: ArrayVec<OpIndex, 4>,
    /// Source line for messages
    #[serde(default)]
    pub line: Option<u32>,
}

impl Opcode {
    /// Create an instruction without jump targets
    pub fn new(name: impl Into<String>, args: &[SymbolId]) -> Self {
        Self {
            name: name.into(),
            args: args.to_vec(),
            jumps: ArrayVec::new(),
            line: None,
        }
    }

    /// Set the jump targets (at most four are kept)
    pub fn with_jumps(mut self, jumps: &[OpIndex]) -> Self {
        self.jumps = jumps.iter().take(4).copied().collect();
        self
    }

    /// Number of arguments
    pub fn nargs(&self) -> usize {
        self.args.len()
    }

    /// Argument symbol `i`
    pub fn arg(&self, i: usize) -> Option<SymbolId> {
        self.args.get(i).copied()
    }

    /// True for `if`, `for`, `while` and `dowhile`
    pub fn is_control(&self) -> bool {
        matches!(self.name.as_str(), "if" | "for" | "while" | "dowhile")
    }

    /// Loop flavor for loop opcodes
    pub fn loop_kind(&self) -> Option<LoopKind> {
        match self.name.as_str() {
            "for" => Some(LoopKind::For),
            "while" => Some(LoopKind::While),
            "dowhile" => Some(LoopKind::DoWhile),
            _ => None,
        }
    }

    /// Region layout of this opcode placed at index `op`, if it is a
    /// well-formed control-flow instruction
    pub fn control(&self, op: OpIndex) -> Option<ControlFlow> {
        let cond = self.arg(0)?;
        if self.name == "if" {
            if self.jumps.len() != 2 {
                return None;
            }
            return Some(ControlFlow::If {
                cond,
                else_start: self.jumps[0],
                after: self.jumps[1],
            });
        }
        let kind = self.loop_kind()?;
        if self.jumps.len() != 4 {
            return None;
        }
        Some(ControlFlow::Loop {
            kind,
            cond,
            init_start: op + 1,
            cond_start: self.jumps[0],
            body_start: self.jumps[1],
            step_start: self.jumps[2],
            after: self.jumps[3],
        })
    }

    /// Index of the instruction that runs after this one completes
    pub fn next_index(&self, op: OpIndex) -> OpIndex {
        self.control(op).map_or(op + 1, |flow| flow.after())
    }
}
