//! Basic-block discovery and the control-flow plan
//!
//! Layers carry structured control flow as jump targets on flat opcodes.
//! Before emitting anything the generator scans the layer once for block
//! leaders, then walks the regions recursively to decide which block every
//! op lands in and how each block ends. Emission follows the plan block by
//! block, writing a block's body first and its terminator last.

use shader_ir::{ControlFlow, LoopKind, OpIndex, ShaderLayer, SymbolId};
use shader_types::{Result, ShadeError};
use std::collections::BTreeSet;

/// Index of a block within a [`BlockPlan`]
pub type BlockId = usize;

/// Why a block exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockRole {
    /// Function entry
    Entry,
    /// First block of a non-empty then region
    Then,
    /// First block of a non-empty else region
    Else,
    /// Continuation after a conditional
    Merge,
    /// First block of a non-empty loop init region
    Init,
    /// Loop condition
    Cond,
    /// First block of a non-empty loop body
    Body,
    /// First block of a non-empty loop step region
    Step,
    /// Continuation after a loop
    Exit,
}

/// How a block ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump
    Jump(BlockId),
    /// Two-way branch on a condition symbol
    Branch {
        /// Control-flow op the branch lowers
        op: OpIndex,
        /// Condition symbol
        cond: SymbolId,
        /// Target when the condition is nonzero
        then_block: BlockId,
        /// Target otherwise
        else_block: BlockId,
    },
    /// Return from the generated function
    Return,
}

/// One block of the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBlock {
    /// Leader op the block starts at
    pub start: OpIndex,
    /// Why the block exists
    pub role: BlockRole,
    /// Non-control ops emitted into the block, in order
    pub ops: Vec<OpIndex>,
    /// How the block ends
    pub terminator: Terminator,
}

/// Kind of a control-flow edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// From a `jump`
    Jump,
    /// From one arm of a `brif`
    Branch,
}

/// A control-flow edge between two planned blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Source block
    pub from: BlockId,
    /// Destination block
    pub to: BlockId,
    /// Instruction producing the edge
    pub kind: EdgeKind,
}

/// Every op index that starts a basic block
///
/// Op 0 always leads. A conditional adds `op+1`, its else start and its
/// continuation; a loop adds `op+1` and the starts of its condition, body
/// and step regions plus its continuation.
pub fn discover_leaders(layer: &ShaderLayer) -> BTreeSet<OpIndex> {
    let mut leaders = BTreeSet::from([0]);
    for (op, opcode) in layer.ops.iter().enumerate() {
        match opcode.control(op) {
            Some(ControlFlow::If {
                else_start, after, ..
            }) => {
                leaders.extend([op + 1, else_start, after]);
            }
            Some(ControlFlow::Loop {
                cond_start,
                body_start,
                step_start,
                after,
                ..
            }) => {
                leaders.extend([op + 1, cond_start, body_start, step_start, after]);
            }
            None => {}
        }
    }
    leaders
}

/// Block layout of one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    leaders: BTreeSet<OpIndex>,
    blocks: Vec<PlannedBlock>,
}

impl BlockPlan {
    /// Plan the blocks of `layer`
    pub fn build(layer: &ShaderLayer) -> Result<Self> {
        let mut plan = Self {
            leaders: discover_leaders(layer),
            blocks: Vec::new(),
        };
        let entry = plan.open(0, BlockRole::Entry);
        plan.region(layer, 0, layer.ops.len(), entry)?;
        Ok(plan)
    }

    /// Op indices that start a block
    pub fn leaders(&self) -> &BTreeSet<OpIndex> {
        &self.leaders
    }

    /// Planned blocks; the entry block comes first
    pub fn blocks(&self) -> &[PlannedBlock] {
        &self.blocks
    }

    /// The entry block
    pub fn entry(&self) -> BlockId {
        0
    }

    /// Every edge implied by the terminators
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (from, block) in self.blocks.iter().enumerate() {
            match block.terminator {
                Terminator::Jump(to) => edges.push(Edge {
                    from,
                    to,
                    kind: EdgeKind::Jump,
                }),
                Terminator::Branch {
                    then_block,
                    else_block,
                    ..
                } => {
                    for to in [then_block, else_block] {
                        edges.push(Edge {
                            from,
                            to,
                            kind: EdgeKind::Branch,
                        });
                    }
                }
                Terminator::Return => {}
            }
        }
        edges
    }

    fn open(&mut self, start: OpIndex, role: BlockRole) -> BlockId {
        self.blocks.push(PlannedBlock {
            start,
            role,
            ops: Vec::new(),
            terminator: Terminator::Return,
        });
        self.blocks.len() - 1
    }

    fn terminate(&mut self, block: BlockId, terminator: Terminator) {
        self.blocks[block].terminator = terminator;
    }

    /// A fresh block for `[start, end)` if the region has ops; returns the
    /// block and the open block the region falls out of
    fn nested(
        &mut self,
        layer: &ShaderLayer,
        start: OpIndex,
        end: OpIndex,
        role: BlockRole,
    ) -> Result<Option<(BlockId, BlockId)>> {
        if start >= end {
            return Ok(None);
        }
        let block = self.open(start, role);
        let exit = self.region(layer, start, end, block)?;
        Ok(Some((block, exit)))
    }

    /// Place `[start, end)` starting in `current`; returns the block still
    /// open when the region ends
    fn region(
        &mut self,
        layer: &ShaderLayer,
        start: OpIndex,
        end: OpIndex,
        mut current: BlockId,
    ) -> Result<BlockId> {
        let mut op = start;
        while op < end {
            let opcode = &layer.ops[op];
            let Some(flow) = opcode.control(op) else {
                if opcode.is_control() {
                    return Err(ShadeError::malformed(format!(
                        "'{}' without jump targets",
                        opcode.name
                    ))
                    .at(op));
                }
                self.blocks[current].ops.push(op);
                op += 1;
                continue;
            };
            current = match flow {
                ControlFlow::If {
                    cond,
                    else_start,
                    after,
                } => self.lower_if(layer, op, cond, else_start, after, current)?,
                ControlFlow::Loop {
                    kind,
                    cond,
                    init_start,
                    cond_start,
                    body_start,
                    step_start,
                    after,
                } => {
                    let init = self.nested(layer, init_start, cond_start, BlockRole::Init)?;
                    let current = match init {
                        Some((init, exit)) => {
                            self.terminate(current, Terminator::Jump(init));
                            exit
                        }
                        None => current,
                    };
                    self.lower_loop(
                        layer,
                        op,
                        kind,
                        cond,
                        [cond_start, body_start, step_start, after],
                        current,
                    )?
                }
            };
            op = flow.after();
        }
        Ok(current)
    }

    fn lower_if(
        &mut self,
        layer: &ShaderLayer,
        op: OpIndex,
        cond: SymbolId,
        else_start: OpIndex,
        after: OpIndex,
        current: BlockId,
    ) -> Result<BlockId> {
        let merge = self.open(after, BlockRole::Merge);
        let arm = |plan: &mut Self, start, end, role| -> Result<BlockId> {
            Ok(match plan.nested(layer, start, end, role)? {
                Some((block, exit)) => {
                    plan.terminate(exit, Terminator::Jump(merge));
                    block
                }
                None => merge,
            })
        };
        let then_block = arm(self, op + 1, else_start, BlockRole::Then)?;
        let else_block = arm(self, else_start, after, BlockRole::Else)?;
        let terminator = if then_block == else_block {
            Terminator::Jump(merge)
        } else {
            Terminator::Branch {
                op,
                cond,
                then_block,
                else_block,
            }
        };
        self.terminate(current, terminator);
        Ok(merge)
    }

    fn lower_loop(
        &mut self,
        layer: &ShaderLayer,
        op: OpIndex,
        kind: LoopKind,
        cond: SymbolId,
        [cond_start, body_start, step_start, after]: [OpIndex; 4],
        current: BlockId,
    ) -> Result<BlockId> {
        let cond_block = self.open(cond_start, BlockRole::Cond);
        let exit = self.open(after, BlockRole::Exit);

        let cond_exit = self.region(layer, cond_start, body_start, cond_block)?;
        let body = self.nested(layer, body_start, step_start, BlockRole::Body)?;
        let step = self.nested(layer, step_start, after, BlockRole::Step)?;

        let continue_block = match step {
            Some((step_block, step_exit)) => {
                self.terminate(step_exit, Terminator::Jump(cond_block));
                step_block
            }
            None => cond_block,
        };
        let body_block = match body {
            Some((body_block, body_exit)) => {
                self.terminate(body_exit, Terminator::Jump(continue_block));
                body_block
            }
            None => continue_block,
        };
        self.terminate(
            cond_exit,
            Terminator::Branch {
                op,
                cond,
                then_block: body_block,
                else_block: exit,
            },
        );
        let first = if kind == LoopKind::DoWhile {
            body_block
        } else {
            cond_block
        };
        self.terminate(current, Terminator::Jump(first));
        Ok(exit)
    }
}
