//! Per-op code emission
//!
//! Lowers the ops of a planned layer into Cranelift IR for one point. Every
//! op reads its operands from stack slots or the shading-state record,
//! computes in registers, and stores the results back, zeroing any
//! derivative planes of the destination. Operand combinations follow the
//! interpreter's specializations; the ones only the interpreter implements
//! are rejected with `UnsupportedTypes`.

use crate::blocks::{BlockPlan, Terminator};
use crate::runtime::Helper;
use crate::storage::{self, NativeSlot, NativeType, StorageClass};
use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{
    types, Block, FuncRef, InstBuilder, MemFlags, StackSlotData, StackSlotKind, Type, Value,
};
use cranelift_frontend::FunctionBuilder;
use shader_ir::{expand_printf, OpIndex, PrintfFormat, ShaderLayer, SymbolId};
use shader_types::{global_field, ErrorKind, OperandKind, Result, ShadeError, FIELD_OFFSETS};
use tracing::trace;

use OperandKind::{Float as F, Int as I, Matrix as M, Triple as T};

/// A value in registers, tagged with its scalar class
#[derive(Debug, Clone, Copy)]
enum Num {
    F(Value),
    I(Value),
}

/// Arithmetic op of `add`, `sub`, `mul`, `div` and `mod`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Operand layout of a binary arithmetic op
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithShape {
    /// Exact integer arithmetic
    Int,
    /// Float arithmetic over `width` components, scalars broadcast
    Float(usize),
    /// `matrix = scalar op scalar`
    Diagonal,
}

/// Lowering state for one function
pub(crate) struct Lowering<'a, 'f> {
    builder: FunctionBuilder<'f>,
    layer: &'a ShaderLayer,
    classes: &'a [StorageClass],
    slots: Vec<Option<NativeSlot>>,
    blocks: Vec<Block>,
    helpers: Vec<FuncRef>,
    state: Value,
    ptr: Type,
    formats: Vec<PrintfFormat>,
}

impl<'a, 'f> Lowering<'a, 'f> {
    /// Set up the entry block and allocate storage
    ///
    /// `helpers` holds one declared function per [`Helper::ALL`] entry.
    pub fn new(
        mut builder: FunctionBuilder<'f>,
        layer: &'a ShaderLayer,
        plan: &BlockPlan,
        classes: &'a [StorageClass],
        helpers: Vec<FuncRef>,
        ptr: Type,
    ) -> Self {
        let blocks: Vec<Block> = plan.blocks().iter().map(|_| builder.create_block()).collect();
        let entry = blocks[plan.entry()];
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        let state = builder.block_params(entry)[0];
        let slots = storage::allocate(&mut builder, layer, classes);
        Self {
            builder,
            layer,
            classes,
            slots,
            blocks,
            helpers,
            state,
            ptr,
            formats: Vec::new(),
        }
    }

    /// Emit every planned block and finish the function; returns the
    /// expanded `printf` formats in the order their indices were assigned
    pub fn lower(mut self, plan: &BlockPlan) -> Result<Vec<PrintfFormat>> {
        for (id, block) in plan.blocks().iter().enumerate() {
            if id != plan.entry() {
                self.builder.switch_to_block(self.blocks[id]);
            }
            for &op in &block.ops {
                trace!(op, name = %self.layer.ops[op].name, "lowering");
                self.op(op)?;
            }
            self.terminate(block.terminator)?;
        }
        self.builder.seal_all_blocks();
        self.builder.finalize();
        Ok(self.formats)
    }

    fn terminate(&mut self, terminator: Terminator) -> Result<()> {
        match terminator {
            Terminator::Jump(to) => {
                self.builder.ins().jump(self.blocks[to], &[]);
            }
            Terminator::Branch {
                op,
                cond,
                then_block,
                else_block,
            } => {
                let truth = match self.read(op, cond, 0, 0)? {
                    Num::I(v) => self.builder.ins().icmp_imm(IntCC::NotEqual, v, 0),
                    Num::F(v) => {
                        let zero = self.builder.ins().f32const(0.0);
                        self.builder.ins().fcmp(FloatCC::NotEqual, v, zero)
                    }
                };
                let (then_block, else_block) = (self.blocks[then_block], self.blocks[else_block]);
                self.builder
                    .ins()
                    .brif(truth, then_block, &[], else_block, &[]);
            }
            Terminator::Return => {
                self.builder.ins().return_(&[]);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Operand access
    // ========================================================================

    fn kind(&self, sym: SymbolId) -> Option<OperandKind> {
        self.layer.symbols[sym].ty.kind()
    }

    fn components(&self, sym: SymbolId) -> usize {
        self.layer.symbols[sym].ty.components()
    }

    /// Component `comp` of `plane`; scalars broadcast and missing planes
    /// read as zero
    fn read(&mut self, op: OpIndex, sym: SymbolId, plane: usize, comp: usize) -> Result<Num> {
        let layer = self.layer;
        let symbol = &layer.symbols[sym];
        let comp = if symbol.ty.components() == 1 { 0 } else { comp };
        match self.classes[sym] {
            StorageClass::Global => {
                let Some(field) = global_field(&symbol.name, plane) else {
                    return Ok(Num::F(self.builder.ins().f32const(0.0)));
                };
                let offset = (FIELD_OFFSETS[field] + 4 * comp) as i32;
                let value =
                    self.builder
                        .ins()
                        .load(types::F32, MemFlags::trusted(), self.state, offset);
                Ok(Num::F(value))
            }
            StorageClass::Native { .. } => {
                let slot = self.slot(op, sym)?;
                let ty = slot.ty.ir_type();
                let value = if plane < slot.planes {
                    self.builder
                        .ins()
                        .stack_load(ty, slot.slot, slot.offset(plane, comp))
                } else if slot.ty == NativeType::I32 {
                    self.builder.ins().iconst(types::I32, 0)
                } else {
                    self.builder.ins().f32const(0.0)
                };
                Ok(match slot.ty {
                    NativeType::F32 => Num::F(value),
                    NativeType::I32 => Num::I(value),
                })
            }
            StorageClass::Elided(_) => Err(self.elided(op, sym)),
        }
    }

    fn read_float(&mut self, op: OpIndex, sym: SymbolId, comp: usize) -> Result<Value> {
        let value = self.read(op, sym, 0, comp)?;
        Ok(self.to_float(value))
    }

    fn read_int(&mut self, op: OpIndex, sym: SymbolId, comp: usize) -> Result<Value> {
        Ok(match self.read(op, sym, 0, comp)? {
            Num::I(v) => v,
            Num::F(v) => self.builder.ins().fcvt_to_sint_sat(types::I32, v),
        })
    }

    fn to_float(&mut self, value: Num) -> Value {
        match value {
            Num::F(v) => v,
            Num::I(v) => self.builder.ins().fcvt_from_sint(types::F32, v),
        }
    }

    /// Store `values` into the value plane of `dst` and zero its derivatives
    fn write(&mut self, op: OpIndex, dst: SymbolId, values: &[Num]) -> Result<()> {
        if self.classes[dst] == StorageClass::Global {
            return Err(ShadeError::new(
                ErrorKind::GlobalWrite,
                format!(
                    "cannot assign to global '{}'",
                    self.layer.symbols[dst].name
                ),
            )
            .at(op));
        }
        let slot = self.slot(op, dst)?;
        for (comp, &value) in values.iter().enumerate() {
            let value = match (slot.ty, value) {
                (NativeType::F32, v) => self.to_float(v),
                (NativeType::I32, Num::I(v)) => v,
                (NativeType::I32, Num::F(v)) => {
                    self.builder.ins().fcvt_to_sint_sat(types::I32, v)
                }
            };
            self.builder
                .ins()
                .stack_store(value, slot.slot, slot.offset(0, comp));
        }
        if slot.planes > 1 {
            let zero = match slot.ty {
                NativeType::F32 => self.builder.ins().f32const(0.0),
                NativeType::I32 => self.builder.ins().iconst(types::I32, 0),
            };
            for plane in 1..slot.planes {
                for comp in 0..slot.components {
                    self.builder
                        .ins()
                        .stack_store(zero, slot.slot, slot.offset(plane, comp));
                }
            }
        }
        Ok(())
    }

    fn slot(&self, op: OpIndex, sym: SymbolId) -> Result<NativeSlot> {
        self.slots[sym].ok_or_else(|| self.elided(op, sym))
    }

    fn elided(&self, op: OpIndex, sym: SymbolId) -> ShadeError {
        let reason = match self.classes[sym] {
            StorageClass::Elided(reason) => format!("{:?}", reason),
            _ => String::from("Global"),
        };
        ShadeError::new(
            ErrorKind::UnsupportedTypes,
            format!(
                "'{}' has no native storage ({})",
                self.layer.symbols[sym].name, reason
            ),
        )
        .at(op)
    }

    fn unsupported(&self, op: OpIndex) -> ShadeError {
        let opcode = &self.layer.ops[op];
        let types: Vec<String> = opcode
            .args
            .iter()
            .map(|&a| self.layer.symbols[a].ty.to_string())
            .collect();
        let description = match types.split_first() {
            Some((dst, args)) => format!("{} = {}({})", dst, opcode.name, args.join(", ")),
            None => opcode.name.clone(),
        };
        ShadeError::new(
            ErrorKind::UnsupportedTypes,
            format!("no native lowering for {}", description),
        )
        .at(op)
    }

    /// Operand kinds of `op`; arrays, strings and closures stay in the
    /// interpreter
    fn kinds(&self, op: OpIndex, arity: usize) -> Result<Vec<OperandKind>> {
        let args = &self.layer.ops[op].args;
        if args.len() != arity {
            return Err(ShadeError::malformed(format!(
                "'{}' takes {} operands, found {}",
                self.layer.ops[op].name,
                arity,
                args.len()
            ))
            .at(op));
        }
        args.iter()
            .map(|&a| self.kind(a).filter(|k| matches!(k, I | F | T | M)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.unsupported(op))
    }

    fn call(&mut self, helper: Helper, args: &[Value]) -> Option<Value> {
        let call = self.builder.ins().call(self.helpers[helper as usize], args);
        self.builder.inst_results(call).first().copied()
    }

    fn call_value(&mut self, op: OpIndex, helper: Helper, args: &[Value]) -> Result<Value> {
        self.call(helper, args).ok_or_else(|| {
            ShadeError::codegen(format!("helper {} returns no value", helper.symbol())).at(op)
        })
    }

    /// Move a fault raised by a helper during this op into the fault list
    fn commit(&mut self, op: OpIndex) {
        let index = self.builder.ins().iconst(types::I32, op as i64);
        self.call(Helper::Commit, &[index]);
    }

    // ========================================================================
    // Ops
    // ========================================================================

    fn op(&mut self, op: OpIndex) -> Result<()> {
        let layer = self.layer;
        let opcode = &layer.ops[op];
        let args = opcode.args.as_slice();
        match opcode.name.as_str() {
            "nop" | "end" => Ok(()),
            "assign" => self.assign(op, args),
            "add" => self.arith(op, Arith::Add, args),
            "sub" => self.arith(op, Arith::Sub, args),
            "mul" => self.arith(op, Arith::Mul, args),
            "div" => self.arith(op, Arith::Div, args),
            "mod" => self.arith(op, Arith::Mod, args),
            "neg" | "abs" | "fabs" | "sqrt" | "sin" | "cos" => {
                self.unary(op, &opcode.name, args)
            }
            "dot" | "cross" => self.pair_geometry(op, &opcode.name, args),
            "length" | "luminance" | "normalize" => self.reduce(op, &opcode.name, args),
            "compref" => self.compref(op, args),
            "eq" | "neq" | "lt" | "le" | "gt" | "ge" => self.compare(op, &opcode.name, args),
            "color" | "vector" | "point" | "normal" => self.construct(op, args),
            "printf" => self.printf(op, args),
            name => Err(ShadeError::new(
                ErrorKind::UnsupportedOpcode,
                format!("no native lowering for opcode '{}'", name),
            )
            .at(op)),
        }
    }

    fn assign(&mut self, op: OpIndex, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 2)?;
        let (dst, src) = (args[0], args[1]);
        let diagonal = match (kinds[0], kinds[1]) {
            (I | F, I | F) | (T, T | F | I) | (M, M) => false,
            (M, F | I) => true,
            _ => return Err(self.unsupported(op)),
        };
        let values = if diagonal {
            let s = self.read_float(op, src, 0)?;
            self.diagonal(s)
        } else {
            (0..self.components(dst))
                .map(|c| self.read(op, src, 0, c))
                .collect::<Result<Vec<_>>>()?
        };
        self.write(op, dst, &values)
    }

    fn diagonal(&mut self, s: Value) -> Vec<Num> {
        let zero = self.builder.ins().f32const(0.0);
        (0..16)
            .map(|i| Num::F(if i % 5 == 0 { s } else { zero }))
            .collect()
    }

    fn arith_shape(&self, op: OpIndex, kind: Arith, kinds: &[OperandKind]) -> Result<ArithShape> {
        let field = kind != Arith::Mod;
        let shape = match (kinds[0], kinds[1], kinds[2]) {
            (I | F, I, I) => ArithShape::Int,
            (I | F, I | F, I | F) => ArithShape::Float(1),
            (T, T, T | F | I) => ArithShape::Float(3),
            (T, F | I, T) | (T, F, F) if field => ArithShape::Float(3),
            (M, I | F, I | F) if field => ArithShape::Diagonal,
            (M, M, F | I) if field => ArithShape::Float(16),
            (M, M, M) if matches!(kind, Arith::Add | Arith::Sub) => ArithShape::Float(16),
            (M, F, M) if matches!(kind, Arith::Add | Arith::Sub | Arith::Mul) => {
                ArithShape::Float(16)
            }
            (M, I, M) if kind == Arith::Mul => ArithShape::Float(16),
            (M, M | F | I, M) if matches!(kind, Arith::Mul | Arith::Div) => {
                return Err(ShadeError::new(
                    ErrorKind::UnsupportedTypes,
                    format!(
                        "matrix {} is only supported by the interpreter",
                        self.layer.ops[op].name
                    ),
                )
                .at(op))
            }
            _ => return Err(self.unsupported(op)),
        };
        Ok(shape)
    }

    fn arith(&mut self, op: OpIndex, kind: Arith, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 3)?;
        let shape = self.arith_shape(op, kind, &kinds)?;
        let (dst, a, b) = (args[0], args[1], args[2]);
        let values = match shape {
            ArithShape::Int => {
                let x = self.read_int(op, a, 0)?;
                let y = self.read_int(op, b, 0)?;
                vec![Num::I(self.int_arith(op, kind, x, y)?)]
            }
            ArithShape::Float(width) => {
                let mut values = Vec::with_capacity(width);
                for c in 0..width {
                    let x = self.read_float(op, a, c)?;
                    let y = self.read_float(op, b, c)?;
                    values.push(Num::F(self.float_arith(op, kind, x, y)?));
                }
                values
            }
            ArithShape::Diagonal => {
                let x = self.read_float(op, a, 0)?;
                let y = self.read_float(op, b, 0)?;
                let r = self.float_arith(op, kind, x, y)?;
                self.diagonal(r)
            }
        };
        if matches!(kind, Arith::Div | Arith::Mod) {
            self.commit(op);
        }
        self.write(op, dst, &values)
    }

    fn int_arith(&mut self, op: OpIndex, kind: Arith, x: Value, y: Value) -> Result<Value> {
        Ok(match kind {
            Arith::Add => self.builder.ins().iadd(x, y),
            Arith::Sub => self.builder.ins().isub(x, y),
            Arith::Mul => self.builder.ins().imul(x, y),
            Arith::Div => self.call_value(op, Helper::IDiv, &[x, y])?,
            Arith::Mod => self.call_value(op, Helper::IMod, &[x, y])?,
        })
    }

    fn float_arith(&mut self, op: OpIndex, kind: Arith, x: Value, y: Value) -> Result<Value> {
        Ok(match kind {
            Arith::Add => self.builder.ins().fadd(x, y),
            Arith::Sub => self.builder.ins().fsub(x, y),
            Arith::Mul => self.builder.ins().fmul(x, y),
            Arith::Div => self.call_value(op, Helper::FDiv, &[x, y])?,
            Arith::Mod => self.call_value(op, Helper::FMod, &[x, y])?,
        })
    }

    fn unary(&mut self, op: OpIndex, name: &str, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 2)?;
        let (dst, a) = (args[0], args[1]);
        let integer = match (kinds[0], kinds[1]) {
            (I, I) if matches!(name, "neg" | "abs") => true,
            (F, F | I) | (T, T) => false,
            (M, M) if name == "neg" => false,
            _ => return Err(self.unsupported(op)),
        };
        let mut values = Vec::new();
        if integer {
            let x = self.read_int(op, a, 0)?;
            let r = match name {
                "neg" => self.builder.ins().ineg(x),
                _ => self.builder.ins().iabs(x),
            };
            values.push(Num::I(r));
        } else {
            for c in 0..self.components(dst) {
                let x = self.read_float(op, a, c)?;
                let r = match name {
                    "neg" => self.builder.ins().fneg(x),
                    "abs" | "fabs" => self.builder.ins().fabs(x),
                    "sqrt" => self.builder.ins().sqrt(x),
                    "sin" => self.call_value(op, Helper::Sin, &[x])?,
                    _ => self.call_value(op, Helper::Cos, &[x])?,
                };
                values.push(Num::F(r));
            }
        }
        self.write(op, dst, &values)
    }

    fn triple(&mut self, op: OpIndex, sym: SymbolId) -> Result<[Value; 3]> {
        Ok([
            self.read_float(op, sym, 0)?,
            self.read_float(op, sym, 1)?,
            self.read_float(op, sym, 2)?,
        ])
    }

    fn dot3(&mut self, a: [Value; 3], b: [Value; 3]) -> Value {
        let fb = &mut self.builder;
        let x = fb.ins().fmul(a[0], b[0]);
        let y = fb.ins().fmul(a[1], b[1]);
        let z = fb.ins().fmul(a[2], b[2]);
        let xy = fb.ins().fadd(x, y);
        fb.ins().fadd(xy, z)
    }

    fn pair_geometry(&mut self, op: OpIndex, name: &str, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 3)?;
        let (dst, a, b) = (args[0], args[1], args[2]);
        let values = match (name, kinds[0], kinds[1], kinds[2]) {
            ("dot", F, T, T) => {
                let (u, v) = (self.triple(op, a)?, self.triple(op, b)?);
                vec![Num::F(self.dot3(u, v))]
            }
            ("cross", T, T, T) => {
                let (u, v) = (self.triple(op, a)?, self.triple(op, b)?);
                (0..3)
                    .map(|i| {
                        let l = self.builder.ins().fmul(u[(i + 1) % 3], v[(i + 2) % 3]);
                        let r = self.builder.ins().fmul(u[(i + 2) % 3], v[(i + 1) % 3]);
                        Num::F(self.builder.ins().fsub(l, r))
                    })
                    .collect()
            }
            _ => return Err(self.unsupported(op)),
        };
        self.write(op, dst, &values)
    }

    fn reduce(&mut self, op: OpIndex, name: &str, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 2)?;
        let (dst, a) = (args[0], args[1]);
        let values = match (name, kinds[0], kinds[1]) {
            ("length", F, T) => {
                let v = self.triple(op, a)?;
                let sq = self.dot3(v, v);
                vec![Num::F(self.builder.ins().sqrt(sq))]
            }
            ("luminance", F, T) => {
                let v = self.triple(op, a)?;
                let fb = &mut self.builder;
                let weights = [
                    fb.ins().f32const(0.2126),
                    fb.ins().f32const(0.7152),
                    fb.ins().f32const(0.0722),
                ];
                vec![Num::F(self.dot3(weights, v))]
            }
            ("normalize", T, T) => {
                let v = self.triple(op, a)?;
                let sq = self.dot3(v, v);
                let fb = &mut self.builder;
                let len = fb.ins().sqrt(sq);
                let one = fb.ins().f32const(1.0);
                let scale = fb.ins().fdiv(one, len);
                v.iter()
                    .map(|&c| Num::F(self.builder.ins().fmul(c, scale)))
                    .collect()
            }
            _ => return Err(self.unsupported(op)),
        };
        self.write(op, dst, &values)
    }

    fn compref(&mut self, op: OpIndex, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 3)?;
        if (kinds[0], kinds[1], kinds[2]) != (F, T, I) {
            return Err(self.unsupported(op));
        }
        let (dst, src, index) = (args[0], args[1], args[2]);
        let layer = self.layer;
        let symbol = &layer.symbols[index];
        if symbol.is_constant() {
            let i = symbol.value.as_ref().and_then(|v| v.as_int()).unwrap_or(0);
            if !(0..3).contains(&i) {
                return Err(ShadeError::new(
                    ErrorKind::IndexOutOfRange,
                    format!("index {} is out of range for 'compref' (length 3)", i),
                )
                .at(op));
            }
            let value = self.read(op, src, 0, i as usize)?;
            return self.write(op, dst, &[value]);
        }
        let components = self.triple(op, src)?;
        let i = self.read_int(op, index, 0)?;
        let len = self.builder.ins().iconst(types::I32, 3);
        let checked = self.call_value(op, Helper::Index, &[i, len])?;
        let mut value = self.builder.ins().f32const(0.0);
        for (c, &component) in components.iter().enumerate().rev() {
            let fb = &mut self.builder;
            let hit = fb.ins().icmp_imm(IntCC::Equal, checked, c as i64);
            value = fb.ins().select(hit, component, value);
        }
        self.commit(op);
        self.write(op, dst, &[Num::F(value)])
    }

    fn compare(&mut self, op: OpIndex, name: &str, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 3)?;
        let (dst, a, b) = (args[0], args[1], args[2]);
        let (int_cc, float_cc, any) = match name {
            "eq" => (IntCC::Equal, FloatCC::Equal, false),
            "neq" => (IntCC::NotEqual, FloatCC::NotEqual, true),
            "lt" => (IntCC::SignedLessThan, FloatCC::LessThan, false),
            "le" => (IntCC::SignedLessThanOrEqual, FloatCC::LessThanOrEqual, false),
            "gt" => (IntCC::SignedGreaterThan, FloatCC::GreaterThan, false),
            _ => (IntCC::SignedGreaterThanOrEqual, FloatCC::GreaterThanOrEqual, false),
        };
        let truth = match (kinds[0], kinds[1], kinds[2]) {
            (I | F, I, I) => {
                let x = self.read_int(op, a, 0)?;
                let y = self.read_int(op, b, 0)?;
                self.builder.ins().icmp(int_cc, x, y)
            }
            (I | F, I | F, I | F) | (I | F, T, T) | (I, T, F) | (I, F, T) | (I, M, M) => {
                let width = self.components(a).max(self.components(b));
                let mut result = None;
                for c in 0..width {
                    let x = self.read_float(op, a, c)?;
                    let y = self.read_float(op, b, c)?;
                    let fb = &mut self.builder;
                    let hit = fb.ins().fcmp(float_cc, x, y);
                    result = Some(match result {
                        None => hit,
                        Some(acc) if any => fb.ins().bor(acc, hit),
                        Some(acc) => fb.ins().band(acc, hit),
                    });
                }
                result.ok_or_else(|| self.unsupported(op))?
            }
            _ => return Err(self.unsupported(op)),
        };
        let value = self.builder.ins().uextend(types::I32, truth);
        self.write(op, dst, &[Num::I(value)])
    }

    fn construct(&mut self, op: OpIndex, args: &[SymbolId]) -> Result<()> {
        let kinds = self.kinds(op, 4)?;
        if kinds[0] != T || !kinds[1..].iter().all(|k| matches!(k, I | F)) {
            return Err(self.unsupported(op));
        }
        let values = args[1..]
            .iter()
            .map(|&a| self.read_float(op, a, 0).map(Num::F))
            .collect::<Result<Vec<_>>>()?;
        self.write(op, args[0], &values)
    }

    fn printf(&mut self, op: OpIndex, args: &[SymbolId]) -> Result<()> {
        let layer = self.layer;
        let format = args
            .first()
            .map(|&f| &layer.symbols[f])
            .filter(|s| s.is_constant() && s.ty.is_string())
            .and_then(|s| s.value.as_ref())
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ShadeError::new(
                    ErrorKind::NonConstantFormat,
                    "printf format must be a constant string",
                )
                .at(op)
            })?;
        let values = &args[1..];
        if let Some(&bad) = values
            .iter()
            .find(|&&a| !matches!(self.kind(a), Some(I | F | T | M)))
        {
            return Err(ShadeError::new(
                ErrorKind::UnsupportedFormatArgument,
                format!(
                    "cannot print '{}' of type {} from native code",
                    layer.symbols[bad].name, layer.symbols[bad].ty
                ),
            )
            .at(op));
        }
        let types: Vec<_> = values.iter().map(|&a| layer.symbols[a].ty).collect();
        let expanded = expand_printf(format, &types).map_err(|e| e.at(op))?;

        let mut widened = Vec::with_capacity(expanded.slots.len());
        for slot in &expanded.slots {
            let value = self.read(op, values[slot.arg], 0, slot.component)?;
            let value = match value {
                Num::F(v) => self.builder.ins().fpromote(types::F64, v),
                Num::I(v) => self.builder.ins().fcvt_from_sint(types::F64, v),
            };
            widened.push(value);
        }
        let buffer = if widened.is_empty() {
            self.builder.ins().iconst(self.ptr, 0)
        } else {
            let slot = self.builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                (8 * widened.len()) as u32,
                3,
            ));
            for (i, &v) in widened.iter().enumerate() {
                self.builder.ins().stack_store(v, slot, (8 * i) as i32);
            }
            self.builder.ins().stack_addr(self.ptr, slot, 0)
        };
        let index = self
            .builder
            .ins()
            .iconst(types::I32, self.formats.len() as i64);
        let count = self
            .builder
            .ins()
            .iconst(types::I32, widened.len() as i64);
        self.call(Helper::Printf, &[index, buffer, count]);
        self.formats.push(expanded);
        Ok(())
    }
}
