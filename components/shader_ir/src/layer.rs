//! Shader layer - the unit both execution paths accept
//!
//! A layer is a symbol table plus a flat opcode sequence. Builders here are
//! used by tests and by the JSON loader; `validate()` is the structural gate
//! every backend runs before touching a layer.

use crate::opcode::{ControlFlow, LoopKind, OpIndex, Opcode};
use crate::symbol::{ConstValue, Symbol, SymbolId, SymbolKind};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use shader_types::{global_field, is_global_name, BaseType, Result, ShadeError, TypeSpec};

/// Symbols and instructions of one compiled shader layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderLayer {
    /// Layer name
    pub name: String,
    /// Symbol table
    pub symbols: Vec<Symbol>,
    /// Flat instruction sequence
    pub ops: Vec<Opcode>,
}

impl ShaderLayer {
    /// Create an empty layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Append a symbol, returning its id
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol);
        self.symbols.len() - 1
    }

    fn add_const(&mut self, ty: TypeSpec, value: ConstValue) -> SymbolId {
        let name = format!("$const{}", self.symbols.len());
        self.add_symbol(Symbol::constant(name, ty, value))
    }

    /// Add an `int` constant
    pub fn add_int_const(&mut self, value: i32) -> SymbolId {
        self.add_const(TypeSpec::int(), ConstValue::Int(vec![value]))
    }

    /// Add a `float` constant
    pub fn add_float_const(&mut self, value: f32) -> SymbolId {
        self.add_const(TypeSpec::float(), ConstValue::Float(vec![value]))
    }

    /// Add a triple constant of type `ty` (color, point, vector or normal)
    pub fn add_triple_const(&mut self, ty: TypeSpec, value: Vec3) -> SymbolId {
        self.add_const(ty, ConstValue::Float(value.to_array().to_vec()))
    }

    /// Add a `matrix` constant; literals are stored row-major
    pub fn add_matrix_const(&mut self, value: Mat4) -> SymbolId {
        self.add_const(
            TypeSpec::matrix(),
            ConstValue::Float(value.transpose().to_cols_array().to_vec()),
        )
    }

    /// Add a `string` constant
    pub fn add_string_const(&mut self, value: impl Into<String>) -> SymbolId {
        self.add_const(TypeSpec::string(), ConstValue::String(vec![value.into()]))
    }

    /// Add a renderer global such as `P` or `u`
    ///
    /// Globals the state record supplies screen-space derivatives for are
    /// declared with derivative planes.
    pub fn add_global(&mut self, name: &str, ty: TypeSpec) -> SymbolId {
        let mut symbol = Symbol::new(name, ty, SymbolKind::Global).varying();
        symbol.has_derivs = global_field(name, 1).is_some();
        self.add_symbol(symbol)
    }

    /// Append an instruction, returning its index
    pub fn emit(&mut self, name: &str, args: &[SymbolId]) -> OpIndex {
        self.ops.push(Opcode::new(name, args));
        self.ops.len() - 1
    }

    /// Set the jump targets of instruction `op`
    pub fn set_jumps(&mut self, op: OpIndex, jumps: &[OpIndex]) {
        if let Some(opcode) = self.ops.get_mut(op) {
            opcode.jumps = jumps.iter().take(4).copied().collect();
        }
    }

    /// Emit `if (cond) { then } else { otherwise }`
    pub fn emit_if(
        &mut self,
        cond: SymbolId,
        then: impl FnOnce(&mut Self),
        otherwise: impl FnOnce(&mut Self),
    ) -> OpIndex {
        let op = self.emit("if", &[cond]);
        then(self);
        let else_start = self.ops.len();
        otherwise(self);
        let after = self.ops.len();
        self.set_jumps(op, &[else_start, after]);
        op
    }

    /// Emit a loop; `cond_ops` must recompute `cond` on every iteration
    pub fn emit_loop(
        &mut self,
        kind: LoopKind,
        cond: SymbolId,
        init: impl FnOnce(&mut Self),
        cond_ops: impl FnOnce(&mut Self),
        body: impl FnOnce(&mut Self),
        step: impl FnOnce(&mut Self),
    ) -> OpIndex {
        let op = self.emit(kind.op_name(), &[cond]);
        init(self);
        let cond_start = self.ops.len();
        cond_ops(self);
        let body_start = self.ops.len();
        body(self);
        let step_start = self.ops.len();
        step(self);
        let after = self.ops.len();
        self.set_jumps(op, &[cond_start, body_start, step_start, after]);
        op
    }

    /// Symbol `id`
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    /// Instruction `op`
    pub fn opcode(&self, op: OpIndex) -> Option<&Opcode> {
        self.ops.get(op)
    }

    /// First symbol named `name`
    pub fn find_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.iter().position(|s| s.name == name)
    }

    /// Check the layer is structurally sound
    pub fn validate(&self) -> Result<()> {
        for (index, symbol) in self.symbols.iter().enumerate() {
            check_symbol(index, symbol)?;
        }
        for (index, op) in self.ops.iter().enumerate() {
            if let Some(&bad) = op.args.iter().find(|&&a| a >= self.symbols.len()) {
                return Err(ShadeError::malformed(format!(
                    "'{}' references symbol {} of {}",
                    op.name,
                    bad,
                    self.symbols.len()
                ))
                .at(index));
            }
            if op.is_control() {
                let flow = op.control(index).ok_or_else(|| {
                    ShadeError::malformed(format!(
                        "'{}' needs a condition and {} jump targets, has {}",
                        op.name,
                        if op.name == "if" { 2 } else { 4 },
                        op.jumps.len()
                    ))
                    .at(index)
                })?;
                self.check_targets(index, &flow)?;
            }
        }
        self.check_nesting(0, self.ops.len())
    }

    fn check_targets(&self, op: OpIndex, flow: &ControlFlow) -> Result<()> {
        let mut previous = op + 1;
        for (start, end) in flow.regions(op) {
            if start < previous || end < start {
                return Err(ShadeError::malformed("jump targets out of order").at(op));
            }
            previous = end;
        }
        if flow.after() > self.ops.len() {
            return Err(ShadeError::malformed(format!(
                "jump target {} past the end of {} ops",
                flow.after(),
                self.ops.len()
            ))
            .at(op));
        }
        Ok(())
    }

    /// Every nested statement must end inside the region that contains it
    fn check_nesting(&self, begin: OpIndex, end: OpIndex) -> Result<()> {
        let mut op = begin;
        while op < end {
            match self.ops[op].control(op) {
                Some(flow) => {
                    if flow.after() > end {
                        return Err(ShadeError::malformed(format!(
                            "'{}' extends past its enclosing region (ends at {})",
                            self.ops[op].name, end
                        ))
                        .at(op));
                    }
                    for (start, stop) in flow.regions(op) {
                        self.check_nesting(start, stop)?;
                    }
                    op = flow.after();
                }
                None => op += 1,
            }
        }
        Ok(())
    }

    /// Serialize to the JSON interchange format
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ShadeError::malformed(e.to_string()))
    }

    /// Load and validate a layer from JSON
    pub fn from_json(text: &str) -> Result<Self> {
        let layer: Self =
            serde_json::from_str(text).map_err(|e| ShadeError::malformed(e.to_string()))?;
        layer.validate()?;
        Ok(layer)
    }
}

fn check_symbol(index: SymbolId, symbol: &Symbol) -> Result<()> {
    if symbol.is_global() && !is_global_name(&symbol.name) {
        return Err(ShadeError::malformed(format!(
            "symbol {} '{}' is not a known global",
            index, symbol.name
        )));
    }
    if !symbol.is_constant() {
        return Ok(());
    }
    let ty = symbol.ty;
    let expected = ty.components() * ty.elements();
    let fits = match &symbol.value {
        Some(ConstValue::Int(v)) => ty.base == BaseType::Int && v.len() == expected,
        Some(ConstValue::Float(v)) => ty.is_float_based() && v.len() == expected,
        Some(ConstValue::String(v)) => ty.is_string() && v.len() == ty.elements(),
        None => false,
    };
    if fits {
        Ok(())
    } else {
        Err(ShadeError::malformed(format!(
            "constant {} '{}' of type {} has a mismatched literal {:?}",
            index, symbol.name, ty, symbol.value
        )))
    }
}
