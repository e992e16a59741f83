//! Type-directed opcode specialization
//!
//! Every opcode is bound, on first execution, to exactly one monomorphic
//! handler chosen by its name and the kinds of its operands. The table of
//! handlers is built once per process; structural ops (control flow,
//! `printf`, closures, arrays) are checked by dedicated resolvers instead.

use crate::execution::ShadingExecution;
use crate::kernels::arith::{
    binary, binary_int, matrix_op, scalar_pair_to_matrix, Add, Div, MatDiv, MatMul, Mod, Mul,
    ScalarDivMatrix, Sub,
};
use crate::kernels::assign::{
    assign_convert, assign_diagonal, assign_same, assign_string, check_constant_index,
    compref, construct_triple,
};
use crate::kernels::closure::{
    closure_op, AddClosure, CopyClosure, DivClosure, NegClosure, ScaleClosure, SubClosure,
};
use crate::kernels::compare::{compare, compare_int, compare_string, Eq, Ge, Gt, Le, Lt, Neq};
use crate::kernels::math::{
    cross_op, dot, reduce, unary, unary_int, Abs, Cos, Length, Luminance, Neg, Normalize, Sin,
    Sqrt,
};
use crate::kernels::{arrays, closure, control, printf};
use arrayvec::ArrayVec;
use glam::{Mat4, Vec3};
use shader_ir::{OpIndex, PrintfFormat, ShaderLayer};
use shader_types::{ErrorKind, OperandKind, Result, ShadeError};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// A monomorphic opcode implementation over a point range
pub type OpHandler =
    fn(&mut ShadingExecution<'_>, OpIndex, &[bool], usize, usize) -> Result<()>;

/// Outcome of specializing one opcode
pub struct Resolved {
    /// Handler every later execution calls directly
    pub handler: OpHandler,
    /// Expanded format of a `printf`
    pub printf: Option<PrintfFormat>,
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("printf", &self.printf.as_ref().map(|p| p.text.as_str()))
            .finish_non_exhaustive()
    }
}

impl From<OpHandler> for Resolved {
    fn from(handler: OpHandler) -> Self {
        Self {
            handler,
            printf: None,
        }
    }
}

/// Key of the specialization table: op name, destination kind, operand kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecKey {
    /// Operation name
    pub op: String,
    /// Destination kind
    pub dst: OperandKind,
    /// Source operand kinds
    pub args: ArrayVec<OperandKind, 3>,
}

impl SpecKey {
    /// Build a key
    pub fn new(op: &str, dst: OperandKind, args: &[OperandKind]) -> Self {
        Self {
            op: op.to_string(),
            dst,
            args: args.iter().take(3).copied().collect(),
        }
    }
}

struct Table {
    handlers: HashMap<SpecKey, OpHandler>,
    names: HashSet<String>,
}

impl Table {
    fn add(&mut self, op: &str, dst: OperandKind, args: &[OperandKind], handler: OpHandler) {
        self.names.insert(op.to_string());
        self.handlers.insert(SpecKey::new(op, dst, args), handler);
    }
}

use OperandKind::{Closure as C, Float as F, Int as I, Matrix as M, String as S, Triple as T};

/// Register one arithmetic op for every supported operand combination
macro_rules! arith {
    ($t:ident, $op:literal, $k:ty) => {{
        // Exact integer path
        $t.add($op, I, &[I, I], binary_int::<i32, $k>);
        $t.add($op, F, &[I, I], binary_int::<f32, $k>);
        // Scalars mixed: promote, demote only into int
        $t.add($op, F, &[F, F], binary::<f32, f32, f32, $k>);
        $t.add($op, F, &[I, F], binary::<f32, i32, f32, $k>);
        $t.add($op, F, &[F, I], binary::<f32, f32, i32, $k>);
        $t.add($op, I, &[F, F], binary::<i32, f32, f32, $k>);
        $t.add($op, I, &[I, F], binary::<i32, i32, f32, $k>);
        $t.add($op, I, &[F, I], binary::<i32, f32, i32, $k>);
        // Triples, scalars broadcast
        $t.add($op, T, &[T, T], binary::<Vec3, Vec3, Vec3, $k>);
        $t.add($op, T, &[T, F], binary::<Vec3, Vec3, f32, $k>);
        $t.add($op, T, &[T, I], binary::<Vec3, Vec3, i32, $k>);
    }};
}

/// Operand combinations shared by add, sub, mul and div but not mod
macro_rules! arith_field {
    ($t:ident, $op:literal, $k:ty) => {{
        $t.add($op, T, &[F, T], binary::<Vec3, f32, Vec3, $k>);
        $t.add($op, T, &[I, T], binary::<Vec3, i32, Vec3, $k>);
        $t.add($op, T, &[F, F], binary::<Vec3, f32, f32, $k>);
        $t.add($op, M, &[M, F], binary::<Mat4, Mat4, f32, $k>);
        $t.add($op, M, &[M, I], binary::<Mat4, Mat4, i32, $k>);
        $t.add($op, M, &[F, F], scalar_pair_to_matrix::<f32, f32, $k>);
        $t.add($op, M, &[I, I], scalar_pair_to_matrix::<i32, i32, $k>);
        $t.add($op, M, &[F, I], scalar_pair_to_matrix::<f32, i32, $k>);
        $t.add($op, M, &[I, F], scalar_pair_to_matrix::<i32, f32, $k>);
    }};
}

macro_rules! comparison {
    ($t:ident, $op:literal, $k:ty) => {{
        for dst in [I, F] {
            let int: OpHandler = if dst == I {
                compare_int::<i32, $k>
            } else {
                compare_int::<f32, $k>
            };
            $t.add($op, dst, &[I, I], int);
        }
        $t.add($op, I, &[F, F], compare::<i32, f32, f32, $k>);
        $t.add($op, I, &[I, F], compare::<i32, i32, f32, $k>);
        $t.add($op, I, &[F, I], compare::<i32, f32, i32, $k>);
        $t.add($op, I, &[T, T], compare::<i32, Vec3, Vec3, $k>);
        $t.add($op, I, &[T, F], compare::<i32, Vec3, f32, $k>);
        $t.add($op, I, &[F, T], compare::<i32, f32, Vec3, $k>);
        $t.add($op, I, &[M, M], compare::<i32, Mat4, Mat4, $k>);
        $t.add($op, F, &[F, F], compare::<f32, f32, f32, $k>);
        $t.add($op, F, &[I, F], compare::<f32, i32, f32, $k>);
        $t.add($op, F, &[F, I], compare::<f32, f32, i32, $k>);
        $t.add($op, F, &[T, T], compare::<f32, Vec3, Vec3, $k>);
    }};
}

macro_rules! unary_float {
    ($t:ident, $op:literal, $k:ty) => {{
        $t.add($op, F, &[F], unary::<f32, f32, $k>);
        $t.add($op, F, &[I], unary::<f32, i32, $k>);
        $t.add($op, T, &[T], unary::<Vec3, Vec3, $k>);
    }};
}

fn build_table() -> Table {
    let mut t = Table {
        handlers: HashMap::new(),
        names: HashSet::new(),
    };

    arith!(t, "add", Add);
    arith!(t, "sub", Sub);
    arith!(t, "mul", Mul);
    arith!(t, "div", Div);
    arith!(t, "mod", Mod);
    arith_field!(t, "add", Add);
    arith_field!(t, "sub", Sub);
    arith_field!(t, "mul", Mul);
    arith_field!(t, "div", Div);

    // Element-wise matrix forms and linear algebra
    t.add("add", M, &[M, M], binary::<Mat4, Mat4, Mat4, Add>);
    t.add("sub", M, &[M, M], binary::<Mat4, Mat4, Mat4, Sub>);
    t.add("add", M, &[F, M], binary::<Mat4, f32, Mat4, Add>);
    t.add("sub", M, &[F, M], binary::<Mat4, f32, Mat4, Sub>);
    t.add("mul", M, &[F, M], binary::<Mat4, f32, Mat4, Mul>);
    t.add("mul", M, &[I, M], binary::<Mat4, i32, Mat4, Mul>);
    t.add("mul", M, &[M, M], matrix_op::<Mat4, Mat4, MatMul>);
    t.add("div", M, &[M, M], matrix_op::<Mat4, Mat4, MatDiv>);
    t.add("div", M, &[F, M], matrix_op::<f32, Mat4, ScalarDivMatrix>);
    t.add("div", M, &[I, M], matrix_op::<i32, Mat4, ScalarDivMatrix>);

    comparison!(t, "eq", Eq);
    comparison!(t, "neq", Neq);
    comparison!(t, "lt", Lt);
    comparison!(t, "le", Le);
    comparison!(t, "gt", Gt);
    comparison!(t, "ge", Ge);
    t.add("eq", I, &[S, S], compare_string::<i32, Eq>);
    t.add("neq", I, &[S, S], compare_string::<i32, Neq>);

    unary_float!(t, "neg", Neg);
    unary_float!(t, "abs", Abs);
    unary_float!(t, "fabs", Abs);
    unary_float!(t, "sqrt", Sqrt);
    unary_float!(t, "sin", Sin);
    unary_float!(t, "cos", Cos);
    t.add("neg", I, &[I], unary_int::<Neg>);
    t.add("abs", I, &[I], unary_int::<Abs>);
    t.add("neg", M, &[M], unary::<Mat4, Mat4, Neg>);

    t.add("length", F, &[T], reduce::<f32, Length>);
    t.add("luminance", F, &[T], reduce::<f32, Luminance>);
    t.add("normalize", T, &[T], reduce::<Vec3, Normalize>);
    t.add("dot", F, &[T, T], dot);
    t.add("cross", T, &[T, T], cross_op);
    t.add("compref", F, &[T, I], compref);
    for ctor in ["color", "vector", "point", "normal"] {
        for x in [I, F] {
            for y in [I, F] {
                for z in [I, F] {
                    t.add(ctor, T, &[x, y, z], construct_triple);
                }
            }
        }
    }

    t.add("assign", I, &[I], assign_same::<i32>);
    t.add("assign", F, &[F], assign_same::<f32>);
    t.add("assign", T, &[T], assign_same::<Vec3>);
    t.add("assign", M, &[M], assign_same::<Mat4>);
    t.add("assign", F, &[I], assign_convert::<f32, i32>);
    t.add("assign", I, &[F], assign_convert::<i32, f32>);
    t.add("assign", T, &[F], assign_convert::<Vec3, f32>);
    t.add("assign", T, &[I], assign_convert::<Vec3, i32>);
    t.add("assign", M, &[F], assign_diagonal::<f32>);
    t.add("assign", M, &[I], assign_diagonal::<i32>);
    t.add("assign", S, &[S], assign_string);

    t.add("assign", C, &[C], closure_op::<CopyClosure>);
    t.add("add", C, &[C, C], closure_op::<AddClosure>);
    t.add("sub", C, &[C, C], closure_op::<SubClosure>);
    t.add("neg", C, &[C], closure_op::<NegClosure>);
    t.add("mul", C, &[C, T], closure_op::<ScaleClosure<Vec3, false>>);
    t.add("mul", C, &[T, C], closure_op::<ScaleClosure<Vec3, true>>);
    t.add("mul", C, &[C, F], closure_op::<ScaleClosure<f32, false>>);
    t.add("mul", C, &[F, C], closure_op::<ScaleClosure<f32, true>>);
    t.add("div", C, &[C, T], closure_op::<DivClosure<Vec3>>);
    t.add("div", C, &[C, F], closure_op::<DivClosure<f32>>);

    for name in [
        "nop", "end", "if", "for", "while", "dowhile", "printf", "closure", "aref", "aassign",
        "arraylength",
    ] {
        t.names.insert(name.to_string());
    }
    debug!(handlers = t.handlers.len(), "specialization table built");
    t
}

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

/// Number of monomorphic handlers in the specialization table
pub fn specialization_count() -> usize {
    table().handlers.len()
}

/// Pick the implementation of opcode `op` from its operand types
pub(crate) fn resolve(layer: &ShaderLayer, op: OpIndex) -> Result<Resolved> {
    let opcode = &layer.ops[op];
    let handler: OpHandler = match opcode.name.as_str() {
        "nop" | "end" => control::nop,
        "if" => control::exec_if,
        "for" | "while" | "dowhile" => control::exec_loop,
        "printf" => return printf::resolve_printf(layer, op),
        "closure" => closure::resolve_closure(layer, op)?,
        "aref" => arrays::resolve_aref(layer, op)?,
        "aassign" => arrays::resolve_aassign(layer, op)?,
        "arraylength" => arrays::resolve_arraylength(layer, op)?,
        "assign"
            if opcode
                .args
                .iter()
                .any(|&a| layer.symbols[a].ty.is_array()) =>
        {
            arrays::resolve_assign_array(layer, op)?
        }
        _ => lookup(layer, op)?,
    };
    if opcode.name == "compref" {
        check_constant_index(layer, op, opcode.args[2], 3)?;
    }
    Ok(handler.into())
}

fn lookup(layer: &ShaderLayer, op: OpIndex) -> Result<OpHandler> {
    let opcode = &layer.ops[op];
    let table = table();
    if !table.names.contains(&opcode.name) {
        return Err(ShadeError::new(
            ErrorKind::UnsupportedOpcode,
            format!("unknown opcode '{}'", opcode.name),
        )
        .at(op));
    }
    let kinds: Option<Vec<OperandKind>> = opcode
        .args
        .iter()
        .map(|&a| layer.symbols[a].ty.kind())
        .collect();
    let handler = kinds.and_then(|kinds| {
        let (dst, args) = kinds.split_first()?;
        if args.len() > 3 {
            return None;
        }
        table.handlers.get(&SpecKey::new(&opcode.name, *dst, args))
    });
    handler.copied().ok_or_else(|| {
        ShadeError::new(
            ErrorKind::UnsupportedTypes,
            format!("don't know how to {} {}", opcode.name, signature(layer, op)),
        )
        .at(op)
    })
}

/// `float = string + float` style description of an opcode's types
fn signature(layer: &ShaderLayer, op: OpIndex) -> String {
    let opcode = &layer.ops[op];
    let types: Vec<String> = opcode
        .args
        .iter()
        .map(|&a| layer.symbols[a].ty.to_string())
        .collect();
    let Some((dst, args)) = types.split_first() else {
        return String::from("()");
    };
    let symbol = match opcode.name.as_str() {
        "add" => "+",
        "sub" => "-",
        "mul" => "*",
        "div" => "/",
        "mod" => "%",
        "eq" => "==",
        "neq" => "!=",
        "lt" => "<",
        "le" => "<=",
        "gt" => ">",
        "ge" => ">=",
        _ => "",
    };
    match (symbol, args) {
        ("", _) => format!("{} = {}({})", dst, opcode.name, args.join(", ")),
        (symbol, [a, b]) => format!("{} = {} {} {}", dst, a, symbol, b),
        (_, _) => format!("{} = {}({})", dst, opcode.name, args.join(", ")),
    }
}
