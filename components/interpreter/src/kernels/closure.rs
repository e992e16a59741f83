//! Closure construction and algebra
//!
//! Closure results are always varying: every point owns its own tree, and
//! trees share operand nodes instead of copying them.

use crate::dispatch::OpHandler;
use crate::execution::{active_points, ShadingExecution};
use crate::storage::Lane;
use closures::{ClosureColor, ClosureParam, ClosureRegistry, ParamType};
use glam::Vec3;
use shader_ir::{OpIndex, ShaderLayer};
use shader_types::{ErrorKind, Result, ShadeError};

/// Check `closure result "name" params...` against the registry
pub(crate) fn resolve_closure(layer: &ShaderLayer, op: OpIndex) -> Result<OpHandler> {
    let args = &layer.ops[op].args;
    let (Some(&dst), Some(&name)) = (args.first(), args.get(1)) else {
        return Err(ShadeError::malformed("'closure' needs a result and a name").at(op));
    };
    if !layer.symbols[dst].ty.is_closure() {
        return Err(ShadeError::new(
            ErrorKind::UnsupportedTypes,
            format!("closure result must be a closure, got {}", layer.symbols[dst].ty),
        )
        .at(op));
    }
    let name = closure_name(layer, name).ok_or_else(|| {
        ShadeError::new(
            ErrorKind::UnknownClosure,
            "closure name must be a constant string",
        )
        .at(op)
    })?;
    let descriptor = ClosureRegistry::builtin().get(name).ok_or_else(|| {
        ShadeError::new(ErrorKind::UnknownClosure, format!("no closure named '{}'", name)).at(op)
    })?;
    let params = &args[2..];
    let matches = params.len() == descriptor.params.len()
        && params.iter().zip(descriptor.params).all(|(&p, expected)| {
            let ty = layer.symbols[p].ty;
            match expected {
                ParamType::Vector => ty.is_triple(),
                ParamType::Float => ty.is_numeric() && ty.components() == 1 && !ty.is_array(),
            }
        });
    if !matches {
        return Err(ShadeError::new(
            ErrorKind::UnsupportedTypes,
            format!(
                "closure '{}' expects {:?}, got ({})",
                name,
                descriptor.params,
                params
                    .iter()
                    .map(|&p| layer.symbols[p].ty.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
        .at(op));
    }
    Ok(construct)
}

fn closure_name(layer: &ShaderLayer, id: usize) -> Option<&str> {
    let symbol = &layer.symbols[id];
    if !symbol.is_constant() || !symbol.ty.is_string() {
        return None;
    }
    symbol.value.as_ref()?.as_str()
}

fn construct(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, name) = (args[0], args[1]);
    let name = closure_name(exec.layer(), name).unwrap_or_default().to_string();
    exec.sym_mut(dst).adjust_varying(true);
    for p in active_points(true, runflags, begin, end) {
        let params: Vec<ClosureParam> = args[2..]
            .iter()
            .map(|&a| {
                if exec.layer().symbols[a].ty.is_triple() {
                    ClosureParam::Vector(Vec3::load(exec.sym(a), p))
                } else {
                    ClosureParam::Float(exec.sym(a).float(p, 0, 0))
                }
            })
            .collect();
        let closure = ClosureRegistry::builtin()
            .build(&name, &params)
            .map_err(|e| e.at(op))?;
        exec.sym_mut(dst).set_closure(p, 0, closure);
    }
    Ok(())
}

/// Per-point closure combination
pub(crate) trait ClosureFn {
    /// Combine the operand values of one point; set `faulted` on a zero divisor
    fn apply(
        exec: &ShadingExecution<'_>,
        args: &[usize],
        point: usize,
        faulted: &mut bool,
    ) -> ClosureColor;
}

/// `closure = closure`
pub struct CopyClosure;
/// `closure = closure + closure`
pub struct AddClosure;
/// `closure = closure - closure`
pub struct SubClosure;
/// `closure = -closure`
pub struct NegClosure;
/// `closure = closure * weight` or `weight * closure`; `W` is the weight lane
pub struct ScaleClosure<W, const WEIGHT_FIRST: bool>(std::marker::PhantomData<W>);
/// `closure = closure / weight`
pub struct DivClosure<W>(std::marker::PhantomData<W>);

impl ClosureFn for CopyClosure {
    fn apply(exec: &ShadingExecution<'_>, args: &[usize], p: usize, _: &mut bool) -> ClosureColor {
        exec.sym(args[1]).closure(p, 0)
    }
}

impl ClosureFn for AddClosure {
    fn apply(exec: &ShadingExecution<'_>, args: &[usize], p: usize, _: &mut bool) -> ClosureColor {
        let a = exec.sym(args[1]).closure(p, 0);
        a.add(&exec.sym(args[2]).closure(p, 0))
    }
}

impl ClosureFn for SubClosure {
    fn apply(exec: &ShadingExecution<'_>, args: &[usize], p: usize, _: &mut bool) -> ClosureColor {
        let a = exec.sym(args[1]).closure(p, 0);
        a.sub(&exec.sym(args[2]).closure(p, 0))
    }
}

impl ClosureFn for NegClosure {
    fn apply(exec: &ShadingExecution<'_>, args: &[usize], p: usize, _: &mut bool) -> ClosureColor {
        exec.sym(args[1]).closure(p, 0).negate()
    }
}

fn weight<W: Lane>(exec: &ShadingExecution<'_>, id: usize, p: usize) -> Vec3 {
    let w = W::load(exec.sym(id), p);
    Vec3::new(w.component(0), w.component(1), w.component(2))
}

impl<W: Lane, const WEIGHT_FIRST: bool> ClosureFn for ScaleClosure<W, WEIGHT_FIRST> {
    fn apply(exec: &ShadingExecution<'_>, args: &[usize], p: usize, _: &mut bool) -> ClosureColor {
        let (c, w) = if WEIGHT_FIRST {
            (args[2], args[1])
        } else {
            (args[1], args[2])
        };
        exec.sym(c).closure(p, 0).scale(weight::<W>(exec, w, p))
    }
}

impl<W: Lane> ClosureFn for DivClosure<W> {
    fn apply(
        exec: &ShadingExecution<'_>,
        args: &[usize],
        p: usize,
        faulted: &mut bool,
    ) -> ClosureColor {
        let w = weight::<W>(exec, args[2], p);
        *faulted |= w.cmpeq(Vec3::ZERO).any();
        let inverse = Vec3::select(w.cmpeq(Vec3::ZERO), Vec3::ZERO, w.recip());
        exec.sym(args[1]).closure(p, 0).scale(inverse)
    }
}

/// Evaluate a closure combination for every active point
pub(crate) fn closure_op<K: ClosureFn>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let dst = args[0];
    exec.sym_mut(dst).adjust_varying(true);
    let mut faulted = false;
    for p in active_points(true, runflags, begin, end) {
        let value = K::apply(exec, args, p, &mut faulted);
        exec.sym_mut(dst).set_closure(p, 0, value);
    }
    if faulted {
        exec.numeric_fault(op, "division by zero");
    }
    Ok(())
}
