//! Array access: `aref`, `aassign`, `arraylength` and whole-array `assign`

use super::assign::{check_constant_index, checked_index};
use crate::dispatch::OpHandler;
use crate::execution::{active_points, ShadingExecution};
use crate::storage::Lane;
use shader_ir::{OpIndex, ShaderLayer};
use shader_types::{ErrorKind, Result, ShadeError, TypeSpec};

fn unsupported(layer: &ShaderLayer, op: OpIndex, detail: String) -> ShadeError {
    ShadeError::new(
        ErrorKind::UnsupportedTypes,
        format!("don't know how to {} {}", layer.ops[op].name, detail),
    )
    .at(op)
}

fn same_element(a: TypeSpec, b: TypeSpec) -> bool {
    a.base == b.base && a.aggregate == b.aggregate
}

fn arg_types<const N: usize>(layer: &ShaderLayer, op: OpIndex) -> Result<[TypeSpec; N]> {
    let args = &layer.ops[op].args;
    if args.len() != N {
        return Err(ShadeError::malformed(format!(
            "'{}' takes {} arguments, has {}",
            layer.ops[op].name,
            N,
            args.len()
        ))
        .at(op));
    }
    Ok(std::array::from_fn(|i| layer.symbols[args[i]].ty))
}

/// Check `dst = array[index]`
pub(crate) fn resolve_aref(layer: &ShaderLayer, op: OpIndex) -> Result<OpHandler> {
    let [dst, array, index] = arg_types::<3>(layer, op)?;
    if !array.is_array() || !index.is_int() || dst.is_array() || !same_element(dst, array) {
        return Err(unsupported(
            layer,
            op,
            format!("{} = {}[{}]", dst, array, index),
        ));
    }
    check_constant_index(layer, op, layer.ops[op].args[2], array.array_len)?;
    Ok(aref)
}

/// Check `array[index] = value`
pub(crate) fn resolve_aassign(layer: &ShaderLayer, op: OpIndex) -> Result<OpHandler> {
    let [array, index, value] = arg_types::<3>(layer, op)?;
    if !array.is_array() || !index.is_int() || value.is_array() || !same_element(value, array) {
        return Err(unsupported(
            layer,
            op,
            format!("{}[{}] = {}", array, index, value),
        ));
    }
    check_constant_index(layer, op, layer.ops[op].args[1], array.array_len)?;
    Ok(aassign)
}

/// Check `int = arraylength(array)`
pub(crate) fn resolve_arraylength(layer: &ShaderLayer, op: OpIndex) -> Result<OpHandler> {
    let [dst, array] = arg_types::<2>(layer, op)?;
    if !dst.is_int() || !array.is_array() {
        return Err(unsupported(layer, op, format!("{} = {}", dst, array)));
    }
    Ok(arraylength)
}

/// Check `array = array` of identical element type and length
pub(crate) fn resolve_assign_array(layer: &ShaderLayer, op: OpIndex) -> Result<OpHandler> {
    let [dst, src] = arg_types::<2>(layer, op)?;
    if dst.array_len != src.array_len || !same_element(dst, src) {
        return Err(unsupported(layer, op, format!("{} = {}", dst, src)));
    }
    Ok(assign_array)
}

fn aref(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, array, index) = (args[0], args[1], args[2]);
    let ty = exec.layer().symbols[array].ty;
    let components = ty.components();
    let varying = exec.prepare_dest(dst, &[array, index], runflags, begin, end);
    let mut faulted = false;
    for p in active_points(varying, runflags, begin, end) {
        let i = i32::load(exec.sym(index), p);
        match checked_index(exec, i, ty.array_len, &mut faulted) {
            Some(i) => {
                let element = exec.sym(array).read_slots(p, i * components, components);
                exec.sym_mut(dst).write_slots(p, 0, &element);
            }
            None => exec.sym_mut(dst).clear_slots(p, 0, components),
        }
    }
    if faulted {
        exec.numeric_fault(op, "array index out of range");
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

fn aassign(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (array, index, value) = (args[0], args[1], args[2]);
    let ty = exec.layer().symbols[array].ty;
    let components = ty.components();
    // Other elements survive the write, so the array is never demoted here
    if exec.sym(index).is_varying()
        || exec.sym(value).is_varying()
        || !exec.all_points_on(runflags, begin, end)
    {
        exec.sym_mut(array).adjust_varying(true);
    }
    let varying = exec.sym(array).is_varying();
    let mut faulted = false;
    for p in active_points(varying, runflags, begin, end) {
        let i = i32::load(exec.sym(index), p);
        if let Some(i) = checked_index(exec, i, ty.array_len, &mut faulted) {
            let element = exec.sym(value).read_slots(p, 0, components);
            exec.sym_mut(array).write_slots(p, i * components, &element);
        }
    }
    if faulted {
        exec.numeric_fault(op, "array index out of range");
    }
    exec.finish_dest(op, array, runflags, begin, end);
    Ok(())
}

fn arraylength(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, array) = (args[0], args[1]);
    let len = exec.layer().symbols[array].ty.array_len as i32;
    let varying = exec.prepare_dest(dst, &[], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        len.store(exec.sym_mut(dst), p);
    }
    Ok(())
}

fn assign_array(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, src) = (args[0], args[1]);
    if dst == src {
        return Ok(());
    }
    let stride = exec.sym(src).stride();
    let varying = exec.prepare_dest(dst, &[src], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let values = exec.sym(src).read_slots(p, 0, stride);
        exec.sym_mut(dst).write_slots(p, 0, &values);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}
