//! Assignment, triple construction and component access

use crate::execution::{active_points, ShadingExecution};
use crate::storage::Lane;
use glam::{Mat4, Vec3, Vec4};
use shader_ir::{OpIndex, ShaderLayer};
use shader_types::{ErrorKind, Result, ShadeError};

/// `T = T`, copied exactly
pub(crate) fn assign_same<T: Lane>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, src) = (args[0], args[1]);
    let varying = exec.prepare_dest(dst, &[src], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        T::load(exec.sym(src), p).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `R = A` through float components: int to float, float to int
/// (truncating) and scalar to triple (splat)
pub(crate) fn assign_convert<R: Lane, A: Lane>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, src) = (args[0], args[1]);
    let varying = exec.prepare_dest(dst, &[src], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let x = A::load(exec.sym(src), p);
        R::from_components(|i| x.component(i)).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `matrix = scalar` puts the scalar on the diagonal
pub(crate) fn assign_diagonal<A: Lane>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, src) = (args[0], args[1]);
    let varying = exec.prepare_dest(dst, &[src], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let s = A::load(exec.sym(src), p).component(0);
        Mat4::from_diagonal(Vec4::splat(s)).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `string = string`
pub(crate) fn assign_string(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, src) = (args[0], args[1]);
    let varying = exec.prepare_dest(dst, &[src], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let value = exec.sym(src).string(p, 0).to_string();
        exec.sym_mut(dst).set_string(p, 0, &value);
    }
    Ok(())
}

/// `triple = color|vector|point|normal(x, y, z)`
pub(crate) fn construct_triple(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, x, y, z) = (args[0], args[1], args[2], args[3]);
    let varying = exec.prepare_dest(dst, &[x, y, z], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let v = Vec3::new(
            exec.sym(x).float(p, 0, 0),
            exec.sym(y).float(p, 0, 0),
            exec.sym(z).float(p, 0, 0),
        );
        v.store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// Reject a constant index outside `[0, len)` before execution
pub(crate) fn check_constant_index(
    layer: &ShaderLayer,
    op: OpIndex,
    index: usize,
    len: usize,
) -> Result<()> {
    let symbol = &layer.symbols[index];
    if !symbol.is_constant() {
        return Ok(());
    }
    let value = symbol.value.as_ref().and_then(|v| v.as_int()).unwrap_or(0);
    if value < 0 || value as usize >= len {
        return Err(ShadeError::new(
            ErrorKind::IndexOutOfRange,
            format!(
                "index {} is out of range for '{}' (length {})",
                value, layer.ops[op].name, len
            ),
        )
        .at(op));
    }
    Ok(())
}

/// Resolve a runtime index; out of range reports (when checking) and yields
/// `None`, or clamps when checking is disabled
pub(crate) fn checked_index(
    exec: &ShadingExecution<'_>,
    index: i32,
    len: usize,
    faulted: &mut bool,
) -> Option<usize> {
    if index >= 0 && (index as usize) < len {
        return Some(index as usize);
    }
    if exec.config.check_varying_indices {
        *faulted = true;
        None
    } else {
        Some(index.clamp(0, len.saturating_sub(1) as i32) as usize)
    }
}

/// `float = triple[int]`
pub(crate) fn compref(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, src, index) = (args[0], args[1], args[2]);
    let varying = exec.prepare_dest(dst, &[src, index], runflags, begin, end);
    let mut faulted = false;
    for p in active_points(varying, runflags, begin, end) {
        let i = i32::load(exec.sym(index), p);
        let value = match checked_index(exec, i, 3, &mut faulted) {
            Some(i) => exec.sym(src).float(p, 0, i),
            None => 0.0,
        };
        value.store(exec.sym_mut(dst), p);
    }
    if faulted {
        exec.numeric_fault(op, "component index out of range");
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}
