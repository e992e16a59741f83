//! Structured control flow under runflags
//!
//! A branch or loop body runs only for the points whose condition holds;
//! the others keep their state untouched. A loop ends once no point is
//! still active.

use crate::execution::ShadingExecution;
use shader_ir::{ControlFlow, LoopKind, OpIndex};
use shader_types::{Result, ShadeError};

/// `nop` and `end`
pub(crate) fn nop(
    _exec: &mut ShadingExecution<'_>,
    _op: OpIndex,
    _runflags: &[bool],
    _begin: usize,
    _end: usize,
) -> Result<()> {
    Ok(())
}

fn flow(exec: &ShadingExecution<'_>, op: OpIndex) -> Result<ControlFlow> {
    exec.layer().ops[op]
        .control(op)
        .ok_or_else(|| ShadeError::malformed("control op without targets").at(op))
}

/// Narrow `runflags` to points where `cond` is (or is not) true
fn mask(
    exec: &ShadingExecution<'_>,
    cond: usize,
    runflags: &[bool],
    begin: usize,
    end: usize,
    want: bool,
) -> Vec<bool> {
    let data = exec.sym(cond);
    runflags
        .iter()
        .enumerate()
        .map(|(p, &on)| on && p >= begin && p < end && (data.float(p, 0, 0) != 0.0) == want)
        .collect()
}

pub(crate) fn exec_if(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let ControlFlow::If {
        cond,
        else_start,
        after,
    } = flow(exec, op)?
    else {
        return Ok(());
    };
    let then_flags = mask(exec, cond, runflags, begin, end, true);
    let else_flags = mask(exec, cond, runflags, begin, end, false);
    if then_flags.contains(&true) {
        exec.run_range(op + 1, else_start, &then_flags, begin, end)?;
    }
    if else_flags.contains(&true) {
        exec.run_range(else_start, after, &else_flags, begin, end)?;
    }
    Ok(())
}

pub(crate) fn exec_loop(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let ControlFlow::Loop {
        kind,
        cond,
        init_start,
        cond_start,
        body_start,
        step_start,
        after,
    } = flow(exec, op)?
    else {
        return Ok(());
    };
    exec.run_range(init_start, cond_start, runflags, begin, end)?;
    let mut active = runflags.to_vec();
    let mut skip_test = kind == LoopKind::DoWhile;
    loop {
        if !skip_test {
            exec.run_range(cond_start, body_start, &active, begin, end)?;
            active = mask(exec, cond, &active, begin, end, true);
            if !active.contains(&true) {
                break;
            }
        }
        skip_test = false;
        exec.run_range(body_start, step_start, &active, begin, end)?;
        exec.run_range(step_start, after, &active, begin, end)?;
    }
    Ok(())
}
