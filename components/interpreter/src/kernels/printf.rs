//! `printf`: formatted output through the diagnostic sink

use crate::dispatch::Resolved;
use crate::execution::{active_points, ShadingExecution};
use shader_ir::{expand_printf, render_printf, FormatValue, OpIndex, ShaderLayer, SlotKind};
use shader_types::{ErrorKind, Result, ShadeError};

/// Expand the constant format of `printf fmt args...` once
pub(crate) fn resolve_printf(layer: &ShaderLayer, op: OpIndex) -> Result<Resolved> {
    let args = &layer.ops[op].args;
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
    let types: Vec<_> = args[1..].iter().map(|&a| layer.symbols[a].ty).collect();
    let expanded = expand_printf(format, &types).map_err(|e| e.at(op))?;
    Ok(Resolved {
        handler: printf,
        printf: Some(expanded),
    })
}

fn printf(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let Some(format) = exec.resolved_op(op)?.printf.as_ref() else {
        return Ok(());
    };
    let args = &exec.args(op)[1..];
    for p in active_points(true, runflags, begin, end) {
        let values: Vec<FormatValue> = format
            .slots
            .iter()
            .map(|slot| {
                let data = exec.sym(args[slot.arg]);
                match slot.kind {
                    SlotKind::Int => FormatValue::Int(data.int(p, 0, slot.component) as i64),
                    SlotKind::Float => FormatValue::Float(data.float(p, 0, slot.component) as f64),
                    SlotKind::String => FormatValue::Str(data.string(p, 0).to_string()),
                }
            })
            .collect();
        exec.print(&render_printf(format, &values));
    }
    Ok(())
}
