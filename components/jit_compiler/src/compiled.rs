//! Compiled layers

use crate::blocks::BlockPlan;
use crate::runtime;
use shader_ir::{render_printf, FormatValue, PrintfFormat, SlotKind};
use shader_types::{Diagnostic, DiagnosticSink, ShaderGlobals};
use std::marker::PhantomData;
use tracing::warn;

/// Native entry point: one invocation shades one point
pub type ShadeFn = unsafe extern "C" fn(*mut ShaderGlobals);

/// A layer compiled to native code
///
/// Borrows the [`CompileSession`](crate::CompileSession) whose module holds
/// the code. The function keeps no state between calls, so one compiled
/// layer may be invoked from many threads with distinct state records.
#[derive(Debug)]
pub struct CompiledLayer<'s> {
    name: String,
    entry: ShadeFn,
    op_names: Vec<String>,
    formats: Vec<PrintfFormat>,
    plan: BlockPlan,
    _session: PhantomData<&'s ()>,
}

impl<'s> CompiledLayer<'s> {
    pub(crate) fn new(
        name: String,
        entry: ShadeFn,
        op_names: Vec<String>,
        formats: Vec<PrintfFormat>,
        plan: BlockPlan,
    ) -> Self {
        Self {
            name,
            entry,
            op_names,
            formats,
            plan,
            _session: PhantomData,
        }
    }

    /// Layer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block plan the function was emitted from
    pub fn plan(&self) -> &BlockPlan {
        &self.plan
    }

    /// `printf` formats, expanded at compile time
    pub fn formats(&self) -> &[PrintfFormat] {
        &self.formats
    }

    /// Shade one point
    ///
    /// Numeric faults raised while running are reported to `sink` once per
    /// faulting op execution, followed by any `printf` output.
    pub fn invoke(&self, globals: &mut ShaderGlobals, sink: &dyn DiagnosticSink) {
        runtime::reset();
        // SAFETY: `entry` was compiled for exactly this signature and the
        // session owning its memory outlives `self`
        unsafe { (self.entry)(globals as *mut ShaderGlobals) };

        for fault in runtime::take_faults() {
            let name = self.op_names.get(fault.op).map_or("?", String::as_str);
            warn!(op = fault.op, name, detail = fault.message, "numeric fault");
            sink.report(Diagnostic::new(fault.op, name, fault.message));
        }
        for printed in runtime::take_output() {
            let Some(format) = self.formats.get(printed.format) else {
                continue;
            };
            let values: Vec<FormatValue> = format
                .slots
                .iter()
                .zip(&printed.values)
                .map(|(slot, &v)| match slot.kind {
                    SlotKind::Int => FormatValue::Int(v as i64),
                    _ => FormatValue::Float(v),
                })
                .collect();
            sink.print(&render_printf(format, &values));
        }
    }
}
