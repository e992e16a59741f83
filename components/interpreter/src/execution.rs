//! Batch execution of a layer
//!
//! `ExecutableLayer` owns a validated layer plus one resolution slot per
//! opcode. `ShadingExecution` holds the symbol storage of one batch of
//! points and runs opcodes over point ranges under a runflag mask.

use crate::dispatch::{resolve, OpHandler, Resolved};
use crate::storage::{Lane, SymbolData};
use closures::ClosureColor;
use glam::{Mat4, Vec3};
use shader_ir::{OpIndex, ShaderLayer, SymbolId};
use shader_types::{
    Diagnostic, DiagnosticSink, FieldValue, Result, RuntimeConfig, ShadeError, ShaderGlobals,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use tracing::{debug, instrument, trace, warn};

/// Specialization state of one opcode
#[derive(Clone, Copy)]
pub enum Resolution {
    /// Not executed or prepared yet
    Unresolved,
    /// Bound to a monomorphic handler
    Resolved(OpHandler),
}

impl Resolution {
    /// True once a handler is bound
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Unresolved => f.write_str("Unresolved"),
            Resolution::Resolved(_) => f.write_str("Resolved"),
        }
    }
}

/// A validated layer with per-opcode specialization slots
#[derive(Debug)]
pub struct ExecutableLayer {
    layer: ShaderLayer,
    resolved: Vec<OnceLock<Resolved>>,
    resolutions: AtomicUsize,
}

impl ExecutableLayer {
    /// Validate `layer` and wrap it for execution
    pub fn new(layer: ShaderLayer) -> Result<Self> {
        layer.validate()?;
        let resolved = (0..layer.ops.len()).map(|_| OnceLock::new()).collect();
        Ok(Self {
            layer,
            resolved,
            resolutions: AtomicUsize::new(0),
        })
    }

    /// The wrapped layer
    pub fn layer(&self) -> &ShaderLayer {
        &self.layer
    }

    /// Resolve opcode `op`, reusing an earlier resolution
    pub fn resolved(&self, op: OpIndex) -> Result<&Resolved> {
        let slot = self
            .resolved
            .get(op)
            .ok_or_else(|| ShadeError::malformed(format!("no opcode {}", op)))?;
        if let Some(resolved) = slot.get() {
            return Ok(resolved);
        }
        let resolved = resolve(&self.layer, op)?;
        if slot.set(resolved).is_ok() {
            self.resolutions.fetch_add(1, Ordering::Relaxed);
            trace!(op, name = %self.layer.ops[op].name, "opcode resolved");
        }
        slot.get()
            .ok_or_else(|| ShadeError::malformed(format!("opcode {} lost its resolution", op)))
    }

    /// Current specialization state of `op`
    pub fn resolution(&self, op: OpIndex) -> Resolution {
        match self.resolved.get(op).and_then(OnceLock::get) {
            Some(resolved) => Resolution::Resolved(resolved.handler),
            None => Resolution::Unresolved,
        }
    }

    /// Number of type resolutions performed so far
    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Resolve every opcode up front
    #[instrument(skip_all, fields(layer = %self.layer.name))]
    pub fn prepare(&self) -> Result<()> {
        for op in 0..self.layer.ops.len() {
            self.resolved(op)?;
        }
        debug!(ops = self.layer.ops.len(), "layer prepared");
        Ok(())
    }

    /// Shade `globals` in batches of at most `config.batch_size` points
    ///
    /// `visit` receives each finished batch and the index of its first point.
    pub fn shade(
        &self,
        globals: &[ShaderGlobals],
        sink: &dyn DiagnosticSink,
        config: &RuntimeConfig,
        mut visit: impl FnMut(&ShadingExecution<'_>, usize),
    ) -> Result<()> {
        for (batch, chunk) in globals.chunks(config.batch_size.max(1)).enumerate() {
            let mut exec = ShadingExecution::new(self, chunk.len(), sink).with_config(config.clone());
            exec.bind_globals(chunk);
            exec.run(&vec![true; chunk.len()])?;
            visit(&exec, batch * config.batch_size.max(1));
        }
        Ok(())
    }
}

/// Symbol storage and execution state for one batch of points
pub struct ShadingExecution<'l> {
    layer: &'l ExecutableLayer,
    pub(crate) symbols: Vec<SymbolData>,
    npoints: usize,
    sink: &'l dyn DiagnosticSink,
    pub(crate) config: RuntimeConfig,
    derivative_gaps: BTreeMap<String, usize>,
}

impl std::fmt::Debug for ShadingExecution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadingExecution")
            .field("layer", &self.layer.layer.name)
            .field("npoints", &self.npoints)
            .field("symbols", &self.symbols.len())
            .field("derivative_gaps", &self.derivative_gaps)
            .finish()
    }
}

impl<'l> ShadingExecution<'l> {
    /// Allocate storage for `npoints` points
    ///
    /// Constants and parameters with defaults start out uniform holding
    /// their literal; everything else starts as uniform zero.
    pub fn new(layer: &'l ExecutableLayer, npoints: usize, sink: &'l dyn DiagnosticSink) -> Self {
        let symbols = layer
            .layer
            .symbols
            .iter()
            .map(|symbol| SymbolData::new(symbol, npoints))
            .collect();
        Self {
            layer,
            symbols,
            npoints,
            sink,
            config: RuntimeConfig::default(),
            derivative_gaps: BTreeMap::new(),
        }
    }

    /// Replace the runtime configuration
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Points in this batch
    pub fn npoints(&self) -> usize {
        self.npoints
    }

    /// The layer being executed
    pub fn layer(&self) -> &ShaderLayer {
        &self.layer.layer
    }

    /// Load every global symbol from one state record per point
    pub fn bind_globals(&mut self, globals: &[ShaderGlobals]) {
        for (id, symbol) in self.layer.layer.symbols.iter().enumerate() {
            if !symbol.is_global() {
                continue;
            }
            let data = &mut self.symbols[id];
            data.adjust_varying(true);
            for (point, sg) in globals.iter().enumerate().take(self.npoints) {
                for plane in 0..data.planes() {
                    match sg.global(&symbol.name, plane) {
                        Some(FieldValue::Vec3(v)) => {
                            for (slot, value) in v.to_array().into_iter().enumerate() {
                                data.set_float(point, plane, slot, value);
                            }
                        }
                        Some(FieldValue::Float(f)) => data.set_float(point, plane, 0, f),
                        Some(FieldValue::Int(i)) => data.set_int(point, plane, 0, i),
                        Some(FieldValue::Pointer) | None => {}
                    }
                }
            }
        }
    }

    /// Execute one opcode over `[begin, end)` for points whose runflag is set
    pub fn execute_op(
        &mut self,
        op: OpIndex,
        runflags: &[bool],
        begin: usize,
        end: usize,
    ) -> Result<()> {
        let handler = self.layer.resolved(op)?.handler;
        handler(self, op, runflags, begin, end)
    }

    /// Execute opcodes `[op_begin, op_end)` in order, skipping over the
    /// regions owned by control-flow opcodes
    pub fn run_range(
        &mut self,
        op_begin: OpIndex,
        op_end: OpIndex,
        runflags: &[bool],
        begin: usize,
        end: usize,
    ) -> Result<()> {
        let mut op = op_begin;
        while op < op_end {
            self.execute_op(op, runflags, begin, end)?;
            op = self.layer.layer.ops[op].next_index(op);
        }
        Ok(())
    }

    /// Execute the whole layer for every point of the batch
    ///
    /// Every opcode is resolved before the first one runs, so a layer with
    /// an unsupported operand combination is rejected without side effects.
    pub fn run(&mut self, runflags: &[bool]) -> Result<()> {
        self.layer.prepare()?;
        let len = self.layer.layer.ops.len();
        self.run_range(0, len, runflags, 0, self.npoints.min(runflags.len()))
    }

    /// Per-op-name count of destination derivatives zeroed instead of computed
    pub fn derivative_gaps(&self) -> &BTreeMap<String, usize> {
        &self.derivative_gaps
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Storage of symbol `id`
    pub fn data(&self, id: SymbolId) -> Option<&SymbolData> {
        self.symbols.get(id)
    }

    /// Mutable storage of symbol `id`, for seeding inputs
    pub fn data_mut(&mut self, id: SymbolId) -> Option<&mut SymbolData> {
        self.symbols.get_mut(id)
    }

    /// Float value of `id` at `point`
    pub fn float_value(&self, id: SymbolId, point: usize) -> Option<f32> {
        self.symbols.get(id).map(|d| f32::load(d, point))
    }

    /// Int value of `id` at `point`
    pub fn int_value(&self, id: SymbolId, point: usize) -> Option<i32> {
        self.symbols.get(id).map(|d| i32::load(d, point))
    }

    /// Triple value of `id` at `point`
    pub fn triple_value(&self, id: SymbolId, point: usize) -> Option<Vec3> {
        self.symbols.get(id).map(|d| Vec3::load(d, point))
    }

    /// Matrix value of `id` at `point`
    pub fn matrix_value(&self, id: SymbolId, point: usize) -> Option<Mat4> {
        self.symbols.get(id).map(|d| Mat4::load(d, point))
    }

    /// String value of `id` at `point`
    pub fn string_value(&self, id: SymbolId, point: usize) -> Option<&str> {
        self.symbols.get(id).map(|d| d.string(point, 0))
    }

    /// Closure tree of `id` at `point`
    pub fn closure_value(&self, id: SymbolId, point: usize) -> Option<ClosureColor> {
        self.symbols.get(id).map(|d| d.closure(point, 0))
    }

    /// True if `id` currently holds one value shared by every point
    pub fn is_uniform(&self, id: SymbolId) -> bool {
        self.symbols.get(id).is_some_and(|d| !d.is_varying())
    }

    /// Component `slot` of derivative `plane` (1 = d/dx, 2 = d/dy); zero for
    /// symbols without derivatives
    pub fn derivative(&self, id: SymbolId, point: usize, plane: usize, slot: usize) -> f32 {
        self.symbols
            .get(id)
            .map_or(0.0, |d| d.float(point, plane, slot))
    }

    // ------------------------------------------------------------------
    // Helpers for kernels
    // ------------------------------------------------------------------

    pub(crate) fn args(&self, op: OpIndex) -> &'l [SymbolId] {
        let layer: &'l ExecutableLayer = self.layer;
        &layer.layer.ops[op].args
    }

    pub(crate) fn op_name(&self, op: OpIndex) -> &'l str {
        let layer: &'l ExecutableLayer = self.layer;
        &layer.layer.ops[op].name
    }

    pub(crate) fn resolved_op(&self, op: OpIndex) -> Result<&'l Resolved> {
        let layer: &'l ExecutableLayer = self.layer;
        layer.resolved(op)
    }

    pub(crate) fn sym(&self, id: SymbolId) -> &SymbolData {
        &self.symbols[id]
    }

    pub(crate) fn sym_mut(&mut self, id: SymbolId) -> &mut SymbolData {
        &mut self.symbols[id]
    }

    /// Fix the density of `dst` before an op writes it
    ///
    /// The result is varying if any operand is, or if only some points of
    /// the batch are running, since the others must keep their old value.
    /// A uniform result written by every point demotes the destination.
    pub(crate) fn prepare_dest(
        &mut self,
        dst: SymbolId,
        operands: &[SymbolId],
        runflags: &[bool],
        begin: usize,
        end: usize,
    ) -> bool {
        let varying = operands.iter().any(|&a| self.symbols[a].is_varying())
            || !self.all_points_on(runflags, begin, end);
        self.symbols[dst].adjust_varying(varying);
        varying
    }

    pub(crate) fn all_points_on(&self, runflags: &[bool], begin: usize, end: usize) -> bool {
        begin == 0 && end >= self.npoints && runflags.iter().take(self.npoints).all(|&f| f)
    }

    /// Zero the destination's derivative planes and count the gap
    pub(crate) fn finish_dest(
        &mut self,
        op: OpIndex,
        dst: SymbolId,
        runflags: &[bool],
        begin: usize,
        end: usize,
    ) {
        let data = &mut self.symbols[dst];
        if data.planes() == 1 {
            return;
        }
        for point in active_points(data.is_varying(), runflags, begin, end) {
            data.zero_derivs(point);
        }
        let name = self.layer.layer.ops[op].name.clone();
        let count = self.derivative_gaps.entry(name).or_insert(0);
        *count += 1;
        if *count == 1 {
            debug!(op, name = %self.layer.layer.ops[op].name, "derivatives not propagated; zeroed");
        }
    }

    /// Report a recoverable numeric condition
    pub(crate) fn numeric_fault(&self, op: OpIndex, message: &str) {
        let name = self.op_name(op);
        warn!(op, name, detail = message, "numeric fault");
        if self.config.report_numeric_faults {
            self.sink.report(Diagnostic::new(op, name, message));
        }
    }

    /// Send formatted output to the sink
    pub(crate) fn print(&self, text: &str) {
        self.sink.print(text);
    }
}

/// Points an op must compute: every active point when varying, otherwise
/// only the first active one
pub(crate) fn active_points(
    varying: bool,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> impl Iterator<Item = usize> + '_ {
    let end = end.min(runflags.len());
    let first = (begin..end).find(|&p| runflags[p]);
    (begin..end).filter(move |&p| runflags[p] && (varying || Some(p) == first))
}
