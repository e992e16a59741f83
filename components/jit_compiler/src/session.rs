//! Compilation sessions
//!
//! A session owns the Cranelift JIT module, a reusable codegen context and
//! the runtime helper declarations. Each compilation gets its own builder
//! context, so a layer that fails halfway leaves nothing behind. It is created once, before any layer is
//! compiled, and every [`CompiledLayer`] it hands out borrows it: the
//! generated code lives in the module's memory.

use crate::blocks::BlockPlan;
use crate::compiled::CompiledLayer;
use crate::emit::Lowering;
use crate::pipeline::OptimizationPipeline;
use crate::runtime::Helper;
use crate::storage::classify_layer;
use cranelift_codegen::ir::{AbiParam, FuncRef};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId, Linkage, Module};
use shader_ir::ShaderLayer;
use shader_types::{Result, ShadeError, ShaderGlobals};
use std::cell::RefCell;
use target_lexicon::Triple;
use tracing::{debug, info, instrument};

/// Cranelift optimization level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptLevel {
    /// No optimization
    None,
    /// Optimize for speed
    Speed,
    /// Optimize for speed and code size
    SpeedAndSize,
}

impl OptLevel {
    /// Value of Cranelift's `opt_level` setting
    pub fn as_str(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

/// Code generator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Cranelift optimization level
    pub opt_level: OptLevel,
    /// Verify every function before it is defined
    pub verify: bool,
    /// Schedule the optimization passes
    pub optimize: bool,
}

impl CodegenConfig {
    /// Optimizing configuration without verification
    pub fn new() -> Self {
        Self {
            opt_level: OptLevel::Speed,
            verify: false,
            optimize: true,
        }
    }

    /// Unoptimized configuration that verifies every function
    pub fn debug() -> Self {
        Self {
            opt_level: OptLevel::None,
            verify: true,
            optimize: false,
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct SessionState {
    module: JITModule,
    ctx: Context,
    helpers: Vec<FuncId>,
    compiled: u32,
}

/// Owner of the JIT module that compiled layers run from
pub struct CompileSession {
    state: RefCell<SessionState>,
    config: CodegenConfig,
    pipeline: OptimizationPipeline,
    triple: Triple,
}

fn codegen_error(e: impl std::fmt::Display) -> ShadeError {
    ShadeError::codegen(e.to_string())
}

impl CompileSession {
    /// Create a session for the host machine
    pub fn new(config: CodegenConfig) -> Result<Self> {
        let mut flags = settings::builder();
        flags
            .set("opt_level", config.opt_level.as_str())
            .map_err(codegen_error)?;
        flags.set("is_pic", "false").map_err(codegen_error)?;
        flags
            .set(
                "enable_verifier",
                if config.verify { "true" } else { "false" },
            )
            .map_err(codegen_error)?;

        let isa_builder = cranelift_native::builder().map_err(codegen_error)?;
        let isa = isa_builder
            .finish(settings::Flags::new(flags))
            .map_err(codegen_error)?;
        let triple = isa.triple().clone();

        let mut builder = JITBuilder::with_isa(isa, default_libcall_names());
        for helper in Helper::ALL {
            builder.symbol(helper.symbol(), helper.address());
        }
        let mut module = JITModule::new(builder);

        let ptr = module.target_config().pointer_type();
        let mut helpers = Vec::with_capacity(Helper::ALL.len());
        for helper in Helper::ALL {
            let sig = helper.signature(module.make_signature(), ptr);
            let id = module
                .declare_function(helper.symbol(), Linkage::Import, &sig)
                .map_err(codegen_error)?;
            helpers.push(id);
        }
        let ctx = module.make_context();

        let pipeline = OptimizationPipeline::from_config(&config);
        info!(
            %triple,
            opt_level = config.opt_level.as_str(),
            passes = pipeline.passes().len(),
            "compile session ready"
        );
        Ok(Self {
            state: RefCell::new(SessionState {
                module,
                ctx,
                helpers,
                compiled: 0,
            }),
            config,
            pipeline,
            triple,
        })
    }

    /// Configuration the session was built from
    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Passes run over every function
    pub fn pipeline(&self) -> &OptimizationPipeline {
        &self.pipeline
    }

    /// Target the session generates code for
    pub fn triple(&self) -> &Triple {
        &self.triple
    }

    /// Number of layers compiled so far
    pub fn compiled_count(&self) -> usize {
        self.state.borrow().compiled as usize
    }

    /// Compile `layer` into a native function of one shading-state pointer
    #[instrument(skip_all, fields(layer = %layer.name))]
    pub fn compile_layer(&self, layer: &ShaderLayer) -> Result<CompiledLayer<'_>> {
        layer.validate()?;
        let classes = classify_layer(layer);
        let plan = BlockPlan::build(layer)?;
        debug!(
            blocks = plan.blocks().len(),
            leaders = plan.leaders().len(),
            "block plan"
        );

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let ptr = state.module.target_config().pointer_type();
        let mut sig = state.module.make_signature();
        sig.params.push(AbiParam::new(ptr));
        state.ctx.func.signature = sig;

        let mut helpers: Vec<FuncRef> = Vec::with_capacity(state.helpers.len());
        for &id in &state.helpers {
            helpers.push(state.module.declare_func_in_func(id, &mut state.ctx.func));
        }

        let mut builder_ctx = FunctionBuilderContext::new();
        let builder = FunctionBuilder::new(&mut state.ctx.func, &mut builder_ctx);
        let lowered = Lowering::new(builder, layer, &plan, &classes, helpers, ptr).lower(&plan);
        let name = format!("shade_{}", state.compiled);
        let defined = lowered
            .and_then(|formats| self.define(state, &name).map(|code| (formats, code)));
        let (formats, code) = match defined {
            Ok(done) => done,
            Err(e) => {
                state.module.clear_context(&mut state.ctx);
                debug!(error = %e, "compilation failed");
                return Err(e);
            }
        };
        state.compiled += 1;

        // SAFETY: the function was declared with exactly this signature and
        // its memory stays valid while the session is alive
        let entry = unsafe {
            std::mem::transmute::<*const u8, unsafe extern "C" fn(*mut ShaderGlobals)>(code)
        };
        Ok(CompiledLayer::new(
            layer.name.clone(),
            entry,
            layer.ops.iter().map(|op| op.name.clone()).collect(),
            formats,
            plan,
        ))
    }

    /// Run the pipeline, then define and finalize the function in `ctx`
    fn define(&self, state: &mut SessionState, name: &str) -> Result<*const u8> {
        self.pipeline.run(&mut state.ctx, state.module.isa())?;
        let id = state
            .module
            .declare_function(name, Linkage::Export, &state.ctx.func.signature)
            .map_err(codegen_error)?;
        state
            .module
            .define_function(id, &mut state.ctx)
            .map_err(codegen_error)?;
        state.module.clear_context(&mut state.ctx);
        state.module.finalize_definitions().map_err(codegen_error)?;
        debug!(name, "function defined");
        Ok(state.module.get_finalized_function(id))
    }
}

impl std::fmt::Debug for CompileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileSession")
            .field("config", &self.config)
            .field("triple", &self.triple)
            .finish_non_exhaustive()
    }
}
