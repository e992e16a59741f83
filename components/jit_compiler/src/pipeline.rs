//! Optimization pipeline
//!
//! The generator schedules a fixed sequence of passes over every function
//! before it is defined. Each pass maps onto a Cranelift stage:
//!
//! | Pass                 | Cranelift stage                                 |
//! |----------------------|-------------------------------------------------|
//! | `register-promotion` | `Context::replace_redundant_loads`              |
//! | `inst-combine`       | e-graph rewrites                                |
//! | `reassociate`        | e-graph rewrites                                |
//! | `gvn`                | e-graph value numbering                         |
//! | `simplify-cfg`       | `Context::eliminate_unreachable_code`           |
//! | `adce`               | e-graph elimination of unused pure instructions |
//! | `verify`             | `Context::verify`                               |
//!
//! The e-graph stage runs inside `define_function` whenever the session's
//! `opt_level` is not `none`; the other passes run explicitly here.

use crate::session::CodegenConfig;
use cranelift_codegen::isa::TargetIsa;
use cranelift_codegen::Context;
use shader_types::{Result, ShadeError};
use std::fmt;
use tracing::trace;

/// One scheduled pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptPass {
    /// Promote stack-slot traffic to SSA values (store-to-load forwarding)
    RegisterPromotion,
    /// Peephole instruction combining
    InstCombine,
    /// Reassociate commutative expressions
    Reassociate,
    /// Global value numbering
    Gvn,
    /// Remove blocks no edge reaches
    SimplifyCfg,
    /// Remove instructions whose results are unused
    AggressiveDce,
    /// Check the IR for structural errors
    Verify,
}

impl OptPass {
    /// True for passes Cranelift performs during `define_function`
    pub fn is_egraph(self) -> bool {
        matches!(
            self,
            OptPass::InstCombine | OptPass::Reassociate | OptPass::Gvn | OptPass::AggressiveDce
        )
    }
}

impl fmt::Display for OptPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptPass::RegisterPromotion => "register-promotion",
            OptPass::InstCombine => "inst-combine",
            OptPass::Reassociate => "reassociate",
            OptPass::Gvn => "gvn",
            OptPass::SimplifyCfg => "simplify-cfg",
            OptPass::AggressiveDce => "adce",
            OptPass::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Ordered pass list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationPipeline {
    passes: Vec<OptPass>,
}

impl OptimizationPipeline {
    /// The full pipeline, finishing with verification
    pub fn standard() -> Self {
        Self {
            passes: vec![
                OptPass::RegisterPromotion,
                OptPass::InstCombine,
                OptPass::Reassociate,
                OptPass::Gvn,
                OptPass::SimplifyCfg,
                OptPass::AggressiveDce,
                OptPass::RegisterPromotion,
                OptPass::Verify,
            ],
        }
    }

    /// Passes selected by a session configuration
    pub fn from_config(config: &CodegenConfig) -> Self {
        let mut pipeline = if config.optimize {
            Self::standard()
        } else {
            Self { passes: Vec::new() }
        };
        if !config.verify {
            pipeline.passes.retain(|&p| p != OptPass::Verify);
        } else if !pipeline.passes.contains(&OptPass::Verify) {
            pipeline.passes.push(OptPass::Verify);
        }
        pipeline
    }

    /// Scheduled passes in order
    pub fn passes(&self) -> &[OptPass] {
        &self.passes
    }

    /// Run the explicit passes over the function held by `ctx`
    pub fn run(&self, ctx: &mut Context, isa: &dyn TargetIsa) -> Result<()> {
        for &pass in &self.passes {
            trace!(%pass, "pass");
            if pass.is_egraph() {
                continue;
            }
            ctx.compute_cfg();
            ctx.compute_domtree();
            match pass {
                OptPass::RegisterPromotion => ctx
                    .replace_redundant_loads()
                    .map_err(|e| ShadeError::codegen(format!("{}: {}", pass, e)))?,
                OptPass::SimplifyCfg => ctx
                    .eliminate_unreachable_code(isa)
                    .map_err(|e| ShadeError::codegen(format!("{}: {}", pass, e)))?,
                OptPass::Verify => ctx
                    .verify(isa)
                    .map_err(|e| ShadeError::codegen(format!("{}: {}", pass, e)))?,
                _ => {}
            }
        }
        Ok(())
    }
}

impl Default for OptimizationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
