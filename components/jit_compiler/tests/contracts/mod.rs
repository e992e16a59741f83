//! Contract tests for the code generator's public API

use jit_compiler::{
    classify, classify_layer, BlockPlan, CodegenConfig, CompileSession, ElisionReason,
    NativeType, OptLevel, OptPass, OptimizationPipeline, StorageClass,
};
use shader_ir::{ShaderLayer, Symbol, SymbolKind};
use shader_types::{DiagnosticLog, ErrorKind, ShaderGlobals, TypeSpec};

fn printing_layer() -> ShaderLayer {
    let mut layer = ShaderLayer::new("contract");
    let u = layer.add_global("u", TypeSpec::float());
    let k = layer.add_float_const(4.0);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    let fmt = layer.add_string_const("r=%g\\n");
    layer.emit("mul", &[r, u, k]);
    layer.emit("printf", &[fmt, r]);
    layer
}

// ============================================================================
// CompileSession
// ============================================================================

/// Test CompileSession::new keeps its configuration
#[test]
fn test_session_new_keeps_config() {
    let session = CompileSession::new(CodegenConfig::debug()).unwrap();
    assert_eq!(session.config(), &CodegenConfig::debug());
    assert_eq!(session.config().opt_level, OptLevel::None);
    assert_eq!(session.compiled_count(), 0);
}

/// Test CompileSession::new targets the host
#[test]
fn test_session_targets_host() {
    let session = CompileSession::new(CodegenConfig::new()).unwrap();
    assert_eq!(
        session.triple().architecture,
        target_lexicon::Triple::host().architecture
    );
}

/// Test compile_layer returns a layer carrying its name
#[test]
fn test_compile_layer_names_result() {
    let session = CompileSession::new(CodegenConfig::new()).unwrap();
    let compiled = session.compile_layer(&printing_layer()).unwrap();
    assert_eq!(compiled.name(), "contract");
    assert_eq!(session.compiled_count(), 1);
}

/// Test compile_layer rejects a malformed layer
#[test]
fn test_compile_layer_rejects_malformed_layer() {
    let mut layer = ShaderLayer::new("bad");
    layer.emit("assign", &[7, 8]);
    let session = CompileSession::new(CodegenConfig::new()).unwrap();
    let err = session.compile_layer(&layer).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedLayer);
}

/// Test a failed compilation leaves the session usable
#[test]
fn test_session_survives_failed_compile() {
    let mut bad = ShaderLayer::new("bad");
    let c = bad.add_symbol(Symbol::local("c", TypeSpec::closure()));
    let d = bad.add_symbol(Symbol::local("d", TypeSpec::closure()));
    bad.emit("assign", &[c, d]);

    let session = CompileSession::new(CodegenConfig::debug()).unwrap();
    assert!(session.compile_layer(&bad).is_err());
    assert_eq!(session.compiled_count(), 0);
    assert!(session.compile_layer(&printing_layer()).is_ok());
    assert_eq!(session.compiled_count(), 1);
}

/// Test a layer rejected midway through lowering does not taint the next one
#[test]
fn test_session_recovers_from_unknown_opcode() {
    let mut bad = ShaderLayer::new("bad");
    let u = bad.add_global("u", TypeSpec::float());
    let r = bad.add_symbol(Symbol::local("r", TypeSpec::float()));
    bad.emit("neg", &[r, u]);
    bad.emit("texture", &[r, u]);

    for config in [CodegenConfig::debug(), CodegenConfig::new()] {
        let session = CompileSession::new(config).unwrap();
        let err = session.compile_layer(&bad).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOpcode);

        let compiled = session.compile_layer(&printing_layer()).unwrap();
        let log = DiagnosticLog::new();
        compiled.invoke(&mut ShaderGlobals::new().with_uv(0.25, 0.0), &log);
        assert_eq!(log.output(), "r=1\n");
        assert_eq!(session.compiled_count(), 1);
    }
}

// ============================================================================
// CompiledLayer
// ============================================================================

/// Test invoke reads the state record and prints through the sink
#[test]
fn test_invoke_prints_through_sink() {
    let session = CompileSession::new(CodegenConfig::new()).unwrap();
    let compiled = session.compile_layer(&printing_layer()).unwrap();
    let log = DiagnosticLog::new();
    compiled.invoke(&mut ShaderGlobals::new().with_uv(0.5, 0.0), &log);
    assert_eq!(log.output(), "r=2\n");
    assert!(log.is_empty());
}

/// Test formats are expanded when the layer is compiled
#[test]
fn test_formats_are_expanded() {
    let session = CompileSession::new(CodegenConfig::new()).unwrap();
    let compiled = session.compile_layer(&printing_layer()).unwrap();
    assert_eq!(compiled.formats().len(), 1);
    assert_eq!(compiled.formats()[0].slots.len(), 1);
}

/// Test the compiled plan equals a freshly built plan
#[test]
fn test_plan_is_exposed() {
    let layer = printing_layer();
    let session = CompileSession::new(CodegenConfig::new()).unwrap();
    let compiled = session.compile_layer(&layer).unwrap();
    assert_eq!(compiled.plan(), &BlockPlan::build(&layer).unwrap());
    assert_eq!(compiled.plan().blocks().len(), 1);
}

// ============================================================================
// OptimizationPipeline
// ============================================================================

/// Test the standard pipeline ends with verification
#[test]
fn test_standard_pipeline_order() {
    let passes = OptimizationPipeline::standard().passes().to_vec();
    assert_eq!(passes.first(), Some(&OptPass::RegisterPromotion));
    assert_eq!(passes.last(), Some(&OptPass::Verify));
    assert!(passes.contains(&OptPass::Gvn));
    assert!(passes.contains(&OptPass::AggressiveDce));
}

/// Test the session schedules passes from its configuration
#[test]
fn test_session_pipeline_follows_config() {
    let debug = CompileSession::new(CodegenConfig::debug()).unwrap();
    assert_eq!(debug.pipeline().passes(), &[OptPass::Verify]);
    let fast = CompileSession::new(CodegenConfig::new()).unwrap();
    assert!(!fast.pipeline().passes().contains(&OptPass::Verify));
    assert!(fast.pipeline().passes().contains(&OptPass::SimplifyCfg));
}

/// Test every scheduled pass runs when optimizing with verification
#[test]
fn test_full_pipeline_compiles_and_runs() {
    let config = CodegenConfig {
        opt_level: OptLevel::Speed,
        verify: true,
        optimize: true,
    };
    let session = CompileSession::new(config).unwrap();
    assert_eq!(
        session.pipeline().passes(),
        OptimizationPipeline::standard().passes()
    );
    let compiled = session.compile_layer(&printing_layer()).unwrap();
    let log = DiagnosticLog::new();
    compiled.invoke(&mut ShaderGlobals::new().with_uv(0.5, 0.0), &log);
    assert_eq!(log.output(), "r=2\n");
}

/// Test pass names
#[test]
fn test_pass_names() {
    assert_eq!(OptPass::AggressiveDce.to_string(), "adce");
    assert_eq!(OptPass::SimplifyCfg.to_string(), "simplify-cfg");
    assert!(OptPass::Gvn.is_egraph());
    assert!(OptPass::AggressiveDce.is_egraph());
    assert!(!OptPass::RegisterPromotion.is_egraph());
    assert!(!OptPass::Verify.is_egraph());
}

// ============================================================================
// Storage
// ============================================================================

/// Test classify gives locals native slots with derivative planes
#[test]
fn test_classify_locals() {
    let c = classify(&Symbol::local("c", TypeSpec::color()).with_derivs());
    assert_eq!(
        c,
        StorageClass::Native {
            ty: NativeType::F32,
            components: 3,
            elements: 1,
            planes: 3,
        }
    );
    assert_eq!(c.slot_bytes(), 36);

    let i = classify(&Symbol::local("i", TypeSpec::int()));
    assert!(matches!(i, StorageClass::Native { ty: NativeType::I32, .. }));
}

/// Test classify elides what generated code cannot own
#[test]
fn test_classify_elisions() {
    let out = Symbol::new("Ci", TypeSpec::color(), SymbolKind::OutputParam);
    assert_eq!(
        classify(&out),
        StorageClass::Elided(ElisionReason::OutputParam)
    );

    let name = Symbol::local("name", TypeSpec::string());
    assert_eq!(
        classify(&name),
        StorageClass::Elided(ElisionReason::NonNumeric)
    );

    let mut kd = Symbol::new("Kd", TypeSpec::float(), SymbolKind::Param);
    kd.connected = true;
    assert_eq!(classify(&kd), StorageClass::Elided(ElisionReason::Connected));
    assert_eq!(StorageClass::Elided(ElisionReason::Connected).slot_bytes(), 0);
}

/// Test classify_layer covers every symbol
#[test]
fn test_classify_layer_covers_symbols() {
    let layer = printing_layer();
    let classes = classify_layer(&layer);
    assert_eq!(classes.len(), layer.symbols.len());
    assert!(classes.contains(&StorageClass::Global));
}
