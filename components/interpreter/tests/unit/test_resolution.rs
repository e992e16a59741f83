//! Tests for resolve-then-execute specialization

use interpreter::{ExecutableLayer, ShadingExecution};
use shader_ir::{ShaderLayer, Symbol};
use shader_types::{DiagnosticLog, ErrorKind, TypeSpec};

fn mixed_add() -> (ExecutableLayer, usize) {
    let mut layer = ShaderLayer::new("mixed");
    let a = layer.add_int_const(3);
    let b = layer.add_float_const(2.5);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("add", &[r, a, b]);
    (ExecutableLayer::new(layer).unwrap(), r)
}

// ============================================================================
// Resolution lifecycle
// ============================================================================

#[test]
fn test_first_call_resolves_second_reuses() {
    let (layer, r) = mixed_add();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 2, &log);

    assert!(!layer.resolution(0).is_resolved());
    exec.execute_op(0, &[true, true], 0, 2).unwrap();
    assert!(layer.resolution(0).is_resolved());
    assert_eq!(layer.resolution_count(), 1);
    assert_eq!(exec.float_value(r, 0), Some(5.5));

    exec.execute_op(0, &[true, true], 0, 2).unwrap();
    assert_eq!(layer.resolution_count(), 1);
    assert_eq!(exec.float_value(r, 1), Some(5.5));
}

#[test]
fn test_resolution_survives_across_batches() {
    let (layer, _) = mixed_add();
    let log = DiagnosticLog::new();
    for _ in 0..3 {
        let mut exec = ShadingExecution::new(&layer, 1, &log);
        exec.run(&[true]).unwrap();
    }
    assert_eq!(layer.resolution_count(), 1);
}

#[test]
fn test_prepare_resolves_everything() {
    let (layer, _) = mixed_add();
    layer.prepare().unwrap();
    layer.prepare().unwrap();
    assert_eq!(layer.resolution_count(), 1);
}

#[test]
fn test_prepare_reports_unsupported_types() {
    let mut layer = ShaderLayer::new("bad");
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    let s = layer.add_string_const("text");
    let f = layer.add_float_const(1.0);
    layer.emit("nop", &[]);
    layer.emit("add", &[r, s, f]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let err = layer.prepare().unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedTypes);
    assert_eq!(err.op_index, Some(1));
    assert!(!layer.resolution(1).is_resolved());
}

#[test]
fn test_malformed_layer_rejected() {
    let mut layer = ShaderLayer::new("bad");
    layer.emit("add", &[0, 1, 2]);
    assert_eq!(
        ExecutableLayer::new(layer).unwrap_err().kind,
        ErrorKind::MalformedLayer
    );
}

#[test]
fn test_printf_requires_constant_format() {
    let mut layer = ShaderLayer::new("bad");
    let fmt = layer.add_symbol(Symbol::local("fmt", TypeSpec::string()));
    layer.emit("printf", &[fmt]);
    let layer = ExecutableLayer::new(layer).unwrap();
    assert_eq!(layer.prepare().unwrap_err().kind, ErrorKind::NonConstantFormat);
}

#[test]
fn test_unknown_closure_rejected() {
    let mut layer = ShaderLayer::new("bad");
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::closure()));
    let name = layer.add_string_const("oren_nayar");
    layer.emit("closure", &[c, name]);
    let layer = ExecutableLayer::new(layer).unwrap();
    assert_eq!(layer.prepare().unwrap_err().kind, ErrorKind::UnknownClosure);
}

#[test]
fn test_rejected_layer_runs_nothing() {
    let mut layer = ShaderLayer::new("bad");
    let fmt = layer.add_string_const("ran\\n");
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    let s = layer.add_string_const("text");
    layer.emit("printf", &[fmt]);
    layer.emit("add", &[r, s, s]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 2, &log);

    let err = exec.run(&[true, true]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedTypes);
    assert_eq!(err.op_index, Some(1));
    assert_eq!(log.output(), "");
}
