//! Tests for arrays, printf, closures and batched shading

use closures::{Bsdf, ClosureNode};
use glam::Vec3;
use interpreter::{ExecutableLayer, ShadingExecution};
use shader_ir::{ShaderLayer, Symbol};
use shader_types::{DiagnosticLog, ErrorKind, RuntimeConfig, TypeSpec};

use super::ramp;

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_aref_aassign_arraylength() {
    let mut layer = ShaderLayer::new("t");
    let arr = layer.add_symbol(Symbol::local("arr", TypeSpec::color().array_of(3)));
    let one = layer.add_int_const(1);
    let red = layer.add_triple_const(TypeSpec::color(), Vec3::X);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::color()));
    let n = layer.add_symbol(Symbol::local("n", TypeSpec::int()));
    layer.emit("aassign", &[arr, one, red]);
    layer.emit("aref", &[r, arr, one]);
    layer.emit("arraylength", &[n, arr]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 2, &log);
    exec.run(&[true, true]).unwrap();

    assert_eq!(exec.triple_value(r, 1), Some(Vec3::X));
    assert_eq!(exec.int_value(n, 0), Some(3));
    assert!(log.is_empty());
}

#[test]
fn test_varying_index_gathers_per_point() {
    let mut layer = ShaderLayer::new("t");
    let u = layer.add_global("u", TypeSpec::float());
    let arr = layer.add_symbol(Symbol::local("arr", TypeSpec::float().array_of(4)));
    let i = layer.add_symbol(Symbol::local("i", TypeSpec::int()));
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("assign", &[i, u]);
    layer.emit("aassign", &[arr, i, u]);
    layer.emit("aref", &[r, arr, i]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    exec.run(&[true; 4]).unwrap();

    let values: Vec<f32> = (0..4).map(|p| exec.float_value(r, p).unwrap()).collect();
    assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(exec.data(arr).unwrap().float(2, 0, 2), 2.0);
    assert_eq!(exec.data(arr).unwrap().float(2, 0, 1), 0.0);
}

#[test]
fn test_varying_index_out_of_range_reports() {
    let mut layer = ShaderLayer::new("t");
    let u = layer.add_global("u", TypeSpec::float());
    let arr = layer.add_symbol(Symbol::local("arr", TypeSpec::float().array_of(2)));
    let i = layer.add_symbol(Symbol::local("i", TypeSpec::int()));
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("assign", &[i, u]);
    layer.emit("aref", &[r, arr, i]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    exec.run(&[true; 4]).unwrap();

    assert_eq!(log.len(), 1);
    assert_eq!(log.diagnostics()[0].op_name, "aref");
    assert_eq!(exec.float_value(r, 3), Some(0.0));
}

#[test]
fn test_constant_index_out_of_range_fails_resolution() {
    let mut layer = ShaderLayer::new("t");
    let arr = layer.add_symbol(Symbol::local("arr", TypeSpec::int().array_of(2)));
    let two = layer.add_int_const(2);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::int()));
    layer.emit("aref", &[r, arr, two]);
    let layer = ExecutableLayer::new(layer).unwrap();
    assert_eq!(layer.prepare().unwrap_err().kind, ErrorKind::IndexOutOfRange);
}

#[test]
fn test_whole_array_assign() {
    let mut layer = ShaderLayer::new("t");
    let a = layer.add_symbol(Symbol::local("a", TypeSpec::float().array_of(2)));
    let b = layer.add_symbol(Symbol::local("b", TypeSpec::float().array_of(2)));
    let one = layer.add_int_const(1);
    let k = layer.add_float_const(4.5);
    layer.emit("aassign", &[a, one, k]);
    layer.emit("assign", &[b, a]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 1, &log);
    exec.run(&[true]).unwrap();
    assert_eq!(exec.data(b).unwrap().float(0, 0, 1), 4.5);
}

// ============================================================================
// printf
// ============================================================================

#[test]
fn test_printf_once_per_active_point() {
    let mut layer = ShaderLayer::new("t");
    let u = layer.add_global("u", TypeSpec::float());
    let fmt = layer.add_string_const("u=%g %s\\n");
    let tag = layer.add_string_const("ok");
    layer.emit("printf", &[fmt, u, tag]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 3, &log);
    exec.bind_globals(&ramp(3));
    exec.run(&[true, false, true]).unwrap();
    assert_eq!(log.output(), "u=0 ok\nu=2 ok\n");
}

#[test]
fn test_printf_expands_triples() {
    let mut layer = ShaderLayer::new("t");
    let fmt = layer.add_string_const("%g");
    let c = layer.add_triple_const(TypeSpec::color(), Vec3::new(1.0, 0.5, 0.25));
    layer.emit("printf", &[fmt, c]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 1, &log);
    exec.run(&[true]).unwrap();
    assert_eq!(log.output(), "1 0.5 0.25");
}

// ============================================================================
// Closures
// ============================================================================

#[test]
fn test_closure_construction_and_algebra() {
    let mut layer = ShaderLayer::new("t");
    let n = layer.add_triple_const(TypeSpec::normal(), Vec3::Z);
    let diffuse_name = layer.add_string_const("diffuse");
    let glass_name = layer.add_string_const("transparent");
    let tint = layer.add_triple_const(TypeSpec::color(), Vec3::new(0.5, 0.25, 1.0));
    let half = layer.add_float_const(0.5);
    let d = layer.add_symbol(Symbol::local("d", TypeSpec::closure()));
    let t = layer.add_symbol(Symbol::local("t", TypeSpec::closure()));
    let scaled = layer.add_symbol(Symbol::local("scaled", TypeSpec::closure()));
    let sum = layer.add_symbol(Symbol::local("sum", TypeSpec::closure()));
    let halved = layer.add_symbol(Symbol::local("halved", TypeSpec::closure()));
    layer.emit("closure", &[d, diffuse_name, n]);
    layer.emit("closure", &[t, glass_name]);
    layer.emit("mul", &[scaled, tint, d]);
    layer.emit("add", &[sum, scaled, t]);
    layer.emit("mul", &[halved, sum, half]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 2, &log);
    exec.run(&[true, true]).unwrap();

    assert!(!exec.is_uniform(d));
    let d_value = exec.closure_value(d, 1).unwrap();
    let sum_value = exec.closure_value(sum, 1).unwrap();
    match sum_value.root().map(|r| r.as_ref()) {
        Some(ClosureNode::Add(left, _)) => match left.as_ref() {
            ClosureNode::Mul(w, inner) => {
                assert_eq!(*w, Vec3::new(0.5, 0.25, 1.0));
                assert!(std::sync::Arc::ptr_eq(inner, d_value.root().unwrap()));
            }
            other => panic!("expected a scaled node, got {:?}", other),
        },
        other => panic!("expected a sum, got {:?}", other),
    }

    let terms = exec.closure_value(halved, 0).unwrap().flatten();
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0].bsdf.name(), "diffuse");
    assert_eq!(terms[0].weight, Vec3::new(0.25, 0.125, 0.5));
    assert_eq!(terms[1].bsdf.name(), "transparent");
    assert_eq!(terms[1].weight, Vec3::splat(0.5));
}

#[test]
fn test_closure_divided_by_zero_weight() {
    let mut layer = ShaderLayer::new("t");
    let name = layer.add_string_const("transparent");
    let w = layer.add_triple_const(TypeSpec::color(), Vec3::new(2.0, 0.0, 4.0));
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::closure()));
    let q = layer.add_symbol(Symbol::local("q", TypeSpec::closure()));
    layer.emit("closure", &[c, name]);
    layer.emit("div", &[q, c, w]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let mut exec = ShadingExecution::new(&layer, 1, &log);
    exec.run(&[true]).unwrap();

    let terms = exec.closure_value(q, 0).unwrap().flatten();
    assert_eq!(terms[0].weight, Vec3::new(0.5, 0.0, 0.25));
    assert_eq!(log.len(), 1);
}

#[test]
fn test_closure_parameter_types_checked() {
    let mut layer = ShaderLayer::new("t");
    let name = layer.add_string_const("phong");
    let n = layer.add_triple_const(TypeSpec::normal(), Vec3::Z);
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::closure()));
    layer.emit("closure", &[c, name, n, n]);
    let layer = ExecutableLayer::new(layer).unwrap();
    assert_eq!(layer.prepare().unwrap_err().kind, ErrorKind::UnsupportedTypes);
}

// ============================================================================
// Batching
// ============================================================================

#[test]
fn test_shade_splits_into_batches() {
    let mut layer = ShaderLayer::new("t");
    let u = layer.add_global("u", TypeSpec::float());
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("mul", &[r, u, u]);
    let layer = ExecutableLayer::new(layer).unwrap();
    let log = DiagnosticLog::new();
    let config = RuntimeConfig {
        batch_size: 3,
        ..RuntimeConfig::default()
    };

    let mut results = Vec::new();
    let mut starts = Vec::new();
    layer
        .shade(&ramp(7), &log, &config, |exec, first| {
            starts.push(first);
            for p in 0..exec.npoints() {
                results.push(exec.float_value(r, p).unwrap());
            }
        })
        .unwrap();

    assert_eq!(starts, vec![0, 3, 6]);
    assert_eq!(results, vec![0.0, 1.0, 4.0, 9.0, 16.0, 25.0, 36.0]);
    assert_eq!(layer.resolution_count(), 1);
}
