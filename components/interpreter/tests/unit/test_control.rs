//! Tests for runflags, branches and loops

use interpreter::{ExecutableLayer, ShadingExecution};
use shader_ir::{LoopKind, ShaderLayer, Symbol};
use shader_types::{DiagnosticLog, TypeSpec};

use super::ramp;

fn executable(layer: ShaderLayer) -> (ExecutableLayer, DiagnosticLog) {
    (ExecutableLayer::new(layer).unwrap(), DiagnosticLog::new())
}

// ============================================================================
// Runflags
// ============================================================================

#[test]
fn test_inactive_points_keep_their_values() {
    let mut layer = ShaderLayer::new("t");
    let u = layer.add_global("u", TypeSpec::float());
    let one = layer.add_float_const(1.0);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("add", &[r, u, one]);
    let (layer, log) = executable(layer);

    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    exec.run(&[true, false, true, false]).unwrap();
    let values: Vec<f32> = (0..4).map(|p| exec.float_value(r, p).unwrap()).collect();
    assert_eq!(values, vec![1.0, 0.0, 3.0, 0.0]);
}

#[test]
fn test_uniform_result_stays_uniform() {
    let mut layer = ShaderLayer::new("t");
    let a = layer.add_float_const(1.0);
    let b = layer.add_float_const(2.0);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("add", &[r, a, b]);
    let (layer, log) = executable(layer);

    let mut exec = ShadingExecution::new(&layer, 16, &log);
    exec.run(&[true; 16]).unwrap();
    assert!(exec.is_uniform(r));
    assert_eq!(exec.float_value(r, 15), Some(3.0));
}

#[test]
fn test_uniform_write_under_partial_mask_promotes() {
    let mut layer = ShaderLayer::new("t");
    let a = layer.add_float_const(7.0);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("assign", &[r, a]);
    let (layer, log) = executable(layer);

    let mut exec = ShadingExecution::new(&layer, 3, &log);
    exec.run(&[false, true, false]).unwrap();
    assert!(!exec.is_uniform(r));
    assert_eq!(exec.float_value(r, 0), Some(0.0));
    assert_eq!(exec.float_value(r, 1), Some(7.0));
}

#[test]
fn test_varying_destination_demotes_when_fully_rewritten() {
    let mut layer = ShaderLayer::new("t");
    let u = layer.add_global("u", TypeSpec::float());
    let two = layer.add_float_const(2.0);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    layer.emit("assign", &[r, u]);
    layer.emit("assign", &[r, two]);
    let (layer, log) = executable(layer);

    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    exec.run(&[true; 4]).unwrap();
    assert!(exec.is_uniform(r));
    assert_eq!(exec.float_value(r, 3), Some(2.0));
}

// ============================================================================
// Branches
// ============================================================================

#[test]
fn test_if_else_splits_points() {
    let mut layer = ShaderLayer::new("t");
    let u = layer.add_global("u", TypeSpec::float());
    let half = layer.add_float_const(1.5);
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::int()));
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    let yes = layer.add_float_const(10.0);
    let no = layer.add_float_const(20.0);
    layer.emit("gt", &[c, u, half]);
    layer.emit_if(
        c,
        |l| {
            l.emit("assign", &[r, yes]);
        },
        |l| {
            l.emit("assign", &[r, no]);
        },
    );
    let (layer, log) = executable(layer);

    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    exec.run(&[true; 4]).unwrap();
    let values: Vec<f32> = (0..4).map(|p| exec.float_value(r, p).unwrap()).collect();
    assert_eq!(values, vec![20.0, 20.0, 10.0, 10.0]);
}

#[test]
fn test_empty_branch_is_skipped() {
    let mut layer = ShaderLayer::new("t");
    let zero = layer.add_int_const(0);
    let r = layer.add_symbol(Symbol::local("r", TypeSpec::float()));
    let one = layer.add_float_const(1.0);
    layer.emit_if(
        zero,
        |_| {},
        |l| {
            l.emit("assign", &[r, one]);
        },
    );
    let (layer, log) = executable(layer);

    let mut exec = ShadingExecution::new(&layer, 2, &log);
    exec.run(&[true, true]).unwrap();
    assert_eq!(exec.float_value(r, 1), Some(1.0));
    assert!(exec.is_uniform(r));
}

// ============================================================================
// Loops
// ============================================================================

/// `sum = 0; for (i = 0; i < u; i += 1) sum += 1;`
fn counting_loop(kind: LoopKind) -> (ShaderLayer, usize) {
    let mut layer = ShaderLayer::new("loop");
    let u = layer.add_global("u", TypeSpec::float());
    let zero = layer.add_int_const(0);
    let one = layer.add_int_const(1);
    let one_f = layer.add_float_const(1.0);
    let i = layer.add_symbol(Symbol::local("i", TypeSpec::int()));
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::int()));
    let sum = layer.add_symbol(Symbol::local("sum", TypeSpec::float()));
    layer.emit_loop(
        kind,
        c,
        |l| {
            l.emit("assign", &[i, zero]);
        },
        |l| {
            l.emit("lt", &[c, i, u]);
        },
        |l| {
            l.emit("add", &[sum, sum, one_f]);
        },
        |l| {
            l.emit("add", &[i, i, one]);
        },
    );
    (layer, sum)
}

#[test]
fn test_for_loop_runs_per_point_trip_counts() {
    let (layer, sum) = counting_loop(LoopKind::For);
    let (layer, log) = executable(layer);
    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    exec.run(&[true; 4]).unwrap();
    let values: Vec<f32> = (0..4).map(|p| exec.float_value(sum, p).unwrap()).collect();
    assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_dowhile_runs_body_once_before_testing() {
    let (layer, sum) = counting_loop(LoopKind::DoWhile);
    let (layer, log) = executable(layer);
    let mut exec = ShadingExecution::new(&layer, 3, &log);
    exec.bind_globals(&ramp(3));
    exec.run(&[true; 3]).unwrap();
    let values: Vec<f32> = (0..3).map(|p| exec.float_value(sum, p).unwrap()).collect();
    assert_eq!(values, vec![1.0, 1.0, 2.0]);
}

#[test]
fn test_while_loop_respects_runflags() {
    let (layer, sum) = counting_loop(LoopKind::While);
    let (layer, log) = executable(layer);
    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    exec.run(&[true, true, false, true]).unwrap();
    let values: Vec<f32> = (0..4).map(|p| exec.float_value(sum, p).unwrap()).collect();
    assert_eq!(values, vec![0.0, 1.0, 0.0, 3.0]);
}

#[test]
fn test_batch_subrange() {
    let (layer, sum) = counting_loop(LoopKind::For);
    let (layer, log) = executable(layer);
    let mut exec = ShadingExecution::new(&layer, 4, &log);
    exec.bind_globals(&ramp(4));
    let ops = exec.layer().ops.len();
    exec.run_range(0, ops, &[true; 4], 2, 4).unwrap();
    assert_eq!(exec.float_value(sum, 1), Some(0.0));
    assert_eq!(exec.float_value(sum, 3), Some(3.0));
}
