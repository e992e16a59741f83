//! Tests for ShaderLayer construction and validation

use shader_ir::{ConstValue, ControlFlow, LoopKind, ShaderLayer, Symbol, SymbolKind};
use shader_types::{ErrorKind, TypeSpec};

fn counting_loop() -> ShaderLayer {
    let mut layer = ShaderLayer::new("loop");
    let i = layer.add_symbol(Symbol::local("i", TypeSpec::int()));
    let cond = layer.add_symbol(Symbol::new("$cond", TypeSpec::int(), SymbolKind::Temp));
    let zero = layer.add_int_const(0);
    let one = layer.add_int_const(1);
    let ten = layer.add_int_const(10);
    let acc = layer.add_symbol(Symbol::local("acc", TypeSpec::float()));
    let half = layer.add_float_const(0.5);
    layer.emit_loop(
        LoopKind::For,
        cond,
        |l| {
            l.emit("assign", &[i, zero]);
        },
        |l| {
            l.emit("lt", &[cond, i, ten]);
        },
        |l| {
            l.emit("add", &[acc, acc, half]);
        },
        |l| {
            l.emit("add", &[i, i, one]);
        },
    );
    layer
}

#[test]
fn test_layer_creation() {
    let layer = ShaderLayer::new("empty");
    assert_eq!(layer.name, "empty");
    assert!(layer.symbols.is_empty());
    assert!(layer.ops.is_empty());
    assert!(layer.validate().is_ok());
}

#[test]
fn test_constants_get_unique_names() {
    let mut layer = ShaderLayer::new("c");
    let a = layer.add_int_const(1);
    let b = layer.add_int_const(1);
    assert_ne!(layer.symbols[a].name, layer.symbols[b].name);
    assert_eq!(layer.symbols[a].value, Some(ConstValue::Int(vec![1])));
}

#[test]
fn test_loop_targets() {
    let layer = counting_loop();
    let op = &layer.ops[0];
    assert_eq!(op.name, "for");
    assert_eq!(op.jumps.as_slice(), &[2, 3, 4, 5]);
    match op.control(0) {
        Some(ControlFlow::Loop {
            init_start, after, ..
        }) => {
            assert_eq!(init_start, 1);
            assert_eq!(after, 5);
        }
        other => panic!("Expected loop, got {:?}", other),
    }
    assert!(layer.validate().is_ok());
}

#[test]
fn test_find_symbol() {
    let layer = counting_loop();
    assert_eq!(layer.find_symbol("acc"), Some(5));
    assert_eq!(layer.find_symbol("missing"), None);
    assert!(layer.symbol(5).is_some());
    assert!(layer.opcode(99).is_none());
}

#[test]
fn test_rejects_missing_targets() {
    let mut layer = ShaderLayer::new("bad");
    let c = layer.add_int_const(1);
    layer.emit("while", &[c]);
    let err = layer.validate().unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedLayer);
    assert!(err.message.contains("4 jump targets"));
}

#[test]
fn test_rejects_target_past_end() {
    let mut layer = ShaderLayer::new("bad");
    let c = layer.add_int_const(1);
    let op = layer.emit("if", &[c]);
    layer.set_jumps(op, &[1, 7]);
    let err = layer.validate().unwrap_err();
    assert_eq!(err.op_index, Some(0));
}

#[test]
fn test_rejects_overlapping_statements() {
    // The inner `if` ends beyond the outer then-region
    let mut layer = ShaderLayer::new("bad");
    let c = layer.add_int_const(1);
    layer.emit("if", &[c]);
    layer.emit("if", &[c]);
    layer.emit("nop", &[]);
    layer.emit("nop", &[]);
    layer.set_jumps(0, &[2, 4]);
    layer.set_jumps(1, &[3, 4]);
    let err = layer.validate().unwrap_err();
    assert_eq!(err.op_index, Some(1));
}

#[test]
fn test_rejects_unknown_global() {
    let mut layer = ShaderLayer::new("bad");
    layer.add_global("Q", TypeSpec::point());
    assert!(layer.validate().is_err());
}
