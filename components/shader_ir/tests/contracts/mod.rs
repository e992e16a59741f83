//! Contract tests for shader_ir
//!
//! Verifies the control-flow encoding every backend relies on.

use shader_ir::{ControlFlow, LoopKind, Opcode, ShaderLayer, Symbol};
use shader_types::TypeSpec;

/// Test `if` carries exactly two targets: else start and after
#[test]
fn test_contract_if_target_layout() {
    let op = Opcode::new("if", &[0]).with_jumps(&[4, 6]);
    assert_eq!(
        op.control(1),
        Some(ControlFlow::If {
            cond: 0,
            else_start: 4,
            after: 6
        })
    );
}

/// Test every loop flavor shares the four-target layout
#[test]
fn test_contract_loop_target_layout() {
    for kind in [LoopKind::For, LoopKind::While, LoopKind::DoWhile] {
        let op = Opcode::new(kind.op_name(), &[3]).with_jumps(&[2, 3, 5, 6]);
        assert_eq!(op.loop_kind(), Some(kind));
        assert_eq!(op.control(0).map(|f| f.after()), Some(6));
        assert_eq!(op.control(0).map(|f| f.cond()), Some(3));
    }
}

/// Test nested statements validate when they close inside their region
#[test]
fn test_contract_nested_statements() {
    let mut layer = ShaderLayer::new("nested");
    let c = layer.add_int_const(1);
    let x = layer.add_symbol(Symbol::local("x", TypeSpec::float()));
    let k = layer.add_float_const(2.0);
    layer.emit_if(
        c,
        |l| {
            l.emit_if(
                c,
                |l| {
                    l.emit("assign", &[x, k]);
                },
                |l| {
                    l.emit("neg", &[x, k]);
                },
            );
        },
        |l| {
            l.emit("nop", &[]);
        },
    );
    assert_eq!(layer.ops[0].jumps.as_slice(), &[4, 5]);
    assert_eq!(layer.ops[1].jumps.as_slice(), &[3, 4]);
    assert!(layer.validate().is_ok());
}

/// Test the step of a loop may be empty
#[test]
fn test_contract_empty_regions_allowed() {
    let mut layer = ShaderLayer::new("while");
    let c = layer.add_int_const(0);
    layer.emit_loop(LoopKind::While, c, |_| {}, |_| {}, |l| {
        l.emit("nop", &[]);
    }, |_| {});
    assert_eq!(layer.ops[0].jumps.as_slice(), &[1, 1, 2, 2]);
    assert!(layer.validate().is_ok());
}
