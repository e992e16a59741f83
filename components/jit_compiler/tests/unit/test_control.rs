//! Tests for branches and loops in generated code

use jit_compiler::{BlockRole, CodegenConfig, CompileSession};
use shader_ir::{LoopKind, ShaderLayer, Symbol};
use shader_types::{DiagnosticLog, ShaderGlobals, TypeSpec};

use super::shade;

fn threshold_layer() -> ShaderLayer {
    let mut layer = ShaderLayer::new("threshold");
    let u = layer.add_global("u", TypeSpec::float());
    let half = layer.add_float_const(0.5);
    let one = layer.add_float_const(1.0);
    let two = layer.add_float_const(2.0);
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::int()));
    let x = layer.add_symbol(Symbol::local("x", TypeSpec::float()));
    let fmt = layer.add_string_const("%g");
    layer.emit("gt", &[c, u, half]);
    layer.emit_if(
        c,
        |l| {
            l.emit("assign", &[x, one]);
        },
        |l| {
            l.emit("assign", &[x, two]);
        },
    );
    layer.emit("printf", &[fmt, x]);
    layer
}

/// `s` accumulates `body` while `i < limit`; prints `s`
fn summing_loop(kind: LoopKind, limit: i32) -> ShaderLayer {
    let mut layer = ShaderLayer::new("sum");
    let i = layer.add_symbol(Symbol::local("i", TypeSpec::int()));
    let s = layer.add_symbol(Symbol::local("s", TypeSpec::int()));
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::int()));
    let zero = layer.add_int_const(0);
    let one = layer.add_int_const(1);
    let limit = layer.add_int_const(limit);
    let fmt = layer.add_string_const("%d\n");
    layer.emit_loop(
        kind,
        c,
        |l| {
            l.emit("assign", &[i, zero]);
        },
        |l| {
            l.emit("lt", &[c, i, limit]);
        },
        |l| {
            l.emit("add", &[s, s, i]);
            l.emit("add", &[i, i, one]);
        },
        |_| {},
    );
    layer.emit("printf", &[fmt, s]);
    layer
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_if_takes_then_arm() {
    let log = shade(&threshold_layer(), &mut ShaderGlobals::new().with_uv(0.75, 0.0));
    assert_eq!(log.output(), "1");
}

#[test]
fn test_if_takes_else_arm() {
    let log = shade(&threshold_layer(), &mut ShaderGlobals::new().with_uv(0.25, 0.0));
    assert_eq!(log.output(), "2");
}

#[test]
fn test_branch_inside_loop() {
    // count the even values of i in 0..6
    let mut layer = ShaderLayer::new("evens");
    let i = layer.add_symbol(Symbol::local("i", TypeSpec::int()));
    let n = layer.add_symbol(Symbol::local("n", TypeSpec::int()));
    let m = layer.add_symbol(Symbol::local("m", TypeSpec::int()));
    let e = layer.add_symbol(Symbol::local("e", TypeSpec::int()));
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::int()));
    let zero = layer.add_int_const(0);
    let one = layer.add_int_const(1);
    let two = layer.add_int_const(2);
    let six = layer.add_int_const(6);
    let fmt = layer.add_string_const("%d");
    layer.emit_loop(
        LoopKind::For,
        c,
        |l| {
            l.emit("assign", &[i, zero]);
        },
        |l| {
            l.emit("lt", &[c, i, six]);
        },
        |l| {
            l.emit("mod", &[m, i, two]);
            l.emit("eq", &[e, m, zero]);
            l.emit_if(
                e,
                |l| {
                    l.emit("add", &[n, n, one]);
                },
                |_| {},
            );
        },
        |l| {
            l.emit("add", &[i, i, one]);
        },
    );
    layer.emit("printf", &[fmt, n]);

    let log = shade(&layer, &mut ShaderGlobals::new());
    assert_eq!(log.output(), "3");
    assert!(log.is_empty());
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_for_loop_sums() {
    let log = shade(&summing_loop(LoopKind::For, 4), &mut ShaderGlobals::new());
    assert_eq!(log.output(), "6\n");
}

#[test]
fn test_while_loop_may_not_run() {
    let log = shade(&summing_loop(LoopKind::While, 0), &mut ShaderGlobals::new());
    assert_eq!(log.output(), "0\n");
}

#[test]
fn test_dowhile_runs_body_once() {
    let mut layer = ShaderLayer::new("once");
    let s = layer.add_symbol(Symbol::local("s", TypeSpec::int()));
    let c = layer.add_symbol(Symbol::local("c", TypeSpec::int()));
    let zero = layer.add_int_const(0);
    let one = layer.add_int_const(1);
    let fmt = layer.add_string_const("%d");
    layer.emit_loop(
        LoopKind::DoWhile,
        c,
        |_| {},
        |l| {
            l.emit("lt", &[c, s, zero]);
        },
        |l| {
            l.emit("add", &[s, s, one]);
        },
        |_| {},
    );
    layer.emit("printf", &[fmt, s]);
    assert_eq!(shade(&layer, &mut ShaderGlobals::new()).output(), "1");
}

#[test]
fn test_compiled_plan_matches_layer() {
    let session = CompileSession::new(CodegenConfig::debug()).unwrap();
    let compiled = session
        .compile_layer(&summing_loop(LoopKind::While, 3))
        .unwrap();
    let roles: Vec<_> = compiled.plan().blocks().iter().map(|b| b.role).collect();
    assert!(roles.contains(&BlockRole::Cond));
    assert!(roles.contains(&BlockRole::Exit));
    assert!(!roles.contains(&BlockRole::Step));
}

// ============================================================================
// Configurations and threads
// ============================================================================

#[test]
fn test_optimized_and_debug_agree() {
    let layer = summing_loop(LoopKind::For, 10);
    let fast = CompileSession::new(CodegenConfig::new()).unwrap();
    let slow = CompileSession::new(CodegenConfig::debug()).unwrap();
    let a = DiagnosticLog::new();
    let b = DiagnosticLog::new();
    fast.compile_layer(&layer)
        .unwrap()
        .invoke(&mut ShaderGlobals::new(), &a);
    slow.compile_layer(&layer)
        .unwrap()
        .invoke(&mut ShaderGlobals::new(), &b);
    assert_eq!(a.output(), "45\n");
    assert_eq!(a.output(), b.output());
}

#[test]
fn test_session_compiles_many_layers() {
    let session = CompileSession::new(CodegenConfig::debug()).unwrap();
    let first = session.compile_layer(&threshold_layer()).unwrap();
    let second = session.compile_layer(&summing_loop(LoopKind::For, 2)).unwrap();
    assert_eq!(session.compiled_count(), 2);

    let log = DiagnosticLog::new();
    first.invoke(&mut ShaderGlobals::new().with_uv(0.9, 0.0), &log);
    second.invoke(&mut ShaderGlobals::new(), &log);
    assert_eq!(log.output(), "11\n");
}

#[test]
fn test_invoke_from_many_threads() {
    let session = CompileSession::new(CodegenConfig::new()).unwrap();
    let compiled = session.compile_layer(&threshold_layer()).unwrap();

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let compiled = &compiled;
                scope.spawn(move || {
                    let log = DiagnosticLog::new();
                    let u = if t % 2 == 0 { 0.9 } else { 0.1 };
                    for _ in 0..16 {
                        compiled.invoke(&mut ShaderGlobals::new().with_uv(u, 0.0), &log);
                    }
                    log.output()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outputs[0], "1".repeat(16));
    assert_eq!(outputs[1], "2".repeat(16));
    assert_eq!(outputs[2], outputs[0]);
    assert_eq!(outputs[3], outputs[1]);
}
