//! Unit tests for code generator components

mod test_control;

use jit_compiler::{CodegenConfig, CompileSession};
use shader_ir::ShaderLayer;
use shader_types::{DiagnosticLog, ShadeError, ShaderGlobals};

/// Compile `layer` with verification on and shade one point
pub fn shade(layer: &ShaderLayer, globals: &mut ShaderGlobals) -> DiagnosticLog {
    let session = CompileSession::new(CodegenConfig::debug()).unwrap();
    let compiled = session.compile_layer(layer).unwrap();
    let log = DiagnosticLog::new();
    compiled.invoke(globals, &log);
    log
}

/// The error compiling `layer` fails with
pub fn compile_error(layer: &ShaderLayer) -> ShadeError {
    let session = CompileSession::new(CodegenConfig::debug()).unwrap();
    session.compile_layer(layer).unwrap_err()
}
