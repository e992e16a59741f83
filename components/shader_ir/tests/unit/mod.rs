//! Unit tests for shader_ir

mod test_layer;
mod test_printf;
