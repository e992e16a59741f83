//! Native storage for layer symbols
//!
//! Each symbol the generated function owns lives in one explicit stack
//! slot of 4-byte components laid out plane by plane:
//! `offset = (plane * stride + component) * 4`, where `stride` is the
//! component count times the array length. Globals are read from the
//! shading-state record instead, and some symbols get no storage at all.

use cranelift_codegen::ir::{types, InstBuilder, StackSlot, StackSlotData, StackSlotKind, Type};
use cranelift_frontend::FunctionBuilder;
use shader_ir::{ConstValue, ShaderLayer, Symbol, SymbolKind};
use shader_types::BaseType;

/// Scalar type of a natively stored component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    /// 32-bit float
    F32,
    /// 32-bit signed integer
    I32,
}

impl NativeType {
    /// Cranelift type of one component
    pub fn ir_type(self) -> Type {
        match self {
            NativeType::F32 => types::F32,
            NativeType::I32 => types::I32,
        }
    }
}

/// Why a symbol gets no native storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElisionReason {
    /// Output parameters are written back by the caller, not the function
    OutputParam,
    /// Strings, closures, structs and void
    NonNumeric,
    /// The value arrives from an upstream layer
    Connected,
    /// The default is computed by init ops
    DeferredInit,
    /// The value may vary with geometry
    NotLockgeom,
}

/// Where a symbol lives in generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Read from the shading-state record
    Global,
    /// An explicit stack slot
    Native {
        /// Component type
        ty: NativeType,
        /// Components per element
        components: usize,
        /// Array length (1 for non-arrays)
        elements: usize,
        /// Value plane plus derivative planes
        planes: usize,
    },
    /// No storage
    Elided(ElisionReason),
}

impl StorageClass {
    /// Size in bytes of the stack slot, or 0 without one
    pub fn slot_bytes(&self) -> u32 {
        match *self {
            StorageClass::Native {
                components,
                elements,
                planes,
                ..
            } => (4 * components * elements * planes) as u32,
            _ => 0,
        }
    }
}

/// Decide the storage of one symbol
pub fn classify(symbol: &Symbol) -> StorageClass {
    if symbol.is_global() {
        return StorageClass::Global;
    }
    if symbol.kind == SymbolKind::OutputParam {
        return StorageClass::Elided(ElisionReason::OutputParam);
    }
    if !symbol.ty.is_numeric() {
        return StorageClass::Elided(ElisionReason::NonNumeric);
    }
    if symbol.kind == SymbolKind::Param {
        if symbol.connected {
            return StorageClass::Elided(ElisionReason::Connected);
        }
        if symbol.init_ops {
            return StorageClass::Elided(ElisionReason::DeferredInit);
        }
        if !symbol.lockgeom {
            return StorageClass::Elided(ElisionReason::NotLockgeom);
        }
    }
    let ty = if symbol.ty.base == BaseType::Int {
        NativeType::I32
    } else {
        NativeType::F32
    };
    StorageClass::Native {
        ty,
        components: symbol.ty.components(),
        elements: symbol.ty.elements(),
        planes: symbol.planes(),
    }
}

/// Storage of every symbol of `layer`, indexed by symbol id
pub fn classify_layer(layer: &ShaderLayer) -> Vec<StorageClass> {
    layer.symbols.iter().map(classify).collect()
}

/// A symbol's stack slot
#[derive(Debug, Clone, Copy)]
pub(crate) struct NativeSlot {
    pub slot: StackSlot,
    pub ty: NativeType,
    pub components: usize,
    stride: usize,
    pub planes: usize,
}

impl NativeSlot {
    /// Byte offset of `component` in `plane`
    pub fn offset(&self, plane: usize, component: usize) -> i32 {
        ((plane * self.stride + component) * 4) as i32
    }
}

/// Create the stack slots and write their initial contents
///
/// Must run in the entry block before any op: literals (constants and
/// parameter defaults) are copied in, everything else starts at zero.
pub(crate) fn allocate(
    builder: &mut FunctionBuilder<'_>,
    layer: &ShaderLayer,
    classes: &[StorageClass],
) -> Vec<Option<NativeSlot>> {
    layer
        .symbols
        .iter()
        .zip(classes)
        .map(|(symbol, class)| {
            let StorageClass::Native {
                ty,
                components,
                elements,
                planes,
            } = *class
            else {
                return None;
            };
            let slot = builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                class.slot_bytes(),
                2,
            ));
            let native = NativeSlot {
                slot,
                ty,
                components,
                stride: components * elements,
                planes,
            };
            let literal = literal_components(ty, symbol.value.as_ref());
            for index in 0..components * elements * planes {
                let value = literal.get(index).copied().unwrap_or(Literal::Zero);
                let value = match (ty, value) {
                    (NativeType::F32, Literal::Float(f)) => builder.ins().f32const(f),
                    (NativeType::F32, _) => builder.ins().f32const(0.0),
                    (NativeType::I32, Literal::Int(i)) => {
                        builder.ins().iconst(types::I32, i64::from(i))
                    }
                    (NativeType::I32, _) => builder.ins().iconst(types::I32, 0),
                };
                builder.ins().stack_store(value, slot, (index * 4) as i32);
            }
            Some(native)
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Literal {
    Float(f32),
    Int(i32),
    Zero,
}

/// The literal prefix copied into a slot; floats never narrow into ints
fn literal_components(ty: NativeType, value: Option<&ConstValue>) -> Vec<Literal> {
    match (ty, value) {
        (NativeType::F32, Some(ConstValue::Float(v))) => {
            v.iter().map(|&f| Literal::Float(f)).collect()
        }
        (NativeType::F32, Some(ConstValue::Int(v))) => {
            v.iter().map(|&i| Literal::Float(i as f32)).collect()
        }
        (NativeType::I32, Some(ConstValue::Int(v))) => v.iter().map(|&i| Literal::Int(i)).collect(),
        _ => Vec::new(),
    }
}
