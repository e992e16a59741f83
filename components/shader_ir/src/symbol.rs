//! Symbols - named, typed storage locations of a layer

use serde::{Deserialize, Serialize};
use shader_types::TypeSpec;

/// Index of a symbol within its layer
pub type SymbolId = usize;

/// Role of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Local variable
    Local,
    /// Compiler temporary
    Temp,
    /// Input parameter
    Param,
    /// Output parameter
    OutputParam,
    /// Renderer-supplied global
    Global,
    /// Literal constant
    Const,
}

/// Literal data held by constants and parameter defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstValue {
    /// Int components
    Int(Vec<i32>),
    /// Float components
    Float(Vec<f32>),
    /// Strings
    String(Vec<String>),
}

impl ConstValue {
    /// Number of scalar entries
    pub fn len(&self) -> usize {
        match self {
            ConstValue::Int(v) => v.len(),
            ConstValue::Float(v) => v.len(),
            ConstValue::String(v) => v.len(),
        }
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First string entry
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// First entry as an int (floats truncate)
    pub fn as_int(&self) -> Option<i32> {
        match self {
            ConstValue::Int(v) => v.first().copied(),
            ConstValue::Float(v) => v.first().map(|f| *f as i32),
            ConstValue::String(_) => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A named, typed storage location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    /// Role of the symbol
    pub kind: SymbolKind,
    /// Declared varying (one value per point) rather than uniform
    #[serde(default)]
    pub varying: bool,
    /// Carries d/dx and d/dy planes
    #[serde(default)]
    pub has_derivs: bool,
    /// Parameter fed by an upstream layer
    #[serde(default)]
    pub connected: bool,
    /// Parameter cannot be overridden by geometry
    #[serde(default = "default_true")]
    pub lockgeom: bool,
    /// Parameter initialized by its own ops instead of a literal
    #[serde(default)]
    pub init_ops: bool,
    /// Literal value (constants and parameter defaults)
    #[serde(default)]
    pub value: Option<ConstValue>,
}

impl Symbol {
    /// Create a symbol of the given kind
    pub fn new(name: impl Into<String>, ty: TypeSpec, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            varying: false,
            has_derivs: false,
            connected: false,
            lockgeom: true,
            init_ops: false,
            value: None,
        }
    }

    /// A local variable
    pub fn local(name: impl Into<String>, ty: TypeSpec) -> Self {
        Self::new(name, ty, SymbolKind::Local)
    }

    /// A constant holding `value`
    pub fn constant(name: impl Into<String>, ty: TypeSpec, value: ConstValue) -> Self {
        Self {
            value: Some(value),
            ..Self::new(name, ty, SymbolKind::Const)
        }
    }

    /// Mark as varying
    pub fn varying(mut self) -> Self {
        self.varying = true;
        self
    }

    /// Mark as carrying derivative planes
    pub fn with_derivs(mut self) -> Self {
        self.has_derivs = true;
        self
    }

    /// Attach a default value
    pub fn with_value(mut self, value: ConstValue) -> Self {
        self.value = Some(value);
        self
    }

    /// True for constants
    pub fn is_constant(&self) -> bool {
        self.kind == SymbolKind::Const
    }

    /// True for globals
    pub fn is_global(&self) -> bool {
        self.kind == SymbolKind::Global
    }

    /// True for input and output parameters
    pub fn is_param(&self) -> bool {
        matches!(self.kind, SymbolKind::Param | SymbolKind::OutputParam)
    }

    /// Derivative planes stored (3 with derivatives, 1 otherwise)
    pub fn planes(&self) -> usize {
        if self.has_derivs {
            3
        } else {
            1
        }
    }

    /// Scalar slots for one point: components x elements x planes
    pub fn slot_count(&self) -> usize {
        self.ty.components() * self.ty.elements() * self.planes()
    }
}
