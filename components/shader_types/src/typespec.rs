//! Shading-language type descriptors
//!
//! A `TypeSpec` describes the declared type of a symbol: its base type,
//! aggregate arity, vector semantics and array length.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base storage type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    /// 32-bit signed integer
    Int,
    /// 32-bit float
    Float,
    /// Interned string
    String,
    /// Closure color (BSDF tree)
    Closure,
    /// User structure
    Struct,
    /// No value
    Void,
}

/// Number of scalar components making up one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    /// One component
    Scalar,
    /// Three components (color, point, vector, normal)
    Vec3,
    /// Sixteen components (4x4 matrix)
    Matrix44,
}

impl Aggregate {
    /// Component count of this aggregate
    pub fn components(self) -> usize {
        match self {
            Aggregate::Scalar => 1,
            Aggregate::Vec3 => 3,
            Aggregate::Matrix44 => 16,
        }
    }
}

/// Interpretation of a three-component value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VecSemantics {
    /// Not a triple
    NotVec,
    /// RGB color
    Color,
    /// Position
    Point,
    /// Direction
    Vector,
    /// Surface normal
    Normal,
}

/// Declared type of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSpec {
    /// Base storage type
    pub base: BaseType,
    /// Aggregate arity
    pub aggregate: Aggregate,
    /// Triple semantics
    pub semantics: VecSemantics,
    /// Array length (0 = not an array)
    pub array_len: usize,
}

impl TypeSpec {
    const fn simple(base: BaseType, aggregate: Aggregate, semantics: VecSemantics) -> Self {
        Self {
            base,
            aggregate,
            semantics,
            array_len: 0,
        }
    }

    /// `int`
    pub const fn int() -> Self {
        Self::simple(BaseType::Int, Aggregate::Scalar, VecSemantics::NotVec)
    }

    /// `float`
    pub const fn float() -> Self {
        Self::simple(BaseType::Float, Aggregate::Scalar, VecSemantics::NotVec)
    }

    /// `color`
    pub const fn color() -> Self {
        Self::simple(BaseType::Float, Aggregate::Vec3, VecSemantics::Color)
    }

    /// `point`
    pub const fn point() -> Self {
        Self::simple(BaseType::Float, Aggregate::Vec3, VecSemantics::Point)
    }

    /// `vector`
    pub const fn vector() -> Self {
        Self::simple(BaseType::Float, Aggregate::Vec3, VecSemantics::Vector)
    }

    /// `normal`
    pub const fn normal() -> Self {
        Self::simple(BaseType::Float, Aggregate::Vec3, VecSemantics::Normal)
    }

    /// `matrix`
    pub const fn matrix() -> Self {
        Self::simple(BaseType::Float, Aggregate::Matrix44, VecSemantics::NotVec)
    }

    /// `string`
    pub const fn string() -> Self {
        Self::simple(BaseType::String, Aggregate::Scalar, VecSemantics::NotVec)
    }

    /// `closure color`
    pub const fn closure() -> Self {
        Self::simple(BaseType::Closure, Aggregate::Scalar, VecSemantics::NotVec)
    }

    /// `struct`
    pub const fn structure() -> Self {
        Self::simple(BaseType::Struct, Aggregate::Scalar, VecSemantics::NotVec)
    }

    /// `void`
    pub const fn void() -> Self {
        Self::simple(BaseType::Void, Aggregate::Scalar, VecSemantics::NotVec)
    }

    /// Array of `len` elements of this type
    pub const fn array_of(self, len: usize) -> Self {
        Self {
            array_len: len,
            ..self
        }
    }

    /// Element type of an array (or the type itself)
    pub const fn element_type(self) -> Self {
        Self {
            array_len: 0,
            ..self
        }
    }

    /// True for `int` (non-array)
    pub fn is_int(&self) -> bool {
        !self.is_array() && self.base == BaseType::Int && self.aggregate == Aggregate::Scalar
    }

    /// True for `float` (non-array)
    pub fn is_float(&self) -> bool {
        !self.is_array() && self.base == BaseType::Float && self.aggregate == Aggregate::Scalar
    }

    /// True for color/point/vector/normal (non-array)
    pub fn is_triple(&self) -> bool {
        !self.is_array() && self.base == BaseType::Float && self.aggregate == Aggregate::Vec3
    }

    /// True for `matrix` (non-array)
    pub fn is_matrix(&self) -> bool {
        !self.is_array() && self.base == BaseType::Float && self.aggregate == Aggregate::Matrix44
    }

    /// True for `string` (non-array)
    pub fn is_string(&self) -> bool {
        !self.is_array() && self.base == BaseType::String
    }

    /// True for closures
    pub fn is_closure(&self) -> bool {
        self.base == BaseType::Closure
    }

    /// True for structures
    pub fn is_struct(&self) -> bool {
        self.base == BaseType::Struct
    }

    /// True for arrays of any element type
    pub fn is_array(&self) -> bool {
        self.array_len > 0
    }

    /// True when the element is stored as float or int components
    pub fn is_numeric(&self) -> bool {
        matches!(self.base, BaseType::Int | BaseType::Float)
    }

    /// True when components are stored as floats
    pub fn is_float_based(&self) -> bool {
        self.base == BaseType::Float
    }

    /// Components per element
    pub fn components(&self) -> usize {
        self.aggregate.components()
    }

    /// Elements per value (1 for non-arrays)
    pub fn elements(&self) -> usize {
        self.array_len.max(1)
    }

    /// Operand kind used as a dispatch key, or `None` for arrays, structs and void
    pub fn kind(&self) -> Option<OperandKind> {
        if self.is_array() {
            return None;
        }
        match (self.base, self.aggregate) {
            (BaseType::Int, Aggregate::Scalar) => Some(OperandKind::Int),
            (BaseType::Float, Aggregate::Scalar) => Some(OperandKind::Float),
            (BaseType::Float, Aggregate::Vec3) => Some(OperandKind::Triple),
            (BaseType::Float, Aggregate::Matrix44) => Some(OperandKind::Matrix),
            (BaseType::String, _) => Some(OperandKind::String),
            (BaseType::Closure, _) => Some(OperandKind::Closure),
            _ => None,
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match (self.base, self.aggregate, self.semantics) {
            (BaseType::Int, _, _) => "int",
            (BaseType::Float, Aggregate::Scalar, _) => "float",
            (BaseType::Float, Aggregate::Vec3, VecSemantics::Point) => "point",
            (BaseType::Float, Aggregate::Vec3, VecSemantics::Vector) => "vector",
            (BaseType::Float, Aggregate::Vec3, VecSemantics::Normal) => "normal",
            (BaseType::Float, Aggregate::Vec3, _) => "color",
            (BaseType::Float, Aggregate::Matrix44, _) => "matrix",
            (BaseType::String, _, _) => "string",
            (BaseType::Closure, _, _) => "closure color",
            (BaseType::Struct, _, _) => "struct",
            (BaseType::Void, _, _) => "void",
        };
        if self.is_array() {
            write!(f, "{}[{}]", name, self.array_len)
        } else {
            f.write_str(name)
        }
    }
}

/// Operand category used to key specialized implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperandKind {
    /// int
    Int,
    /// float
    Float,
    /// color/point/vector/normal
    Triple,
    /// matrix
    Matrix,
    /// string
    String,
    /// closure color
    Closure,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandKind::Int => "int",
            OperandKind::Float => "float",
            OperandKind::Triple => "triple",
            OperandKind::Matrix => "matrix",
            OperandKind::String => "string",
            OperandKind::Closure => "closure",
        };
        f.write_str(name)
    }
}
