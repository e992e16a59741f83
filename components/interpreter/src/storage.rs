//! Per-batch symbol storage
//!
//! Each symbol owns one flat vector. A point's block holds every derivative
//! plane of every element: `[plane][element][component]`. Uniform symbols
//! store a single block shared by all points; varying symbols store one block
//! per point.

use closures::ClosureColor;
use glam::{Mat4, Vec3};
use num_traits::Zero;
use shader_ir::{ConstValue, Symbol};
use shader_types::BaseType;

/// Backing vector of a symbol
#[derive(Debug, Clone)]
pub enum Storage {
    /// float-based components
    Float(Vec<f32>),
    /// int components
    Int(Vec<i32>),
    /// strings
    Str(Vec<String>),
    /// closure trees
    Closure(Vec<ClosureColor>),
}

impl Storage {
    fn len(&self) -> usize {
        match self {
            Storage::Float(v) => v.len(),
            Storage::Int(v) => v.len(),
            Storage::Str(v) => v.len(),
            Storage::Closure(v) => v.len(),
        }
    }
}

fn spread<T: Clone>(values: &mut Vec<T>, block: usize, npoints: usize) {
    values.truncate(block);
    let first = values.clone();
    for _ in 1..npoints {
        values.extend_from_slice(&first);
    }
}

/// Storage of one symbol for one batch
#[derive(Debug, Clone)]
pub struct SymbolData {
    storage: Storage,
    varying: bool,
    stride: usize,
    planes: usize,
    npoints: usize,
}

impl SymbolData {
    /// Allocate zeroed uniform storage for `symbol`
    pub fn new(symbol: &Symbol, npoints: usize) -> Self {
        let stride = symbol.ty.components() * symbol.ty.elements();
        let planes = symbol.planes();
        let block = stride * planes;
        let storage = match symbol.ty.base {
            BaseType::Int => Storage::Int(vec![0; block]),
            BaseType::String => Storage::Str(vec![String::new(); block]),
            BaseType::Closure => Storage::Closure(vec![ClosureColor::empty(); block]),
            _ => Storage::Float(vec![0.0; block]),
        };
        let mut data = Self {
            storage,
            varying: false,
            stride,
            planes,
            npoints,
        };
        if let Some(value) = &symbol.value {
            data.load_literal(value);
        }
        data
    }

    fn load_literal(&mut self, value: &ConstValue) {
        match (&mut self.storage, value) {
            (Storage::Float(dst), ConstValue::Float(src)) => copy_prefix(dst, src),
            (Storage::Float(dst), ConstValue::Int(src)) => {
                let src: Vec<f32> = src.iter().map(|&i| i as f32).collect();
                copy_prefix(dst, &src)
            }
            (Storage::Int(dst), ConstValue::Int(src)) => copy_prefix(dst, src),
            (Storage::Str(dst), ConstValue::String(src)) => copy_prefix(dst, src),
            _ => {}
        }
    }

    /// The backing vector
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// True when one value is stored per point
    pub fn is_varying(&self) -> bool {
        self.varying
    }

    /// Scalar slots per plane (components x elements)
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of stored planes (1 or 3)
    pub fn planes(&self) -> usize {
        self.planes
    }

    fn index(&self, point: usize, plane: usize, slot: usize) -> Option<usize> {
        if plane >= self.planes || slot >= self.stride {
            return None;
        }
        let point = if self.varying { point } else { 0 };
        let index = (point * self.planes + plane) * self.stride + slot;
        (index < self.storage.len()).then_some(index)
    }

    /// Switch between one shared value and one value per point
    ///
    /// Promotion copies the uniform block to every point; demotion keeps the
    /// first point's block.
    pub fn adjust_varying(&mut self, varying: bool) {
        if varying == self.varying {
            return;
        }
        let block = self.stride * self.planes;
        let npoints = if varying { self.npoints } else { 1 };
        match &mut self.storage {
            Storage::Float(v) => spread(v, block, npoints),
            Storage::Int(v) => spread(v, block, npoints),
            Storage::Str(v) => spread(v, block, npoints),
            Storage::Closure(v) => spread(v, block, npoints),
        }
        self.varying = varying;
    }

    /// Float slot; int storage converts, missing planes read as zero
    pub fn float(&self, point: usize, plane: usize, slot: usize) -> f32 {
        let Some(index) = self.index(point, plane, slot) else {
            return f32::zero();
        };
        match &self.storage {
            Storage::Float(v) => v[index],
            Storage::Int(v) => v[index] as f32,
            _ => f32::zero(),
        }
    }

    /// Int slot; float storage truncates, missing planes read as zero
    pub fn int(&self, point: usize, plane: usize, slot: usize) -> i32 {
        let Some(index) = self.index(point, plane, slot) else {
            return i32::zero();
        };
        match &self.storage {
            Storage::Int(v) => v[index],
            Storage::Float(v) => v[index] as i32,
            _ => i32::zero(),
        }
    }

    /// String element
    pub fn string(&self, point: usize, slot: usize) -> &str {
        match (&self.storage, self.index(point, 0, slot)) {
            (Storage::Str(v), Some(index)) => &v[index],
            _ => "",
        }
    }

    /// Closure element
    pub fn closure(&self, point: usize, slot: usize) -> ClosureColor {
        match (&self.storage, self.index(point, 0, slot)) {
            (Storage::Closure(v), Some(index)) => v[index].clone(),
            _ => ClosureColor::empty(),
        }
    }

    /// Store a float slot
    pub fn set_float(&mut self, point: usize, plane: usize, slot: usize, value: f32) {
        if let Some(index) = self.index(point, plane, slot) {
            match &mut self.storage {
                Storage::Float(v) => v[index] = value,
                Storage::Int(v) => v[index] = value as i32,
                _ => {}
            }
        }
    }

    /// Store an int slot
    pub fn set_int(&mut self, point: usize, plane: usize, slot: usize, value: i32) {
        if let Some(index) = self.index(point, plane, slot) {
            match &mut self.storage {
                Storage::Int(v) => v[index] = value,
                Storage::Float(v) => v[index] = value as f32,
                _ => {}
            }
        }
    }

    /// Store a string element
    pub fn set_string(&mut self, point: usize, slot: usize, value: &str) {
        if let (Some(index), Storage::Str(v)) = (self.index(point, 0, slot), &mut self.storage) {
            v[index] = value.to_string();
        }
    }

    /// Store a closure element
    pub fn set_closure(&mut self, point: usize, slot: usize, value: ClosureColor) {
        if let (Some(index), Storage::Closure(v)) = (self.index(point, 0, slot), &mut self.storage)
        {
            v[index] = value;
        }
    }

    /// Copy `count` plane-0 slots of `point` starting at `offset`
    pub fn read_slots(&self, point: usize, offset: usize, count: usize) -> Storage {
        let range = |len: usize| {
            let start = self.index(point, 0, offset).unwrap_or(len);
            start..(start + count).min(len)
        };
        match &self.storage {
            Storage::Float(v) => Storage::Float(v[range(v.len())].to_vec()),
            Storage::Int(v) => Storage::Int(v[range(v.len())].to_vec()),
            Storage::Str(v) => Storage::Str(v[range(v.len())].to_vec()),
            Storage::Closure(v) => Storage::Closure(v[range(v.len())].to_vec()),
        }
    }

    /// Overwrite plane-0 slots of `point` starting at `offset`; mismatched
    /// storage kinds are ignored
    pub fn write_slots(&mut self, point: usize, offset: usize, slots: &Storage) {
        let Some(start) = self.index(point, 0, offset) else {
            return;
        };
        match (&mut self.storage, slots) {
            (Storage::Float(dst), Storage::Float(src)) => copy_prefix(&mut dst[start..], src),
            (Storage::Int(dst), Storage::Int(src)) => copy_prefix(&mut dst[start..], src),
            (Storage::Str(dst), Storage::Str(src)) => copy_prefix(&mut dst[start..], src),
            (Storage::Closure(dst), Storage::Closure(src)) => copy_prefix(&mut dst[start..], src),
            _ => {}
        }
    }

    /// Reset plane-0 slots of `point` to zero, empty strings or empty closures
    pub fn clear_slots(&mut self, point: usize, offset: usize, count: usize) {
        let Some(start) = self.index(point, 0, offset) else {
            return;
        };
        let end = |len: usize| (start + count).min(len);
        match &mut self.storage {
            Storage::Float(v) => {
                let end = end(v.len());
                v[start..end].fill(0.0)
            }
            Storage::Int(v) => {
                let end = end(v.len());
                v[start..end].fill(0)
            }
            Storage::Str(v) => {
                let end = end(v.len());
                v[start..end].fill(String::new())
            }
            Storage::Closure(v) => {
                let end = end(v.len());
                v[start..end].fill(ClosureColor::empty())
            }
        }
    }

    /// Zero the d/dx and d/dy planes of `point`
    pub fn zero_derivs(&mut self, point: usize) {
        for plane in 1..self.planes {
            for slot in 0..self.stride {
                self.set_float(point, plane, slot, 0.0);
            }
        }
    }
}

fn copy_prefix<T: Clone>(dst: &mut [T], src: &[T]) {
    let n = dst.len().min(src.len());
    dst[..n].clone_from_slice(&src[..n]);
}

/// A value type kernels read and write one point at a time
pub trait Lane: Copy {
    /// Scalar components
    const WIDTH: usize;

    /// Read the value of `point` (plane 0) starting at slot `offset`
    fn load_at(data: &SymbolData, point: usize, offset: usize) -> Self;

    /// Write the value of `point` (plane 0) starting at slot `offset`
    fn store_at(self, data: &mut SymbolData, point: usize, offset: usize);

    /// Component `i` as a float; scalars broadcast to every index
    fn component(&self, i: usize) -> f32;

    /// Build a value from float components (int values truncate)
    fn from_components(f: impl FnMut(usize) -> f32) -> Self;

    /// Build a value from an exact integer result
    fn from_int(value: i32) -> Self;

    /// Read the value of `point`
    fn load(data: &SymbolData, point: usize) -> Self {
        Self::load_at(data, point, 0)
    }

    /// Write the value of `point`
    fn store(self, data: &mut SymbolData, point: usize) {
        self.store_at(data, point, 0)
    }
}

impl Lane for i32 {
    const WIDTH: usize = 1;

    fn load_at(data: &SymbolData, point: usize, offset: usize) -> Self {
        data.int(point, 0, offset)
    }

    fn store_at(self, data: &mut SymbolData, point: usize, offset: usize) {
        data.set_int(point, 0, offset, self)
    }

    fn component(&self, _i: usize) -> f32 {
        *self as f32
    }

    fn from_components(mut f: impl FnMut(usize) -> f32) -> Self {
        f(0) as i32
    }

    fn from_int(value: i32) -> Self {
        value
    }
}

impl Lane for f32 {
    const WIDTH: usize = 1;

    fn load_at(data: &SymbolData, point: usize, offset: usize) -> Self {
        data.float(point, 0, offset)
    }

    fn store_at(self, data: &mut SymbolData, point: usize, offset: usize) {
        data.set_float(point, 0, offset, self)
    }

    fn component(&self, _i: usize) -> f32 {
        *self
    }

    fn from_components(mut f: impl FnMut(usize) -> f32) -> Self {
        f(0)
    }

    fn from_int(value: i32) -> Self {
        value as f32
    }
}

impl Lane for Vec3 {
    const WIDTH: usize = 3;

    fn load_at(data: &SymbolData, point: usize, offset: usize) -> Self {
        Vec3::new(
            data.float(point, 0, offset),
            data.float(point, 0, offset + 1),
            data.float(point, 0, offset + 2),
        )
    }

    fn store_at(self, data: &mut SymbolData, point: usize, offset: usize) {
        for (i, value) in self.to_array().into_iter().enumerate() {
            data.set_float(point, 0, offset + i, value);
        }
    }

    fn component(&self, i: usize) -> f32 {
        self[i % 3]
    }

    fn from_components(mut f: impl FnMut(usize) -> f32) -> Self {
        Vec3::new(f(0), f(1), f(2))
    }

    fn from_int(value: i32) -> Self {
        Vec3::splat(value as f32)
    }
}

/// Matrices are stored row-major: slot `4 * row + col`
impl Lane for Mat4 {
    const WIDTH: usize = 16;

    fn load_at(data: &SymbolData, point: usize, offset: usize) -> Self {
        let mut rows = [0.0; 16];
        for (i, value) in rows.iter_mut().enumerate() {
            *value = data.float(point, 0, offset + i);
        }
        Mat4::from_cols_array(&rows).transpose()
    }

    fn store_at(self, data: &mut SymbolData, point: usize, offset: usize) {
        for (i, value) in self.transpose().to_cols_array().into_iter().enumerate() {
            data.set_float(point, 0, offset + i, value);
        }
    }

    fn component(&self, i: usize) -> f32 {
        self.row(i / 4 % 4)[i % 4]
    }

    fn from_components(mut f: impl FnMut(usize) -> f32) -> Self {
        let mut rows = [0.0; 16];
        for (i, value) in rows.iter_mut().enumerate() {
            *value = f(i);
        }
        Mat4::from_cols_array(&rows).transpose()
    }

    fn from_int(value: i32) -> Self {
        Mat4::from_diagonal(glam::Vec4::splat(value as f32))
    }
}
