//! Unary math and geometric operations

use crate::execution::{active_points, ShadingExecution};
use crate::storage::Lane;
use glam::Vec3;
use shader_ir::OpIndex;
use shader_types::Result;

/// A component-wise unary function
pub trait UnaryOp {
    /// Float form
    fn float(x: f32) -> f32;

    /// Int form
    fn int(x: i32) -> i32 {
        Self::float(x as f32) as i32
    }
}

/// `neg`
pub struct Neg;
/// `abs` / `fabs`
pub struct Abs;
/// `sqrt`
pub struct Sqrt;
/// `sin`
pub struct Sin;
/// `cos`
pub struct Cos;

impl UnaryOp for Neg {
    fn float(x: f32) -> f32 {
        -x
    }
    fn int(x: i32) -> i32 {
        x.wrapping_neg()
    }
}

impl UnaryOp for Abs {
    fn float(x: f32) -> f32 {
        x.abs()
    }
    fn int(x: i32) -> i32 {
        x.wrapping_abs()
    }
}

impl UnaryOp for Sqrt {
    fn float(x: f32) -> f32 {
        x.sqrt()
    }
}

impl UnaryOp for Sin {
    fn float(x: f32) -> f32 {
        x.sin()
    }
}

impl UnaryOp for Cos {
    fn float(x: f32) -> f32 {
        x.cos()
    }
}

/// `R = f(A)` per float component
pub(crate) fn unary<R: Lane, A: Lane, K: UnaryOp>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a) = (args[0], args[1]);
    let varying = exec.prepare_dest(dst, &[a], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let x = A::load(exec.sym(a), p);
        R::from_components(|i| K::float(x.component(i))).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `int = f(int)`
pub(crate) fn unary_int<K: UnaryOp>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a) = (args[0], args[1]);
    let varying = exec.prepare_dest(dst, &[a], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let x = i32::load(exec.sym(a), p);
        K::int(x).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// Euclidean length: square root of the sum of squares
pub fn length(v: Vec3) -> f32 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Rec. 709 luminance
pub fn luminance(c: Vec3) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

/// `v * (1 / sqrt(dot(v, v)))`; zero input gives non-finite components
pub fn normalize(v: Vec3) -> Vec3 {
    v * (1.0 / v.dot(v).sqrt())
}

/// `cross[i] = a[i+1] * b[i+2] - a[i+2] * b[i+1]` (indices mod 3)
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::from_array(std::array::from_fn(|i| {
        a[(i + 1) % 3] * b[(i + 2) % 3] - a[(i + 2) % 3] * b[(i + 1) % 3]
    }))
}

/// `R = f(triple)` for length, luminance and normalize
pub(crate) fn reduce<R: Lane, F: TripleFn<R>>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a) = (args[0], args[1]);
    let varying = exec.prepare_dest(dst, &[a], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let v = Vec3::load(exec.sym(a), p);
        F::apply(v).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// A function of one triple
pub trait TripleFn<R> {
    /// Evaluate
    fn apply(v: Vec3) -> R;
}

/// `length`
pub struct Length;
/// `luminance`
pub struct Luminance;
/// `normalize`
pub struct Normalize;

impl TripleFn<f32> for Length {
    fn apply(v: Vec3) -> f32 {
        length(v)
    }
}

impl TripleFn<f32> for Luminance {
    fn apply(v: Vec3) -> f32 {
        luminance(v)
    }
}

impl TripleFn<Vec3> for Normalize {
    fn apply(v: Vec3) -> Vec3 {
        normalize(v)
    }
}

/// `float = dot(triple, triple)`
pub(crate) fn dot(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a, b) = (args[0], args[1], args[2]);
    let varying = exec.prepare_dest(dst, &[a, b], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let r = Vec3::load(exec.sym(a), p).dot(Vec3::load(exec.sym(b), p));
        r.store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `triple = cross(triple, triple)`
pub(crate) fn cross_op(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a, b) = (args[0], args[1], args[2]);
    let varying = exec.prepare_dest(dst, &[a, b], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let r = cross(Vec3::load(exec.sym(a), p), Vec3::load(exec.sym(b), p));
        r.store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}
