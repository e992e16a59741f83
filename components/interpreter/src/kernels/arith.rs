//! Binary arithmetic: `add`, `sub`, `mul`, `div`, `mod`
//!
//! Operands are combined component by component. Mixed int/float operands
//! are computed in float and truncated only into an int destination; scalar
//! operands broadcast across triples and matrices.

use crate::execution::{active_points, ShadingExecution};
use crate::storage::Lane;
use glam::{Mat4, Vec4};
use shader_ir::OpIndex;
use shader_types::Result;

/// A component-wise arithmetic operation
///
/// `None` marks a division or modulo by zero; the component becomes zero
/// and the op reports one diagnostic.
pub trait ArithOp {
    /// Diagnostic text for a zero divisor
    const FAULT: &'static str;

    /// Exact integer form
    fn int(a: i32, b: i32) -> Option<i32>;

    /// Float form
    fn float(a: f32, b: f32) -> Option<f32>;
}

/// `add`
pub struct Add;
/// `sub`
pub struct Sub;
/// `mul`
pub struct Mul;
/// `div`
pub struct Div;
/// `mod`
pub struct Mod;

impl ArithOp for Add {
    const FAULT: &'static str = "";
    fn int(a: i32, b: i32) -> Option<i32> {
        Some(a.wrapping_add(b))
    }
    fn float(a: f32, b: f32) -> Option<f32> {
        Some(a + b)
    }
}

impl ArithOp for Sub {
    const FAULT: &'static str = "";
    fn int(a: i32, b: i32) -> Option<i32> {
        Some(a.wrapping_sub(b))
    }
    fn float(a: f32, b: f32) -> Option<f32> {
        Some(a - b)
    }
}

impl ArithOp for Mul {
    const FAULT: &'static str = "";
    fn int(a: i32, b: i32) -> Option<i32> {
        Some(a.wrapping_mul(b))
    }
    fn float(a: f32, b: f32) -> Option<f32> {
        Some(a * b)
    }
}

impl ArithOp for Div {
    const FAULT: &'static str = "division by zero";
    fn int(a: i32, b: i32) -> Option<i32> {
        (b != 0).then(|| a.wrapping_div(b))
    }
    fn float(a: f32, b: f32) -> Option<f32> {
        (b != 0.0).then(|| a / b)
    }
}

impl ArithOp for Mod {
    const FAULT: &'static str = "modulo by zero";
    fn int(a: i32, b: i32) -> Option<i32> {
        (b != 0).then(|| a.wrapping_rem(b))
    }
    fn float(a: f32, b: f32) -> Option<f32> {
        (b != 0.0).then(|| a % b)
    }
}

/// `R = A op B` computed in float
pub(crate) fn binary<R: Lane, A: Lane, B: Lane, K: ArithOp>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a, b) = (args[0], args[1], args[2]);
    let varying = exec.prepare_dest(dst, &[a, b], runflags, begin, end);
    let mut faulted = false;
    for p in active_points(varying, runflags, begin, end) {
        let x = A::load(exec.sym(a), p);
        let y = B::load(exec.sym(b), p);
        let r = R::from_components(|i| {
            K::float(x.component(i), y.component(i)).unwrap_or_else(|| {
                faulted = true;
                0.0
            })
        });
        r.store(exec.sym_mut(dst), p);
    }
    if faulted {
        exec.numeric_fault(op, K::FAULT);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `R = int op int` computed exactly
pub(crate) fn binary_int<R: Lane, K: ArithOp>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a, b) = (args[0], args[1], args[2]);
    let varying = exec.prepare_dest(dst, &[a, b], runflags, begin, end);
    let mut faulted = false;
    for p in active_points(varying, runflags, begin, end) {
        let x = i32::load(exec.sym(a), p);
        let y = i32::load(exec.sym(b), p);
        let r = K::int(x, y).unwrap_or_else(|| {
            faulted = true;
            0
        });
        R::from_int(r).store(exec.sym_mut(dst), p);
    }
    if faulted {
        exec.numeric_fault(op, K::FAULT);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `matrix = scalar op scalar`: the result lands on the diagonal
pub(crate) fn scalar_pair_to_matrix<A: Lane, B: Lane, K: ArithOp>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a, b) = (args[0], args[1], args[2]);
    let varying = exec.prepare_dest(dst, &[a, b], runflags, begin, end);
    let mut faulted = false;
    for p in active_points(varying, runflags, begin, end) {
        let x = A::load(exec.sym(a), p).component(0);
        let y = B::load(exec.sym(b), p).component(0);
        let r = K::float(x, y).unwrap_or_else(|| {
            faulted = true;
            0.0
        });
        Mat4::from_diagonal(Vec4::splat(r)).store(exec.sym_mut(dst), p);
    }
    if faulted {
        exec.numeric_fault(op, K::FAULT);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// Linear-algebra forms of `mul` and `div` involving matrices
pub(crate) trait MatrixOp<A: Lane, B: Lane> {
    /// Compute the product or quotient; `None` for a singular divisor
    fn apply(a: A, b: B) -> Option<Mat4>;
}

/// `matrix = matrix * matrix`
pub struct MatMul;
/// `matrix = matrix / matrix`, i.e. `a * inverse(b)`
pub struct MatDiv;

impl MatrixOp<Mat4, Mat4> for MatMul {
    fn apply(a: Mat4, b: Mat4) -> Option<Mat4> {
        Some(a * b)
    }
}

impl MatrixOp<Mat4, Mat4> for MatDiv {
    fn apply(a: Mat4, b: Mat4) -> Option<Mat4> {
        invert(b).map(|inv| a * inv)
    }
}

/// `matrix = scalar / matrix`, i.e. `scalar * inverse(b)`
pub struct ScalarDivMatrix;

impl<A: Lane> MatrixOp<A, Mat4> for ScalarDivMatrix {
    fn apply(a: A, b: Mat4) -> Option<Mat4> {
        invert(b).map(|inv| inv * a.component(0))
    }
}

fn invert(m: Mat4) -> Option<Mat4> {
    (m.determinant() != 0.0).then(|| m.inverse())
}

/// Matrix product or quotient; a singular divisor yields the zero matrix
pub(crate) fn matrix_op<A: Lane, B: Lane, K: MatrixOp<A, B>>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a, b) = (args[0], args[1], args[2]);
    let varying = exec.prepare_dest(dst, &[a, b], runflags, begin, end);
    let mut faulted = false;
    for p in active_points(varying, runflags, begin, end) {
        let x = A::load(exec.sym(a), p);
        let y = B::load(exec.sym(b), p);
        let r = K::apply(x, y).unwrap_or_else(|| {
            faulted = true;
            Mat4::ZERO
        });
        r.store(exec.sym_mut(dst), p);
    }
    if faulted {
        exec.numeric_fault(op, "division by a singular matrix");
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}
