//! Comparisons: `eq`, `neq`, `lt`, `le`, `gt`, `ge`
//!
//! Multi-component operands compare component by component and reduce left
//! to right with AND, or OR for `neq`.

use crate::execution::{active_points, ShadingExecution};
use crate::storage::Lane;
use shader_ir::OpIndex;
use shader_types::Result;

/// A scalar comparison
pub trait CompareOp {
    /// Reduce components with OR instead of AND
    const ANY: bool = false;

    /// Compare two floats
    fn float(a: f32, b: f32) -> bool;

    /// Compare two ints
    fn int(a: i32, b: i32) -> bool;
}

macro_rules! compare_op {
    ($name:ident, $doc:literal, $op:tt, $any:literal) => {
        #[doc = $doc]
        pub struct $name;

        impl CompareOp for $name {
            const ANY: bool = $any;
            fn float(a: f32, b: f32) -> bool {
                a $op b
            }
            fn int(a: i32, b: i32) -> bool {
                a $op b
            }
        }
    };
}

compare_op!(Eq, "`eq`", ==, false);
compare_op!(Neq, "`neq`", !=, true);
compare_op!(Lt, "`lt`", <, false);
compare_op!(Le, "`le`", <=, false);
compare_op!(Gt, "`gt`", >, false);
compare_op!(Ge, "`ge`", >=, false);

/// `R = A cmp B` over float components
pub(crate) fn compare<R: Lane, A: Lane, B: Lane, K: CompareOp>(
    exec: &mut ShadingExecution<'_>,
    op: OpIndex,
    runflags: &[bool],
    begin: usize,
    end: usize,
) -> Result<()> {
    let args = exec.args(op);
    let (dst, a, b) = (args[0], args[1], args[2]);
    let width = A::WIDTH.max(B::WIDTH);
    let varying = exec.prepare_dest(dst, &[a, b], runflags, begin, end);
    for p in active_points(varying, runflags, begin, end) {
        let x = A::load(exec.sym(a), p);
        let y = B::load(exec.sym(b), p);
        let mut result = !K::ANY;
        for i in 0..width {
            let c = K::float(x.component(i), y.component(i));
            result = if K::ANY { result || c } else { result && c };
        }
        R::from_int(result as i32).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `R = int cmp int`
pub(crate) fn compare_int<R: Lane, K: CompareOp>(
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
        let r = K::int(i32::load(exec.sym(a), p), i32::load(exec.sym(b), p));
        R::from_int(r as i32).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}

/// `R = string cmp string` (`eq` and `neq` only)
pub(crate) fn compare_string<R: Lane, K: CompareOp>(
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
        let same = exec.sym(a).string(p, 0) == exec.sym(b).string(p, 0);
        let r = if K::ANY { !same } else { same };
        R::from_int(r as i32).store(exec.sym_mut(dst), p);
    }
    exec.finish_dest(op, dst, runflags, begin, end);
    Ok(())
}
