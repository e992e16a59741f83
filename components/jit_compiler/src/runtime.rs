//! Runtime helpers called from generated code
//!
//! Generated functions cannot report through a sink directly. Helpers that
//! detect a numeric fault mark it pending; the generated code commits the
//! pending fault once per op execution, and [`CompiledLayer::invoke`]
//! drains the committed faults and `printf` output afterwards. All buffers
//! are thread-local, so one compiled layer may run on many threads.
//!
//! [`CompiledLayer::invoke`]: crate::CompiledLayer::invoke

use cranelift_codegen::ir::{types, AbiParam, Signature, Type};
use std::cell::{Cell, RefCell};

thread_local! {
    static PENDING: Cell<Option<&'static str>> = const { Cell::new(None) };
    static FAULTS: RefCell<Vec<Fault>> = const { RefCell::new(Vec::new()) };
    static OUTPUT: RefCell<Vec<Printed>> = const { RefCell::new(Vec::new()) };
}

/// A numeric fault committed by one op execution
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fault {
    pub op: usize,
    pub message: &'static str,
}

/// One `printf` call: the format index and its widened arguments
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Printed {
    pub format: usize,
    pub values: Vec<f64>,
}

fn raise(message: &'static str) {
    PENDING.with(|p| {
        if p.get().is_none() {
            p.set(Some(message));
        }
    });
}

extern "C" fn shade_fdiv(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        raise("division by zero");
        return 0.0;
    }
    a / b
}

extern "C" fn shade_fmod(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        raise("modulo by zero");
        return 0.0;
    }
    a % b
}

extern "C" fn shade_idiv(a: i32, b: i32) -> i32 {
    if b == 0 {
        raise("division by zero");
        return 0;
    }
    a.wrapping_div(b)
}

extern "C" fn shade_imod(a: i32, b: i32) -> i32 {
    if b == 0 {
        raise("modulo by zero");
        return 0;
    }
    a.wrapping_rem(b)
}

extern "C" fn shade_sin(x: f32) -> f32 {
    x.sin()
}

extern "C" fn shade_cos(x: f32) -> f32 {
    x.cos()
}

/// `index` if it lies in `[0, len)`, otherwise -1 and a pending fault
extern "C" fn shade_index(index: i32, len: i32) -> i32 {
    if (0..len).contains(&index) {
        return index;
    }
    raise("component index out of range");
    -1
}

extern "C" fn shade_commit(op: i32) {
    if let Some(message) = PENDING.with(|p| p.take()) {
        FAULTS.with(|f| {
            f.borrow_mut().push(Fault {
                op: op as usize,
                message,
            })
        });
    }
}

/// # Safety
///
/// `values` must point at `count` readable f64 (generated code passes a
/// stack buffer of exactly that size).
unsafe extern "C" fn shade_printf(format: i32, values: *const f64, count: i32) {
    let values = if values.is_null() || count <= 0 {
        Vec::new()
    } else {
        // SAFETY: the caller guarantees `count` valid elements
        unsafe { std::slice::from_raw_parts(values, count as usize) }.to_vec()
    };
    OUTPUT.with(|o| {
        o.borrow_mut().push(Printed {
            format: format as usize,
            values,
        })
    });
}

/// Helpers generated code may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Helper {
    FDiv,
    FMod,
    IDiv,
    IMod,
    Sin,
    Cos,
    Index,
    Commit,
    Printf,
}

/// Parameter or return kind of a helper
#[derive(Debug, Clone, Copy)]
enum Arg {
    F32,
    I32,
    Ptr,
}

impl Helper {
    pub(crate) const ALL: [Helper; 9] = [
        Helper::FDiv,
        Helper::FMod,
        Helper::IDiv,
        Helper::IMod,
        Helper::Sin,
        Helper::Cos,
        Helper::Index,
        Helper::Commit,
        Helper::Printf,
    ];

    /// Symbol name registered with the JIT
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Helper::FDiv => "shade_fdiv",
            Helper::FMod => "shade_fmod",
            Helper::IDiv => "shade_idiv",
            Helper::IMod => "shade_imod",
            Helper::Sin => "shade_sin",
            Helper::Cos => "shade_cos",
            Helper::Index => "shade_index",
            Helper::Commit => "shade_commit",
            Helper::Printf => "shade_printf",
        }
    }

    /// Address of the implementation
    pub(crate) fn address(self) -> *const u8 {
        match self {
            Helper::FDiv => shade_fdiv as *const u8,
            Helper::FMod => shade_fmod as *const u8,
            Helper::IDiv => shade_idiv as *const u8,
            Helper::IMod => shade_imod as *const u8,
            Helper::Sin => shade_sin as *const u8,
            Helper::Cos => shade_cos as *const u8,
            Helper::Index => shade_index as *const u8,
            Helper::Commit => shade_commit as *const u8,
            Helper::Printf => shade_printf as *const u8,
        }
    }

    fn shape(self) -> (&'static [Arg], Option<Arg>) {
        match self {
            Helper::FDiv | Helper::FMod => (&[Arg::F32, Arg::F32], Some(Arg::F32)),
            Helper::IDiv | Helper::IMod | Helper::Index => (&[Arg::I32, Arg::I32], Some(Arg::I32)),
            Helper::Sin | Helper::Cos => (&[Arg::F32], Some(Arg::F32)),
            Helper::Commit => (&[Arg::I32], None),
            Helper::Printf => (&[Arg::I32, Arg::Ptr, Arg::I32], None),
        }
    }

    /// Native signature, starting from the module's default
    pub(crate) fn signature(self, mut sig: Signature, ptr: Type) -> Signature {
        let lower = |arg: Arg| match arg {
            Arg::F32 => types::F32,
            Arg::I32 => types::I32,
            Arg::Ptr => ptr,
        };
        let (params, ret) = self.shape();
        sig.params
            .extend(params.iter().map(|&a| AbiParam::new(lower(a))));
        sig.returns.extend(ret.map(|a| AbiParam::new(lower(a))));
        sig
    }
}

/// Forget anything left over from an earlier invocation on this thread
pub(crate) fn reset() {
    PENDING.with(|p| p.set(None));
    FAULTS.with(|f| f.borrow_mut().clear());
    OUTPUT.with(|o| o.borrow_mut().clear());
}

/// Committed faults since the last reset
pub(crate) fn take_faults() -> Vec<Fault> {
    FAULTS.with(|f| std::mem::take(&mut *f.borrow_mut()))
}

/// `printf` calls since the last reset
pub(crate) fn take_output() -> Vec<Printed> {
    OUTPUT.with(|o| std::mem::take(&mut *o.borrow_mut()))
}
