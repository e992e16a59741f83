//! `printf` format expansion and rendering
//!
//! Both execution paths expand a format string once, before any point is
//! shaded: every specifier consuming a multi-component argument is repeated
//! once per component, separated by spaces. Rendering then walks the
//! expanded segments with one scalar value per slot.

use regex::Regex;
use shader_types::{ErrorKind, Result, ShadeError, TypeSpec};

const SPECIFIER: &str = r"^%([-+ #0]*)(\d+)?(?:\.(\d*))?[hlLqjzt]*([cdefgimnopsuvxX])";

/// Scalar class of one expanded argument slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Integer component
    Int,
    /// Float component (widened to f64 for rendering)
    Float,
    /// String argument
    String,
}

/// One consumed argument component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSlot {
    /// Position in the format's argument list (0 = first value argument)
    pub arg: usize,
    /// Component of that argument
    pub component: usize,
    /// Storage class of the component
    pub kind: SlotKind,
}

/// A parsed conversion specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Flag characters
    pub flags: String,
    /// Minimum field width
    pub width: Option<usize>,
    /// Precision
    pub precision: Option<usize>,
    /// Conversion character
    pub conversion: char,
}

/// Piece of an expanded format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied verbatim
    Literal(String),
    /// A conversion consuming slot `slot`
    Spec {
        /// Parsed conversion
        conversion: Conversion,
        /// Index into `PrintfFormat::slots`
        slot: usize,
    },
}

/// A format string expanded against concrete argument types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintfFormat {
    /// The expanded format text (for logging)
    pub text: String,
    /// Literal and conversion segments
    pub segments: Vec<Segment>,
    /// Argument components in consumption order
    pub slots: Vec<ArgSlot>,
}

/// A value fed to one slot at render time
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    /// Integer component
    Int(i64),
    /// Float component
    Float(f64),
    /// String argument
    Str(String),
}

/// Decode `\n`, `\r`, `\t` and `\\` escapes left in a literal
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

fn slot_kind(ty: &TypeSpec) -> Result<SlotKind> {
    if ty.is_array() || ty.is_closure() || ty.is_struct() {
        return Err(ShadeError::new(
            ErrorKind::UnsupportedFormatArgument,
            format!("cannot format a value of type {}", ty),
        ));
    }
    if ty.is_string() {
        Ok(SlotKind::String)
    } else if ty.is_float_based() {
        Ok(SlotKind::Float)
    } else {
        Ok(SlotKind::Int)
    }
}

/// Expand `format` against the types of its value arguments
pub fn expand_printf(format: &str, arg_types: &[TypeSpec]) -> Result<PrintfFormat> {
    let specifier = Regex::new(SPECIFIER).map_err(|e| ShadeError::malformed(e.to_string()))?;
    let format = unescape(format);

    let mut text = String::new();
    let mut segments = Vec::new();
    let mut slots = Vec::new();
    let mut literal = String::new();
    let mut next_arg = 0;
    let mut rest = format.as_str();

    while let Some(pos) = rest.find('%') {
        literal.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if rest.starts_with("%%") {
            literal.push('%');
            text.push_str(&literal_text(&literal));
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
            rest = &rest[2..];
            continue;
        }
        let caps = specifier.captures(rest).ok_or_else(|| {
            ShadeError::new(
                ErrorKind::UnsupportedFormatArgument,
                format!("unterminated conversion in \"{}\"", format),
            )
        })?;
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let conversion = Conversion {
            flags: caps.get(1).map_or("", |m| m.as_str()).to_string(),
            width: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            precision: caps
                .get(3)
                .map(|m| m.as_str().parse().unwrap_or(0)),
            conversion: caps
                .get(4)
                .and_then(|m| m.as_str().chars().next())
                .unwrap_or('g'),
        };
        if matches!(conversion.conversion, 'm' | 'n' | 'p' | 'v') {
            return Err(ShadeError::new(
                ErrorKind::UnsupportedFormatArgument,
                format!("conversion '%{}' is not supported", conversion.conversion),
            ));
        }
        let ty = arg_types.get(next_arg).ok_or_else(|| {
            ShadeError::new(
                ErrorKind::UnsupportedFormatArgument,
                format!("too few arguments for \"{}\"", format),
            )
        })?;
        let kind = slot_kind(ty)?;
        let components = if kind == SlotKind::String {
            1
        } else {
            ty.components()
        };

        if !literal.is_empty() {
            text.push_str(&literal_text(&literal));
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        for component in 0..components {
            if component > 0 {
                text.push(' ');
                segments.push(Segment::Literal(" ".to_string()));
            }
            text.push_str(whole);
            segments.push(Segment::Spec {
                conversion: conversion.clone(),
                slot: slots.len(),
            });
            slots.push(ArgSlot {
                arg: next_arg,
                component,
                kind,
            });
        }
        next_arg += 1;
        rest = &rest[whole.len()..];
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        text.push_str(&literal_text(&literal));
        segments.push(Segment::Literal(literal));
    }

    Ok(PrintfFormat {
        text,
        segments,
        slots,
    })
}

fn literal_text(literal: &str) -> String {
    literal.replace('%', "%%")
}

/// Render an expanded format with one value per slot
pub fn render_printf(format: &PrintfFormat, values: &[FormatValue]) -> String {
    let mut out = String::new();
    for segment in &format.segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Spec { conversion, slot } => {
                let value = values.get(*slot).cloned().unwrap_or(FormatValue::Int(0));
                out.push_str(&render_conversion(conversion, &value));
            }
        }
    }
    out
}

fn render_conversion(spec: &Conversion, value: &FormatValue) -> String {
    let body = match spec.conversion {
        'd' | 'i' => signed(spec, as_int(value).to_string(), as_int(value) < 0),
        'u' => (as_int(value) as u32).to_string(),
        'x' => format!("{:x}", as_int(value) as u32),
        'X' => format!("{:X}", as_int(value) as u32),
        'o' => format!("{:o}", as_int(value) as u32),
        'c' => char::from_u32(as_int(value) as u32)
            .map(String::from)
            .unwrap_or_default(),
        's' => match value {
            FormatValue::Str(s) => match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.clone(),
            },
            FormatValue::Int(i) => i.to_string(),
            FormatValue::Float(f) => format_general(*f, spec.precision.unwrap_or(6), false),
        },
        'f' => {
            let f = as_float(value);
            signed(spec, fixed(f, spec.precision.unwrap_or(6)), f.is_sign_negative())
        }
        'e' => {
            let f = as_float(value);
            signed(
                spec,
                scientific(f, spec.precision.unwrap_or(6)),
                f.is_sign_negative(),
            )
        }
        _ => {
            let f = as_float(value);
            signed(
                spec,
                format_general(f, spec.precision.unwrap_or(6), spec.flags.contains('#')),
                f.is_sign_negative(),
            )
        }
    };
    pad(spec, body)
}

fn as_int(value: &FormatValue) -> i64 {
    match value {
        FormatValue::Int(i) => *i,
        FormatValue::Float(f) => *f as i64,
        FormatValue::Str(_) => 0,
    }
}

fn as_float(value: &FormatValue) -> f64 {
    match value {
        FormatValue::Int(i) => *i as f64,
        FormatValue::Float(f) => *f,
        FormatValue::Str(_) => 0.0,
    }
}

fn signed(spec: &Conversion, body: String, negative: bool) -> String {
    if negative || body.starts_with('-') {
        body
    } else if spec.flags.contains('+') {
        format!("+{}", body)
    } else if spec.flags.contains(' ') {
        format!(" {}", body)
    } else {
        body
    }
}

fn pad(spec: &Conversion, body: String) -> String {
    let width = match spec.width {
        Some(w) if w > body.chars().count() => w,
        _ => return body,
    };
    let fill = width - body.chars().count();
    if spec.flags.contains('-') {
        format!("{}{}", body, " ".repeat(fill))
    } else if spec.flags.contains('0') && !matches!(spec.conversion, 's' | 'c') {
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), body[1..].to_string()),
            _ => (String::new(), body),
        };
        format!("{}{}{}", sign, "0".repeat(fill), digits)
    } else {
        format!("{}{}", " ".repeat(fill), body)
    }
}

fn fixed(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    format!("{:.*}", precision, value)
}

fn scientific(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    c_exponent(&format!("{:.*e}", precision, value))
}

/// Rewrite Rust's `1.5e2` exponent style as C's `1.5e+02`
fn c_exponent(text: &str) -> String {
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text.to_string(),
    }
}

fn non_finite(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

/// `%g`: shortest of fixed and scientific with `precision` significant digits
fn format_general(value: f64, precision: usize, keep_zeros: bool) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    let precision = precision.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let sci = format!("{:.*e}", precision - 1, value);
    let exponent: i32 = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let text = if exponent < -4 || exponent >= precision as i32 {
        let text = sci;
        if keep_zeros {
            c_exponent(&text)
        } else {
            let (mantissa, exp) = text.split_once('e').unwrap_or((&text, "0"));
            c_exponent(&format!("{}e{}", strip_zeros(mantissa), exp))
        }
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        let text = format!("{:.*}", decimals, value);
        if keep_zeros {
            text
        } else {
            strip_zeros(&text)
        }
    };
    text
}

fn strip_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}
