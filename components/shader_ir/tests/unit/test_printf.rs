//! Tests for printf expansion and rendering

use shader_ir::{expand_printf, render_printf, FormatValue, SlotKind};
use shader_types::{ErrorKind, TypeSpec};

#[test]
fn test_matrix_argument_expands_sixteen_times() {
    let fmt = expand_printf("%f", &[TypeSpec::matrix()]).unwrap();
    assert_eq!(fmt.slots.len(), 16);
    assert_eq!(fmt.text.matches("%f").count(), 16);
}

#[test]
fn test_string_argument() {
    let fmt = expand_printf("name: %s!", &[TypeSpec::string()]).unwrap();
    assert_eq!(fmt.slots[0].kind, SlotKind::String);
    let out = render_printf(&fmt, &[FormatValue::Str("diffuse".into())]);
    assert_eq!(out, "name: diffuse!");
}

#[test]
fn test_slots_follow_argument_order() {
    let fmt = expand_printf("%d %g", &[TypeSpec::int(), TypeSpec::point()]).unwrap();
    let args: Vec<_> = fmt.slots.iter().map(|s| (s.arg, s.component)).collect();
    assert_eq!(args, vec![(0, 0), (1, 0), (1, 1), (1, 2)]);
}

#[test]
fn test_flags_and_width() {
    let fmt = expand_printf("[%-4d][%04d][%+.1f]", &[TypeSpec::int(), TypeSpec::int(), TypeSpec::float()])
        .unwrap();
    let out = render_printf(
        &fmt,
        &[
            FormatValue::Int(7),
            FormatValue::Int(-7),
            FormatValue::Float(2.31),
        ],
    );
    assert_eq!(out, "[7   ][-007][+2.3]");
}

#[test]
fn test_exponent_format() {
    let fmt = expand_printf("%e", &[TypeSpec::float()]).unwrap();
    assert_eq!(render_printf(&fmt, &[FormatValue::Float(1500.0)]), "1.500000e+03");
}

#[test]
fn test_rejects_pointer_conversion() {
    let err = expand_printf("%p", &[TypeSpec::int()]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedFormatArgument);
}

#[test]
fn test_rejects_array_argument() {
    let err = expand_printf("%g", &[TypeSpec::float().array_of(2)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedFormatArgument);
}
