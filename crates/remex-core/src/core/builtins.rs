// Members available on primitive payloads.
use remex_domain::{DynValue, PrimitiveKind};

use crate::core::registry::{CallArgs, MemberError, MemberResult, Registry};

pub(crate) fn register(registry: &mut Registry) {
    registry
        .register_primitive(PrimitiveKind::Str)
        .getter("len", |value, args| {
            args.expect_at_most(0)?;
            length(expect_str(value)?.chars().count())
        })
        .method("upper", |value, args| {
            args.expect_at_most(0)?;
            Ok(expect_str(value)?.to_uppercase().into())
        })
        .method("lower", |value, args| {
            args.expect_at_most(0)?;
            Ok(expect_str(value)?.to_lowercase().into())
        });

    registry
        .register_primitive(PrimitiveKind::Bytes)
        .getter("len", |value, args| {
            args.expect_at_most(0)?;
            length(expect_kind(value, PrimitiveKind::Bytes, DynValue::as_bytes)?.len())
        });

    registry
        .register_primitive(PrimitiveKind::Int)
        .getter("real", |value, args| {
            args.expect_at_most(0)?;
            expect_kind(value, PrimitiveKind::Int, DynValue::as_int).map(DynValue::from)
        })
        .method("add", add_int);

    registry
        .register_primitive(PrimitiveKind::Float)
        .getter("real", |value, args| {
            args.expect_at_most(0)?;
            expect_kind(value, PrimitiveKind::Float, as_float).map(DynValue::from)
        });
}

fn add_int(value: &DynValue, args: &CallArgs) -> MemberResult {
    args.expect_at_most(1)?;
    let left = expect_kind(value, PrimitiveKind::Int, DynValue::as_int)?;
    let right = args.required_int(0, "other")?;
    left.checked_add(right)
        .map(DynValue::from)
        .ok_or_else(|| MemberError::Failed(format!("{left} + {right} overflows int")))
}

fn as_float(value: &DynValue) -> Option<f64> {
    match value.as_primitive() {
        Some(remex_domain::Primitive::Float(value)) => Some(*value),
        _ => None,
    }
}

fn expect_str(value: &DynValue) -> Result<&str, MemberError> {
    expect_kind(value, PrimitiveKind::Str, DynValue::as_str)
}

fn expect_kind<'v, T>(
    value: &'v DynValue,
    kind: PrimitiveKind,
    extract: impl FnOnce(&'v DynValue) -> Option<T>,
) -> Result<T, MemberError> {
    extract(value).ok_or_else(|| MemberError::TargetType {
        expected: kind.as_str().to_string(),
        found: value.type_tag().to_string(),
    })
}

fn length(len: usize) -> MemberResult {
    i64::try_from(len)
        .map(DynValue::from)
        .map_err(|_| MemberError::Failed(format!("length {len} does not fit in an int")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Member;

    fn call(path: (&str, &str), target: DynValue, args: CallArgs) -> MemberResult {
        let mut registry = Registry::new();
        register(&mut registry);
        let mut target = target;
        match registry.member(path.0, path.1) {
            Some(Member::Method(method)) => (method.call)(&mut target, &args),
            Some(Member::Property(property)) => {
                let getter = property.getter.as_ref().expect("getter");
                getter(&target, &args)
            }
            None => panic!("{}.{} is not registered", path.0, path.1),
        }
    }

    #[test]
    fn string_members() -> Result<(), MemberError> {
        assert_eq!(
            call(("str", "upper"), "Mixed".into(), CallArgs::default())?,
            DynValue::from("MIXED")
        );
        assert_eq!(
            call(("str", "lower"), "Mixed".into(), CallArgs::default())?,
            DynValue::from("mixed")
        );
        assert_eq!(
            call(("str", "len"), "héllo".into(), CallArgs::default())?,
            DynValue::from(5_i64)
        );
        Ok(())
    }

    #[test]
    fn numeric_members() -> Result<(), MemberError> {
        assert_eq!(
            call(("bytes", "len"), vec![1_u8, 2, 3].into(), CallArgs::default())?,
            DynValue::from(3_i64)
        );
        assert_eq!(
            call(("float", "real"), 1.5_f64.into(), CallArgs::default())?,
            DynValue::from(1.5_f64)
        );
        assert_eq!(
            call(
                ("int", "add"),
                40_i64.into(),
                CallArgs::positional(vec![2_i64.into()])
            )?,
            DynValue::from(42_i64)
        );
        Ok(())
    }

    #[test]
    fn int_add_reports_bad_arguments() {
        let err = call(("int", "add"), 1_i64.into(), CallArgs::default()).expect_err("arity");
        assert!(matches!(err, MemberError::Arity { .. }));
        let err = call(
            ("int", "add"),
            1_i64.into(),
            CallArgs::positional(vec!["x".into()]),
        )
        .expect_err("type");
        assert!(matches!(err, MemberError::ArgumentType { .. }));
        let err = call(
            ("int", "add"),
            i64::MAX.into(),
            CallArgs::positional(vec![1_i64.into()]),
        )
        .expect_err("overflow");
        assert!(matches!(err, MemberError::Failed(_)));
    }
}
