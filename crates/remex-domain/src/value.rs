//! Dynamic payloads carried by stored objects.
//!
//! The engine never looks inside a payload beyond its type tag. Primitive
//! values have a canonical representation ([`Primitive`]); everything else is
//! a foreign value supplied by a vendor adapter and reached through the
//! [`ForeignObject`] trait object.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::ObjectId;

/// Canonical representation of simple scalar results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Primitive {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    None,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
}

impl PrimitiveKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bytes => "bytes",
        }
    }
}

impl Primitive {
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::None => PrimitiveKind::None,
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Int(_) => PrimitiveKind::Int,
            Self::Float(_) => PrimitiveKind::Float,
            Self::Str(_) => PrimitiveKind::Str,
            Self::Bytes(_) => PrimitiveKind::Bytes,
        }
    }

    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        self.kind().as_str()
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity of {type_tag} is read-only")]
    ReadOnly { type_tag: String },
}

/// Explicit identity contract for foreign values that carry their own id.
///
/// Values without it are wrapped in a fresh stored object instead.
pub trait HasIdentity {
    fn get_id(&self) -> ObjectId;

    fn set_id(&mut self, id: ObjectId) -> Result<(), IdentityError>;

    fn tags(&self) -> &[String] {
        &[]
    }

    fn description(&self) -> &str {
        ""
    }
}

/// Object-safe view of a foreign value.
///
/// Implemented for every [`Foreign`] type; adapters should implement
/// `Foreign` rather than this trait.
pub trait ForeignObject: Any + Send + Sync + fmt::Debug {
    fn type_tag(&self) -> &'static str;
    fn clone_foreign(&self) -> Box<dyn ForeignObject>;
    fn eq_foreign(&self, other: &dyn ForeignObject) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn identity_mut(&mut self) -> Option<&mut dyn HasIdentity>;
}

/// Typed side of a foreign value registration.
pub trait Foreign: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Registry key; members are addressed as `<TYPE_TAG>.<member>`.
    const TYPE_TAG: &'static str;

    fn as_identity_mut(&mut self) -> Option<&mut dyn HasIdentity> {
        None
    }
}

impl<T: Foreign> ForeignObject for T {
    fn type_tag(&self) -> &'static str {
        T::TYPE_TAG
    }

    fn clone_foreign(&self) -> Box<dyn ForeignObject> {
        Box::new(self.clone())
    }

    fn eq_foreign(&self, other: &dyn ForeignObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn identity_mut(&mut self) -> Option<&mut dyn HasIdentity> {
        self.as_identity_mut()
    }
}

/// Payload of a [`crate::StorableObject`].
pub enum DynValue {
    Primitive(Primitive),
    Foreign(Box<dyn ForeignObject>),
}

impl DynValue {
    #[must_use]
    pub fn none() -> Self {
        Self::Primitive(Primitive::None)
    }

    pub fn foreign<T: Foreign>(value: T) -> Self {
        Self::Foreign(Box::new(value))
    }

    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Primitive(value) => value.type_tag(),
            Self::Foreign(value) => value.type_tag(),
        }
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Self::Primitive(value) => Some(value),
            Self::Foreign(_) => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Primitive(Primitive::Int(value)) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Primitive(Primitive::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Primitive(Primitive::Str(value)) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Primitive(Primitive::Bytes(value)) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Foreign>(&self) -> Option<&T> {
        match self {
            Self::Foreign(value) => value.as_any().downcast_ref::<T>(),
            Self::Primitive(_) => None,
        }
    }

    pub fn downcast_mut<T: Foreign>(&mut self) -> Option<&mut T> {
        match self {
            Self::Foreign(value) => value.as_any_mut().downcast_mut::<T>(),
            Self::Primitive(_) => None,
        }
    }
}

impl Clone for DynValue {
    fn clone(&self) -> Self {
        match self {
            Self::Primitive(value) => Self::Primitive(value.clone()),
            Self::Foreign(value) => Self::Foreign(value.clone_foreign()),
        }
    }
}

impl PartialEq for DynValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Primitive(left), Self::Primitive(right)) => left == right,
            (Self::Foreign(left), Self::Foreign(right)) => left.eq_foreign(right.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for DynValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(value) => fmt::Debug::fmt(value, f),
            Self::Foreign(value) => fmt::Debug::fmt(value, f),
        }
    }
}

impl From<Primitive> for DynValue {
    fn from(value: Primitive) -> Self {
        Self::Primitive(value)
    }
}

impl From<bool> for DynValue {
    fn from(value: bool) -> Self {
        Self::Primitive(Primitive::Bool(value))
    }
}

impl From<i64> for DynValue {
    fn from(value: i64) -> Self {
        Self::Primitive(Primitive::Int(value))
    }
}

impl From<f64> for DynValue {
    fn from(value: f64) -> Self {
        Self::Primitive(Primitive::Float(value))
    }
}

impl From<&str> for DynValue {
    fn from(value: &str) -> Self {
        Self::Primitive(Primitive::Str(value.to_string()))
    }
}

impl From<String> for DynValue {
    fn from(value: String) -> Self {
        Self::Primitive(Primitive::Str(value))
    }
}

impl From<Vec<u8>> for DynValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Primitive(Primitive::Bytes(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        hits: u32,
    }

    impl Foreign for Counter {
        const TYPE_TAG: &'static str = "test.Counter";
    }

    #[test]
    fn foreign_values_compare_by_content() {
        let left = DynValue::foreign(Counter { hits: 1 });
        let right = DynValue::foreign(Counter { hits: 1 });
        assert_eq!(left, right);
        assert_ne!(left, DynValue::foreign(Counter { hits: 2 }));
        assert_ne!(left, DynValue::from(1_i64));
    }

    #[test]
    fn downcast_mut_reaches_the_concrete_value() {
        let mut value = DynValue::foreign(Counter { hits: 0 });
        value.downcast_mut::<Counter>().expect("counter").hits += 3;
        assert_eq!(value.downcast_ref::<Counter>().map(|c| c.hits), Some(3));
        assert_eq!(value.type_tag(), "test.Counter");
    }

    #[test]
    fn clones_are_independent() {
        let original = DynValue::foreign(Counter { hits: 1 });
        let mut copy = original.clone();
        copy.downcast_mut::<Counter>().expect("counter").hits = 9;
        assert_eq!(original.downcast_ref::<Counter>().map(|c| c.hits), Some(1));
    }

    #[test]
    fn primitive_tags_match_kind_names() {
        assert_eq!(DynValue::none().type_tag(), "none");
        assert_eq!(DynValue::from("x").type_tag(), "str");
        assert_eq!(DynValue::from(vec![1_u8]).type_tag(), "bytes");
        assert_eq!(DynValue::from(1.5_f64).type_tag(), "float");
    }
}
