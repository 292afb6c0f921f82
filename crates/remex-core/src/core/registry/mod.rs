//! Capability registry: which members a type exposes and how to call them.
//!
//! Types are registered once at startup. Every member is declared either as
//! a property with an explicit set of accessors or as a callable method;
//! dispatch consults this table instead of inspecting values at runtime.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use remex_domain::{DynValue, Foreign, PrimitiveKind};

mod adapter;

pub use adapter::{AdapterError, AdapterTable, ForeignAdapter, VendorBytes, VendorCodec};

/// Operation a property may allow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Gettable,
    Settable,
    Deletable,
}

impl Capability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gettable => "get",
            Self::Settable => "set",
            Self::Deletable => "delete",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    get: bool,
    set: bool,
    delete: bool,
}

impl CapabilitySet {
    #[must_use]
    pub fn contains(self, capability: Capability) -> bool {
        match capability {
            Capability::Gettable => self.get,
            Capability::Settable => self.set,
            Capability::Deletable => self.delete,
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        !(self.get || self.set || self.delete)
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        [
            Capability::Gettable,
            Capability::Settable,
            Capability::Deletable,
        ]
        .into_iter()
        .filter(move |capability| self.contains(*capability))
    }
}

/// Failure reported by a member implementation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MemberError {
    #[error("target is not a {expected} (found {found})")]
    TargetType { expected: String, found: String },
    #[error("expected {expected} argument(s), received {received}")]
    Arity { expected: String, received: usize },
    #[error("argument {name} must be {expected}, found {found}")]
    ArgumentType {
        name: String,
        expected: &'static str,
        found: String,
    },
    #[error("index {index} out of range for {len} element(s)")]
    OutOfRange { index: i64, len: usize },
    #[error("{0}")]
    Failed(String),
}

/// Already-resolved operands handed to a member implementation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallArgs {
    pub args: Vec<DynValue>,
    pub kwargs: IndexMap<String, DynValue>,
}

impl CallArgs {
    #[must_use]
    pub fn positional(args: Vec<DynValue>) -> Self {
        Self {
            args,
            kwargs: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len() + self.kwargs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument `position`, or the keyword argument `name`.
    #[must_use]
    pub fn get(&self, position: usize, name: &str) -> Option<&DynValue> {
        self.args.get(position).or_else(|| self.kwargs.get(name))
    }

    pub fn expect_at_most(&self, max: usize) -> Result<(), MemberError> {
        if self.len() > max {
            return Err(MemberError::Arity {
                expected: format!("at most {max}"),
                received: self.len(),
            });
        }
        Ok(())
    }

    pub fn required(&self, position: usize, name: &str) -> Result<&DynValue, MemberError> {
        self.get(position, name).ok_or_else(|| MemberError::Arity {
            expected: format!("{} (missing '{name}')", position + 1),
            received: self.len(),
        })
    }

    pub fn required_int(&self, position: usize, name: &str) -> Result<i64, MemberError> {
        let value = self.required(position, name)?;
        value.as_int().ok_or_else(|| argument_type(name, "int", value))
    }

    pub fn required_bytes(&self, position: usize, name: &str) -> Result<&[u8], MemberError> {
        let value = self.required(position, name)?;
        value
            .as_bytes()
            .ok_or_else(|| argument_type(name, "bytes", value))
    }

    pub fn optional_int(&self, position: usize, name: &str) -> Result<Option<i64>, MemberError> {
        match self.get(position, name) {
            None => Ok(None),
            Some(value) => value
                .as_int()
                .map(Some)
                .ok_or_else(|| argument_type(name, "int", value)),
        }
    }
}

fn argument_type(name: &str, expected: &'static str, found: &DynValue) -> MemberError {
    MemberError::ArgumentType {
        name: name.to_string(),
        expected,
        found: found.type_tag().to_string(),
    }
}

pub type MemberResult = Result<DynValue, MemberError>;
pub type Getter = Arc<dyn Fn(&DynValue, &CallArgs) -> MemberResult + Send + Sync>;
pub type Setter = Arc<dyn Fn(&mut DynValue, DynValue, &CallArgs) -> MemberResult + Send + Sync>;
pub type Deleter = Arc<dyn Fn(&mut DynValue, &CallArgs) -> MemberResult + Send + Sync>;
pub type Callable = Arc<dyn Fn(&mut DynValue, &CallArgs) -> MemberResult + Send + Sync>;

/// Accessors declared for a property member.
#[derive(Clone, Default)]
pub struct PropertyMember {
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
    pub deleter: Option<Deleter>,
}

impl PropertyMember {
    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            get: self.getter.is_some(),
            set: self.setter.is_some(),
            delete: self.deleter.is_some(),
        }
    }
}

#[derive(Clone)]
pub struct MethodMember {
    pub call: Callable,
    /// Whether the call changes the target's payload.
    pub mutates: bool,
}

#[derive(Clone)]
pub enum Member {
    Property(PropertyMember),
    Method(MethodMember),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(property) => f
                .debug_struct("Property")
                .field("capabilities", &property.capabilities())
                .finish(),
            Self::Method(method) => f
                .debug_struct("Method")
                .field("mutates", &method.mutates)
                .finish(),
        }
    }
}

/// Member path split into its type tag and member name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberPath<'a> {
    pub type_tag: &'a str,
    pub member: &'a str,
}

impl<'a> MemberPath<'a> {
    /// Split `<type_tag>.<member>` at the last dot.
    #[must_use]
    pub fn parse(path: &'a str) -> Option<Self> {
        let (type_tag, member) = path.rsplit_once('.')?;
        if type_tag.is_empty() || member.is_empty() {
            return None;
        }
        Some(Self { type_tag, member })
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    members: HashMap<String, BTreeMap<String, Member>>,
    adapters: Arc<AdapterTable>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the builtin primitive members and the PSI vendor types.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::core::builtins::register(&mut registry);
        crate::core::vendor::psi::register(&mut registry);
        registry
    }

    pub fn register_type<T: Foreign>(&mut self) -> TypeRegistration<'_, T> {
        TypeRegistration {
            members: self.members.entry(T::TYPE_TAG.to_string()).or_default(),
            _type: PhantomData,
        }
    }

    pub fn register_primitive(&mut self, kind: PrimitiveKind) -> PrimitiveRegistration<'_> {
        PrimitiveRegistration {
            members: self.members.entry(kind.as_str().to_string()).or_default(),
        }
    }

    pub fn register_adapter(&mut self, adapter: ForeignAdapter) {
        Arc::make_mut(&mut self.adapters).register(adapter);
    }

    #[must_use]
    pub fn adapters(&self) -> &Arc<AdapterTable> {
        &self.adapters
    }

    #[must_use]
    pub fn member(&self, type_tag: &str, member: &str) -> Option<&Member> {
        self.members.get(type_tag)?.get(member)
    }
}

fn property_entry<'a>(
    members: &'a mut BTreeMap<String, Member>,
    name: &str,
) -> &'a mut PropertyMember {
    let entry = members
        .entry(name.to_string())
        .or_insert_with(|| Member::Property(PropertyMember::default()));
    if let Member::Method(_) = entry {
        // a later property declaration replaces an earlier method
        *entry = Member::Property(PropertyMember::default());
    }
    match entry {
        Member::Property(property) => property,
        Member::Method(_) => unreachable!("entry was just replaced with a property"),
    }
}

fn downcast_target<'v, T: Foreign>(value: &'v DynValue) -> Result<&'v T, MemberError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| MemberError::TargetType {
            expected: T::TYPE_TAG.to_string(),
            found: value.type_tag().to_string(),
        })
}

fn downcast_target_mut<'v, T: Foreign>(value: &'v mut DynValue) -> Result<&'v mut T, MemberError> {
    let found = value.type_tag();
    value
        .downcast_mut::<T>()
        .ok_or_else(|| MemberError::TargetType {
            expected: T::TYPE_TAG.to_string(),
            found: found.to_string(),
        })
}

/// Typed registration handle for a foreign type.
pub struct TypeRegistration<'r, T> {
    members: &'r mut BTreeMap<String, Member>,
    _type: PhantomData<fn(T)>,
}

impl<T: Foreign> TypeRegistration<'_, T> {
    pub fn getter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T, &CallArgs) -> MemberResult + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |value: &DynValue, args: &CallArgs| {
            f(downcast_target::<T>(value)?, args)
        });
        property_entry(self.members, name).getter = Some(getter);
        self
    }

    pub fn setter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut T, DynValue, &CallArgs) -> MemberResult + Send + Sync + 'static,
    {
        let setter: Setter =
            Arc::new(move |value: &mut DynValue, new: DynValue, args: &CallArgs| {
                f(downcast_target_mut::<T>(value)?, new, args)
            });
        property_entry(self.members, name).setter = Some(setter);
        self
    }

    pub fn deleter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut T, &CallArgs) -> MemberResult + Send + Sync + 'static,
    {
        let deleter: Deleter = Arc::new(move |value: &mut DynValue, args: &CallArgs| {
            f(downcast_target_mut::<T>(value)?, args)
        });
        property_entry(self.members, name).deleter = Some(deleter);
        self
    }

    /// Register a method that only reads the target.
    pub fn method<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T, &CallArgs) -> MemberResult + Send + Sync + 'static,
    {
        let call: Callable = Arc::new(move |value: &mut DynValue, args: &CallArgs| {
            f(downcast_target::<T>(value)?, args)
        });
        self.members.insert(
            name.to_string(),
            Member::Method(MethodMember {
                call,
                mutates: false,
            }),
        );
        self
    }

    /// Register a method that changes the target.
    pub fn method_mut<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut T, &CallArgs) -> MemberResult + Send + Sync + 'static,
    {
        let call: Callable = Arc::new(move |value: &mut DynValue, args: &CallArgs| {
            f(downcast_target_mut::<T>(value)?, args)
        });
        self.members.insert(
            name.to_string(),
            Member::Method(MethodMember {
                call,
                mutates: true,
            }),
        );
        self
    }
}

/// Registration handle for members of a primitive kind.
pub struct PrimitiveRegistration<'r> {
    members: &'r mut BTreeMap<String, Member>,
}

impl PrimitiveRegistration<'_> {
    pub fn getter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&DynValue, &CallArgs) -> MemberResult + Send + Sync + 'static,
    {
        property_entry(self.members, name).getter = Some(Arc::new(f));
        self
    }

    pub fn method<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&DynValue, &CallArgs) -> MemberResult + Send + Sync + 'static,
    {
        let call: Callable = Arc::new(move |value: &mut DynValue, args: &CallArgs| f(value, args));
        self.members.insert(
            name.to_string(),
            Member::Method(MethodMember {
                call,
                mutates: false,
            }),
        );
        self
    }
}
