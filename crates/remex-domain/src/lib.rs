#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod ids;
pub mod key;
pub mod object;
pub mod permissions;
pub mod value;

pub use ids::{Address, IdError, ObjectId};
pub use key::{KeyError, VerifyKey};
pub use object::{ObjectReference, StorableObject};
pub use permissions::{intersect, intersect_keys_only, PermissionMap, PermissionPolicy};
pub use value::{
    DynValue, Foreign, ForeignObject, HasIdentity, IdentityError, Primitive, PrimitiveKind,
};
