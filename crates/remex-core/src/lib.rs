#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

mod core;

pub use crate::core::action::{
    resolve_operands, wrap_result, Action, ActionError, Engine, ExecutionReport, MethodAction,
    Operands, PropertyAction, PropertyKind,
};
pub use crate::core::commands::{
    action_decode, action_encode, exec_action, object_get, object_put, parse_reader,
    ObjectPutRequest,
};
pub use crate::core::config::{
    open_store, Config, StoreBackend, StoreConfig, StoreLocation,
};
pub use crate::core::registry::{
    AdapterError, AdapterTable, CallArgs, Capability, CapabilitySet, ForeignAdapter, Member,
    MemberError, MemberPath, MemberResult, MethodMember, PropertyMember, Registry, VendorBytes,
    VendorCodec,
};
pub use crate::core::store::{
    CommitBatch, MemoryStore, ObjectStore, SqliteStore, StoreError, STORE_FILENAME,
};
pub use crate::core::tooling::diagnostics;
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
pub use crate::core::vendor::psi;
pub use crate::core::wire::{
    decode_action, decode_object, encode_action, encode_object, DecodeError,
};
