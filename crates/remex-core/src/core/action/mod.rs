//! Remote actions and the engine that executes them against an object store.
//!
//! An action names a member of an object the node already holds. Executing
//! it resolves every operand from the store, folds their read permissions,
//! dispatches through the capability registry, wraps the result and commits
//! it under the requester-chosen `result_id`.

use indexmap::IndexMap;
use remex_domain::{
    Address, ObjectId, ObjectReference, PermissionPolicy, StorableObject, VerifyKey,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::registry::{Capability, MemberError, MemberPath, Registry};
use crate::core::store::{CommitBatch, ObjectStore, StoreError};
use crate::core::tooling::diagnostics;

mod method;
mod property;
mod resolve;
mod wrap;

pub use resolve::{resolve_operands, Operands};
pub use wrap::wrap_result;

/// Property access requested by a [`PropertyAction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Set,
    Get,
    Delete,
}

impl PropertyKind {
    /// Wire tag of the kind.
    #[must_use]
    pub fn tag(self) -> u32 {
        match self {
            Self::Set => 1,
            Self::Get => 2,
            Self::Delete => 3,
        }
    }

    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Set),
            2 => Some(Self::Get),
            3 => Some(Self::Delete),
            _ => None,
        }
    }

    #[must_use]
    pub fn capability(self) -> Capability {
        match self {
            Self::Set => Capability::Settable,
            Self::Get => Capability::Gettable,
            Self::Delete => Capability::Deletable,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.capability().as_str()
    }
}

/// Get, set or delete a property of a stored object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyAction {
    path: String,
    target: ObjectReference,
    result_id: ObjectId,
    #[serde(default)]
    address: Address,
    #[serde(default)]
    args: Vec<ObjectReference>,
    #[serde(default)]
    kwargs: IndexMap<String, ObjectReference>,
    kind: PropertyKind,
    #[serde(default)]
    set_value: Option<ObjectReference>,
    #[serde(default)]
    message_id: ObjectId,
}

impl PropertyAction {
    pub fn new(
        path: impl Into<String>,
        target: impl Into<ObjectReference>,
        result_id: ObjectId,
        kind: PropertyKind,
    ) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
            result_id,
            address: Address::default(),
            args: Vec::new(),
            kwargs: IndexMap::new(),
            kind,
            set_value: None,
            message_id: ObjectId::new(),
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<ObjectReference>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<ObjectReference>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_set_value(mut self, value: impl Into<ObjectReference>) -> Self {
        self.set_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_message_id(mut self, message_id: ObjectId) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn target(&self) -> &ObjectReference {
        &self.target
    }

    pub fn result_id(&self) -> ObjectId {
        self.result_id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn args(&self) -> &[ObjectReference] {
        &self.args
    }

    pub fn kwargs(&self) -> &IndexMap<String, ObjectReference> {
        &self.kwargs
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn set_value(&self) -> Option<&ObjectReference> {
        self.set_value.as_ref()
    }

    pub fn message_id(&self) -> ObjectId {
        self.message_id
    }
}

/// Call a registered method of a stored object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodAction {
    path: String,
    target: ObjectReference,
    result_id: ObjectId,
    #[serde(default)]
    address: Address,
    #[serde(default)]
    args: Vec<ObjectReference>,
    #[serde(default)]
    kwargs: IndexMap<String, ObjectReference>,
    #[serde(default)]
    message_id: ObjectId,
}

impl MethodAction {
    pub fn new(
        path: impl Into<String>,
        target: impl Into<ObjectReference>,
        result_id: ObjectId,
    ) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
            result_id,
            address: Address::default(),
            args: Vec::new(),
            kwargs: IndexMap::new(),
            message_id: ObjectId::new(),
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<ObjectReference>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<ObjectReference>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_message_id(mut self, message_id: ObjectId) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn target(&self) -> &ObjectReference {
        &self.target
    }

    pub fn result_id(&self) -> ObjectId {
        self.result_id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn args(&self) -> &[ObjectReference] {
        &self.args
    }

    pub fn kwargs(&self) -> &IndexMap<String, ObjectReference> {
        &self.kwargs
    }

    pub fn message_id(&self) -> ObjectId {
        self.message_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Property(PropertyAction),
    Method(MethodAction),
}

impl Action {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Property(action) => action.path(),
            Self::Method(action) => action.path(),
        }
    }

    #[must_use]
    pub fn result_id(&self) -> ObjectId {
        match self {
            Self::Property(action) => action.result_id(),
            Self::Method(action) => action.result_id(),
        }
    }

    #[must_use]
    pub fn message_id(&self) -> ObjectId {
        match self {
            Self::Property(action) => action.message_id(),
            Self::Method(action) => action.message_id(),
        }
    }
}

impl From<PropertyAction> for Action {
    fn from(action: PropertyAction) -> Self {
        Self::Property(action)
    }
}

impl From<MethodAction> for Action {
    fn from(action: MethodAction) -> Self {
        Self::Method(action)
    }
}

/// Errors surfaced while executing an action.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ActionError {
    #[error("[RX404] object {id} referenced by the action is not in the store")]
    NotFound { id: ObjectId },
    #[error("[RX422] {0}")]
    InvalidOperation(String),
    #[error("[RX500] result identity mismatch: expected {expected}, found {found}")]
    SchemaViolation { expected: ObjectId, found: String },
    #[error("[RX422] {path} failed: {source}")]
    Member {
        path: String,
        #[source]
        source: MemberError,
    },
    #[error(transparent)]
    Store(StoreError),
}

impl ActionError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => diagnostics::action::NOT_FOUND,
            Self::InvalidOperation(_) | Self::Member { .. } => {
                diagnostics::action::INVALID_OPERATION
            }
            Self::SchemaViolation { .. } => diagnostics::action::SCHEMA_VIOLATION,
            Self::Store(err) => err.code(),
        }
    }
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { id },
            other => Self::Store(other),
        }
    }
}

/// Attempts made before a target that keeps changing is reported as a conflict.
const MAX_COMMIT_ATTEMPTS: usize = 64;

/// Summary of a committed action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub result_id: ObjectId,
    pub type_tag: String,
    pub readers: usize,
    /// Whether the target was written back after a mutating call.
    pub target_updated: bool,
}

/// Executes actions against a borrowed store and registry.
pub struct Engine<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    registry: &'a Registry,
    policy: PermissionPolicy,
}

impl<'a, S: ObjectStore + ?Sized> Engine<'a, S> {
    pub fn new(store: &'a S, registry: &'a Registry) -> Self {
        Self {
            store,
            registry,
            policy: PermissionPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PermissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PermissionPolicy {
        self.policy
    }

    /// Execute `action` on behalf of `requester`.
    ///
    /// Nothing is written unless the operation and result wrapping both
    /// succeed. When a mutated target changes underneath the action, the
    /// action is re-run against the fresh copy.
    pub fn execute(
        &self,
        action: Action,
        requester: &VerifyKey,
    ) -> Result<ExecutionReport, ActionError> {
        debug!(
            %requester,
            message_id = %action.message_id(),
            path = action.path(),
            "executing action"
        );
        let mut attempt = 1;
        loop {
            let outcome = match &action {
                Action::Property(action) => property::execute(self, action),
                Action::Method(action) => method::execute(self, action),
            };
            match outcome {
                Err(ActionError::Store(StoreError::Conflict { id }))
                    if attempt < MAX_COMMIT_ATTEMPTS =>
                {
                    debug!(%id, attempt, "target changed during action, retrying");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    fn resolve(
        &self,
        target: &ObjectReference,
        args: &[ObjectReference],
        kwargs: &IndexMap<String, ObjectReference>,
        set_value: Option<&ObjectReference>,
    ) -> Result<Operands, ActionError> {
        resolve_operands(self.store, self.policy, target, args, kwargs, set_value)
    }

    /// Commit the result, together with the mutated target when there is one.
    ///
    /// `target` pairs the copy the action read with its updated form; the
    /// commit fails with a conflict if the stored copy changed meanwhile.
    fn commit(
        &self,
        target: Option<(StorableObject, StorableObject)>,
        result: StorableObject,
    ) -> Result<ExecutionReport, ActionError> {
        let target_updated = target.is_some();
        let mut batch = CommitBatch::new();
        if let Some((original, updated)) = target {
            batch = batch.guard(original).write(updated);
        }
        let report = ExecutionReport {
            result_id: result.id,
            type_tag: result.data.type_tag().to_string(),
            readers: result.read_permissions.len(),
            target_updated,
        };
        self.store.commit(batch.write(result))?;
        debug!(
            result_id = %report.result_id,
            type_tag = %report.type_tag,
            readers = report.readers,
            target_updated,
            "committed action result"
        );
        Ok(report)
    }
}

/// Split a member path and check it against the target's runtime type.
fn check_target<'p>(
    path: &'p str,
    target: &StorableObject,
) -> Result<MemberPath<'p>, ActionError> {
    let parsed = MemberPath::parse(path).ok_or_else(|| {
        ActionError::InvalidOperation(format!(
            "{path} is not a member path of the form <type>.<member>"
        ))
    })?;
    let found = target.data.type_tag();
    if parsed.type_tag != found {
        return Err(ActionError::InvalidOperation(format!(
            "{path} does not apply to object {} of type {found}",
            target.id
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(PropertyKind::Set.tag(), 1);
        assert_eq!(PropertyKind::Get.tag(), 2);
        assert_eq!(PropertyKind::Delete.tag(), 3);
        assert_eq!(PropertyKind::from_tag(2), Some(PropertyKind::Get));
        assert_eq!(PropertyKind::from_tag(0), None);
        assert_eq!(PropertyKind::from_tag(4), None);
    }

    #[test]
    fn store_misses_become_action_not_found() {
        let id = ObjectId::new();
        let err = ActionError::from(StoreError::NotFound { id });
        assert_eq!(err, ActionError::NotFound { id });
        assert_eq!(err.code(), "RX404");
        let backend = ActionError::from(StoreError::Backend("disk".to_string()));
        assert_eq!(backend.code(), "RX810");
    }

    #[test]
    fn actions_read_from_json_with_defaults() -> anyhow::Result<()> {
        let target = ObjectId::new();
        let result = ObjectId::new();
        let raw = format!(
            r#"{{"action":"property","path":"str.len","target":{{"id_at_location":"{target}"}},"result_id":"{result}","kind":"get"}}"#
        );
        let action: Action = serde_json::from_str(&raw)?;
        let Action::Property(action) = action else {
            panic!("expected a property action");
        };
        assert_eq!(action.target().id_at_location, target);
        assert_eq!(action.kind(), PropertyKind::Get);
        assert!(action.args().is_empty());
        assert!(action.set_value().is_none());
        Ok(())
    }

    #[test]
    fn kwarg_order_does_not_affect_equality() {
        let target = ObjectId::new();
        let result = ObjectId::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());
        let message = ObjectId::new();
        let left = MethodAction::new("int.add", target, result)
            .with_kwarg("a", a)
            .with_kwarg("b", b)
            .with_message_id(message);
        let right = MethodAction::new("int.add", target, result)
            .with_kwarg("b", b)
            .with_kwarg("a", a)
            .with_message_id(message);
        assert_eq!(left, right);
    }
}
