use indexmap::IndexMap;
use remex_domain::{
    DynValue, ObjectReference, PermissionMap, PermissionPolicy, StorableObject,
};
use tracing::{debug, trace};

use super::ActionError;
use crate::core::registry::CallArgs;
use crate::core::store::ObjectStore;

/// Operands of an action after every reference has been fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct Operands {
    pub target: StorableObject,
    pub call_args: CallArgs,
    pub set_value: Option<DynValue>,
    /// Intersection of the read permissions of every operand.
    pub permissions: PermissionMap,
}

/// Fetch the target and every argument, folding read permissions in order:
/// target, positional args, keyword args, then the set value.
///
/// Any missing reference fails the whole resolution.
pub fn resolve_operands<S: ObjectStore + ?Sized>(
    store: &S,
    policy: PermissionPolicy,
    target: &ObjectReference,
    args: &[ObjectReference],
    kwargs: &IndexMap<String, ObjectReference>,
    set_value: Option<&ObjectReference>,
) -> Result<Operands, ActionError> {
    let target = store.get(&target.id_at_location)?;
    let mut permissions = target.read_permissions.clone();

    let mut call_args = CallArgs::default();
    for reference in args {
        let operand = fold(store, policy, reference, &mut permissions)?;
        call_args.args.push(operand);
    }
    for (name, reference) in kwargs {
        let operand = fold(store, policy, reference, &mut permissions)?;
        call_args.kwargs.insert(name.clone(), operand);
    }
    let set_value = set_value
        .map(|reference| fold(store, policy, reference, &mut permissions))
        .transpose()?;

    debug!(
        target = %target.id,
        args = call_args.args.len(),
        kwargs = call_args.kwargs.len(),
        readers = permissions.len(),
        policy = policy.as_str(),
        "resolved action operands"
    );
    Ok(Operands {
        target,
        call_args,
        set_value,
        permissions,
    })
}

fn fold<S: ObjectStore + ?Sized>(
    store: &S,
    policy: PermissionPolicy,
    reference: &ObjectReference,
    permissions: &mut PermissionMap,
) -> Result<DynValue, ActionError> {
    let operand = store.get(&reference.id_at_location)?;
    *permissions = policy.combine(permissions, &operand.read_permissions);
    trace!(operand = %operand.id, readers = permissions.len(), "folded operand permissions");
    Ok(operand.data)
}
