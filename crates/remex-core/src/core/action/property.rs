use tracing::debug;

use super::{
    check_target, wrap_result, ActionError, Engine, ExecutionReport, PropertyAction, PropertyKind,
};
use crate::core::registry::{Capability, Member, MemberError};
use crate::core::store::ObjectStore;

pub(super) fn execute<S: ObjectStore + ?Sized>(
    engine: &Engine<'_, S>,
    action: &PropertyAction,
) -> Result<ExecutionReport, ActionError> {
    let kind = action.kind();
    let operands = engine.resolve(
        action.target(),
        action.args(),
        action.kwargs(),
        match kind {
            PropertyKind::Set => action.set_value(),
            PropertyKind::Get | PropertyKind::Delete => None,
        },
    )?;

    let path = action.path();
    let parsed = check_target(path, &operands.target)?;
    let property = match engine.registry.member(parsed.type_tag, parsed.member) {
        Some(Member::Property(property)) => property,
        Some(Member::Method(_)) | None => {
            return Err(ActionError::InvalidOperation(format!(
                "{path} is not an actual property"
            )));
        }
    };
    let unsupported = || {
        let allowed: Vec<&str> = property
            .capabilities()
            .iter()
            .map(Capability::as_str)
            .collect();
        ActionError::InvalidOperation(format!(
            "{path} does not support {} (supports: {})",
            kind.as_str(),
            allowed.join(", ")
        ))
    };
    debug!(path, kind = kind.as_str(), "dispatching property action");

    let member_error = |source: MemberError| ActionError::Member {
        path: path.to_string(),
        source,
    };
    let original = operands.target;
    let mut target = original.clone();
    let args = &operands.call_args;
    let (value, mutated) = match kind {
        PropertyKind::Get => {
            let getter = property.getter.as_ref().ok_or_else(unsupported)?;
            (getter(&target.data, args).map_err(member_error)?, false)
        }
        PropertyKind::Set => {
            let setter = property.setter.as_ref().ok_or_else(unsupported)?;
            let new_value = operands.set_value.ok_or_else(|| {
                ActionError::InvalidOperation(format!("{path} set requires a set_value"))
            })?;
            (setter(&mut target.data, new_value, args).map_err(member_error)?, true)
        }
        PropertyKind::Delete => {
            let deleter = property.deleter.as_ref().ok_or_else(unsupported)?;
            (deleter(&mut target.data, args).map_err(member_error)?, true)
        }
    };

    let result = wrap_result(value, action.result_id(), operands.permissions)?;
    engine.commit(mutated.then(|| (original, target)), result)
}
