use tracing::debug;

use super::{check_target, wrap_result, ActionError, Engine, ExecutionReport, MethodAction};
use crate::core::registry::Member;
use crate::core::store::ObjectStore;

pub(super) fn execute<S: ObjectStore + ?Sized>(
    engine: &Engine<'_, S>,
    action: &MethodAction,
) -> Result<ExecutionReport, ActionError> {
    let operands = engine.resolve(action.target(), action.args(), action.kwargs(), None)?;

    let path = action.path();
    let parsed = check_target(path, &operands.target)?;
    let method = match engine.registry.member(parsed.type_tag, parsed.member) {
        Some(Member::Method(method)) => method,
        Some(Member::Property(_)) | None => {
            return Err(ActionError::InvalidOperation(format!(
                "{path} is not a callable method"
            )));
        }
    };
    debug!(path, mutates = method.mutates, "dispatching method action");

    let original = operands.target;
    let mut target = original.clone();
    let value = (method.call)(&mut target.data, &operands.call_args).map_err(|source| {
        ActionError::Member {
            path: path.to_string(),
            source,
        }
    })?;

    let result = wrap_result(value, action.result_id(), operands.permissions)?;
    engine.commit(method.mutates.then(|| (original, target)), result)
}
