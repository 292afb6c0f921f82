use remex_domain::{DynValue, ObjectId, PermissionMap, StorableObject};
use tracing::debug;

use super::ActionError;

/// Package a member's return value for storage under `result_id`.
///
/// Values that carry their own identity are rebound to `result_id` and must
/// report it back; their tags and description travel with them. The stored
/// read permissions are always exactly `permissions`.
pub fn wrap_result(
    value: DynValue,
    result_id: ObjectId,
    permissions: PermissionMap,
) -> Result<StorableObject, ActionError> {
    let mut foreign = match value {
        DynValue::Primitive(primitive) => {
            return Ok(StorableObject::new(result_id, primitive).with_permissions(permissions));
        }
        DynValue::Foreign(foreign) => foreign,
    };

    let type_tag = foreign.type_tag();
    let (tags, description) = match foreign.identity_mut() {
        Some(identity) => {
            identity
                .set_id(result_id)
                .map_err(|err| ActionError::SchemaViolation {
                    expected: result_id,
                    found: err.to_string(),
                })?;
            let found = identity.get_id();
            if found != result_id {
                return Err(ActionError::SchemaViolation {
                    expected: result_id,
                    found: found.to_string(),
                });
            }
            debug!(%result_id, type_tag, "rebound result identity");
            (identity.tags().to_vec(), identity.description().to_string())
        }
        None => (Vec::new(), String::new()),
    };

    Ok(StorableObject {
        id: result_id,
        data: DynValue::Foreign(foreign),
        read_permissions: permissions,
        tags,
        description,
    })
}
