//! Operator commands behind the `remex` binary.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use remex_domain::{DynValue, ObjectId, Primitive, StorableObject, VerifyKey};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::core::action::{Action, ActionError, Engine};
use crate::core::config::{open_store, Config};
use crate::core::registry::Registry;
use crate::core::store::StoreError;
use crate::core::tooling::outcome::ExecutionOutcome;
use crate::core::wire::{decode_action, encode_action, DecodeError};

#[derive(Debug, Clone, Default)]
pub struct ObjectPutRequest {
    pub id: Option<ObjectId>,
    /// JSON scalar, or a tagged primitive such as `{"type":"bytes","value":[1,2]}`.
    pub value: String,
    pub readers: Vec<(VerifyKey, ObjectId)>,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

/// Parse a `<hex-key>=<object-id>` reader grant.
pub fn parse_reader(raw: &str) -> Result<(VerifyKey, ObjectId), String> {
    let (key, provenance) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <hex-key>=<object-id>, got '{raw}'"))?;
    let key = key.parse::<VerifyKey>().map_err(|err| err.to_string())?;
    let provenance = provenance
        .parse::<ObjectId>()
        .map_err(|err| err.to_string())?;
    Ok((key, provenance))
}

/// Encode a JSON action file into wire bytes.
pub fn action_encode(input: &Path, output: &Path) -> Result<ExecutionOutcome> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let action: Action = match serde_json::from_str(&raw) {
        Ok(action) => action,
        Err(err) => {
            return Ok(ExecutionOutcome::user_error(
                format!("invalid action JSON in {}: {err}", input.display()),
                json!({ "path": input.display().to_string() }),
            ));
        }
    };
    let bytes = encode_action(&action);
    fs::write(output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    debug!(path = %output.display(), bytes = bytes.len(), "encoded action");
    Ok(ExecutionOutcome::success(
        format!("encoded {} to {}", action.path(), output.display()),
        json!({
            "bytes": bytes.len(),
            "result_id": action.result_id(),
            "message_id": action.message_id(),
        }),
    ))
}

/// Decode wire bytes into the JSON action form.
pub fn action_decode(input: &Path) -> Result<ExecutionOutcome> {
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let action = match decode_action(&bytes) {
        Ok(action) => action,
        Err(err) => return Ok(decode_failure(&err)),
    };
    let details = serde_json::to_value(&action)?;
    Ok(ExecutionOutcome::success(
        serde_json::to_string_pretty(&details)?,
        json!({ "action": details, "passthrough": true }),
    ))
}

pub fn object_put(config: &Config, request: &ObjectPutRequest) -> Result<ExecutionOutcome> {
    let value = match parse_value(&request.value) {
        Ok(value) => value,
        Err(reason) => {
            return Ok(ExecutionOutcome::user_error(
                format!("invalid value: {reason}"),
                json!({ "value": request.value }),
            ));
        }
    };
    let id = request.id.unwrap_or_default();
    let mut object = StorableObject::new(id, value).with_tags(request.tags.clone());
    if let Some(description) = &request.description {
        object = object.with_description(description.clone());
    }
    for (reader, provenance) in &request.readers {
        object = object.readable_by(*reader, *provenance);
    }
    let registry = Registry::with_defaults();
    let store = open_store(config.store(), Arc::clone(registry.adapters()))?;
    let view = object_view(&object);
    store.set(id, object).with_context(|| format!("failed to store {id}"))?;
    Ok(ExecutionOutcome::success(format!("stored {id}"), view))
}

pub fn object_get(config: &Config, id: ObjectId) -> Result<ExecutionOutcome> {
    let registry = Registry::with_defaults();
    let store = open_store(config.store(), Arc::clone(registry.adapters()))?;
    match store.get(&id) {
        Ok(object) => {
            let view = object_view(&object);
            Ok(ExecutionOutcome::success(
                serde_json::to_string_pretty(&view)?,
                json!({ "object": view, "passthrough": true }),
            ))
        }
        Err(err @ StoreError::NotFound { .. }) => Ok(ExecutionOutcome::user_error(
            err.to_string(),
            json!({ "code": err.code(), "id": id }),
        )),
        Err(err) => Ok(ExecutionOutcome::failure(
            err.to_string(),
            json!({ "code": err.code(), "id": id }),
        )),
    }
}

/// Decode an action file and execute it against the configured store.
pub fn exec_action(
    config: &Config,
    input: &Path,
    requester: &VerifyKey,
) -> Result<ExecutionOutcome> {
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let action = match decode_action(&bytes) {
        Ok(action) => action,
        Err(err) => return Ok(decode_failure(&err)),
    };
    let registry = Registry::with_defaults();
    let store = open_store(config.store(), Arc::clone(registry.adapters()))?;
    let engine = Engine::new(store.as_ref(), &registry).with_policy(config.policy());
    match engine.execute(action, requester) {
        Ok(report) => Ok(ExecutionOutcome::success(
            format!("committed {} result as {}", report.type_tag, report.result_id),
            serde_json::to_value(&report)?,
        )),
        Err(err) => Ok(action_failure(&err)),
    }
}

fn decode_failure(err: &DecodeError) -> ExecutionOutcome {
    ExecutionOutcome::user_error(err.to_string(), json!({ "code": err.code() }))
}

fn action_failure(err: &ActionError) -> ExecutionOutcome {
    let details = json!({ "code": err.code(), "reason": err.to_string() });
    match err {
        ActionError::NotFound { .. }
        | ActionError::InvalidOperation(_)
        | ActionError::Member { .. } => ExecutionOutcome::user_error(err.to_string(), details),
        ActionError::SchemaViolation { .. } | ActionError::Store(_) => {
            ExecutionOutcome::failure(err.to_string(), details)
        }
    }
}

fn parse_value(raw: &str) -> Result<Primitive, String> {
    let value: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    match value {
        Value::Null => Ok(Primitive::None),
        Value::Bool(value) => Ok(Primitive::Bool(value)),
        Value::Number(number) => number
            .as_i64()
            .map(Primitive::Int)
            .or_else(|| number.as_f64().map(Primitive::Float))
            .ok_or_else(|| format!("{number} is out of range")),
        Value::String(value) => Ok(Primitive::Str(value)),
        tagged @ Value::Object(_) => {
            serde_json::from_value::<Primitive>(tagged).map_err(|err| err.to_string())
        }
        Value::Array(_) => Err("arrays are not primitives".to_string()),
    }
}

fn object_view(object: &StorableObject) -> Value {
    let readers: Map<String, Value> = object
        .read_permissions
        .iter()
        .map(|(key, provenance)| (key.to_hex(), Value::String(provenance.to_string())))
        .collect();
    json!({
        "id": object.id,
        "type": object.data.type_tag(),
        "data": data_view(&object.data),
        "read_permissions": readers,
        "tags": object.tags,
        "description": object.description,
    })
}

fn data_view(data: &DynValue) -> Value {
    match data {
        DynValue::Primitive(primitive) => serde_json::to_value(primitive).unwrap_or(Value::Null),
        DynValue::Foreign(value) => json!({ "debug": format!("{value:?}") }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[test]
    fn values_parse_from_json_scalars_and_tagged_form() {
        assert_eq!(parse_value("null"), Ok(Primitive::None));
        assert_eq!(parse_value("7"), Ok(Primitive::Int(7)));
        assert_eq!(parse_value("1.25"), Ok(Primitive::Float(1.25)));
        assert_eq!(parse_value("\"hi\""), Ok(Primitive::Str("hi".to_string())));
        assert_eq!(
            parse_value(r#"{"type":"bytes","value":[1,2]}"#),
            Ok(Primitive::Bytes(vec![1, 2]))
        );
        assert!(parse_value("[1]").is_err());
    }

    #[test]
    fn readers_parse_key_and_provenance() {
        let key: VerifyKey = SigningKey::from_bytes(&[5; 32]).verifying_key().into();
        let id = ObjectId::new();
        assert_eq!(parse_reader(&format!("{key}={id}")), Ok((key, id)));
        assert!(parse_reader("missing-separator").is_err());
    }

    #[test]
    fn action_errors_map_to_exit_codes() {
        let id = ObjectId::new();
        assert_eq!(action_failure(&ActionError::NotFound { id }).exit_code(), 1);
        let violation = ActionError::SchemaViolation {
            expected: id,
            found: "other".to_string(),
        };
        assert_eq!(action_failure(&violation).exit_code(), 2);
    }
}
