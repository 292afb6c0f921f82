use prost::Message;
use remex_domain::{DynValue, PermissionMap, Primitive, StorableObject, VerifyKey};

use super::proto::{
    DataProto, DataValue, NullProto, PermissionProto, StorableObjectProto, VendorBytesProto,
};
use super::{decode_id, DecodeError};
use crate::core::registry::{AdapterError, AdapterTable, VendorBytes};

/// Serialize a stored object. Foreign payloads go through their adapter.
pub fn encode_object(
    object: &StorableObject,
    adapters: &AdapterTable,
) -> Result<Vec<u8>, AdapterError> {
    let data = match &object.data {
        DynValue::Primitive(primitive) => primitive_to_proto(primitive),
        DynValue::Foreign(foreign) => {
            let vendor = adapters.encode(&**foreign)?;
            DataValue::Vendor(VendorBytesProto {
                obj_type: vendor.obj_type,
                vendor_lib: vendor.vendor_lib,
                vendor_lib_version: vendor.vendor_lib_version,
                content: vendor.content,
            })
        }
    };
    let proto = StorableObjectProto {
        id: object.id.to_vec(),
        data: Some(DataProto { value: Some(data) }),
        read_permissions: object
            .read_permissions
            .iter()
            .map(|(key, provenance)| PermissionProto {
                key: key.as_bytes().to_vec(),
                provenance: provenance.to_vec(),
            })
            .collect(),
        tags: object.tags.clone(),
        description: object.description.clone(),
    };
    Ok(proto.encode_to_vec())
}

pub fn decode_object(bytes: &[u8], adapters: &AdapterTable) -> Result<StorableObject, DecodeError> {
    let proto = StorableObjectProto::decode(bytes)?;
    let id = decode_id("id", &proto.id)?;
    let value = proto
        .data
        .and_then(|data| data.value)
        .ok_or(DecodeError::MissingField("data"))?;
    let data = match value {
        DataValue::Null(NullProto {}) => DynValue::none(),
        DataValue::Bool(value) => DynValue::from(value),
        DataValue::Int(value) => DynValue::from(value),
        DataValue::Float(value) => DynValue::from(value),
        DataValue::Str(value) => DynValue::from(value),
        DataValue::Bytes(value) => DynValue::from(value),
        DataValue::Vendor(vendor) => DynValue::Foreign(adapters.decode(&VendorBytes {
            obj_type: vendor.obj_type,
            vendor_lib: vendor.vendor_lib,
            vendor_lib_version: vendor.vendor_lib_version,
            content: vendor.content,
        })?),
    };
    let mut read_permissions = PermissionMap::new();
    for permission in proto.read_permissions {
        let key = VerifyKey::from_bytes(&permission.key)?;
        read_permissions.insert(key, decode_id("read_permissions", &permission.provenance)?);
    }
    Ok(StorableObject {
        id,
        data,
        read_permissions,
        tags: proto.tags,
        description: proto.description,
    })
}

fn primitive_to_proto(primitive: &Primitive) -> DataValue {
    match primitive {
        Primitive::None => DataValue::Null(NullProto {}),
        Primitive::Bool(value) => DataValue::Bool(*value),
        Primitive::Int(value) => DataValue::Int(*value),
        Primitive::Float(value) => DataValue::Float(*value),
        Primitive::Str(value) => DataValue::Str(value.clone()),
        Primitive::Bytes(value) => DataValue::Bytes(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use remex_domain::{Foreign, ObjectId};

    fn key(seed: u8) -> VerifyKey {
        SigningKey::from_bytes(&[seed; 32]).verifying_key().into()
    }

    #[test]
    fn primitive_objects_keep_metadata_and_permissions() -> anyhow::Result<()> {
        let adapters = AdapterTable::default();
        let id = ObjectId::new();
        let object = StorableObject::new(id, vec![0_u8, 1, 2])
            .readable_by(key(1), ObjectId::new())
            .readable_by(key(2), id)
            .with_tags(vec!["a".to_string(), "b".to_string()])
            .with_description("raw bytes");
        let decoded = decode_object(&encode_object(&object, &adapters)?, &adapters)?;
        assert_eq!(decoded, object);
        Ok(())
    }

    #[test]
    fn null_and_float_payloads_decode() -> anyhow::Result<()> {
        let adapters = AdapterTable::default();
        for data in [DynValue::none(), DynValue::from(-2.5_f64), DynValue::from(i64::MIN)] {
            let object = StorableObject::new(ObjectId::new(), data);
            assert_eq!(decode_object(&encode_object(&object, &adapters)?, &adapters)?, object);
        }
        Ok(())
    }

    #[test]
    fn foreign_payloads_need_an_adapter() {
        #[derive(Clone, Debug, PartialEq)]
        struct Opaque;

        impl Foreign for Opaque {
            const TYPE_TAG: &'static str = "test.Opaque";
        }

        let object = StorableObject::new(ObjectId::new(), DynValue::foreign(Opaque));
        let err = encode_object(&object, &AdapterTable::default()).expect_err("no adapter");
        assert_eq!(
            err,
            AdapterError::UnknownType {
                type_tag: "test.Opaque".to_string()
            }
        );
    }

    #[test]
    fn objects_without_data_are_rejected() {
        let proto = StorableObjectProto {
            id: ObjectId::new().to_vec(),
            data: None,
            read_permissions: Vec::new(),
            tags: Vec::new(),
            description: String::new(),
        };
        let err = decode_object(&proto.encode_to_vec(), &AdapterTable::default())
            .expect_err("missing data");
        assert_eq!(err, DecodeError::MissingField("data"));
    }
}
